//! Polling threads for the elevator server.
//!
//! The driver is blocking, so each input gets its own OS thread feeding a crossbeam channel.
//! A bridge thread selects over those channels and forwards everything into one tokio channel
//! of [`HwEvent`]s for the control FSM.
//!
//! A polling thread stops on the first I/O error. When every poller has stopped the bridge
//! drops its sender, and the FSM sees the hardware channel close.

use crossbeam_channel as cbc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;

use super::elev::ElevatorDriver;
use super::HwEvent;
use crate::config;
use crate::elev_types::OrderType;
use crate::print;

struct LocalElevTxs {
    call_button: cbc::Sender<(u8, OrderType)>,
    floor_sensor: cbc::Sender<u8>,
}

struct LocalElevRxs {
    call_button: cbc::Receiver<(u8, OrderType)>,
    floor_sensor: cbc::Receiver<u8>,
}

struct LocalElevChannels {
    rxs: LocalElevRxs,
    txs: LocalElevTxs,
}

impl LocalElevChannels {
    fn new() -> Self {
        let (call_button_tx, call_button_rx) = cbc::unbounded();
        let (floor_sensor_tx, floor_sensor_rx) = cbc::unbounded();

        LocalElevChannels {
            rxs: LocalElevRxs { call_button: call_button_rx, floor_sensor: floor_sensor_rx },
            txs: LocalElevTxs { call_button: call_button_tx, floor_sensor: floor_sensor_tx },
        }
    }
}

/// Starts polling `driver` and returns the channel the events arrive on.
pub fn start(driver: ElevatorDriver) -> mpsc::UnboundedReceiver<HwEvent> {
    let channels = LocalElevChannels::new();
    let (hw_tx, hw_rx) = mpsc::unbounded_channel();

    {
        let driver = driver.clone();
        let tx = channels.txs.call_button;
        thread::spawn(move || call_buttons(driver, tx, config::ELEV_POLL));
    }
    {
        let tx = channels.txs.floor_sensor;
        thread::spawn(move || floor_sensor(driver, tx, config::ELEV_POLL));
    }

    let rxs = channels.rxs;
    thread::spawn(move || bridge(rxs, hw_tx));

    hw_rx
}

/// Reports every button that goes from released to pressed.
pub fn call_buttons(driver: ElevatorDriver, ch: cbc::Sender<(u8, OrderType)>, period: Duration) {
    let mut prev = vec![[false; config::NUM_BUTTONS]; driver.num_floors.into()];
    loop {
        for floor in 0..driver.num_floors {
            for order_type in OrderType::ALL {
                let pressed = match driver.call_button(floor, order_type) {
                    Ok(pressed) => pressed,
                    Err(e) => {
                        print::err(format!("Lost elevator server while reading buttons: {}", e));
                        return;
                    }
                };
                let was = &mut prev[floor as usize][order_type.index()];
                if pressed && !*was && ch.send((floor, order_type)).is_err() {
                    return;
                }
                *was = pressed;
            }
        }
        thread::sleep(period)
    }
}

/// Reports the floor each time the car arrives at one.
///
/// Leaving a floor forgets it, so passing the same floor twice is reported twice.
pub fn floor_sensor(driver: ElevatorDriver, ch: cbc::Sender<u8>, period: Duration) {
    let mut prev: Option<u8> = None;
    loop {
        match driver.floor_sensor() {
            Ok(Some(floor)) => {
                if prev != Some(floor) && ch.send(floor).is_err() {
                    return;
                }
                prev = Some(floor);
            }
            Ok(None) => prev = None,
            Err(e) => {
                print::err(format!("Lost elevator server while reading floor sensor: {}", e));
                return;
            }
        }
        thread::sleep(period)
    }
}

fn bridge(rxs: LocalElevRxs, tx: mpsc::UnboundedSender<HwEvent>) {
    let mut call_button = Some(rxs.call_button);
    let mut floor_sensor = Some(rxs.floor_sensor);

    // A closed crossbeam receiver is replaced by `never` so select stops waking on it
    loop {
        if call_button.is_none() && floor_sensor.is_none() {
            return;
        }
        let buttons = call_button.clone().unwrap_or_else(cbc::never);
        let floors = floor_sensor.clone().unwrap_or_else(cbc::never);

        let event = cbc::select! {
            recv(buttons) -> msg => match msg {
                Ok((floor, order_type)) => Some(HwEvent::Button { floor, order_type }),
                Err(_) => { call_button = None; None }
            },
            recv(floors) -> msg => match msg {
                Ok(floor) => Some(HwEvent::Floor(floor)),
                Err(_) => { floor_sensor = None; None }
            },
        };

        if let Some(event) = event {
            if tx.send(event).is_err() {
                return;
            }
        }
    }
}
