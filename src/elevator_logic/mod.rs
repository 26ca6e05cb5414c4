//! ## Control FSM task
//!
//! Owns the physical elevator. The task waits on four things at once: hardware events,
//! commands from the assignment protocol, the door timer and the motor timer. Each event is
//! handled to completion by [`fsm::LocalElevator`] before the next one is taken.
//!
//! After every event the elevator is compared to the last published copy. A changed elevator
//! is sent to the assignment protocol as [`LocalUpdate::Snapshot`] and put on the `watch`
//! channel the backup writer reads.

pub mod fsm;
pub mod timer;
mod lights;

use tokio::sync::{mpsc, watch};

use crate::elev_types::{Elevator, Order};
use crate::elevio::{ElevatorIo, HwEvent};
use crate::print;

/// Requests from the assignment protocol. The FSM is the only one mutating the elevator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsmCommand {
    /// Claim and start serving this order
    Execute(Order),
    /// Apply an order status received from another elevator
    ApplyNetwork(Order),
    /// Make the cell NotTaken again
    Release(Order),
}

/// What the FSM tells the assignment protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalUpdate {
    /// The elevator changed
    Snapshot(Elevator),
    /// A call button press that made a new request, as a NotTaken order
    ButtonPress(Order),
}

/// Runs the control FSM until the hardware or the protocol goes away.
///
/// ## Parameters
/// `io`: Hardware outputs
/// `elevator`: Starting state, fresh or from the backup file
/// `hw_rx`: Button and floor events from [`crate::elevio::poll`]
/// `cmd_rx`: Commands from the assignment protocol
/// `update_tx`: Snapshots and button presses to the assignment protocol
/// `snapshot_tx`: Latest elevator for the backup writer
pub async fn run_local_elevator<I: ElevatorIo>(
    io: I,
    elevator: Elevator,
    mut hw_rx: mpsc::UnboundedReceiver<HwEvent>,
    mut cmd_rx: mpsc::UnboundedReceiver<FsmCommand>,
    update_tx: mpsc::UnboundedSender<LocalUpdate>,
    snapshot_tx: watch::Sender<Elevator>,
) {
    let mut local = fsm::LocalElevator::new(elevator, io);
    local.start();

    let mut published = local.elevator().clone();
    print::elevator(&published);
    let _ = update_tx.send(LocalUpdate::Snapshot(published.clone()));
    snapshot_tx.send_replace(published.clone());

    loop {
        tokio::select! {
            event = hw_rx.recv() => {
                match event {
                    Some(HwEvent::Button { floor, order_type }) => {
                        if let Some(pressed) = local.on_button(floor, order_type) {
                            let _ = update_tx.send(LocalUpdate::ButtonPress(pressed));
                        }
                    }
                    Some(HwEvent::Floor(floor)) => local.on_floor(floor),
                    None => {
                        print::err("Hardware event channel closed, stopping elevator".to_string());
                        return;
                    }
                }
            }
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(FsmCommand::Execute(order)) => local.on_execute(order),
                    Some(FsmCommand::ApplyNetwork(order)) => local.on_network_order(order),
                    Some(FsmCommand::Release(order)) => local.on_release(order),
                    None => {
                        print::warn("Assignment protocol gone, stopping elevator".to_string());
                        return;
                    }
                }
            }
            generation = local.door_timer.wait() => {
                if local.door_timer.expire(generation) {
                    local.on_door_timeout();
                }
            }
            generation = local.motor_timer.wait() => {
                if local.motor_timer.expire(generation) {
                    local.on_motor_timeout();
                }
            }
        }

        if local.elevator() != &published {
            if local.elevator().state != published.state {
                print::info(format!("State {:?} -> {:?}", published.state, local.elevator().state));
            }
            published = local.elevator().clone();
            print::elevator(&published);
            let _ = update_tx.send(LocalUpdate::Snapshot(published.clone()));
            snapshot_tx.send_replace(published.clone());
        }
    }
}
