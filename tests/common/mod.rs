#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};

use elevatorclaim::elev_types::{Direction, Elevator, Order, OrderType};
use elevatorclaim::elevator_logic::{self, FsmCommand, LocalUpdate};
use elevatorclaim::elevio::{ElevatorIo, HwEvent};
use elevatorclaim::manager;
use elevatorclaim::network::NetMessage;

/// A hardware write seen by the recorder
#[derive(Debug, Clone, PartialEq)]
pub enum IoCall {
    Motor(Direction),
    Lamp(u8, OrderType, bool),
    Indicator(u8),
    Door(bool),
}

/// Stands in for the elevator server, remembers every write
#[derive(Clone, Default)]
pub struct RecordingIo(Arc<Mutex<Vec<IoCall>>>);

impl RecordingIo {
    pub fn calls(&self) -> Vec<IoCall> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }

    pub fn last_motor(&self) -> Option<Direction> {
        self.calls().iter().rev().find_map(|c| match c {
            IoCall::Motor(d) => Some(*d),
            _ => None,
        })
    }

    pub fn lamp(&self, floor: u8, order_type: OrderType) -> Option<bool> {
        self.calls().iter().rev().find_map(|c| match c {
            IoCall::Lamp(f, t, on) if *f == floor && *t == order_type => Some(*on),
            _ => None,
        })
    }

    pub fn door(&self) -> Option<bool> {
        self.calls().iter().rev().find_map(|c| match c {
            IoCall::Door(on) => Some(*on),
            _ => None,
        })
    }
}

impl ElevatorIo for RecordingIo {
    fn motor_direction(&self, dirn: Direction) {
        self.0.lock().unwrap().push(IoCall::Motor(dirn));
    }
    fn call_button_light(&self, floor: u8, order_type: OrderType, on: bool) {
        self.0.lock().unwrap().push(IoCall::Lamp(floor, order_type, on));
    }
    fn floor_indicator(&self, floor: u8) {
        self.0.lock().unwrap().push(IoCall::Indicator(floor));
    }
    fn door_light(&self, on: bool) {
        self.0.lock().unwrap().push(IoCall::Door(on));
    }
}

/// One elevator process without sockets: FSM and order manager wired by channels
pub struct Node {
    pub io: RecordingIo,
    pub hw_tx: mpsc::UnboundedSender<HwEvent>,
    pub state_rx: watch::Receiver<Elevator>,
    /// Orders "received from the network"
    pub net_in: mpsc::UnboundedSender<Order>,
    /// Everything the node broadcasts
    pub net_out: mpsc::UnboundedReceiver<NetMessage>,
}

pub fn spawn_node(elevator: Elevator, resume: Option<Order>) -> Node {
    elevatorclaim::config::silence_prints();
    let io = RecordingIo::default();
    let num_floors = elevator.num_floors();

    let (hw_tx, hw_rx) = mpsc::unbounded_channel();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<FsmCommand>();
    let (update_tx, update_rx) = mpsc::unbounded_channel::<LocalUpdate>();
    let (snapshot_tx, state_rx) = watch::channel(elevator.clone());
    let (net_in, order_rx) = mpsc::unbounded_channel();
    let (net_tx, net_out) = mpsc::unbounded_channel();

    tokio::spawn(manager::run_order_manager(num_floors, resume, update_rx, order_rx, cmd_tx, net_tx));
    tokio::spawn(elevator_logic::run_local_elevator(
        io.clone(),
        elevator,
        hw_rx,
        cmd_rx,
        update_tx,
        snapshot_tx,
    ));

    Node { io, hw_tx, state_rx, net_in, net_out }
}

impl Node {
    pub fn floor(&self, floor: u8) {
        self.hw_tx.send(HwEvent::Floor(floor)).unwrap();
    }

    pub fn press(&self, floor: u8, order_type: OrderType) {
        self.hw_tx.send(HwEvent::Button { floor, order_type }).unwrap();
    }

    pub fn elevator(&self) -> Elevator {
        self.state_rx.borrow().clone()
    }

    /// Waits until the published elevator satisfies `pred`
    pub async fn wait_for<F>(&mut self, within: Duration, pred: F) -> Elevator
    where
        F: Fn(&Elevator) -> bool,
    {
        let res = tokio::time::timeout(within, async {
            loop {
                {
                    let e = self.state_rx.borrow_and_update();
                    if pred(&e) {
                        return e.clone();
                    }
                }
                self.state_rx.changed().await.unwrap();
            }
        })
        .await;
        match res {
            Ok(e) => e,
            Err(_) => panic!("condition not reached, elevator is {:?}", self.elevator()),
        }
    }

    /// Every order broadcast so far
    pub fn drain_sent(&mut self) -> Vec<Order> {
        let mut sent = Vec::new();
        while let Ok(msg) = self.net_out.try_recv() {
            if let NetMessage::Order(order) = msg {
                sent.push(order);
            }
        }
        sent
    }
}

/// Lets the spawned tasks run without moving time much
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
