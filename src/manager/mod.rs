//! ## Order assignment
//!
//! Decides which order this elevator serves next, without any master. Every elevator runs the
//! same rules on its own copy of the order matrix:
//! - after every change of the local elevator, pick a candidate with [`next_order::find_next_order`]
//!   and arm the claim timer with a distance based, jittered delay
//! - when the timer fires and the candidate is still NotTaken, tell the FSM to execute it and
//!   broadcast the claim
//! - broadcast every finish of a hall order, and every hall button press that made a new request
//! - sweep the matrix for Taken orders whose deadline passed and release them
//! - release the active hall order the moment the elevator gets stuck
//!
//! The manager never touches the elevator itself. It works on the snapshots the FSM publishes
//! and sends [`FsmCommand`]s back.

pub mod next_order;

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};

use crate::config;
use crate::elev_types::{now_ms, Elevator, ElevatorState, Order, OrderStatus, OrderType};
use crate::elevator_logic::timer::Timer;
use crate::elevator_logic::{FsmCommand, LocalUpdate};
use crate::network::NetMessage;
use crate::print;

/// State of the assignment protocol for one elevator.
pub struct OrderManager {
    latest: Elevator,
    candidate: Option<Order>,
    /// Pending claim of `candidate`
    pub claim_timer: Timer,
    /// `(floor, type, deadline)` of every stale claim already released
    reclaimed: HashSet<(u8, OrderType, u64)>,
    cmd_tx: mpsc::UnboundedSender<FsmCommand>,
    net_tx: mpsc::UnboundedSender<NetMessage>,
    rng: StdRng,
}

impl OrderManager {
    /// `num_floors` sizes the empty elevator used until the first snapshot arrives
    pub fn new(
        num_floors: u8,
        cmd_tx: mpsc::UnboundedSender<FsmCommand>,
        net_tx: mpsc::UnboundedSender<NetMessage>,
    ) -> Self {
        OrderManager {
            latest: Elevator::new(num_floors),
            candidate: None,
            claim_timer: Timer::new(),
            reclaimed: HashSet::new(),
            cmd_tx,
            net_tx,
            rng: StdRng::from_entropy(),
        }
    }

    /// The order the claim timer is running for
    pub fn candidate(&self) -> Option<Order> {
        self.candidate
    }

    fn broadcast(&self, order: Order) {
        if !order.order_type.is_hall() {
            return;
        }
        print::net(format!("Broadcasting {}", order));
        let _ = self.net_tx.send(NetMessage::Order(order));
    }

    fn command(&self, cmd: FsmCommand) {
        let _ = self.cmd_tx.send(cmd);
    }

    /// Claims `order`: Execute to the FSM, Taken on the network for hall orders
    fn execute(&self, order: Order) {
        self.command(FsmCommand::Execute(order.with_status(OrderStatus::Execute)));
        self.broadcast(Order::new(order.floor, order.order_type, OrderStatus::Taken));
    }

    /// Releases `order`: NotTaken in the local matrix, and on the network for hall orders
    fn release(&self, order: Order) {
        let released = Order::new(order.floor, order.order_type, OrderStatus::NotTaken);
        self.command(FsmCommand::Release(released));
        self.broadcast(released);
    }

    /// Handles a message from the FSM
    pub fn on_update(&mut self, update: LocalUpdate) {
        match update {
            LocalUpdate::ButtonPress(order) => self.broadcast(order),
            LocalUpdate::Snapshot(elevator) => self.on_snapshot(elevator),
        }
    }

    fn on_snapshot(&mut self, elevator: Elevator) {
        let prev = std::mem::replace(&mut self.latest, elevator);
        let active = self.latest.active_order;

        if !prev.active_order.compare_eq(&active) && active.status == OrderStatus::Finished {
            self.broadcast(active);
        }

        if self.latest.state == ElevatorState::Error
            && prev.state != ElevatorState::Error
            && active.order_type.is_hall()
            && active.status.is_claimed()
        {
            print::warn(format!("Elevator stuck, giving up {}", active));
            self.release(active);
        }

        self.reclaimed.retain(|&(floor, order_type, deadline)| {
            self.latest
                .orders
                .get(floor, order_type)
                .is_some_and(|o| o.status == OrderStatus::Taken && o.local_timestamp == deadline)
        });

        self.recompute_candidate();
    }

    fn recompute_candidate(&mut self) {
        match next_order::find_next_order(&self.latest) {
            Some(candidate) => {
                let floor = self.latest.floor.unwrap_or(candidate.floor);
                let delay = next_order::claim_delay(floor.abs_diff(candidate.floor), &mut self.rng);
                self.claim_timer.arm(delay);
                self.candidate = Some(candidate);
            }
            None => {
                self.claim_timer.stop();
                self.candidate = None;
            }
        }
    }

    /// An order status received from another elevator
    pub fn on_network_order(&mut self, order: Order) {
        if !order.order_type.is_hall() {
            print::warn(format!("Ignoring cab order from network: {}", order));
            return;
        }
        print::net(format!("Received {}", order));
        self.command(FsmCommand::ApplyNetwork(order));
    }

    /// The claim timer of `generation` fired
    pub fn on_claim_timeout(&mut self, generation: u64) {
        if !self.claim_timer.expire(generation) {
            return;
        }
        let Some(candidate) = self.candidate.take() else { return };

        let still_free = self
            .latest
            .orders
            .get(candidate.floor, candidate.order_type)
            .is_some_and(|o| o.status == OrderStatus::NotTaken);
        if !still_free {
            print::info(format!("{} was claimed by someone else first", candidate));
            return;
        }

        self.execute(candidate);

        let prev = self.latest.active_order;
        if !prev.same_target(&candidate) && prev.status == OrderStatus::Taken {
            print::info(format!("Switching from {} to {}", prev, candidate));
            self.release(prev);
        }
    }

    /// Releases every Taken order whose deadline is before `now_ms`. Each claim is released once.
    pub fn sweep(&mut self, now_ms: u64) {
        let stale: Vec<Order> = self
            .latest
            .orders
            .iter()
            .filter(|o| o.timed_out(now_ms))
            .copied()
            .collect();

        for order in stale {
            if self.reclaimed.insert((order.floor, order.order_type, order.local_timestamp)) {
                print::warn(format!("Claim on {} timed out, releasing", order));
                self.release(order);
            }
        }
    }
}

/// The order to resubmit after a restart: the active order if it was being served
pub fn resume_order(elevator: &Elevator) -> Option<Order> {
    let active = elevator.active_order;
    active.status.is_claimed().then(|| active.with_status(OrderStatus::Execute))
}

/// Runs the assignment protocol until the FSM goes away.
///
/// ## Parameters
/// `num_floors`: Floors of the elevator
/// `resume`: Order to execute right away, from [`resume_order`]
/// `update_rx`: Snapshots and button presses from the FSM
/// `net_rx`: Orders received from other elevators
/// `cmd_tx`: Commands to the FSM
/// `net_tx`: Messages to broadcast
pub async fn run_order_manager(
    num_floors: u8,
    resume: Option<Order>,
    mut update_rx: mpsc::UnboundedReceiver<LocalUpdate>,
    mut net_rx: mpsc::UnboundedReceiver<Order>,
    cmd_tx: mpsc::UnboundedSender<FsmCommand>,
    net_tx: mpsc::UnboundedSender<NetMessage>,
) {
    let mut manager = OrderManager::new(num_floors, cmd_tx, net_tx);
    if let Some(order) = resume {
        print::info(format!("Resuming {}", order));
        manager.execute(order);
    }

    let mut sweep = interval(config::CHECK_TIMESTAMP_INTERVAL);
    sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut net_open = true;

    loop {
        tokio::select! {
            update = update_rx.recv() => {
                match update {
                    Some(update) => manager.on_update(update),
                    None => return,
                }
            }
            order = net_rx.recv(), if net_open => {
                match order {
                    Some(order) => manager.on_network_order(order),
                    None => net_open = false,
                }
            }
            generation = manager.claim_timer.wait() => {
                manager.on_claim_timeout(generation);
            }
            _ = sweep.tick() => {
                manager.sweep(now_ms());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elev_types::Direction;

    fn manager() -> (
        OrderManager,
        mpsc::UnboundedReceiver<FsmCommand>,
        mpsc::UnboundedReceiver<NetMessage>,
    ) {
        crate::config::silence_prints();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (net_tx, net_rx) = mpsc::unbounded_channel();
        (OrderManager::new(4, cmd_tx, net_tx), cmd_rx, net_rx)
    }

    fn idle_at(floor: u8) -> Elevator {
        let mut e = Elevator::new(4);
        e.floor = Some(floor);
        e.state = ElevatorState::Idle;
        e
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_with_request_arms_claim_timer() {
        let (mut m, _cmd, _net) = manager();
        let mut e = idle_at(1);
        e.orders.set(Order::new(3, OrderType::HallUp, OrderStatus::NotTaken));
        m.on_update(LocalUpdate::Snapshot(e));

        assert!(m.claim_timer.is_armed());
        assert_eq!(m.candidate().unwrap().floor, 3);
        let left = m.claim_timer.remaining().unwrap();
        assert!(left >= std::time::Duration::from_millis(400));
        assert!(left < std::time::Duration::from_millis(600));
    }

    #[tokio::test(start_paused = true)]
    async fn fire_executes_free_candidate() {
        let (mut m, mut cmd, mut net) = manager();
        let mut e = idle_at(1);
        e.orders.set(Order::new(3, OrderType::HallUp, OrderStatus::NotTaken));
        m.on_update(LocalUpdate::Snapshot(e));

        let generation = m.claim_timer.wait().await;
        m.on_claim_timeout(generation);
        match cmd.try_recv().unwrap() {
            FsmCommand::Execute(order) => {
                assert_eq!((order.floor, order.order_type), (3, OrderType::HallUp));
                assert_eq!(order.status, OrderStatus::Execute);
            }
            other => panic!("expected execute, got {:?}", other),
        }
        assert!(cmd.try_recv().is_err());
        assert_eq!(
            net.try_recv().unwrap(),
            NetMessage::Order(Order::new(3, OrderType::HallUp, OrderStatus::Taken))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn fire_skips_candidate_claimed_meanwhile() {
        let (mut m, mut cmd, _net) = manager();
        let mut e = idle_at(1);
        e.orders.set(Order::new(3, OrderType::HallUp, OrderStatus::NotTaken));
        m.on_update(LocalUpdate::Snapshot(e.clone()));
        let stale_generation = m.claim_timer.wait().await;

        // another elevator's claim reached the FSM before the fire was handled
        e.orders.set(Order::new(3, OrderType::HallUp, OrderStatus::Taken));
        m.on_update(LocalUpdate::Snapshot(e));
        m.on_claim_timeout(stale_generation);
        assert!(cmd.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn switching_order_releases_the_old_hall_claim() {
        let (mut m, mut cmd, mut net) = manager();
        let mut e = idle_at(0);
        let old = Order::new(3, OrderType::HallDown, OrderStatus::Taken);
        e.active_order = old;
        e.orders.set(old);
        e.orders.set(Order::new(1, OrderType::HallUp, OrderStatus::NotTaken));
        m.on_update(LocalUpdate::Snapshot(e));
        while net.try_recv().is_ok() {}

        let generation = m.claim_timer.wait().await;
        m.on_claim_timeout(generation);

        assert!(matches!(cmd.try_recv().unwrap(), FsmCommand::Execute(o) if o.floor == 1));
        assert!(matches!(
            cmd.try_recv().unwrap(),
            FsmCommand::Release(o) if o.floor == 3 && o.status == OrderStatus::NotTaken
        ));
        assert!(matches!(
            net.try_recv().unwrap(),
            NetMessage::Order(o) if o.floor == 1 && o.status == OrderStatus::Taken
        ));
        assert!(matches!(
            net.try_recv().unwrap(),
            NetMessage::Order(o) if o.floor == 3 && o.status == OrderStatus::NotTaken
        ));
    }

    #[test]
    fn finish_of_hall_orders_is_broadcast_once() {
        let (mut m, _cmd, mut net) = manager();
        let mut e = idle_at(0);
        e.active_order = Order::new(2, OrderType::HallUp, OrderStatus::Taken);
        m.on_update(LocalUpdate::Snapshot(e.clone()));
        assert!(net.try_recv().is_err());

        e.active_order.status = OrderStatus::Finished;
        m.on_update(LocalUpdate::Snapshot(e.clone()));
        m.on_update(LocalUpdate::Snapshot(e.clone()));
        assert!(matches!(net.try_recv().unwrap(), NetMessage::Order(o) if o.status == OrderStatus::Finished));
        assert!(net.try_recv().is_err());

        e.active_order = Order::new(1, OrderType::Cab, OrderStatus::Taken);
        m.on_update(LocalUpdate::Snapshot(e));
        assert!(net.try_recv().is_err());
    }

    #[test]
    fn hall_button_is_broadcast_and_cab_is_not() {
        let (mut m, _cmd, mut net) = manager();
        m.on_update(LocalUpdate::ButtonPress(Order::new(2, OrderType::HallDown, OrderStatus::NotTaken)));
        m.on_update(LocalUpdate::ButtonPress(Order::new(2, OrderType::Cab, OrderStatus::NotTaken)));
        assert!(matches!(net.try_recv().unwrap(), NetMessage::Order(o) if o.order_type == OrderType::HallDown));
        assert!(net.try_recv().is_err());
    }

    #[test]
    fn entering_error_releases_active_hall_order() {
        let (mut m, mut cmd, mut net) = manager();
        let mut e = idle_at(0);
        e.state = ElevatorState::Moving;
        e.active_order = Order::new(3, OrderType::HallUp, OrderStatus::Taken);
        m.on_update(LocalUpdate::Snapshot(e.clone()));
        while net.try_recv().is_ok() {}

        e.state = ElevatorState::Error;
        m.on_update(LocalUpdate::Snapshot(e.clone()));
        assert!(matches!(cmd.try_recv().unwrap(), FsmCommand::Release(o) if o.floor == 3));
        assert!(matches!(
            net.try_recv().unwrap(),
            NetMessage::Order(o) if o.floor == 3 && o.status == OrderStatus::NotTaken
        ));

        // staying in Error does not release again
        m.on_update(LocalUpdate::Snapshot(e));
        assert!(cmd.try_recv().is_err());
    }

    #[test]
    fn stale_claim_is_released_exactly_once() {
        let (mut m, mut cmd, mut net) = manager();
        let mut e = idle_at(0);
        let mut claim = Order::new(2, OrderType::HallDown, OrderStatus::Taken);
        claim.local_timestamp = 1_000;
        e.orders.set(claim);
        m.on_update(LocalUpdate::Snapshot(e));

        m.sweep(999);
        assert!(cmd.try_recv().is_err());

        m.sweep(1_000);
        m.sweep(1_100);
        m.sweep(1_200);
        assert!(matches!(cmd.try_recv().unwrap(), FsmCommand::Release(o) if o.floor == 2));
        assert!(cmd.try_recv().is_err());
        assert!(matches!(net.try_recv().unwrap(), NetMessage::Order(o) if o.status == OrderStatus::NotTaken));
        assert!(net.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn released_own_order_is_claimed_again_on_the_network() {
        let (mut m, mut cmd, mut net) = manager();
        let mut e = idle_at(1);
        e.state = ElevatorState::Moving;
        e.direction = Direction::Up;
        e.active_order = Order::new(3, OrderType::HallUp, OrderStatus::Taken);
        // the claim was released while the car was on its way
        e.orders.set(e.active_order.with_status(OrderStatus::NotTaken));
        m.on_update(LocalUpdate::Snapshot(e));
        assert!(net.try_recv().is_err());

        let generation = m.claim_timer.wait().await;
        m.on_claim_timeout(generation);

        assert!(matches!(cmd.try_recv().unwrap(), FsmCommand::Execute(o) if o.floor == 3));
        assert!(cmd.try_recv().is_err());
        assert_eq!(
            net.try_recv().unwrap(),
            NetMessage::Order(Order::new(3, OrderType::HallUp, OrderStatus::Taken))
        );
        assert!(net.try_recv().is_err());
    }

    #[test]
    fn no_claim_behind_a_car_serving_an_order() {
        let (mut m, _cmd, _net) = manager();
        let mut e = idle_at(1);
        e.state = ElevatorState::Moving;
        e.direction = Direction::Up;
        e.active_order = Order::new(3, OrderType::HallUp, OrderStatus::Taken);
        e.orders.set(e.active_order);
        e.orders.set(Order::new(0, OrderType::HallUp, OrderStatus::NotTaken));
        m.on_update(LocalUpdate::Snapshot(e));

        assert!(!m.claim_timer.is_armed());
        assert_eq!(m.candidate(), None);
    }

    #[test]
    fn network_orders_go_to_the_fsm() {
        let (mut m, mut cmd, _net) = manager();
        let order = Order::new(1, OrderType::HallUp, OrderStatus::Taken);
        m.on_network_order(order);
        m.on_network_order(Order::new(1, OrderType::Cab, OrderStatus::Taken));
        assert_eq!(cmd.try_recv().unwrap(), FsmCommand::ApplyNetwork(order));
        assert!(cmd.try_recv().is_err());
    }

    #[test]
    fn only_claimed_active_orders_are_resumed() {
        let mut e = Elevator::new(4);
        assert_eq!(resume_order(&e), None);
        e.active_order = Order::new(2, OrderType::Cab, OrderStatus::Taken);
        assert_eq!(resume_order(&e).unwrap().status, OrderStatus::Execute);
        e.active_order.status = OrderStatus::Finished;
        assert_eq!(resume_order(&e), None);
    }
}
