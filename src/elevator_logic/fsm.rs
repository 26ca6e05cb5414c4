//! Transitions of the control FSM.
//!
//! [`LocalElevator`] owns the [`Elevator`], the hardware outputs and the door and motor timers.
//! Every handler runs to completion before the next event is looked at, the task loop in
//! [`super::run_local_elevator`] guarantees that.

use super::lights::CallLamps;
use super::timer::Timer;
use crate::config;
use crate::elev_types::{deadline_ms, Direction, Elevator, ElevatorState, Order, OrderStatus, OrderType};
use crate::elevio::ElevatorIo;
use crate::print;

/// The one physical elevator this process controls.
pub struct LocalElevator<I: ElevatorIo> {
    elevator: Elevator,
    io: I,
    lamps: CallLamps,
    /// Door open time
    pub door_timer: Timer,
    /// Max time between floors while moving
    pub motor_timer: Timer,
}

impl<I: ElevatorIo> LocalElevator<I> {
    /// Takes over `elevator`. Nothing is written to the hardware before [`start`](Self::start).
    pub fn new(elevator: Elevator, io: I) -> Self {
        let lamps = CallLamps::new(elevator.num_floors());
        LocalElevator {
            elevator,
            io,
            lamps,
            door_timer: Timer::new(),
            motor_timer: Timer::new(),
        }
    }

    /// Current state
    pub fn elevator(&self) -> &Elevator {
        &self.elevator
    }

    /// Puts the hardware in line with the elevator. In Init the car runs down until the
    /// first floor is seen.
    pub fn start(&mut self) {
        self.io.door_light(false);
        if let Some(floor) = self.elevator.floor {
            self.io.floor_indicator(floor);
        }
        if self.elevator.state == ElevatorState::Init {
            self.elevator.direction = Direction::Down;
            self.io.motor_direction(Direction::Down);
        }
        self.sync_lamps();
    }

    /// A call button was pressed.
    ///
    /// The cell becomes NotTaken unless it is already outstanding.
    ///
    /// Returns the new NotTaken order only when the cell changed. A press on an outstanding
    /// order, or on a floor outside the shaft, gives `None`, so a claim held by some elevator is
    /// never announced as free again.
    pub fn on_button(&mut self, floor: u8, order_type: OrderType) -> Option<Order> {
        let cell = self.elevator.orders.get_mut(floor, order_type)?;
        if !matches!(cell.status, OrderStatus::Invalid | OrderStatus::Finished) {
            return None;
        }
        let pressed = Order::new(floor, order_type, OrderStatus::NotTaken);
        *cell = pressed;
        self.sync_lamps();
        Some(pressed)
    }

    /// The car reached `floor`
    pub fn on_floor(&mut self, floor: u8) {
        if floor >= self.elevator.num_floors() {
            print::cosmic_err(format!("floor sensor reported floor {}", floor));
            return;
        }
        self.elevator.floor = Some(floor);
        self.io.floor_indicator(floor);

        match self.elevator.state {
            ElevatorState::Init => {
                self.stop_motor();
                self.elevator.state = ElevatorState::Idle;
                print::ok(format!("Elevator found floor {}", floor));
                if self.elevator.active_order.status.is_claimed() {
                    self.start_active();
                }
            }
            ElevatorState::Moving => self.moving_arrival(floor),
            ElevatorState::Error => {
                print::ok(format!("Elevator moving again, at floor {}", floor));
                self.elevator.state = ElevatorState::Moving;
                self.moving_arrival(floor);
            }
            ElevatorState::Idle | ElevatorState::DoorOpen => {}
        }
        self.sync_lamps();
    }

    fn moving_arrival(&mut self, floor: u8) {
        let active = self.elevator.active_order;
        if active.status == OrderStatus::Abort {
            print::info(format!("{} was served by someone else, stopping at {}", active, floor));
            self.stop_motor();
            self.motor_timer.stop();
            self.elevator.state = ElevatorState::Idle;
        } else if !active.status.is_claimed() {
            self.stop_motor();
            self.motor_timer.stop();
            self.elevator.state = ElevatorState::Idle;
        } else if active.floor == floor {
            self.arrive_at_target();
        } else {
            self.motor_timer.arm(config::MOTOR_TIMEOUT);
        }
    }

    /// The door has been open long enough
    pub fn on_door_timeout(&mut self) {
        if self.elevator.state != ElevatorState::DoorOpen {
            return;
        }
        self.io.door_light(false);
        self.elevator.state = ElevatorState::Idle;
        self.elevator.direction = Direction::Stop;
        if self.elevator.active_order.status.is_claimed() {
            self.start_active();
        }
    }

    /// No floor was seen within the motor timeout
    pub fn on_motor_timeout(&mut self) {
        if self.elevator.state != ElevatorState::Moving {
            return;
        }
        print::err(format!(
            "No floor reached within {:?}, elevator is stuck",
            config::MOTOR_TIMEOUT
        ));
        self.elevator.state = ElevatorState::Error;
    }

    /// Start serving `order`. Sent by the assignment protocol when its claim timer fires.
    pub fn on_execute(&mut self, order: Order) {
        if order.floor >= self.elevator.num_floors() {
            print::warn(format!("Ignoring execute of {}, no such floor", order));
            return;
        }
        let mut claimed = order.with_status(OrderStatus::Taken);
        claimed.local_timestamp = deadline_ms(config::ORDER_TIMEOUT);
        self.elevator.orders.set(claimed);
        self.elevator.active_order = claimed;
        print::info(format!("Executing {}", claimed));

        match self.elevator.state {
            ElevatorState::Init | ElevatorState::DoorOpen => {}
            ElevatorState::Idle | ElevatorState::Moving | ElevatorState::Error => self.start_active(),
        }
        self.sync_lamps();
    }

    /// An order status received from another elevator. Never changes `state`.
    pub fn on_network_order(&mut self, order: Order) {
        if !order.order_type.is_hall() {
            return;
        }
        let Some(cell) = self.elevator.orders.get_mut(order.floor, order.order_type) else {
            print::warn(format!("Ignoring {} from network, no such floor", order));
            return;
        };

        match order.status {
            OrderStatus::NotTaken => {
                *cell = Order::new(order.floor, order.order_type, OrderStatus::NotTaken);
            }
            OrderStatus::Taken | OrderStatus::Execute => {
                if cell.status != OrderStatus::Taken {
                    *cell = Order::new(order.floor, order.order_type, OrderStatus::Taken);
                    cell.local_timestamp = deadline_ms(config::ORDER_TIMEOUT);
                }
            }
            OrderStatus::Finished => {
                *cell = Order::new(order.floor, order.order_type, OrderStatus::Finished);
                let active = &mut self.elevator.active_order;
                if active.same_target(&order) && active.status.is_claimed() {
                    active.status = OrderStatus::Abort;
                }
            }
            OrderStatus::Invalid | OrderStatus::Abort => {}
        }
        self.sync_lamps();
    }

    /// Makes the cell available again. Used for stale claims and for an order given up on.
    pub fn on_release(&mut self, order: Order) {
        if let Some(cell) = self.elevator.orders.get_mut(order.floor, order.order_type) {
            *cell = Order::new(order.floor, order.order_type, OrderStatus::NotTaken);
        }
        self.sync_lamps();
    }

    fn start_active(&mut self) {
        let Some(floor) = self.elevator.floor else { return };
        let target = self.elevator.active_order.floor;

        let direction = if floor != target {
            Direction::towards(floor, target)
        } else if self.elevator.state == ElevatorState::Idle {
            self.arrive_at_target();
            return;
        } else {
            // Moving or stuck with the target as last seen floor: the car has left it.
            match self.elevator.direction {
                Direction::Up => Direction::Down,
                Direction::Down | Direction::Stop => Direction::Up,
            }
        };

        self.elevator.direction = direction;
        self.io.motor_direction(direction);
        self.elevator.state = ElevatorState::Moving;
        self.motor_timer.arm(config::MOTOR_TIMEOUT);
    }

    fn arrive_at_target(&mut self) {
        self.stop_motor();
        self.motor_timer.stop();

        let active = &mut self.elevator.active_order;
        active.status = OrderStatus::Finished;
        active.local_timestamp = 0;
        let finished = *active;
        self.elevator.orders.set(finished);
        print::ok(format!("Served {}", finished));

        self.io.door_light(true);
        self.elevator.state = ElevatorState::DoorOpen;
        self.door_timer.arm(config::DOOR_OPEN_TIME);
    }

    fn stop_motor(&mut self) {
        self.elevator.direction = Direction::Stop;
        self.io.motor_direction(Direction::Stop);
    }

    fn sync_lamps(&mut self) {
        self.lamps.sync(&self.io, &self.elevator.orders);
    }
}
