//! The elevator snapshot and its order matrix.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::order::{Order, OrderStatus, OrderType};
use crate::config;

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
/// Direction the car is travelling in.
pub enum Direction {
    Down = -1,
    #[default]
    Stop = 0,
    Up = 1,
}

impl Direction {
    /// Direction from `from` towards `to`
    pub fn towards(from: u8, to: u8) -> Self {
        match to.cmp(&from) {
            std::cmp::Ordering::Greater => Direction::Up,
            std::cmp::Ordering::Less => Direction::Down,
            std::cmp::Ordering::Equal => Direction::Stop,
        }
    }

    /// Byte the elevator server expects for this direction
    pub fn as_motor_byte(self) -> u8 {
        match self {
            Direction::Up => 1,
            Direction::Down => u8::MAX,
            Direction::Stop => 0,
        }
    }
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
/// State of the control FSM.
pub enum ElevatorState {
    #[default]
    Init,
    Idle,
    Moving,
    DoorOpen,
    Error,
}

/// Floor × type grid of orders, as seen by one elevator.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OrderMatrix {
    cells: Vec<[Order; config::NUM_BUTTONS]>,
}

impl OrderMatrix {
    /// Matrix of Invalid orders, with floor and type filled in per cell
    pub fn new(num_floors: u8) -> Self {
        let cells = (0..num_floors)
            .map(|floor| OrderType::ALL.map(|t| Order::new(floor, t, OrderStatus::Invalid)))
            .collect();
        OrderMatrix { cells }
    }

    /// Number of floors
    pub fn num_floors(&self) -> u8 {
        self.cells.len() as u8
    }

    /// The cell at `(floor, order_type)`, `None` when the floor is out of range
    pub fn get(&self, floor: u8, order_type: OrderType) -> Option<&Order> {
        self.cells.get(floor as usize).map(|row| &row[order_type.index()])
    }

    /// Overwrites the cell matching the order's floor and type. Out of range orders are ignored.
    ///
    /// Returns `true` if the cell exists.
    pub fn set(&mut self, order: Order) -> bool {
        match self.cells.get_mut(order.floor as usize) {
            Some(row) => {
                row[order.order_type.index()] = order;
                true
            }
            None => false,
        }
    }

    /// Mutable cell
    pub fn get_mut(&mut self, floor: u8, order_type: OrderType) -> Option<&mut Order> {
        self.cells.get_mut(floor as usize).map(|row| &mut row[order_type.index()])
    }

    /// Every cell, floor by floor
    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.cells.iter().flat_map(|row| row.iter())
    }

    /// The row of one floor
    pub fn row(&self, floor: u8) -> Option<&[Order; config::NUM_BUTTONS]> {
        self.cells.get(floor as usize)
    }

    /// Status digits, one group per floor. `"100 020 000 004"`
    pub fn render(&self) -> String {
        self.cells
            .iter()
            .map(|row| row.iter().map(|o| (o.status as u8).to_string()).collect::<String>())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// The full state of one elevator. Owned by the control FSM, everybody else gets copies.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Elevator {
    /// Last floor reported by the floor sensor, `None` before the first reading
    pub floor: Option<u8>,
    /// Direction of travel
    pub direction: Direction,
    /// FSM state
    pub state: ElevatorState,
    /// Order currently being served. Invalid when there is none.
    pub active_order: Order,
    /// This elevator's view of all orders
    pub orders: OrderMatrix,
}

impl Elevator {
    /// A fresh elevator: unknown floor, Init, empty matrix
    pub fn new(num_floors: u8) -> Self {
        Elevator {
            floor: None,
            direction: Direction::Stop,
            state: ElevatorState::Init,
            active_order: Order::default(),
            orders: OrderMatrix::new(num_floors),
        }
    }

    /// Number of floors
    pub fn num_floors(&self) -> u8 {
        self.orders.num_floors()
    }
}

impl fmt::Display for Elevator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let floor = match self.floor {
            Some(floor) => floor.to_string(),
            None => "?".to_string(),
        };
        write!(
            f,
            "Elevator{{{} floor:{} dir:{:?} state:{:?}}}",
            self.active_order, floor, self.direction, self.state
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_matrix_has_coordinates_in_every_cell() {
        let m = OrderMatrix::new(4);
        assert_eq!(m.num_floors(), 4);
        let cell = m.get(3, OrderType::HallDown).unwrap();
        assert_eq!(cell.floor, 3);
        assert_eq!(cell.order_type, OrderType::HallDown);
        assert_eq!(cell.status, OrderStatus::Invalid);
        assert_eq!(m.iter().count(), 12);
    }

    #[test]
    fn set_ignores_floors_out_of_range() {
        let mut m = OrderMatrix::new(4);
        assert!(!m.set(Order::new(9, OrderType::HallUp, OrderStatus::NotTaken)));
        assert!(m.set(Order::new(1, OrderType::Cab, OrderStatus::Taken)));
        assert_eq!(m.get(1, OrderType::Cab).unwrap().status, OrderStatus::Taken);
        assert!(m.get(9, OrderType::Cab).is_none());
    }

    #[test]
    fn render_shows_status_digits() {
        let mut m = OrderMatrix::new(2);
        m.set(Order::new(0, OrderType::HallUp, OrderStatus::NotTaken));
        m.set(Order::new(1, OrderType::Cab, OrderStatus::Finished));
        assert_eq!(m.render(), "100 004");
    }

    #[test]
    fn direction_towards_target() {
        assert_eq!(Direction::towards(1, 3), Direction::Up);
        assert_eq!(Direction::towards(3, 1), Direction::Down);
        assert_eq!(Direction::towards(2, 2), Direction::Stop);
        assert_eq!(Direction::Down.as_motor_byte(), 255);
    }

    #[test]
    fn fresh_elevator_is_in_init_without_floor() {
        let e = Elevator::new(4);
        assert_eq!(e.floor, None);
        assert_eq!(e.state, ElevatorState::Init);
        assert_eq!(e.active_order.status, OrderStatus::Invalid);
        assert_eq!(e.num_floors(), 4);
    }
}
