//! Orders and their lifecycle.
//!
//! An order is identified by `(floor, order_type)`. A cab order additionally belongs to the elevator
//! whose panel it came from, and never leaves that elevator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The button an order came from.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum OrderType {
    /// Hall call going up
    #[default]
    HallUp = 0,
    /// Hall call going down
    HallDown = 1,
    /// Call from inside the car
    Cab = 2,
}

impl OrderType {
    /// All types, in matrix column order.
    pub const ALL: [OrderType; 3] = [OrderType::HallUp, OrderType::HallDown, OrderType::Cab];

    /// Column of this type in the order matrix
    pub fn index(self) -> usize {
        self as usize
    }

    /// `true` for hall calls, the only orders shared over the network
    pub fn is_hall(self) -> bool {
        self != OrderType::Cab
    }
}

/// Where an order is in its lifecycle.
///
/// The numbering is fixed, it is what the backup file and the matrix log show.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum OrderStatus {
    /// Empty cell, or "no candidate"
    #[default]
    Invalid = 0,
    /// Requested, nobody has claimed it
    NotTaken = 1,
    /// Claimed by some elevator, until `local_timestamp`
    Taken = 2,
    /// Command to the control FSM: start serving this order
    Execute = 3,
    /// Served, door opened at the floor
    Finished = 4,
    /// Someone else finished the order we were driving towards
    Abort = 5,
}

impl OrderStatus {
    /// The call button lamp is lit while the order is outstanding
    pub fn lamp_on(self) -> bool {
        matches!(self, OrderStatus::NotTaken | OrderStatus::Taken | OrderStatus::Execute)
    }

    /// Some elevator is committed to the order
    pub fn is_claimed(self) -> bool {
        matches!(self, OrderStatus::Taken | OrderStatus::Execute)
    }
}

/// A request for a car at `floor`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Order {
    /// Target floor, `0..num_floors`
    pub floor: u8,
    /// Which button the order came from
    pub order_type: OrderType,
    /// Lifecycle status
    pub status: OrderStatus,
    /// While Taken: wall clock (ms since UNIX epoch) after which the claim is abandoned. 0 when unset.
    pub local_timestamp: u64,
}

impl Order {
    /// A fresh order with no deadline
    pub fn new(floor: u8, order_type: OrderType, status: OrderStatus) -> Self {
        Order { floor, order_type, status, local_timestamp: 0 }
    }

    /// Same target: equal floor and type
    pub fn same_target(&self, other: &Order) -> bool {
        self.floor == other.floor && self.order_type == other.order_type
    }

    /// Equal floor, type and status. Used to detect a changed active order.
    pub fn compare_eq(&self, other: &Order) -> bool {
        self.same_target(other) && self.status == other.status
    }

    /// Copy of this order with another status
    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = status;
        self
    }

    /// A Taken order whose deadline has passed at `now_ms`
    pub fn timed_out(&self, now_ms: u64) -> bool {
        self.status == OrderStatus::Taken && self.local_timestamp != 0 && now_ms >= self.local_timestamp
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Order{{floor:{} type:{:?} status:{:?}}}", self.floor, self.order_type, self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lamp_follows_outstanding_statuses() {
        assert!(OrderStatus::NotTaken.lamp_on());
        assert!(OrderStatus::Taken.lamp_on());
        assert!(OrderStatus::Execute.lamp_on());
        assert!(!OrderStatus::Finished.lamp_on());
        assert!(!OrderStatus::Invalid.lamp_on());
        assert!(!OrderStatus::Abort.lamp_on());
    }

    #[test]
    fn compare_eq_includes_status_but_same_target_does_not() {
        let a = Order::new(2, OrderType::HallUp, OrderStatus::Taken);
        let b = a.with_status(OrderStatus::Finished);
        assert!(a.same_target(&b));
        assert!(!a.compare_eq(&b));
        assert!(!a.same_target(&Order::new(2, OrderType::HallDown, OrderStatus::Taken)));
    }

    #[test]
    fn only_taken_orders_time_out() {
        let mut o = Order::new(1, OrderType::HallDown, OrderStatus::Taken);
        o.local_timestamp = 1_000;
        assert!(!o.timed_out(999));
        assert!(o.timed_out(1_000));
        assert!(!o.with_status(OrderStatus::Finished).timed_out(5_000));

        // no deadline set: never times out
        assert!(!Order::new(1, OrderType::HallDown, OrderStatus::Taken).timed_out(u64::MAX));
    }
}
