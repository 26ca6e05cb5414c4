//! ## Elevator types
//!
//! Plain value types shared by every task: [`Order`], its [`OrderType`] and [`OrderStatus`],
//! the [`OrderMatrix`], and the [`Elevator`] snapshot the control FSM publishes.
//!
//! Tasks never share these by reference. The FSM owns the live [`Elevator`], all other
//! tasks work on copies sent over channels.

pub mod order;
pub mod elevator;

pub use order::{Order, OrderStatus, OrderType};
pub use elevator::{Direction, Elevator, ElevatorState, OrderMatrix};

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Wall clock in milliseconds since the UNIX epoch. Used for order deadlines.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Deadline `timeout` from now, in the same clock as [`now_ms`]
pub fn deadline_ms(timeout: Duration) -> u64 {
    now_ms() + timeout.as_millis() as u64
}
