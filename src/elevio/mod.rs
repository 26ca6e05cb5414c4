//! ## Elevator I/O module for the local elevator
//!
//! The driver talking to the elevator server lives in [`elev`], the threads polling it in [`poll`].
//!
//! The control FSM never sees the driver directly. It writes outputs through the
//! [`ElevatorIo`] trait and reads inputs as [`HwEvent`]s from a channel, so tests can run the
//! FSM against a recording double instead of a server.

pub mod elev;
pub mod poll;

use crate::elev_types::{Direction, OrderType};

/// Outputs of one elevator: motor, lamps and floor indicator.
///
/// Implementations must not fail. Errors talking to the hardware are logged and swallowed,
/// the FSM has no way to recover from them anyway.
pub trait ElevatorIo: Send + 'static {
    /// Starts the motor in `dirn`, or stops it for [`Direction::Stop`]
    fn motor_direction(&self, dirn: Direction);
    /// Sets the lamp of a call button
    fn call_button_light(&self, floor: u8, order_type: OrderType, on: bool);
    /// Shows `floor` on the floor indicator
    fn floor_indicator(&self, floor: u8);
    /// Sets the door open lamp
    fn door_light(&self, on: bool);
}

/// Something happened on the elevator panel or in the shaft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwEvent {
    /// A call button went from released to pressed
    Button {
        /// Floor of the button
        floor: u8,
        /// Which button on that floor
        order_type: OrderType,
    },
    /// The car arrived at a floor
    Floor(u8),
}
