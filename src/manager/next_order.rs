//! Which order this elevator should claim next, and how long to wait before claiming it.

use rand::Rng;
use std::time::Duration;

use crate::config;
use crate::elev_types::{Direction, Elevator, ElevatorState, Order, OrderStatus, OrderType};

/// Types in the order they are preferred at one floor
const TYPE_PREFERENCE: [OrderType; 3] = [OrderType::Cab, OrderType::HallDown, OrderType::HallUp];

/// Finds the NotTaken order this elevator should go for.
///
/// ## Behavior
/// - Nothing while the floor is unknown (Init) or the car is stuck (Error)
/// - While the active order is claimed, only an order strictly between the car and the target,
///   nearest first, or the active order itself when it was released, may take over
/// - Otherwise first an order at the current floor
/// - Then the nearest order on the side the car is heading: above for Up and Stop, below for Down
/// - Then the nearest order on the other side
///
/// Within one floor cab orders win over hall down, hall down over hall up.
/// Returns `None` when there is no such NotTaken order.
pub fn find_next_order(elevator: &Elevator) -> Option<Order> {
    if matches!(elevator.state, ElevatorState::Init | ElevatorState::Error) {
        return None;
    }
    let floor = elevator.floor?;
    let num_floors = elevator.num_floors();

    let active = elevator.active_order;
    if active.status.is_claimed() {
        let between: Vec<u8> = if active.floor > floor {
            (floor + 1..active.floor).collect()
        } else {
            (active.floor + 1..floor).rev().collect()
        };
        return between
            .into_iter()
            .find_map(|f| not_taken_at(elevator, f))
            .or_else(|| {
                elevator
                    .orders
                    .get(active.floor, active.order_type)
                    .filter(|o| o.status == OrderStatus::NotTaken)
                    .copied()
            });
    }

    let above = (floor + 1..num_floors).collect::<Vec<_>>();
    let below = (0..floor).rev().collect::<Vec<_>>();
    let (first, second) = match elevator.direction {
        Direction::Up | Direction::Stop => (above, below),
        Direction::Down => (below, above),
    };

    std::iter::once(floor)
        .chain(first)
        .chain(second)
        .find_map(|f| not_taken_at(elevator, f))
}

fn not_taken_at(elevator: &Elevator, floor: u8) -> Option<Order> {
    TYPE_PREFERENCE
        .iter()
        .filter_map(|&t| elevator.orders.get(floor, t))
        .find(|o| o.status == OrderStatus::NotTaken)
        .copied()
}

/// Wait before claiming an order `distance` floors away.
///
/// [`config::DISTANCE_PENALTY`] per floor, plus uniform jitter in
/// `[-ORDER_JITTER, +ORDER_JITTER)`. Never negative.
pub fn claim_delay<R: Rng>(distance: u8, rng: &mut R) -> Duration {
    let base = config::DISTANCE_PENALTY.as_micros() as i64 * distance as i64;
    let jitter = config::ORDER_JITTER.as_micros() as i64;
    let offset = rng.gen_range(-jitter..jitter);
    Duration::from_micros((base + offset).max(0) as u64)
}
