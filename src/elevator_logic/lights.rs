use crate::config;
use crate::elev_types::{OrderMatrix, OrderType};
use crate::elevio::ElevatorIo;

/// Remembers what every call button lamp was last set to, so lamps are only written on change.
#[derive(Debug)]
pub struct CallLamps {
    lit: Vec<[Option<bool>; config::NUM_BUTTONS]>,
}

impl CallLamps {
    /// Nothing written yet. The first [`sync`](CallLamps::sync) writes every lamp.
    pub fn new(num_floors: u8) -> Self {
        CallLamps { lit: vec![[None; config::NUM_BUTTONS]; num_floors as usize] }
    }

    /// Sets the call button lamps to follow the matrix
    ///
    /// ## Behavior
    /// A lamp is lit while its order is NotTaken, Taken or Execute.
    /// Hall buttons that do not exist (down on floor 0, up on the top floor) are skipped.
    pub fn sync<I: ElevatorIo>(&mut self, io: &I, orders: &OrderMatrix) {
        let top = orders.num_floors().saturating_sub(1);
        for order in orders.iter() {
            let missing = (order.order_type == OrderType::HallUp && order.floor == top)
                || (order.order_type == OrderType::HallDown && order.floor == 0);
            if missing {
                continue;
            }
            let Some(row) = self.lit.get_mut(order.floor as usize) else { continue };
            let on = order.status.lamp_on();
            let slot = &mut row[order.order_type.index()];
            if *slot != Some(on) {
                io.call_button_light(order.floor, order.order_type, on);
                *slot = Some(on);
            }
        }
    }
}
