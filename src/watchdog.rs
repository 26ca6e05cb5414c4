//! Heartbeat to the external watchdog.
//!
//! The watchdog restarts the elevator with `--resume` when the heartbeats stop. It listens on
//! its own port, the heartbeats go out through a dedicated [`Transmitter`].

use tokio::time::{interval, MissedTickBehavior};

use crate::config;
use crate::network::udp_broadcast::Transmitter;
use crate::network::Heartbeat;
use crate::print;

/// Sends a [`Heartbeat`] every [`config::WATCHDOG_INTERVAL`], forever.
///
/// A failed send is logged. Missing heartbeats are for the watchdog to act on.
pub async fn run_heartbeat(mut transmitter: Transmitter, elevator_port: u16) {
    let mut ticker = interval(config::WATCHDOG_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if let Err(e) = transmitter.send(Heartbeat::new(elevator_port)).await {
            print::err(format!("Watchdog heartbeat not sent: {:#}", e));
        }
    }
}
