//! # config.rs – Centralized Parameter Store
//!
//! This module holds all static program parameters used throughout the system,
//! and the [`ElevConfig`] struct carrying the few values given on the command line.
//! Nothing here is read by a component on its own: the values are handed to each
//! constructor, so several elevators can run side by side in one test process.

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use once_cell::sync::Lazy;

//
// ──────────────────────────────────────────────────────────────
//   1. NETWORK SETTINGS
// ──────────────────────────────────────────────────────────────
//

/// Port the order protocol is broadcast on
pub const NETWORK_PORT: u16 = 20028;

/// Default port of the external watchdog process
pub const DEFAULT_WATCHDOG_PORT: u16 = 57005;

/// UDP broadcast listen address (bind address)
pub const BC_LISTEN_ADDR: Ipv4Addr = Ipv4Addr::UNSPECIFIED;

/// Broadcast address used for all protocol traffic
pub const BC_ADDR: Ipv4Addr = Ipv4Addr::BROADCAST;

/// Group id prefixed on every frame. Isolates deployments sharing a segment.
pub const GROUP_ID: [u8; 4] = *b"4242";

/// Every outgoing frame is sent this many times, back to back
pub const TIMES_TO_RESEND: usize = 10;

/// Size of UDP receive buffer in bytes
pub const UDP_BUFFER: usize = u16::MAX as usize;

/// Pause before reading the socket again after a receive error
pub const UDP_RETRY_DELAY: Duration = Duration::from_millis(50);

/// How many recent (timestamp, session) keys the receiver remembers per message kind
pub const DEDUP_WINDOW: usize = 64;

/// Host of the elevator server
pub const LOCAL_ELEV_HOST: &str = "localhost";

//
// ──────────────────────────────────────────────────────────────
//   2. SYSTEM & ELEVATOR PARAMETERS
// ──────────────────────────────────────────────────────────────
//

/// Default number of floors in Sanntidshallen setup
pub const DEFAULT_NUM_FLOORS: u8 = 4;

/// Default port of the elevator server
pub const DEFAULT_ELEV_PORT: u16 = 15657;

/// Number of button types per floor (hall up, hall down, cab)
pub const NUM_BUTTONS: usize = 3;

/// Duration between elevator hardware polls
pub const ELEV_POLL: Duration = Duration::from_millis(25);

//
// ──────────────────────────────────────────────────────────────
//   3. TIMING & TIMEOUTS & INTERVALS
// ──────────────────────────────────────────────────────────────
//

/// Time the door stays open at a served floor
pub const DOOR_OPEN_TIME: Duration = Duration::from_secs(3);

/// Max time between two floor readings while moving before the car is declared stuck
pub const MOTOR_TIMEOUT: Duration = Duration::from_secs(5);

/// Wait added per floor of distance before claiming an order
pub const DISTANCE_PENALTY: Duration = Duration::from_millis(250);

/// Half width of the uniform random jitter added to the claim wait
pub const ORDER_JITTER: Duration = Duration::from_millis(100);

/// A Taken order not finished within this window is released again
pub const ORDER_TIMEOUT: Duration = Duration::from_secs(10);

/// How often the matrix is swept for timed out claims
pub const CHECK_TIMESTAMP_INTERVAL: Duration = Duration::from_millis(100);

/// How often the elevator is written to the backup file
pub const BACKUP_WRITE_INTERVAL: Duration = Duration::from_millis(90);

/// How often the watchdog is fed
pub const WATCHDOG_INTERVAL: Duration = Duration::from_millis(500);

/// Text sent to the watchdog
pub const WATCHDOG_MESSAGE: &str = "IAmAlive";

//
// ──────────────────────────────────────────────────────────────
//   4. LOGGING CONFIGURATION
// ──────────────────────────────────────────────────────────────
//

/// Enable/disable printing of the elevator table on every state change
pub static PRINT_ELEV_ON: Lazy<Mutex<bool>> = Lazy::new(|| Mutex::new(true));

/// Enable/disable printing of errors
pub static PRINT_ERR_ON: Lazy<Mutex<bool>> = Lazy::new(|| Mutex::new(true));

/// Enable/disable printing of warnings
pub static PRINT_WARN_ON: Lazy<Mutex<bool>> = Lazy::new(|| Mutex::new(true));

/// Enable/disable printing of success messages
pub static PRINT_OK_ON: Lazy<Mutex<bool>> = Lazy::new(|| Mutex::new(true));

/// Enable/disable printing of general info
pub static PRINT_INFO_ON: Lazy<Mutex<bool>> = Lazy::new(|| Mutex::new(true));

/// Enable/disable printing of network traffic
pub static PRINT_NET_ON: Lazy<Mutex<bool>> = Lazy::new(|| Mutex::new(true));

//
// ──────────────────────────────────────────────────────────────
//   5. RUNTIME CONFIGURATION
// ──────────────────────────────────────────────────────────────
//

/// Values decided once at startup and passed to every component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElevConfig {
    /// Port of the elevator server (also names the backup file)
    pub elev_port: u16,
    /// Number of floors served
    pub num_floors: u8,
    /// Seed the elevator from the backup file
    pub resume: bool,
    /// Port of the watchdog heartbeat channel
    pub watchdog_port: u16,
    /// Port of the order protocol
    pub network_port: u16,
}

impl Default for ElevConfig {
    fn default() -> Self {
        ElevConfig {
            elev_port: DEFAULT_ELEV_PORT,
            num_floors: DEFAULT_NUM_FLOORS,
            resume: false,
            watchdog_port: DEFAULT_WATCHDOG_PORT,
            network_port: NETWORK_PORT,
        }
    }
}

impl ElevConfig {
    /// Address of the elevator server, `localhost:<port>`
    pub fn elev_addr(&self) -> String {
        format!("{}:{}", LOCAL_ELEV_HOST, self.elev_port)
    }

    /// Backup file for this elevator. One file per elevator-server port.
    pub fn backup_path(&self) -> PathBuf {
        PathBuf::from(format!("elevBackupFile_{}.json", self.elev_port))
    }
}

/// Turns off all terminal output. Used by tests that drive many events.
pub fn silence_prints() {
    for toggle in [
        &PRINT_ELEV_ON,
        &PRINT_ERR_ON,
        &PRINT_WARN_ON,
        &PRINT_OK_ON,
        &PRINT_INFO_ON,
        &PRINT_NET_ON,
    ] {
        if let Ok(mut on) = toggle.lock() {
            *on = false;
        }
    }
}
