//! # Backup file
//!
//! The elevator, with its full order matrix, is written to a JSON file every
//! [`config::BACKUP_WRITE_INTERVAL`]. When the process is restarted with `--resume` the file
//! seeds the starting elevator, so cab orders and the order being served survive a crash.
//!
//! Writes go to `<file>.tmp` first and are renamed over the file, a crash mid-write never
//! leaves half a snapshot behind.

use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

use crate::config;
use crate::elev_types::{Direction, Elevator, ElevatorState};
use crate::print;

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Replaces the backup file at `path` with `elevator`
pub fn write_backup(path: &Path, elevator: &Elevator) -> anyhow::Result<()> {
    let json = serde_json::to_vec_pretty(elevator).context("Failed to serialize elevator")?;
    let tmp = tmp_path(path);
    fs::write(&tmp, json).with_context(|| format!("Failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("Failed to move backup into {}", path.display()))?;
    Ok(())
}

/// Reads the backup file at `path`
pub fn read_backup(path: &Path) -> anyhow::Result<Elevator> {
    let json = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let elevator = serde_json::from_slice(&json)
        .with_context(|| format!("{} is not a valid backup", path.display()))?;
    Ok(elevator)
}

/// The elevator to start from after a restart.
///
/// ## Behavior
/// - Missing, unreadable or corrupt file: a fresh elevator, with a warning
/// - A backup for another number of floors: a fresh elevator, with a warning
/// - Otherwise the stored elevator, put back in Init with the motor stopped. Its orders and
///   active order are kept.
pub fn load_or_default(path: &Path, num_floors: u8) -> Elevator {
    match read_backup(path) {
        Ok(mut elevator) if elevator.num_floors() == num_floors => {
            elevator.state = ElevatorState::Init;
            elevator.direction = Direction::Stop;
            print::ok(format!("Resumed from {}: {}", path.display(), elevator));
            elevator
        }
        Ok(elevator) => {
            print::warn(format!(
                "Backup {} has {} floors, expected {}. Starting fresh",
                path.display(),
                elevator.num_floors(),
                num_floors
            ));
            Elevator::new(num_floors)
        }
        Err(e) => {
            print::warn(format!("{:#}. Starting fresh", e));
            Elevator::new(num_floors)
        }
    }
}

/// Writes the latest elevator to `path` every [`config::BACKUP_WRITE_INTERVAL`].
///
/// Only changed elevators are written. Failed writes are logged and retried on the next tick.
/// Returns when the FSM drops its end of the watch channel.
pub async fn run_backup_writer(path: PathBuf, mut elevator_rx: watch::Receiver<Elevator>) {
    let mut ticker = interval(config::BACKUP_WRITE_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut dirty = true;

    loop {
        ticker.tick().await;
        match elevator_rx.has_changed() {
            Ok(changed) => dirty |= changed,
            Err(_) => return,
        }
        if !dirty {
            continue;
        }
        let elevator = elevator_rx.borrow_and_update().clone();
        match write_backup(&path, &elevator) {
            Ok(()) => dirty = false,
            Err(e) => print::err(format!("{:#}", e)),
        }
    }
}
