#![warn(missing_docs)]
//! # This projects library
//!
//! This library runs one elevator in a bank of elevators that share hall calls without any master.
//! Every elevator keeps its own order matrix, claims orders over UDP broadcast after a distance
//! based, jittered wait, and releases orders whose claimant has gone silent.
//!
//! ## Overview
//! - **config**: Constants and the runtime [`config::ElevConfig`].
//! - **print**: Coloured terminal logging.
//! - **init**: Command line parsing and startup state.
//! - **elev_types**: Orders, the order matrix and the elevator snapshot.
//! - **elevio**: Interface for elevator I/O.
//! - **elevator_logic**: The control FSM owning the physical elevator.
//! - **manager**: Decides which order this elevator takes next, and defends the claim.
//! - **network**: Broadcast transport with framing, dedup and redundant sends.
//! - **backup**: Snapshot of the elevator to disk, and resume from it.
//! - **watchdog**: Heartbeat to an external watchdog process.

pub mod config;

pub mod print;

pub mod init;

pub mod elev_types;

pub mod elevio;

pub mod elevator_logic;

pub mod manager;

pub mod network;

pub mod backup;

pub mod watchdog;
