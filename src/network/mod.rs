//! ## Network module
//!
//! Moves typed messages between elevators over UDP broadcast. The medium drops, duplicates and
//! reorders datagrams, so:
//! - every frame carries the group id, a send timestamp, and the session id of its sender
//! - every frame is sent [`config::TIMES_TO_RESEND`] times back to back
//! - receivers drop their own frames and frames whose key they have already seen
//!
//! ## Sub-modules
//! - [frame]: wire layout and the [`frame::FrameError`] decode errors
//! - [dedup]: the per-kind window of recently seen keys
//! - [udp_broadcast]: sockets, the transmitter task and the receiver task
//!
//! ## Message kinds
//! The set of messages is closed. [`MsgKind`] is the byte on the wire, and each kind maps to
//! one decode function. Adding a kind means adding a variant to [`MsgKind`] and [`NetMessage`]
//! and implementing [`WireMessage`] for its payload.

pub mod dedup;
pub mod frame;
pub mod udp_broadcast;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config;
use crate::elev_types::Order;
use frame::FrameError;

/// Discriminator byte of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MsgKind {
    /// Order claims, releases and finishes
    Order = 1,
    /// Liveness messages to the watchdog
    Heartbeat = 2,
}

impl TryFrom<u8> for MsgKind {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(MsgKind::Order),
            2 => Ok(MsgKind::Heartbeat),
            other => Err(FrameError::UnknownKind(other)),
        }
    }
}

/// Decodes the payload of one kind into a [`NetMessage`]
pub type Decoder = fn(&[u8]) -> Result<NetMessage, FrameError>;

fn decode_as<T: WireMessage>(payload: &[u8]) -> Result<NetMessage, FrameError> {
    let value: T = bincode::deserialize(payload)?;
    Ok(value.into_message())
}

impl MsgKind {
    /// The decode function registered for this kind
    pub fn decoder(self) -> Decoder {
        match self {
            MsgKind::Order => decode_as::<Order>,
            MsgKind::Heartbeat => decode_as::<Heartbeat>,
        }
    }
}

/// A payload type that can travel in a frame.
pub trait WireMessage: Serialize + DeserializeOwned {
    /// The discriminator written for this type
    const KIND: MsgKind;

    /// Wraps the value for the transmitter
    fn into_message(self) -> NetMessage;
}

/// Sent to the watchdog every [`config::WATCHDOG_INTERVAL`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Heartbeat {
    /// Always [`config::WATCHDOG_MESSAGE`]
    pub message: String,
    /// Port of the elevator server, tells the watchdog which elevator is alive
    pub elevator_port: u16,
}

impl Heartbeat {
    /// Heartbeat of the elevator on `elevator_port`
    pub fn new(elevator_port: u16) -> Self {
        Heartbeat { message: config::WATCHDOG_MESSAGE.to_string(), elevator_port }
    }
}

/// Every message the transport carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetMessage {
    /// An order status, never a cab order
    Order(Order),
    /// Liveness
    Heartbeat(Heartbeat),
}

impl NetMessage {
    /// The discriminator of this message
    pub fn kind(&self) -> MsgKind {
        match self {
            NetMessage::Order(_) => MsgKind::Order,
            NetMessage::Heartbeat(_) => MsgKind::Heartbeat,
        }
    }

    /// Serialized payload, without the frame header
    pub fn encode_payload(&self) -> Result<Vec<u8>, FrameError> {
        let bytes = match self {
            NetMessage::Order(order) => bincode::serialize(order)?,
            NetMessage::Heartbeat(heartbeat) => bincode::serialize(heartbeat)?,
        };
        Ok(bytes)
    }
}

impl WireMessage for Order {
    const KIND: MsgKind = MsgKind::Order;

    fn into_message(self) -> NetMessage {
        NetMessage::Order(self)
    }
}

impl WireMessage for Heartbeat {
    const KIND: MsgKind = MsgKind::Heartbeat;

    fn into_message(self) -> NetMessage {
        NetMessage::Heartbeat(self)
    }
}

/// A fresh random session id. One per process, shared by its transmitters and its receiver.
pub fn new_session_id() -> u64 {
    rand::random()
}
