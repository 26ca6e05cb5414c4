//! ## UDP broadcast transport
//!
//! [`Transmitter`] frames messages and sends each one [`config::TIMES_TO_RESEND`] times.
//! [`Demux`] takes received datagrams apart, drops own and duplicate frames, and hands exactly
//! one decoded copy to the consumer registered for the kind.

use anyhow::Context;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{SocketAddr, SocketAddrV4};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

use super::dedup::Dedup;
use super::frame::{self, FrameError};
use super::{Heartbeat, NetMessage, WireMessage};
use crate::config;
use crate::elev_types::Order;
use crate::print;

/// Sets up a reusable broadcast socket bound to `0.0.0.0:port`.
///
/// Several processes on one host can bind the same port, each gets a copy of every broadcast.
/// Must be called from within a tokio runtime.
pub fn broadcast_socket(port: u16) -> std::io::Result<UdpSocket> {
    let addr = SocketAddr::V4(SocketAddrV4::new(config::BC_LISTEN_ADDR, port));
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;

    socket.set_nonblocking(true)?;
    socket.set_reuse_address(true)?;
    socket.set_broadcast(true)?;
    socket.bind(&addr.into())?;
    UdpSocket::from_std(socket.into())
}

/// Sending half of the transport. Owns its socket and its timestamp counter.
#[derive(Debug)]
pub struct Transmitter {
    socket: UdpSocket,
    dest: SocketAddr,
    session: u64,
    last_timestamp: u64,
    resend: usize,
}

impl Transmitter {
    /// Broadcasts to `255.255.255.255:port` from an ephemeral port
    pub fn broadcast(port: u16, session: u64) -> anyhow::Result<Self> {
        let socket = broadcast_socket(0).context("Failed to set up broadcast socket")?;
        let dest = SocketAddr::V4(SocketAddrV4::new(config::BC_ADDR, port));
        Ok(Transmitter::with_socket(socket, dest, session))
    }

    /// Sends every frame to `dest` through `socket`
    pub fn with_socket(socket: UdpSocket, dest: SocketAddr, session: u64) -> Self {
        Transmitter { socket, dest, session, last_timestamp: 0, resend: config::TIMES_TO_RESEND }
    }

    /// Wall clock in ns, bumped when needed so it never repeats
    fn next_timestamp(&mut self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        self.last_timestamp = now.max(self.last_timestamp + 1);
        self.last_timestamp
    }

    /// Frames and sends a typed value
    pub async fn send<T: WireMessage>(&mut self, value: T) -> anyhow::Result<()> {
        self.send_message(&value.into_message()).await
    }

    /// Frames `message` once and sends the frame `resend` times.
    ///
    /// Single lost sends are ignored. Fails only if not a single copy went out.
    pub async fn send_message(&mut self, message: &NetMessage) -> anyhow::Result<()> {
        let timestamp = self.next_timestamp();
        let data = frame::encode(timestamp, self.session, message)?;

        let mut last_err = None;
        let mut sent = 0;
        for _ in 0..self.resend {
            match self.socket.send_to(&data, self.dest).await {
                Ok(_) => sent += 1,
                Err(e) => last_err = Some(e),
            }
        }
        match (sent, last_err) {
            (0, Some(e)) => Err(anyhow::Error::new(e)
                .context(format!("Failed to send {:?} to {}", message, self.dest))),
            _ => Ok(()),
        }
    }
}

/// Sends everything arriving on `rx` until every sender is dropped.
pub async fn run_transmitter(mut transmitter: Transmitter, mut rx: mpsc::UnboundedReceiver<NetMessage>) {
    while let Some(message) = rx.recv().await {
        if let Err(e) = transmitter.send_message(&message).await {
            print::err(format!("{:#}", e));
        }
    }
}

/// Where decoded messages go. One consumer per kind, a kind without one is dropped.
#[derive(Debug, Default, Clone)]
pub struct Consumers {
    /// Order statuses from other elevators
    pub orders: Option<mpsc::UnboundedSender<Order>>,
    /// Heartbeats from other elevators
    pub heartbeats: Option<mpsc::UnboundedSender<Heartbeat>>,
}

/// Receiving half of the transport, without the socket.
#[derive(Debug)]
pub struct Demux {
    session: u64,
    dedup: Dedup,
    consumers: Consumers,
}

impl Demux {
    /// Drops frames carrying `session`, the id of this process' own transmitters
    pub fn new(session: u64, consumers: Consumers) -> Self {
        Demux { session, dedup: Dedup::new(config::DEDUP_WINDOW), consumers }
    }

    /// Handles one datagram. Returns `Ok(true)` if a message was delivered.
    ///
    /// Own frames and duplicates give `Ok(false)`. Frames that do not decode give an error and
    /// leave no trace, so a later good copy is still delivered.
    pub fn handle(&mut self, buf: &[u8]) -> Result<bool, FrameError> {
        let (header, message) = frame::decode(buf)?;
        if header.session == self.session {
            return Ok(false);
        }
        if !self.dedup.is_new(header.kind, header.timestamp, header.session) {
            return Ok(false);
        }

        let delivered = match message {
            NetMessage::Order(order) => match &self.consumers.orders {
                Some(tx) => tx.send(order).is_ok(),
                None => false,
            },
            NetMessage::Heartbeat(heartbeat) => match &self.consumers.heartbeats {
                Some(tx) => tx.send(heartbeat).is_ok(),
                None => false,
            },
        };
        Ok(delivered)
    }
}

/// Reads datagrams from `socket` forever and hands them to `demux`.
pub async fn run_receiver(socket: UdpSocket, mut demux: Demux) {
    let mut buf = vec![0u8; config::UDP_BUFFER];
    loop {
        match socket.recv_from(&mut buf).await {
            Ok((len, from)) => {
                if let Err(e) = demux.handle(&buf[..len]) {
                    print::warn(format!("Dropped frame from {}: {}", from, e));
                }
            }
            Err(e) => {
                print::err(format!("UDP receive failed: {}", e));
                tokio::time::sleep(config::UDP_RETRY_DELAY).await;
            }
        }
    }
}
