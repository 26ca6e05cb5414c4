//! TCP client for the elevator server.
//!
//! Every command is four bytes. Queries get a four byte reply on the same socket, so the
//! socket is locked for the whole write and read.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::sync::{Arc, Mutex};

use super::ElevatorIo;
use crate::elev_types::{Direction, OrderType};
use crate::print;

const CMD_MOTOR: u8 = 1;
const CMD_CALL_LIGHT: u8 = 2;
const CMD_FLOOR_INDICATOR: u8 = 3;
const CMD_DOOR_LIGHT: u8 = 4;
const CMD_CALL_BUTTON: u8 = 6;
const CMD_FLOOR_SENSOR: u8 = 7;

/// Handle to the elevator server. Cheap to clone, all clones share one connection.
#[derive(Clone, Debug)]
pub struct ElevatorDriver {
    socket: Arc<Mutex<TcpStream>>,
    /// Number of floors the server simulates
    pub num_floors: u8,
}

impl ElevatorDriver {
    /// Connects to the elevator server at `addr`
    pub fn init(addr: &str, num_floors: u8) -> io::Result<ElevatorDriver> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        Ok(ElevatorDriver {
            socket: Arc::new(Mutex::new(stream)),
            num_floors,
        })
    }

    fn command(&self, buf: [u8; 4]) -> io::Result<()> {
        let mut sock = self
            .socket
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "elevator socket poisoned"))?;
        sock.write_all(&buf)
    }

    fn query(&self, buf: [u8; 4]) -> io::Result<[u8; 4]> {
        let mut sock = self
            .socket
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "elevator socket poisoned"))?;
        sock.write_all(&buf)?;
        let mut reply = [0u8; 4];
        sock.read_exact(&mut reply)?;
        Ok(reply)
    }

    fn command_or_log(&self, buf: [u8; 4]) {
        if let Err(e) = self.command(buf) {
            print::err(format!("Elevator server command {:?} failed: {}", buf, e));
        }
    }

    /// `true` while the button is held
    pub fn call_button(&self, floor: u8, order_type: OrderType) -> io::Result<bool> {
        let reply = self.query([CMD_CALL_BUTTON, order_type as u8, floor, 0])?;
        Ok(reply[1] != 0)
    }

    /// The floor the car is at, `None` between floors
    pub fn floor_sensor(&self) -> io::Result<Option<u8>> {
        let reply = self.query([CMD_FLOOR_SENSOR, 0, 0, 0])?;
        if reply[1] != 0 {
            Ok(Some(reply[2]))
        } else {
            Ok(None)
        }
    }
}

impl ElevatorIo for ElevatorDriver {
    fn motor_direction(&self, dirn: Direction) {
        self.command_or_log([CMD_MOTOR, dirn.as_motor_byte(), 0, 0]);
    }

    fn call_button_light(&self, floor: u8, order_type: OrderType, on: bool) {
        self.command_or_log([CMD_CALL_LIGHT, order_type as u8, floor, on as u8]);
    }

    fn floor_indicator(&self, floor: u8) {
        self.command_or_log([CMD_FLOOR_INDICATOR, floor, 0, 0]);
    }

    fn door_light(&self, on: bool) {
        self.command_or_log([CMD_DOOR_LIGHT, on as u8, 0, 0]);
    }
}
