//! ## Printing Module
//!
//! This module is only here to make logging in the terminal easier to read.
//! It prints in appropriate colors depending on the situation, and gives a table view of the
//! [`Elevator`] with its order matrix.
//!
//! Every kind of message has its own toggle in [`config`], so tests and noisy runs can silence
//! parts of the output.
use crate::config;
use crate::elev_types::{Direction, Elevator, ElevatorState, OrderStatus, OrderType};
use ansi_term::Colour::{self, Green, Purple, Red, Yellow};
use once_cell::sync::Lazy;
use prettytable::{format, Cell, Row, Table};
use std::sync::Mutex;
use unicode_width::UnicodeWidthStr;

/// A poisoned toggle still prints. Losing log lines is worse than a few extra.
fn enabled(toggle: &Lazy<Mutex<bool>>) -> bool {
    toggle.lock().map(|on| *on).unwrap_or(true)
}

/// Prints an error message in red to the terminal.
///
/// If `PRINT_ERR_ON` is `false`, the message will not be printed.
///
/// ## Terminal output
/// - "\[ERROR\]:   {}", msg
///
/// ## Example
/// ```
/// use elevatorclaim::print;
///
/// print::err("Something went wrong!".to_string());
/// ```
pub fn err(msg: String) {
    if enabled(&config::PRINT_ERR_ON) {
        println!("{}{}\n", Red.paint("[ERROR]:   "), Red.paint(msg));
    }
}

/// Prints a warning message in yellow to the terminal.
///
/// If `PRINT_WARN_ON` is `false`, the message will not be printed.
///
/// ## Terminal output
/// - "\[WARNING\]: {}", msg
pub fn warn(msg: String) {
    if enabled(&config::PRINT_WARN_ON) {
        println!("{}{}\n", Yellow.paint("[WARNING]: "), Yellow.paint(msg));
    }
}

/// Prints a success message in green to the terminal.
///
/// If `PRINT_OK_ON` is `false`, the message will not be printed.
///
/// ## Terminal output
/// - "\[OK\]:      {}", msg
pub fn ok(msg: String) {
    if enabled(&config::PRINT_OK_ON) {
        println!("{}{}\n", Green.paint("[OK]:      "), Green.paint(msg));
    }
}

/// Prints an informational message in light blue to the terminal.
///
/// If `PRINT_INFO_ON` is `false`, the message will not be printed.
///
/// ## Terminal output
/// - "\[INFO\]:    {}", msg
pub fn info(msg: String) {
    let light_blue = Colour::RGB(102, 178, 255);
    if enabled(&config::PRINT_INFO_ON) {
        println!("{}{}\n", light_blue.paint("[INFO]:    "), light_blue.paint(msg));
    }
}

/// Prints network traffic (claims, releases, sweeps) in pink.
///
/// If `PRINT_NET_ON` is `false`, the message will not be printed.
///
/// ## Terminal output
/// - "\[NET\]:     {}", msg
pub fn net(msg: String) {
    let pink = Colour::RGB(255, 51, 255);
    if enabled(&config::PRINT_NET_ON) {
        println!("{}{}\n", pink.paint("[NET]:     "), pink.paint(msg));
    }
}

/// Prints an error message with a cosmic twist, displaying the message in a rainbow of colors.
///
/// Used when something happens that should be impossible, such as a value outside an enum
/// arriving from the hardware. Always printed.
///
/// ## Terminal output
/// - "\[ERROR\]: Cosmic rays flipped a bit! IN: {fun}"
pub fn cosmic_err(fun: String) {
    print!("{}", Colour::Red.paint("[ERROR]: "));

    let colors = [
        Colour::Red,
        Colour::Yellow,
        Colour::Green,
        Colour::Cyan,
        Colour::Blue,
        Colour::Purple,
    ];

    let message = format!("Cosmic rays flipped a bit! IN: {}", fun);
    for (i, c) in message.chars().enumerate() {
        let color = colors[i % colors.len()];
        print!("{}", color.paint(c.to_string()));
    }

    println!();
}

/// Pads the input text to a fixed display width using spaces.
///
/// Accounts for characters that take more than one column (e.g. arrows and symbols),
/// so the table columns stay aligned.
fn pad_text(text: &str, width: usize) -> String {
    let visible_width = UnicodeWidthStr::width(text);
    let padding = width.saturating_sub(visible_width);
    format!("{}{}", text, " ".repeat(padding))
}

/// One symbol per order status, as shown in the matrix table
fn status_symbol(status: OrderStatus) -> String {
    match status {
        OrderStatus::Invalid => pad_text("·", 2),
        OrderStatus::NotTaken => Yellow.paint(pad_text("N", 2)).to_string(),
        OrderStatus::Taken => Green.paint(pad_text("T", 2)).to_string(),
        OrderStatus::Execute => Green.bold().paint(pad_text("E", 2)).to_string(),
        OrderStatus::Finished => Purple.paint(pad_text("F", 2)).to_string(),
        OrderStatus::Abort => Red.paint(pad_text("A", 2)).to_string(),
    }
}

fn state_label(elevator: &Elevator) -> String {
    match (elevator.direction, elevator.state) {
        (_, ElevatorState::Init) => Yellow.paint("Init").to_string(),
        (_, ElevatorState::Idle) => Green.paint("Idle").to_string(),
        (Direction::Up, ElevatorState::Moving) => Yellow.paint("↑ Moving").to_string(),
        (Direction::Down, ElevatorState::Moving) => Yellow.paint("↓ Moving").to_string(),
        (Direction::Stop, ElevatorState::Moving) => Yellow.paint("Moving").to_string(),
        (_, ElevatorState::DoorOpen) => Purple.paint("Door Open").to_string(),
        (_, ElevatorState::Error) => Red.paint("Motor Error").to_string(),
    }
}

/// Logs the elevator to the terminal as two tables: the state line, and the order matrix with
/// the top floor first.
///
/// Hall buttons that do not exist (up at the top floor, down at the ground floor) are left blank.
///
/// If `PRINT_ELEV_ON` is `false`, nothing is printed.
pub fn elevator(elevator: &Elevator) {
    if !enabled(&config::PRINT_ELEV_ON) {
        return;
    }

    let floor = match elevator.floor {
        Some(floor) => floor.to_string(),
        None => "?".to_string(),
    };

    let mut status = Table::new();
    status.set_format(*format::consts::FORMAT_BOX_CHARS);
    status.set_titles(Row::new(vec![
        Cell::new("Floor"),
        Cell::new("State"),
        Cell::new("Active order"),
    ]));
    status.add_row(Row::new(vec![
        Cell::new(&floor),
        Cell::new(&state_label(elevator)),
        Cell::new(&elevator.active_order.to_string()),
    ]));

    let mut matrix = Table::new();
    matrix.set_format(*format::consts::FORMAT_BOX_CHARS);
    matrix.set_titles(Row::new(vec![
        Cell::new("Floor"),
        Cell::new("Up"),
        Cell::new("Down"),
        Cell::new("Cab"),
    ]));

    let top = elevator.num_floors().saturating_sub(1);
    for floor in (0..elevator.num_floors()).rev() {
        let Some(row) = elevator.orders.row(floor) else { continue };
        let mut cells = vec![Cell::new(&floor.to_string())];
        for order_type in OrderType::ALL {
            let missing = (order_type == OrderType::HallUp && floor == top)
                || (order_type == OrderType::HallDown && floor == 0);
            let text = if missing {
                pad_text("", 2)
            } else {
                status_symbol(row[order_type.index()].status)
            };
            cells.push(Cell::new(&text));
        }
        matrix.add_row(Row::new(cells));
    }

    status.printstd();
    matrix.printstd();
}
