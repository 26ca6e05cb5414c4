//! Startup: command line and the starting elevator.

use anyhow::{bail, Context};
use std::env;

use crate::backup;
use crate::config::{self, ElevConfig};
use crate::elev_types::Elevator;
use crate::print;

const USAGE: &str = "\
Usage: elevatorclaim [options]
  --port N            port of the elevator server (default 15657)
  --floors N          number of floors (default 4)
  --resume            start from the backup file
  --watchdog-port N   port the watchdog listens on (default 57005)
  print_elev::true/false
  print_err::true/false
  print_warn::true/false
  print_ok::true/false
  print_info::true/false
  print_net::true/false
  debug               only error messages
  help                this text";

/// ### Reads the command line
///
/// See [`parse_args_from`].
pub fn parse_args() -> anyhow::Result<ElevConfig> {
    parse_args_from(env::args().skip(1))
}

/// ### Builds the [`ElevConfig`] from command line arguments (without the program name)
///
/// `--port`, `--floors`, `--resume` and `--watchdog-port` set the config.
/// `key::true/false` toggles a kind of print, `debug` leaves only errors, `help` prints
/// the usage and exits.
///
/// Unknown arguments and numbers that do not parse are reported and skipped, the default is
/// kept. A flag without its value, or fewer than two floors, is an error.
pub fn parse_args_from<I>(args: I) -> anyhow::Result<ElevConfig>
where
    I: IntoIterator<Item = String>,
{
    let mut cfg = ElevConfig::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--resume" => cfg.resume = true,
            "--port" | "--floors" | "--watchdog-port" => {
                let value = args.next().with_context(|| format!("{} needs a value", arg))?;
                match arg.as_str() {
                    "--port" => set_number(&mut cfg.elev_port, &arg, &value),
                    "--floors" => set_number(&mut cfg.num_floors, &arg, &value),
                    _ => set_number(&mut cfg.watchdog_port, &arg, &value),
                }
            }
            "help" | "--help" => {
                println!("{}", USAGE);
                std::process::exit(0);
            }
            "debug" => {
                for toggle in [
                    &config::PRINT_ELEV_ON,
                    &config::PRINT_WARN_ON,
                    &config::PRINT_OK_ON,
                    &config::PRINT_INFO_ON,
                    &config::PRINT_NET_ON,
                ] {
                    set_toggle(toggle, false);
                }
            }
            other => match other.split_once("::") {
                Some((key, value)) => {
                    let on = value.eq_ignore_ascii_case("true");
                    match key.to_lowercase().as_str() {
                        "print_elev" => set_toggle(&config::PRINT_ELEV_ON, on),
                        "print_err" => set_toggle(&config::PRINT_ERR_ON, on),
                        "print_warn" => set_toggle(&config::PRINT_WARN_ON, on),
                        "print_ok" => set_toggle(&config::PRINT_OK_ON, on),
                        "print_info" => set_toggle(&config::PRINT_INFO_ON, on),
                        "print_net" => set_toggle(&config::PRINT_NET_ON, on),
                        _ => print::warn(format!("Unknown print toggle {}, ignoring", key)),
                    }
                }
                None => print::warn(format!("Unknown argument {}, ignoring", other)),
            },
        }
    }

    if cfg.num_floors < 2 {
        bail!("An elevator needs at least two floors, got {}", cfg.num_floors);
    }
    Ok(cfg)
}

fn set_number<T: std::str::FromStr + std::fmt::Display>(field: &mut T, flag: &str, value: &str) {
    match value.parse() {
        Ok(v) => *field = v,
        Err(_) => print::warn(format!("{} {} is not a number, keeping {}", flag, value, field)),
    }
}

fn set_toggle(toggle: &once_cell::sync::Lazy<std::sync::Mutex<bool>>, on: bool) {
    if let Ok(mut value) = toggle.lock() {
        *value = on;
    }
}

/// The elevator to start with: from the backup file when resuming, otherwise fresh
pub fn initial_elevator(cfg: &ElevConfig) -> Elevator {
    if cfg.resume {
        backup::load_or_default(&cfg.backup_path(), cfg.num_floors)
    } else {
        Elevator::new(cfg.num_floors)
    }
}
