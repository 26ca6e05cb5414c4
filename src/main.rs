use anyhow::Context;
use tokio::sync::{mpsc, watch};

use elevatorclaim::elev_types::Direction;
use elevatorclaim::elevio::{self, elev::ElevatorDriver, ElevatorIo};
use elevatorclaim::network::udp_broadcast::{self, Consumers, Demux, Transmitter};
use elevatorclaim::{backup, elevator_logic, init, manager, network, print, watchdog};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = init::parse_args()?;
    print::info(format!("Starting elevator on {} with {} floors", cfg.elev_addr(), cfg.num_floors));

    let elevator = init::initial_elevator(&cfg);
    let resume = if cfg.resume { manager::resume_order(&elevator) } else { None };

    /* START ----------- Heisserver ---------------------- */
    let driver = ElevatorDriver::init(&cfg.elev_addr(), cfg.num_floors)
        .with_context(|| format!("Could not connect to elevator server at {}", cfg.elev_addr()))?;
    let hw_rx = elevio::poll::start(driver.clone());
    /* SLUTT ----------- Heisserver ---------------------- */

    /* START ----------- Nettverk ---------------------- */
    let session = network::new_session_id();

    let (net_tx, net_rx) = mpsc::unbounded_channel();
    let transmitter = Transmitter::broadcast(cfg.network_port, session)?;
    tokio::spawn(udp_broadcast::run_transmitter(transmitter, net_rx));

    let (order_tx, order_rx) = mpsc::unbounded_channel();
    let socket = udp_broadcast::broadcast_socket(cfg.network_port)
        .with_context(|| format!("Could not listen on port {}", cfg.network_port))?;
    let demux = Demux::new(session, Consumers { orders: Some(order_tx), heartbeats: None });
    tokio::spawn(udp_broadcast::run_receiver(socket, demux));
    /* SLUTT ----------- Nettverk ---------------------- */

    /* START ----------- Heis og ordrefordeling ---------------------- */
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (update_tx, update_rx) = mpsc::unbounded_channel();
    let (snapshot_tx, snapshot_rx) = watch::channel(elevator.clone());

    tokio::spawn(backup::run_backup_writer(cfg.backup_path(), snapshot_rx));
    tokio::spawn(manager::run_order_manager(
        cfg.num_floors,
        resume,
        update_rx,
        order_rx,
        cmd_tx,
        net_tx,
    ));
    let fsm_task = tokio::spawn(elevator_logic::run_local_elevator(
        driver.clone(),
        elevator,
        hw_rx,
        cmd_rx,
        update_tx,
        snapshot_tx,
    ));
    /* SLUTT ----------- Heis og ordrefordeling ---------------------- */

    match Transmitter::broadcast(cfg.watchdog_port, session) {
        Ok(transmitter) => {
            tokio::spawn(watchdog::run_heartbeat(transmitter, cfg.elev_port));
        }
        Err(e) => print::warn(format!("No watchdog heartbeat: {:#}", e)),
    }

    print::ok("Elevator running".to_string());

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                print::err(format!("Could not listen for ctrl-c: {}", e));
            }
            print::info("Shutting down".to_string());
        }
        _ = fsm_task => {
            print::err("Elevator control stopped".to_string());
        }
    }

    driver.motor_direction(Direction::Stop);
    Ok(())
}
