use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

use elevatorclaim::config;
use elevatorclaim::elev_types::{Order, OrderStatus, OrderType};
use elevatorclaim::network::udp_broadcast::{run_receiver, Consumers, Demux, Transmitter};

async fn receiver(session: u64) -> (std::net::SocketAddr, mpsc::UnboundedReceiver<Order>) {
    config::silence_prints();
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();
    let demux = Demux::new(session, Consumers { orders: Some(tx), heartbeats: None });
    tokio::spawn(run_receiver(socket, demux));
    (addr, rx)
}

async fn transmitter(dest: std::net::SocketAddr, session: u64) -> Transmitter {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    Transmitter::with_socket(socket, dest, session)
}

async fn collect(rx: &mut mpsc::UnboundedReceiver<Order>) -> Vec<Order> {
    sleep(Duration::from_millis(200)).await;
    let mut got = Vec::new();
    while let Ok(order) = rx.try_recv() {
        got.push(order);
    }
    got
}

#[tokio::test]
async fn redundant_copies_are_delivered_once() {
    let (addr, mut rx) = receiver(1).await;
    let mut tx = transmitter(addr, 2).await;

    let order = Order::new(2, OrderType::HallDown, OrderStatus::Taken);
    tx.send(order).await.unwrap();

    assert_eq!(collect(&mut rx).await, vec![order]);
}

#[tokio::test]
async fn every_logical_message_gets_through_once() {
    let (addr, mut rx) = receiver(1).await;
    let mut a = transmitter(addr, 2).await;
    let mut b = transmitter(addr, 3).await;

    let first = Order::new(1, OrderType::HallUp, OrderStatus::NotTaken);
    let second = first.with_status(OrderStatus::Taken);
    a.send(first).await.unwrap();
    b.send(first).await.unwrap();
    a.send(second).await.unwrap();

    let got = collect(&mut rx).await;
    assert_eq!(got.len(), 3);
    assert_eq!(got.iter().filter(|o| **o == first).count(), 2);
    assert_eq!(got.iter().filter(|o| **o == second).count(), 1);
}

#[tokio::test]
async fn own_messages_are_not_delivered() {
    let (addr, mut rx) = receiver(7).await;
    let mut tx = transmitter(addr, 7).await;
    tx.send(Order::new(0, OrderType::HallUp, OrderStatus::NotTaken)).await.unwrap();

    assert!(collect(&mut rx).await.is_empty());
}

#[tokio::test]
async fn garbage_does_not_stop_the_receiver() {
    let (addr, mut rx) = receiver(1).await;
    let junk = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    junk.send_to(b"not a frame at all, just noise", addr).await.unwrap();
    junk.send_to(b"4242", addr).await.unwrap();

    let mut tx = transmitter(addr, 2).await;
    let order = Order::new(3, OrderType::HallDown, OrderStatus::Finished);
    tx.send(order).await.unwrap();

    let got = timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
    assert_eq!(got, Some(order));
}

#[tokio::test]
async fn receive_errors_do_not_stop_the_receiver() {
    config::silence_prints();
    let peer_addr = {
        let reserve = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        reserve.local_addr().unwrap()
    };

    // nobody listens on the peer port yet, the refused send surfaces as a receive error
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    socket.connect(peer_addr).await.unwrap();
    socket.send(b"ping").await.unwrap();
    sleep(Duration::from_millis(20)).await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let demux = Demux::new(1, Consumers { orders: Some(tx), heartbeats: None });
    tokio::spawn(run_receiver(socket, demux));

    let peer = UdpSocket::bind(peer_addr).await.unwrap();
    let mut tx = Transmitter::with_socket(peer, addr, 2);
    let order = Order::new(1, OrderType::HallUp, OrderStatus::Taken);
    tx.send(order).await.unwrap();

    let got = timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
    assert_eq!(got, Some(order));
}
