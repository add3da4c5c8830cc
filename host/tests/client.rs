use std::time::Duration;
use tokio::net::UdpSocket;

use host::Client;

/// A minimal stand-in card: echoes back a fixed CFRAME reply for whatever
/// it receives, so the client's send/receive path can be exercised without
/// real hardware.
async fn fake_card() -> (std::net::SocketAddr, tokio::task::JoinHandle<()>) {
  let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
  let addr = socket.local_addr().unwrap();
  let handle = tokio::spawn(async move {
    let mut buf = [0u8; 256];
    let (n, peer) = socket.recv_from(&mut buf).await.unwrap();
    assert!(buf[..n].ends_with(&[0]), "command datagram must be NUL-terminated");
    let reply = common::CFrame::new(0, 0, "ok").unwrap();
    let words = reply.encode().unwrap();
    let mut bytes = Vec::new();
    for w in &words {
      bytes.extend_from_slice(&w.to_le_bytes());
    }
    socket.send_to(&bytes, peer).await.unwrap();
  });
  (addr, handle)
}

#[tokio::test]
async fn a_command_round_trips_through_a_real_udp_socket() {
  let (addr, server) = fake_card().await;
  let client = Client::connect(addr).await.unwrap();

  let reply = client.command("version", Duration::from_secs(1)).await.unwrap();
  assert_eq!(reply.error_code, 0);
  assert_eq!(reply.message.as_str(), "ok");

  server.await.unwrap();
}

#[tokio::test]
async fn a_reply_that_never_arrives_times_out() {
  let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
  let addr = socket.local_addr().unwrap();
  let client = Client::connect(addr).await.unwrap();

  let result = client.command("version", Duration::from_millis(50)).await;
  assert!(matches!(result, Err(host::Error::Timeout)));
}
