//! UDP command client (§6.2): one socket per target, "connected" to the
//! card's address so `send`/`recv` need not repeat it, mirroring the
//! `tokio::net::UdpSocket` usage in the pack's `disk-gateway`.

use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;

use crate::Error;

const MAX_DATAGRAM_BYTES: usize = 2048;

pub struct Client {
  socket: UdpSocket,
}

impl Client {
  pub async fn connect(target: SocketAddr) -> Result<Self, Error> {
    let local: SocketAddr = if target.is_ipv6() { "[::]:0" } else { "0.0.0.0:0" }.parse().unwrap();
    let socket = UdpSocket::bind(local).await?;
    socket.connect(target).await?;
    Ok(Client { socket })
  }

  /// Send one ASCII command line, NUL-terminated the way the firmware's
  /// `poll_command` expects (§4.7 step 1, §6.2).
  pub async fn send_line(&self, line: &str) -> Result<(), Error> {
    let mut datagram = Vec::with_capacity(line.len() + 1);
    datagram.extend_from_slice(line.as_bytes());
    datagram.push(0);
    self.socket.send(&datagram).await?;
    Ok(())
  }

  /// Receive one reply datagram and decode it as a [`common::CFrame`]
  /// (§4.3.3).
  pub async fn recv_cframe(&self, wait: Duration) -> Result<common::CFrame, Error> {
    let mut buf = [0u8; MAX_DATAGRAM_BYTES];
    let n = timeout(wait, self.socket.recv(&mut buf)).await.map_err(|_| Error::Timeout)??;
    if n % 2 != 0 {
      return Err(Error::OddDatagram(n));
    }
    let words: Vec<u16> = buf[..n].chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]])).collect();
    Ok(common::CFrame::decode(&words)?)
  }

  /// Send a command and wait for its reply in one call, the common case
  /// for every CLI subcommand but `daq`'s streaming issuer.
  pub async fn command(&self, line: &str, wait: Duration) -> Result<common::CFrame, Error> {
    self.send_line(line).await?;
    self.recv_cframe(wait).await
  }
}
