//! The hardware trait boundary a real platform wires in (§4.7, §5, §9
//! design note "aggregate them into a single owning `Service` value
//! constructed in `main`"). Everything below this line is untested and
//! out of scope (Xilinx SDK peripheral wrappers, §1 Non-goals); the
//! traits exist so [`crate::service::Service`] can be driven entirely
//! by fakes in host tests.

/// UDP command socket plus the telnet/debug TCP output queue (§4.7
/// steps 1, 2, 5). A real implementation wraps the Xilinx lwIP/AXI
/// Ethernet stack; `feminos`'s own tests use an in-memory fake.
pub trait EthernetHw {
  /// Poll the UDP socket once, non-blocking. `buf` is filled with the
  /// datagram payload (not including any terminating NUL) on success.
  fn recv_udp(&mut self, buf: &mut [u8]) -> Option<usize>;

  /// Send a reply datagram to the most recent sender.
  fn send_udp(&mut self, bytes: &[u8]);

  /// §4.7 step 2: reap transmit-complete callbacks so buffers return
  /// to their owners. A no-op for sinks that free synchronously.
  fn check_tx(&mut self);

  /// §4.7 step 5: flush queued telnet/debug bytes.
  fn output_tcp(&mut self);
}
