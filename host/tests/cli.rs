use assert_cmd::Command;
use std::net::UdpSocket;
use std::thread;
use std::time::Duration;

/// Exercise the `send` subcommand end-to-end against a blocking stand-in
/// card running on its own thread, the way `aero-machine-cli`'s smoke test
/// drives its binary as a subprocess.
#[test]
fn send_subcommand_prints_the_cframe_reply() {
  let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
  let addr = socket.local_addr().unwrap();

  let server = thread::spawn(move || {
    let mut buf = [0u8; 256];
    let (n, peer) = socket.recv_from(&mut buf).unwrap();
    assert!(buf[..n].ends_with(&[0]));
    let reply = common::CFrame::new(0, 0, "ok").unwrap();
    let words = reply.encode().unwrap();
    let mut bytes = Vec::new();
    for w in &words {
      bytes.extend_from_slice(&w.to_le_bytes());
    }
    socket.send_to(&bytes, peer).unwrap();
  });

  let mut cmd = Command::cargo_bin("minos-host").unwrap();
  cmd.args(["--target", &addr.to_string(), "--timeout-ms", "2000", "send", "version"]);
  cmd.timeout(Duration::from_secs(5));
  cmd.assert().success().stdout("0 ok\n");

  server.join().unwrap();
}

#[test]
fn missing_target_is_a_clean_error_not_a_panic() {
  let mut cmd = Command::cargo_bin("minos-host").unwrap();
  cmd.args(["send", "version"]);
  cmd.assert().failure();
}
