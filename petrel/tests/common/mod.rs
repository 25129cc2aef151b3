// Copyright (c) 2022 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Affero General Public License that can be found
// in the LICENSE file.

#![allow(dead_code)]

use std::io::Read;
use std::net::{SocketAddr, TcpStream};
use std::time::{Duration, Instant};

use petrel::config::Config;
use petrel::server::ServerContext;

pub const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Start an in-process broker on an ephemeral loopback port.
pub fn start_broker(extra: &str) -> (ServerContext, SocketAddr) {
    let content = format!(
        r#"
[listener]
address = "127.0.0.1:0"

[log]
console_log = false

{extra}
"#
    );
    let config: Config = toml::from_str(&content).unwrap();
    config.validate().unwrap();
    let mut server = ServerContext::new(config);
    server.start().unwrap();
    let addr = server.local_addr().unwrap();
    (server, addr)
}

pub fn connect(addr: SocketAddr) -> TcpStream {
    let stream = TcpStream::connect(addr).unwrap();
    stream.set_read_timeout(Some(READ_TIMEOUT)).unwrap();
    stream
}

/// A well-formed clean-start CONNECT with client id "test" and keep-alive
/// 60 seconds.
pub fn connect_packet_bytes() -> Vec<u8> {
    vec![
        0x10, 0x11, 0x00, 0x04, 0x4d, 0x51, 0x54, 0x54, 0x05, 0x02, 0x00, 0x3c, 0x00, 0x00, 0x04,
        0x74, 0x65, 0x73, 0x74,
    ]
}

/// Read one complete CONNACK off the socket and return its raw bytes.
pub fn read_connack(stream: &mut TcpStream) -> Vec<u8> {
    let mut header = [0_u8; 2];
    stream.read_exact(&mut header).unwrap();
    assert_eq!(header[0], 0x20, "expected a CONNACK control byte");
    // All CONNACKs the broker emits fit a one-byte remaining length.
    let remaining = header[1] as usize;
    assert!(remaining < 0x80);
    let mut body = vec![0_u8; remaining];
    stream.read_exact(&mut body).unwrap();
    let mut packet = header.to_vec();
    packet.extend_from_slice(&body);
    packet
}

/// Assert the peer closed the connection without sending anything.
///
/// Both an orderly end-of-stream and a reset count as closed; a received
/// byte does not.
pub fn assert_closed_without_data(stream: &mut TcpStream) {
    let mut buf = [0_u8; 16];
    match stream.read(&mut buf) {
        Ok(0) => {}
        Ok(received) => panic!("expected silent close, got {received} bytes: {buf:02x?}"),
        Err(_err) => {}
    }
}

/// Poll `predicate` until it holds or the deadline passes.
pub fn wait_until(predicate: impl Fn() -> bool, what: &str) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if predicate() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    panic!("timed out waiting for {what}");
}
