// Copyright (c) 2022 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Affero General Public License that can be found
// in the LICENSE file.

use std::io::Write;

mod common;
use common::{
    assert_closed_without_data, connect, connect_packet_bytes, read_connack, start_broker,
    wait_until,
};

#[test]
fn test_connection_cap_rejects_excess_clients() {
    let (server, addr) = start_broker(
        r#"
[general]
max_connections = 1
"#,
    );

    let mut first = connect(addr);
    first.write_all(&connect_packet_bytes()).unwrap();
    let _ack = read_connack(&mut first);
    wait_until(|| server.session_count() == 1, "first session registration");

    // The second socket is dropped at admission, never registered and
    // never read from.
    let mut second = connect(addr);
    assert_closed_without_data(&mut second);
    assert_eq!(server.session_count(), 1);

    // Its handle still flows through the deletion queue.
    server.update(1);
    assert_eq!(server.session_count(), 1);

    first.write_all(&[0xe0, 0x00]).unwrap();
    server.update(1);
    assert_eq!(server.session_count(), 0);
}

#[test]
fn test_first_packet_timeout_disconnects_idle_client() {
    let (server, addr) = start_broker(
        r#"
[general]
connect_timeout = 1
"#,
    );

    let mut client = connect(addr);
    wait_until(|| server.session_count() == 1, "session registration");

    // Never send a byte; the first-packet timer kills the connection.
    assert_closed_without_data(&mut client);
    server.update(1);
    assert_eq!(server.session_count(), 0);
}

#[test]
fn test_registry_drains_after_malformed_packets() {
    let (server, addr) = start_broker("");

    // Repeated malformed openings must not leak sessions.
    for _ in 0..3 {
        let mut client = connect(addr);
        client.write_all(&[0x13, 0x00]).unwrap();
        assert_closed_without_data(&mut client);
        server.update(1);
    }
    assert_eq!(server.session_count(), 0);
}

#[test]
fn test_sessions_from_two_clients_coexist() {
    let (server, addr) = start_broker("");

    let mut first = connect(addr);
    first.write_all(&connect_packet_bytes()).unwrap();
    let _ack = read_connack(&mut first);

    let mut second = connect(addr);
    second.write_all(&connect_packet_bytes()).unwrap();
    let _ack = read_connack(&mut second);

    wait_until(|| server.session_count() == 2, "both sessions registered");

    first.write_all(&[0xe0, 0x00]).unwrap();
    server.update(1);
    assert_eq!(server.session_count(), 1);

    second.write_all(&[0xe0, 0x00]).unwrap();
    server.update(1);
    assert_eq!(server.session_count(), 0);
}
