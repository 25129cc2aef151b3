// Copyright (c) 2022 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Affero General Public License that can be found
// in the LICENSE file.

use std::io::Write;

mod common;
use common::{
    assert_closed_without_data, connect, connect_packet_bytes, read_connack, start_broker,
};

#[test]
fn test_bad_protocol_name_closes_silently() {
    let (server, addr) = start_broker("");
    let mut client = connect(addr);

    // "MQTA" instead of "MQTT".
    let mut packet = connect_packet_bytes();
    packet[7] = 0x41;
    client.write_all(&packet).unwrap();

    assert_closed_without_data(&mut client);
    server.update(1);
    assert_eq!(server.session_count(), 0);
}

#[test]
fn test_old_protocol_level_closes_silently() {
    let (server, addr) = start_broker("");
    let mut client = connect(addr);

    // Protocol level 4 (MQTT 3.1.1).
    let mut packet = connect_packet_bytes();
    packet[8] = 0x04;
    client.write_all(&packet).unwrap();

    assert_closed_without_data(&mut client);
    server.update(1);
}

#[test]
fn test_reserved_connect_flag_closes() {
    let (server, addr) = start_broker("");
    let mut client = connect(addr);

    let mut packet = connect_packet_bytes();
    packet[9] = 0x03;
    client.write_all(&packet).unwrap();

    assert_closed_without_data(&mut client);
    server.update(1);
}

#[test]
fn test_duplicate_unique_property_closes() {
    let (server, addr) = start_broker("");
    let mut client = connect(addr);

    // Clean-start CONNECT whose property list carries the session-expiry
    // interval twice.
    let packet: Vec<u8> = vec![
        0x10, 0x1b, //
        0x00, 0x04, 0x4d, 0x51, 0x54, 0x54, 0x05, 0x02, 0x00, 0x3c, //
        0x0a, // property length
        0x11, 0x00, 0x00, 0x00, 0x10, //
        0x11, 0x00, 0x00, 0x00, 0x20, //
        0x00, 0x04, 0x74, 0x65, 0x73, 0x74,
    ];
    client.write_all(&packet).unwrap();

    assert_closed_without_data(&mut client);
    server.update(1);
    assert_eq!(server.session_count(), 0);
}

#[test]
fn test_oversize_packet_closes_before_body() {
    let (server, addr) = start_broker("");
    let mut client = connect(addr);

    // Remaining length 0x2000 announced, over the 1 KiB default limit.
    // The connection dies after the length bytes, before any body read.
    client.write_all(&[0x10, 0x80, 0x40]).unwrap();

    assert_closed_without_data(&mut client);
    server.update(1);
    assert_eq!(server.session_count(), 0);
}

#[test]
fn test_first_packet_must_be_connect() {
    let (server, addr) = start_broker("");
    let mut client = connect(addr);

    // A PUBLISH as the opening packet is never acknowledged.
    client
        .write_all(&[0x30, 0x08, 0x00, 0x03, b'a', b'/', b'b', 0x00, b'h', b'i'])
        .unwrap();

    assert_closed_without_data(&mut client);
    server.update(1);
    assert_eq!(server.session_count(), 0);
}

#[test]
fn test_reserved_packet_type_closes() {
    let (server, addr) = start_broker("");
    let mut client = connect(addr);

    client.write_all(&[0x00, 0x00]).unwrap();

    assert_closed_without_data(&mut client);
    server.update(1);
}

#[test]
fn test_ill_formed_client_id_closes() {
    let (server, addr) = start_broker("");
    let mut client = connect(addr);

    // Overlong-encoded null in the client id.
    let mut packet = connect_packet_bytes();
    packet[15] = 0xc0;
    packet[16] = 0x80;
    client.write_all(&packet).unwrap();

    assert_closed_without_data(&mut client);
    server.update(1);
    assert_eq!(server.session_count(), 0);
}

#[test]
fn test_oversize_publish_payload_closes() {
    let (server, addr) = start_broker(
        r#"
[general]
message_size_limit = 4
"#,
    );
    let mut client = connect(addr);

    client.write_all(&connect_packet_bytes()).unwrap();
    let _ack = read_connack(&mut client);

    // Five payload bytes against a limit of four.
    client
        .write_all(&[
            0x30, 0x0b, 0x00, 0x03, b'a', b'/', b'b', 0x00, b'1', b'2', b'3', b'4', b'5',
        ])
        .unwrap();

    assert_closed_without_data(&mut client);
    server.update(1);
    assert_eq!(server.session_count(), 0);
}
