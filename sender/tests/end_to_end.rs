use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::thread;

use ilp_common::config::{AutoFlushConfig, Protocol, ProtocolVersion, SenderConfig};
use ilp_sender::{Sender, TimeUnit};

/// Scenario 1 of spec.md §8: a single symbol+float row flushed over HTTP
/// produces exactly one POST with the expected v1 body, and a 204 resolves
/// the flush successfully.
#[test]
fn http_flush_sends_single_row_and_gets_204() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());

        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();
        assert!(request_line.starts_with("POST /write"));

        let mut content_length = 0usize;
        loop {
            let mut header = String::new();
            reader.read_line(&mut header).unwrap();
            if header == "\r\n" || header.is_empty() {
                break;
            }
            if let Some(value) = header.strip_prefix("Content-Length: ") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }

        let mut body = vec![0u8; content_length];
        reader.read_exact(&mut body).unwrap();
        stream.write_all(b"HTTP/1.1 204 No Content\r\nContent-Length: 0\r\n\r\n").unwrap();
        String::from_utf8(body).unwrap()
    });

    let config = SenderConfig {
        protocol: Protocol::Http,
        host: "127.0.0.1".to_string(),
        port,
        protocol_version: ProtocolVersion::V1,
        ..SenderConfig::default()
    };
    let mut sender = Sender::new(config).unwrap();
    sender.table("t").unwrap().symbol("s", "x").unwrap().float_column("f", 1.5).unwrap();
    sender.at(1_700_000_000_000_000_000, TimeUnit::Ns).unwrap();
    assert!(sender.flush().unwrap());

    let received_body = handle.join().unwrap();
    assert_eq!(received_body, "t,s=x f=1.5 1700000000000000000\n");
}

/// A TCP sender dials, writes the drained row bytes directly on the wire,
/// and performs no retry or framing beyond that (spec.md §4.4).
#[test]
fn tcp_connect_and_flush_writes_row_bytes_on_the_wire() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut buf = vec![0u8; b"t x=1i\n".len()];
        stream.read_exact(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    });

    let config = SenderConfig {
        protocol: Protocol::Tcp,
        host: "127.0.0.1".to_string(),
        port,
        protocol_version: ProtocolVersion::V1,
        auto_flush: AutoFlushConfig { enabled: false, rows_threshold: None, interval_millis: None },
        ..SenderConfig::default()
    };
    let mut sender = Sender::new(config).unwrap();
    sender.connect().unwrap();
    sender.table("t").unwrap().int_column("x", 1).unwrap();
    sender.at_now().unwrap();
    assert!(sender.flush().unwrap());

    let received = handle.join().unwrap();
    assert_eq!(received, "t x=1i\n");
    sender.close().unwrap();
}

/// With `auto_flush_rows = 2`, the second `at_now()` triggers exactly one
/// flush and a third row does not flush on its own (spec.md §8 scenario 3).
#[test]
fn auto_flush_triggers_once_at_row_threshold() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut buf = vec![0u8; b"t x=1i\nt x=2i\n".len()];
        stream.read_exact(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    });

    let config = SenderConfig {
        protocol: Protocol::Tcp,
        host: "127.0.0.1".to_string(),
        port,
        protocol_version: ProtocolVersion::V1,
        auto_flush: AutoFlushConfig { enabled: true, rows_threshold: Some(2), interval_millis: None },
        ..SenderConfig::default()
    };
    let mut sender = Sender::new(config).unwrap();
    sender.connect().unwrap();
    sender.table("t").unwrap().int_column("x", 1).unwrap();
    sender.at_now().unwrap();
    sender.table("t").unwrap().int_column("x", 2).unwrap();
    sender.at_now().unwrap();

    let received = handle.join().unwrap();
    assert_eq!(received, "t x=1i\nt x=2i\n");
    assert_eq!(sender.current_position(), 0);
}
