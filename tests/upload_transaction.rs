// End-to-end upload attempts against a mock collection server on loopback.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use motionlink::config::{Endpoint, ResponseMode, Timeouts, UploadConfig};
use motionlink::http;
use motionlink::{upload, FailureReason, SensorSample, UploadOutcome, Uploader, Uplink};

fn walking() -> SensorSample {
    SensorSample {
        ax: 1.0,
        ay: -2.5,
        az: 9.8,
        gx: 0.1,
        gy: 0.0,
        gz: -0.3,
        label: "walking".into(),
    }
}

fn local_port(listener: &TcpListener) -> u16 {
    match listener.local_addr().unwrap() {
        SocketAddr::V4(v4) => v4.port(),
        SocketAddr::V6(v6) => v6.port(),
    }
}

/// Read one request: head plus `Content-Length` body bytes.
fn read_request(stream: &mut TcpStream) -> Vec<u8> {
    let mut request = Vec::new();
    let mut chunk = [0u8; 256];
    loop {
        if let Some(end) = http::header_end(&request) {
            let len = http::content_length(&request[..end]).unwrap_or(0);
            if request.len() >= end + len {
                return request;
            }
        }
        let n = stream.read(&mut chunk).unwrap();
        if n == 0 {
            return request;
        }
        request.extend_from_slice(&chunk[..n]);
    }
}

/// Serve exactly one connection, answer with `reply`, hand back the request.
fn serve_once(reply: &'static [u8]) -> (u16, JoinHandle<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = local_port(&listener);
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        let request = read_request(&mut stream);
        stream.write_all(reply).unwrap();
        request
    });
    (port, handle)
}

#[test]
fn test_delivered_against_mock_server() {
    let (port, server) = serve_once(b"HTTP/1.1 200 OK\r\nContent-Length: 7\r\n\r\nSUCCESS");
    let endpoint = Endpoint::new("127.0.0.1", port, "/api/data");

    let outcome = upload(walking(), &endpoint);
    assert_eq!(outcome, UploadOutcome::Delivered { status: 200 });

    let request = server.join().unwrap();
    let end = http::header_end(&request).unwrap();
    let head = std::str::from_utf8(&request[..end]).unwrap();
    let body = &request[end..];

    assert!(head.starts_with("POST /api/data HTTP/1.1\r\n"));
    assert!(head.contains(&format!("Host: 127.0.0.1:{}\r\n", port)));
    assert!(head.contains("Connection: close\r\n"));
    assert_eq!(http::content_length(&request[..end]), Some(body.len()));
    assert_eq!(
        body,
        br#"{"ax":1.0,"ay":-2.5,"az":9.8,"gx":0.1,"gy":0.0,"gz":-0.3,"label":"walking"}"#
    );
}

#[test]
fn test_server_error_is_non_2xx() {
    let (port, server) = serve_once(b"HTTP/1.1 500 Internal Server Error\r\n\r\n");
    let outcome = upload(walking(), &Endpoint::new("127.0.0.1", port, "/api/data"));
    server.join().unwrap();

    match outcome {
        UploadOutcome::DeliveredNon2xx { status, .. } => assert_eq!(status, Some(500)),
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[test]
fn test_legacy_mode_against_mock_server() {
    let (port, server) = serve_once(b"HTTP/1.1 200 OK\r\n\r\nOK");
    let mut cfg = UploadConfig::new(Endpoint::new("127.0.0.1", port, "/api/data"));
    cfg.response_mode = ResponseMode::Legacy;
    cfg.timeouts = Timeouts::blocking();

    let outcome = Uploader::new(cfg).upload(walking());
    server.join().unwrap();
    assert!(outcome.is_delivered());
}

#[test]
fn test_connect_failed_when_nobody_listens() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        local_port(&listener)
    };
    let outcome = upload(walking(), &Endpoint::new("127.0.0.1", port, "/api/data"));
    assert_eq!(outcome, UploadOutcome::Failed(FailureReason::ConnectFailed));
}

#[test]
fn test_no_response_when_server_hangs_up() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = local_port(&listener);
    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        read_request(&mut stream);
        // Dropping the stream closes without a reply.
    });

    let outcome = upload(walking(), &Endpoint::new("127.0.0.1", port, "/api/data"));
    server.join().unwrap();
    assert_eq!(outcome, UploadOutcome::Failed(FailureReason::NoResponse));
}

#[test]
fn test_read_timeout_is_no_response() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = local_port(&listener);
    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        read_request(&mut stream);
        // Hold the connection open past the client's read timeout.
        thread::sleep(Duration::from_millis(600));
    });

    let mut cfg = UploadConfig::new(Endpoint::new("127.0.0.1", port, "/api/data"));
    cfg.timeouts.read = Some(Duration::from_millis(200));

    let outcome = Uploader::new(cfg).upload(walking());
    server.join().unwrap();
    assert_eq!(outcome, UploadOutcome::Failed(FailureReason::NoResponse));
}

#[test]
fn test_unresolvable_host_is_dns_failure() {
    let outcome = upload(walking(), &Endpoint::new("collector.invalid", 80, "/api/data"));
    assert_eq!(outcome, UploadOutcome::Failed(FailureReason::DnsResolutionFailed));
}

#[test]
fn test_zero_read_timeout_is_connect_failed() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = local_port(&listener);
    let mut cfg = UploadConfig::new(Endpoint::new("127.0.0.1", port, "/api/data"));
    cfg.timeouts.read = Some(Duration::ZERO);

    let outcome = Uploader::new(cfg).upload(walking());
    assert_eq!(outcome, UploadOutcome::Failed(FailureReason::ConnectFailed));
}
