//! End-to-end reader tests against a throwaway TCP server.

use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

use camstream_client::{ClientError, FrameReader, ReconnectPolicy, Source};
use camstream_core::mjpeg::{part_header, PART_TRAILER, STREAM_RESPONSE_HEAD};
use pretty_assertions::assert_eq;

fn jpeg(tag: u8) -> Vec<u8> {
    vec![0xFF, 0xD8, tag, tag, tag, 0xFF, 0xD9]
}

/// Consume the request head so the client sees a clean response.
fn read_request(stream: &TcpStream) {
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    while reader.read_line(&mut line).unwrap_or(0) > 0 {
        if line == "\r\n" || line == "\n" {
            break;
        }
        line.clear();
    }
}

/// Serve one connection with `respond`, then close it.
fn serve_once<F>(respond: F) -> SocketAddr
where
    F: FnOnce(&mut TcpStream) + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            read_request(&stream);
            respond(&mut stream);
        }
    });
    addr
}

#[test]
fn test_stream_frames_then_end() {
    let addr = serve_once(|stream| {
        stream.write_all(STREAM_RESPONSE_HEAD.as_bytes()).unwrap();
        for tag in 1..=3 {
            let body = jpeg(tag);
            stream.write_all(part_header(body.len()).as_bytes()).unwrap();
            stream.write_all(&body).unwrap();
            stream.write_all(PART_TRAILER).unwrap();
        }
    });

    let source = Source::parse(&format!("http://{addr}")).unwrap();
    assert!(!source.is_polling());
    let results: Vec<_> = FrameReader::new(source, ReconnectPolicy::disabled()).collect();

    assert_eq!(results.len(), 4);
    for (i, result) in results[..3].iter().enumerate() {
        let frame = result.as_ref().expect("frame");
        assert_eq!(frame.data, jpeg(i as u8 + 1));
    }
    assert!(matches!(results[3], Err(ClientError::StreamEnded)));
}

#[test]
fn test_snapshot_polling() {
    let addr = serve_once(|stream| {
        let body = jpeg(9);
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        stream.write_all(head.as_bytes()).unwrap();
        stream.write_all(&body).unwrap();
    });

    let source = Source::parse(&format!("http://{addr}/cam-lo.jpg")).unwrap();
    assert!(source.is_polling());
    let mut reader = FrameReader::new(source, ReconnectPolicy::disabled());

    assert_eq!(reader.next().unwrap().unwrap().data, jpeg(9));
    // The server is gone; the error is reported once and iteration stops.
    assert!(reader.next().unwrap().is_err());
    assert!(reader.next().is_none());
}

#[test]
fn test_gives_up_after_max_attempts() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let policy = ReconnectPolicy {
        delay: Duration::from_millis(10),
        max_attempts: Some(2),
        ..ReconnectPolicy::default()
    };
    let source = Source::parse(&format!("http://{addr}/stream")).unwrap();
    let results: Vec<_> = FrameReader::new(source, policy).collect();

    assert_eq!(results.len(), 1);
    assert!(matches!(results[0], Err(ClientError::Http(_))));
}

#[test]
fn test_deadline_stops_reconnect_wait() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let policy = ReconnectPolicy {
        delay: Duration::from_millis(50),
        ..ReconnectPolicy::default()
    };
    let source = Source::parse(&format!("http://{addr}/stream")).unwrap();
    let started = Instant::now();
    let results: Vec<_> = FrameReader::new(source, policy)
        .until(started + Duration::from_millis(300))
        .collect();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(results.len(), 1);
    assert!(matches!(results[0], Err(ClientError::Http(_))));
}
