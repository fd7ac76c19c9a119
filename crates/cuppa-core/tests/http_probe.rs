#![cfg(feature = "http")]

use cuppa_core::{Error, HttpProbe, ItemSource, Probe};
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::num::NonZeroUsize;
use std::thread;

// Answers `responses.len()` requests with the given status codes, then stops.
fn serve(responses: Vec<u16>) -> (String, thread::JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let handle = thread::spawn(move || {
        let mut paths = Vec::new();
        for status in responses {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            paths.push(request_line.split_whitespace().nth(1).unwrap_or("").to_string());
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                    break;
                }
            }
            let mut stream = stream;
            write!(
                stream,
                "HTTP/1.1 {} X\r\nContent-Type: image/jpeg\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                status
            )
            .unwrap();
            stream.flush().unwrap();
        }
        paths
    });
    (base, handle)
}

#[test]
fn probe_ok_and_status_failure() {
    let (base, server) = serve(vec![200, 500]);
    let probe = HttpProbe::default();
    probe.probe(&format!("{base}/random?t=1")).expect("200 is reachable");
    let err = probe.probe(&format!("{base}/random?t=2")).unwrap_err();
    assert!(err.to_string().contains("500"));
    let paths = server.join().unwrap();
    assert_eq!(paths, ["/random?t=1", "/random?t=2"]);
}

#[test]
fn batch_against_local_server_uses_cache_busters() {
    let (base, server) = serve(vec![200, 200, 200]);
    let src = ItemSource::new(base.clone(), HttpProbe::default());
    let batch = src.fetch_batch(NonZeroUsize::new(3).unwrap()).unwrap();
    assert_eq!(batch.len(), 3);
    let paths = server.join().unwrap();
    for (item, path) in batch.iter().zip(&paths) {
        assert_eq!(item.source_url, format!("{base}{path}"));
        assert!(path.starts_with("/random?t="));
    }
    let mut unique = paths.clone();
    unique.dedup();
    assert_eq!(unique.len(), 3);
}

#[test]
fn closed_port_fails_the_batch() {
    let port = {
        let l = TcpListener::bind("127.0.0.1:0").unwrap();
        l.local_addr().unwrap().port()
    };
    let src = ItemSource::new(format!("http://127.0.0.1:{port}"), HttpProbe::default());
    let err = src.fetch_batch(NonZeroUsize::new(2).unwrap()).unwrap_err();
    assert!(matches!(err, Error::Unreachable { index: 1, count: 2, .. }));
}
