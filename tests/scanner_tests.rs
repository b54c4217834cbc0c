use std::collections::BTreeSet;
use std::time::Duration;

use net_diag_rs::config::ScanConfig;
use net_diag_rs::scanner::{probe_port, scan};
use net_diag_rs::types::{PortResult, ScanRequest};
use tokio::net::TcpListener;

const TIMEOUT: Duration = Duration::from_millis(500);

fn cfg(concurrency: usize) -> ScanConfig {
    ScanConfig {
        connect_timeout: TIMEOUT,
        concurrency,
    }
}

async fn listening() -> (TcpListener, i64) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("addr").port();
    (listener, port.into())
}

/// A loopback port with nothing listening on it.
async fn free_port() -> i64 {
    let (listener, port) = listening().await;
    drop(listener);
    port
}

#[tokio::test]
async fn probe_open_and_closed() {
    let (_listener, open) = listening().await;
    let closed = free_port().await;

    assert_eq!(probe_port("127.0.0.1", open, TIMEOUT).await, PortResult::Open);
    assert_eq!(probe_port("127.0.0.1", closed, TIMEOUT).await, PortResult::Closed);
}

#[tokio::test]
async fn unresolvable_host_is_error() {
    let outcome = probe_port("no-such-host.invalid", 80, TIMEOUT).await;
    assert!(matches!(outcome, PortResult::Error(_)), "got {outcome:?}");
}

#[tokio::test]
async fn every_distinct_port_is_reported() {
    let (_listener, open) = listening().await;
    let closed = free_port().await;
    let ports = vec![closed, open, 70000, open, -5, closed];
    let req = ScanRequest::new("127.0.0.1", ports.clone()).unwrap();

    let res = scan(&req, &cfg(2)).await;

    let expected: BTreeSet<i64> = ports.iter().copied().collect();
    let got: BTreeSet<i64> = res.ports().into_iter().collect();
    assert_eq!(got, expected);
    assert_eq!(res.ports(), vec![closed, open, 70000, -5]);
    assert_eq!(res.get(open), Some(&PortResult::Open));
    assert_eq!(res.get(closed), Some(&PortResult::Closed));
    assert!(matches!(res.get(70000), Some(PortResult::Error(_))));
    assert!(matches!(res.get(-5), Some(PortResult::Error(_))));
}

#[tokio::test]
async fn repeated_scans_are_stable() {
    let (_listener, open) = listening().await;
    let closed = free_port().await;
    let req = ScanRequest::new("127.0.0.1", vec![open, closed]).unwrap();

    let first = scan(&req, &cfg(8)).await;
    let second = scan(&req, &cfg(1)).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn error_on_one_host_does_not_short_circuit() {
    let req = ScanRequest::new("no-such-host.invalid", vec![22, 80, 443]).unwrap();
    let res = scan(&req, &cfg(3)).await;
    assert_eq!(res.len(), 3);
    assert!(res.iter().all(|(_, r)| matches!(r, PortResult::Error(_))));
}
