use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{lookup_host, TcpStream};
use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};
use tokio::time;
use tracing::{debug, info, warn};

use crate::config::ScanConfig;
use crate::types::{PortResult, ScanRequest, ScanResult};

/// Probe a single `host:port` with one TCP connect attempt.
///
/// - Port outside `0..=65535` or failed name resolution: `Error`.
/// - Connected within `timeout`: `Open`.
/// - Refused, timed out or any other connect failure: `Closed`.
///
/// The stream is dropped before returning on every path.
pub async fn probe_port(host: &str, port: i64, timeout: Duration) -> PortResult {
    let Ok(port) = u16::try_from(port) else {
        return PortResult::Error("port must be 0-65535".to_string());
    };

    let addr = match resolve(host, port, timeout).await {
        Ok(addr) => addr,
        Err(msg) => return PortResult::Error(msg),
    };

    match time::timeout(timeout, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => {
            drop(stream);
            PortResult::Open
        }
        Ok(Err(e)) => {
            debug!(%addr, error = %e, "connect failed");
            PortResult::Closed
        }
        Err(_) => {
            debug!(%addr, "connect timed out");
            PortResult::Closed
        }
    }
}

/// Resolve `host:port`, preferring IPv4 and falling back to any address family.
async fn resolve(host: &str, port: u16, timeout: Duration) -> Result<SocketAddr, String> {
    let addrs: Vec<SocketAddr> = match time::timeout(timeout, lookup_host((host, port))).await {
        Ok(Ok(it)) => it.collect(),
        Ok(Err(e)) => return Err(e.to_string()),
        Err(_) => return Err(format!("name resolution timed out for {host}")),
    };
    addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| format!("no addresses found for {host}"))
}

/// Probe every port of `request` and collect the outcomes.
///
/// - Limits concurrent connects using a `Semaphore`.
/// - Each probe runs in its own task; one failing task never aborts the others.
/// - Results are assembled in input order, so a repeated port reports its last probe.
pub async fn scan(request: &ScanRequest, config: &ScanConfig) -> ScanResult {
    let host: Arc<str> = Arc::from(request.host.as_str());
    let timeout = config.connect_timeout;

    info!(host = %request.host, ports = request.ports.len(), "starting port scan");

    let result = scan_with(request, config.effective_concurrency(), move |port| {
        let host = host.clone();
        async move { probe_port(&host, port, timeout).await }
    })
    .await;

    info!(
        host = %request.host,
        probed = request.ports.len(),
        open = result.open_count(),
        "port scan finished"
    );
    result
}

/// Fan `probe` out over the request's ports and fan the outcomes back in by input index.
async fn scan_with<F, Fut>(request: &ScanRequest, concurrency: usize, probe: F) -> ScanResult
where
    F: Fn(i64) -> Fut,
    Fut: Future<Output = PortResult> + Send + 'static,
{
    let ports = &request.ports;
    let sem = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut set = JoinSet::new();
    let mut task_slots: HashMap<task::Id, usize> = HashMap::with_capacity(ports.len());

    for (idx, &port) in ports.iter().enumerate() {
        // The semaphore is never closed; a missing permit only loosens the bound.
        let permit = sem.clone().acquire_owned().await.ok();
        let fut = probe(port);
        let handle = set.spawn(async move {
            let _permit = permit;
            fut.await
        });
        task_slots.insert(handle.id(), idx);
    }

    let mut slots: Vec<Option<PortResult>> = vec![None; ports.len()];
    while let Some(joined) = set.join_next_with_id().await {
        let (id, outcome) = match joined {
            Ok((id, outcome)) => (id, outcome),
            Err(e) => {
                warn!(error = %e, "probe task failed");
                (e.id(), PortResult::Error(format!("probe task failed: {e}")))
            }
        };
        if let Some(&idx) = task_slots.get(&id) {
            slots[idx] = Some(outcome);
        }
    }

    let mut result = ScanResult::new(request.host.clone());
    for (&port, slot) in ports.iter().zip(slots) {
        let outcome = slot
            .unwrap_or_else(|| PortResult::Error("probe task failed: no outcome".to_string()));
        result.record(port, outcome);
    }
    result
}
