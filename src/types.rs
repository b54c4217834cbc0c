use std::collections::HashMap;
use std::fmt;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::error::Error;

/// A validated request to probe a set of ports on one host.
///
/// Ports are kept as plain integers: duplicates are allowed and values outside
/// the TCP port range are passed through, the prober reports them per port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    pub host: String,
    pub ports: Vec<i64>,
}

impl ScanRequest {
    /// Build a request, rejecting a blank host or an empty port list.
    pub fn new(host: impl AsRef<str>, ports: Vec<i64>) -> Result<Self, Error> {
        let host = host.as_ref().trim();
        if host.is_empty() {
            return Err(Error::NoHost);
        }
        if ports.is_empty() {
            return Err(Error::NoValidPorts);
        }
        Ok(Self {
            host: host.to_string(),
            ports,
        })
    }
}

/// Outcome of a single TCP connect probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortResult {
    Open,
    Closed,
    Error(String),
}

impl PortResult {
    pub fn is_open(&self) -> bool {
        matches!(self, PortResult::Open)
    }
}

impl fmt::Display for PortResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortResult::Open => f.write_str("open"),
            PortResult::Closed => f.write_str("closed"),
            PortResult::Error(msg) => write!(f, "error: {msg}"),
        }
    }
}

impl Serialize for PortResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Aggregated scan outcome, keyed by port number in first-seen order.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub host: String,
    #[serde(serialize_with = "serialize_results")]
    results: Vec<(i64, PortResult)>,
    /// Position of each port in `results`.
    #[serde(skip)]
    index: HashMap<i64, usize>,
}

impl ScanResult {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            results: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Record an outcome. A port seen before keeps its position and takes the new value.
    pub fn record(&mut self, port: i64, outcome: PortResult) {
        match self.index.get(&port) {
            Some(&pos) => self.results[pos].1 = outcome,
            None => {
                self.index.insert(port, self.results.len());
                self.results.push((port, outcome));
            }
        }
    }

    pub fn get(&self, port: i64) -> Option<&PortResult> {
        self.index.get(&port).map(|&pos| &self.results[pos].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, &PortResult)> {
        self.results.iter().map(|(p, r)| (*p, r))
    }

    pub fn ports(&self) -> Vec<i64> {
        self.results.iter().map(|(p, _)| *p).collect()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn open_count(&self) -> usize {
        self.results.iter().filter(|(_, r)| r.is_open()).count()
    }
}

fn serialize_results<S: Serializer>(
    results: &[(i64, PortResult)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(results.len()))?;
    for (port, outcome) in results {
        map.serialize_entry(&port.to_string(), outcome)?;
    }
    map.end()
}

/// Body of a successful `/port_scan` response.
#[derive(Serialize, Debug)]
pub struct PortScanResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub scan: ScanResult,
}

/// Client and server addressing details for `/server_info`.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub client_ip: String,
    pub server_ip: String,
    pub city: String,
    pub country: String,
    pub org: String,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct PingResponse {
    pub ok: bool,
    pub ts: f64,
}
