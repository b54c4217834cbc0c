//! Runtime configuration. Defaults mirror the behavior of the hosted service.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BIND: &str = "0.0.0.0:5000";
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(1500);
pub const DEFAULT_CONCURRENCY: usize = 64;
pub const MAX_CONCURRENCY: usize = 1024;
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(4);
pub const DEFAULT_SELF_IP_URL: &str = "https://api64.ipify.org?format=json";
pub const DEFAULT_GEO_URL: &str = "https://ipapi.co";

/// Settings for the port reachability scanner.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Upper bound for a single connect attempt (and name resolution).
    pub connect_timeout: Duration,
    /// Maximum number of ports probed at once within one request.
    pub concurrency: usize,
}

impl ScanConfig {
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.clamp(1, MAX_CONCURRENCY)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// Endpoints used for best-effort IP and geolocation lookups.
#[derive(Debug, Clone)]
pub struct LookupConfig {
    pub self_ip_url: String,
    /// Base URL; the client IP and `/json/` are appended.
    pub geo_base_url: String,
    pub timeout: Duration,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            self_ip_url: DEFAULT_SELF_IP_URL.to_string(),
            geo_base_url: DEFAULT_GEO_URL.to_string(),
            timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    /// Directory holding `index.html` and other static assets.
    pub ui_dir: PathBuf,
    pub scan: ScanConfig,
    pub lookup: LookupConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            ui_dir: PathBuf::from("ui"),
            scan: ScanConfig::default(),
            lookup: LookupConfig::default(),
        }
    }
}
