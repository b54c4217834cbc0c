//! Best-effort public IP and geolocation lookups against external HTTP services.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::config::LookupConfig;
use crate::types::ServerInfo;

pub const UNAVAILABLE: &str = "Unavailable";
pub const UNKNOWN: &str = "Unknown";

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("lookup request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("lookup response missing field `{0}`")]
    MissingField(&'static str),
}

/// Location details for an IP address. Fields the service omits stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GeoInfo {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default, rename = "country_name")]
    pub country: Option<String>,
    #[serde(default)]
    pub org: Option<String>,
}

#[async_trait]
pub trait NetLookup: Send + Sync {
    /// Public IP address of this server as seen from the internet.
    async fn public_ip(&self) -> Result<String, LookupError>;

    async fn geolocate(&self, ip: &str) -> Result<GeoInfo, LookupError>;
}

/// [`NetLookup`] backed by ipify / ipapi style JSON endpoints.
pub struct HttpLookup {
    client: reqwest::Client,
    self_ip_url: String,
    geo_base_url: String,
}

#[derive(Deserialize)]
struct IpResponse {
    ip: Option<String>,
}

impl HttpLookup {
    pub fn new(config: &LookupConfig) -> Result<Self, LookupError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            self_ip_url: config.self_ip_url.clone(),
            geo_base_url: config.geo_base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl NetLookup for HttpLookup {
    async fn public_ip(&self) -> Result<String, LookupError> {
        let resp: IpResponse = self
            .client
            .get(&self.self_ip_url)
            .send()
            .await?
            .json()
            .await?;
        resp.ip.ok_or(LookupError::MissingField("ip"))
    }

    async fn geolocate(&self, ip: &str) -> Result<GeoInfo, LookupError> {
        let url = format!("{}/{}/json/", self.geo_base_url, ip);
        let geo = self.client.get(url).send().await?.json().await?;
        Ok(geo)
    }
}

/// Gather `/server_info` data, substituting placeholders for any failed lookup.
pub async fn server_info(lookup: &dyn NetLookup, client_ip: String) -> ServerInfo {
    let (server_ip, geo) = tokio::join!(lookup.public_ip(), lookup.geolocate(&client_ip));

    let server_ip = server_ip.unwrap_or_else(|e| {
        warn!(error = %e, "public IP lookup failed");
        UNAVAILABLE.to_string()
    });
    let geo = geo.unwrap_or_else(|e| {
        warn!(client_ip = %client_ip, error = %e, "geolocation lookup failed");
        GeoInfo::default()
    });

    let or_unknown = |v: Option<String>| v.unwrap_or_else(|| UNKNOWN.to_string());
    ServerInfo {
        client_ip,
        server_ip,
        city: or_unknown(geo.city),
        country: or_unknown(geo.country),
        org: or_unknown(geo.org),
    }
}
