//! Remote path-discovery fallback.
//!
//! When no local tool can produce a trace, a remote service runs the probe
//! and answers with hops carrying their locations inline, so no separate geo
//! resolution is needed.

use serde::Deserialize;
use std::time::Duration;

use crate::state::Location;

/// Response shape of the remote path-discovery service
#[derive(Debug, Deserialize)]
pub struct RemoteTraceResponse {
    pub hops: Vec<RemoteHop>,
}

/// One hop as reported by the remote service, location inline
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteHop {
    pub ip: String,
    #[serde(default = "unknown_name")]
    pub city: String,
    #[serde(default = "unknown_name")]
    pub country: String,
    #[serde(default)]
    pub lat: f64,
    #[serde(default)]
    pub lon: f64,
}

fn unknown_name() -> String {
    "Unknown".to_string()
}

impl RemoteHop {
    pub fn location(&self) -> Location {
        Location {
            city: self.city.clone(),
            country: self.country.clone(),
            latitude: self.lat,
            longitude: self.lon,
        }
    }
}

/// Client for the remote path-discovery service
pub struct RemoteTraceClient {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl RemoteTraceClient {
    pub fn new(client: reqwest::Client, endpoint: String, timeout: Duration) -> Self {
        Self {
            client,
            endpoint,
            timeout,
        }
    }

    /// Run one remote trace. Single attempt, bounded timeout.
    pub async fn fetch(&self, target: &str) -> Result<Vec<RemoteHop>, reqwest::Error> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("target", target)])
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?;

        let parsed: RemoteTraceResponse = response.json().await?;
        tracing::debug!(
            "Remote path-discovery returned {} hops for {}",
            parsed.hops.len(),
            target
        );
        Ok(parsed.hops)
    }
}
