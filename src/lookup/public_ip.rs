//! Own-address discovery.
//!
//! The serving process resolves its own public address so that private hops
//! can be relocated near the server when the caller supplies no position.

use std::net::IpAddr;
use std::time::Duration;

use crate::lookup::geo::GeoResolver;
use crate::state::Location;

/// Discover this process's public IP via a "what is my IP" service.
///
/// The service answers with a bare address in the response body. Any failure
/// (network, non-200, unparseable body) yields None.
pub async fn discover_public_ip(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Option<IpAddr> {
    let response = match client.get(url).timeout(timeout).send().await {
        Ok(response) if response.status().is_success() => response,
        Ok(response) => {
            tracing::warn!("Public IP service returned {}", response.status());
            return None;
        }
        Err(e) => {
            tracing::warn!("Public IP discovery failed: {}", e);
            return None;
        }
    };

    let body = response.text().await.ok()?;
    match body.trim().parse::<IpAddr>() {
        Ok(ip) => Some(ip),
        Err(_) => {
            tracing::warn!("Public IP service returned a non-address body");
            None
        }
    }
}

/// Resolve the server's own location for use as the fallback position of
/// private hops. Collapses to the unknown sentinel when discovery or
/// resolution fails.
pub async fn server_fallback_location(
    client: &reqwest::Client,
    geo: &GeoResolver,
    url: &str,
    timeout: Duration,
) -> Location {
    match discover_public_ip(client, url, timeout).await {
        Some(ip) => geo.resolve(ip).await,
        None => Location::UNKNOWN,
    }
}
