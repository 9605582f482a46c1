use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::cli::Args;

/// Default remote geo-IP service (free tier, no key required)
pub const DEFAULT_GEO_API_URL: &str = "http://ip-api.com/json";

/// Default "what is my IP" service for own-address discovery
pub const DEFAULT_PUBLIC_IP_URL: &str = "https://api.ipify.org";

/// Runtime configuration derived from CLI args
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Maximum number of hops to probe
    pub max_hops: u8,
    /// Wall-clock bound for the local probe process
    #[serde(with = "duration_serde")]
    pub probe_timeout: Duration,
    /// Per-lookup bound for the remote geo-IP service
    #[serde(with = "duration_serde")]
    pub geo_api_timeout: Duration,
    /// Bound for the remote path-discovery service
    #[serde(with = "duration_serde")]
    pub trace_api_timeout: Duration,
    /// Bound for own-address discovery
    #[serde(with = "duration_serde")]
    pub public_ip_timeout: Duration,
    /// Enable reverse DNS lookups
    pub dns_enabled: bool,
    /// Explicit GeoLite2 database path (overrides default path discovery)
    pub geoip_db: Option<PathBuf>,
    /// Remote geo-IP service base URL
    pub geo_api_url: String,
    /// Remote path-discovery endpoint; None means no fallback exists
    pub trace_api_url: Option<String>,
    /// Own-address discovery URL
    pub public_ip_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_hops: 30,
            probe_timeout: Duration::from_secs(60),
            geo_api_timeout: Duration::from_secs(2),
            trace_api_timeout: Duration::from_secs(30),
            public_ip_timeout: Duration::from_secs(5),
            dns_enabled: true,
            geoip_db: None,
            geo_api_url: DEFAULT_GEO_API_URL.to_string(),
            trace_api_url: None,
            public_ip_url: DEFAULT_PUBLIC_IP_URL.to_string(),
        }
    }
}

impl From<&Args> for Config {
    fn from(args: &Args) -> Self {
        Self {
            max_hops: args.max_hops,
            dns_enabled: !args.no_dns,
            geoip_db: args.geoip_db.as_ref().map(PathBuf::from),
            trace_api_url: args.trace_api.clone(),
            ..Self::default()
        }
    }
}

/// Serde helper for Duration
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(secs))
    }
}
