use maxminddb::{MaxMindDBError, Reader, geoip2};
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::HashMap;
use std::net::IpAddr;
use std::path::Path;
use std::time::{Duration, Instant};

use crate::state::Location;

/// True for addresses in reserved, non-globally-routable ranges.
///
/// These never carry public geolocation, so the resolver short-circuits
/// before touching the database or the network.
pub fn is_reserved(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_unspecified()
                || is_cgnat(v4)
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                // fc00::/7 unique local
                || (v6.segments()[0] & 0xfe00) == 0xfc00
                // fe80::/10 link local
                || (v6.segments()[0] & 0xffc0) == 0xfe80
        }
    }
}

/// CGNAT range (100.64.0.0/10)
fn is_cgnat(ip: std::net::Ipv4Addr) -> bool {
    let octets = ip.octets();
    octets[0] == 100 && (64..=127).contains(&octets[1])
}

/// Record shape of the remote geo-IP service
#[derive(Debug, Deserialize)]
struct GeoApiRecord {
    #[serde(default = "unknown_name")]
    city: String,
    #[serde(default = "unknown_name")]
    country: String,
    #[serde(default)]
    lat: f64,
    #[serde(default)]
    lon: f64,
}

fn unknown_name() -> String {
    "Unknown".to_string()
}

/// Geo cache entry
struct CacheEntry {
    location: Location,
    cached_at: Instant,
}

/// Resolves an IP address to a location through a tiered fallback chain:
/// reserved-range short-circuit, local GeoLite2 database, remote geo-IP
/// service. Total over the address space; every failure collapses into the
/// unknown sentinel.
pub struct GeoResolver {
    reader: Option<Reader<Vec<u8>>>,
    client: reqwest::Client,
    api_url: String,
    api_timeout: Duration,
    cache: RwLock<HashMap<IpAddr, CacheEntry>>,
    cache_ttl: Duration,
}

impl GeoResolver {
    /// Create a resolver. `db_path` overrides default database discovery;
    /// a missing or unreadable database is recoverable (remote tier takes
    /// over).
    pub fn new(
        db_path: Option<&Path>,
        client: reqwest::Client,
        api_url: String,
        api_timeout: Duration,
    ) -> Self {
        let reader = match db_path {
            Some(path) => match Reader::open_readfile(path) {
                Ok(reader) => Some(reader),
                Err(e) => {
                    tracing::warn!("Failed to open GeoIP database {}: {}", path.display(), e);
                    None
                }
            },
            None => Self::open_default(),
        };

        if reader.is_none() {
            tracing::info!("No local GeoIP database; using remote geo-IP service only");
        }

        Self {
            reader,
            client,
            api_url,
            api_timeout,
            cache: RwLock::new(HashMap::new()),
            cache_ttl: Duration::from_secs(3600), // 1 hour
        }
    }

    /// Try to open a GeoLite2 City database from common default paths
    fn open_default() -> Option<Reader<Vec<u8>>> {
        let paths = [
            dirs::data_dir().map(|d| d.join("hoptrace").join("GeoLite2-City.mmdb")),
            dirs::config_dir().map(|d| d.join("hoptrace").join("GeoLite2-City.mmdb")),
            Some(std::path::PathBuf::from("GeoLite2-City.mmdb")),
            Some(std::path::PathBuf::from("/usr/share/GeoIP/GeoLite2-City.mmdb")),
            Some(std::path::PathBuf::from("/var/lib/GeoIP/GeoLite2-City.mmdb")),
        ];

        for path in paths.into_iter().flatten() {
            if path.exists()
                && let Ok(reader) = Reader::open_readfile(&path)
            {
                tracing::debug!("Using GeoIP database at {}", path.display());
                return Some(reader);
            }
        }

        None
    }

    /// Resolve one IP address to a location. Never fails: errors in any tier
    /// are absorbed and the unknown sentinel is the final fallback.
    pub async fn resolve(&self, ip: IpAddr) -> Location {
        // Private space carries no public geolocation; skip external lookups
        if is_reserved(ip) {
            return Location::UNKNOWN;
        }

        // Check cache first
        {
            let cache = self.cache.read();
            if let Some(entry) = cache.get(&ip)
                && entry.cached_at.elapsed() < self.cache_ttl
            {
                return entry.location.clone();
            }
        }

        let location = self.do_resolve(ip).await;

        // Cache result
        {
            let mut cache = self.cache.write();
            cache.insert(
                ip,
                CacheEntry {
                    location: location.clone(),
                    cached_at: Instant::now(),
                },
            );
        }

        location
    }

    /// Run the database tier, falling through to the remote tier on reader
    /// errors (a clean miss is a final answer, not a reason to go remote).
    async fn do_resolve(&self, ip: IpAddr) -> Location {
        match &self.reader {
            Some(reader) => match reader.lookup::<geoip2::City>(ip) {
                Ok(city) => map_city(&city),
                Err(MaxMindDBError::AddressNotFoundError(_)) => {
                    tracing::debug!("{} not in GeoIP database", ip);
                    Location::UNKNOWN
                }
                Err(e) => {
                    tracing::warn!("GeoIP database lookup failed for {}: {}", ip, e);
                    self.remote_lookup(ip).await
                }
            },
            None => self.remote_lookup(ip).await,
        }
    }

    /// Remote geo-IP tier: single attempt, short timeout
    async fn remote_lookup(&self, ip: IpAddr) -> Location {
        let url = format!("{}/{}", self.api_url.trim_end_matches('/'), ip);

        let response = match self
            .client
            .get(&url)
            .timeout(self.api_timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Remote geo-IP request for {} failed: {}", ip, e);
                return Location::UNKNOWN;
            }
        };

        if !response.status().is_success() {
            tracing::warn!(
                "Remote geo-IP service returned {} for {}",
                response.status(),
                ip
            );
            return Location::UNKNOWN;
        }

        match response.json::<GeoApiRecord>().await {
            Ok(record) => Location {
                city: record.city,
                country: record.country,
                latitude: record.lat,
                longitude: record.lon,
            },
            Err(e) => {
                tracing::warn!("Remote geo-IP response for {} was malformed: {}", ip, e);
                Location::UNKNOWN
            }
        }
    }
}

/// Map a GeoLite2 City record to a Location. Missing names default to
/// "Unknown", missing coordinates to 0.
fn map_city(city: &geoip2::City) -> Location {
    let city_name = city
        .city
        .as_ref()
        .and_then(|c| c.names.as_ref())
        .and_then(|n| n.get("en"))
        .map(|s| s.to_string())
        .unwrap_or_else(unknown_name);

    let country = city
        .country
        .as_ref()
        .and_then(|c| c.names.as_ref())
        .and_then(|n| n.get("en"))
        .map(|s| s.to_string())
        .unwrap_or_else(unknown_name);

    let (latitude, longitude) = city
        .location
        .as_ref()
        .map(|loc| {
            (
                loc.latitude.unwrap_or_default(),
                loc.longitude.unwrap_or_default(),
            )
        })
        .unwrap_or_default();

    Location {
        city: city_name,
        country,
        latitude,
        longitude,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn test_reserved_v4_ranges() {
        for addr in [
            "192.168.1.1",
            "10.0.0.5",
            "172.16.0.1",
            "127.0.0.1",
            "169.254.10.10",
            "100.64.0.1",
            "100.127.255.254",
            "0.0.0.0",
        ] {
            let ip: IpAddr = addr.parse().unwrap();
            assert!(is_reserved(ip), "{} should be reserved", addr);
        }
    }

    #[test]
    fn test_reserved_v6_ranges() {
        for addr in ["::1", "fc00::1", "fd12:3456::1", "fe80::1", "::"] {
            let ip: IpAddr = addr.parse().unwrap();
            assert!(is_reserved(ip), "{} should be reserved", addr);
        }
    }

    #[test]
    fn test_public_addresses_not_reserved() {
        for addr in ["8.8.8.8", "1.1.1.1", "100.128.0.1", "2001:4860:4860::8888"] {
            let ip: IpAddr = addr.parse().unwrap();
            assert!(!is_reserved(ip), "{} should not be reserved", addr);
        }
    }

    #[test]
    fn test_cgnat_bounds() {
        assert!(is_cgnat(Ipv4Addr::new(100, 64, 0, 0)));
        assert!(is_cgnat(Ipv4Addr::new(100, 127, 255, 255)));
        assert!(!is_cgnat(Ipv4Addr::new(100, 63, 255, 255)));
        assert!(!is_cgnat(Ipv4Addr::new(100, 128, 0, 0)));
    }

    #[tokio::test]
    async fn test_reserved_resolves_to_sentinel_without_network() {
        // Point the remote tier at an unroutable URL; a reserved address must
        // short-circuit before any lookup is attempted.
        let resolver = GeoResolver::new(
            Some(Path::new("/nonexistent/GeoLite2-City.mmdb")),
            reqwest::Client::new(),
            "http://127.0.0.1:1/json".to_string(),
            Duration::from_millis(100),
        );

        let location = resolver
            .resolve(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1)))
            .await;
        assert_eq!(location, Location::UNKNOWN);

        let location = resolver
            .resolve(IpAddr::V6(Ipv6Addr::new(0xfc00, 0, 0, 0, 0, 0, 0, 1)))
            .await;
        assert_eq!(location, Location::UNKNOWN);
    }

    #[tokio::test]
    async fn test_resolve_is_total_on_tier_failure() {
        // No database and an unreachable remote service: resolve must still
        // return a Location, not an error.
        let resolver = GeoResolver::new(
            Some(Path::new("/nonexistent/GeoLite2-City.mmdb")),
            reqwest::Client::new(),
            "http://127.0.0.1:1/json".to_string(),
            Duration::from_millis(100),
        );

        let location = resolver
            .resolve(IpAddr::V4(Ipv4Addr::new(203, 0, 113, 7)))
            .await;
        assert_eq!(location, Location::UNKNOWN);
    }

    #[test]
    fn test_geo_api_record_defaults() {
        // Missing fields default to "Unknown" names and 0 coordinates
        let record: GeoApiRecord = serde_json::from_str("{}").unwrap();
        assert_eq!(record.city, "Unknown");
        assert_eq!(record.country, "Unknown");
        assert_eq!(record.lat, 0.0);
        assert_eq!(record.lon, 0.0);

        let record: GeoApiRecord = serde_json::from_str(
            r#"{"city":"Paris","country":"France","lat":48.8566,"lon":2.3522}"#,
        )
        .unwrap();
        assert_eq!(record.city, "Paris");
        assert_eq!(record.lat, 48.8566);
    }
}
