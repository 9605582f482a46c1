use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Geographic position of a hop.
///
/// The all-empty value with `(0, 0)` coordinates is the reserved "unknown"
/// sentinel: it means no geolocation was resolved, never a real position in
/// the Gulf of Guinea. The reconciler relies on this convention to detect
/// unresolved hops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    /// The "no geolocation resolved" sentinel.
    pub const UNKNOWN: Location = Location {
        city: String::new(),
        country: String::new(),
        latitude: 0.0,
        longitude: 0.0,
    };

    /// True when the coordinate pair is the reserved `(0, 0)` marker.
    ///
    /// Keyed off coordinates alone: a database record that carried names but
    /// no coordinates still needs fallback substitution.
    pub fn is_unmapped(&self) -> bool {
        self.latitude == 0.0 && self.longitude == 0.0
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

/// Caller-supplied position attached to a trace request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// One entry in the discovered path.
///
/// `is_private` is false at construction and set only by the reconciler,
/// after the full hop list exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hop {
    pub ip: IpAddr,
    pub hostname: String,
    /// Round-trip latency in milliseconds; `0.0` when the probing source
    /// reported no timing.
    pub rtt_ms: f64,
    pub location: Location,
    pub is_private: bool,
}

impl Hop {
    pub fn new(ip: IpAddr, hostname: String, rtt_ms: f64, location: Location) -> Self {
        Self {
            ip,
            hostname,
            rtt_ms,
            location,
            is_private: false,
        }
    }
}

/// Inbound trace request shape.
#[derive(Debug, Clone, Deserialize)]
pub struct TraceRequest {
    pub target: String,
    pub user_location: Option<Coordinates>,
}

impl TraceRequest {
    pub fn new(target: impl Into<String>, user_location: Option<Coordinates>) -> Self {
        Self {
            target: target.into(),
            user_location,
        }
    }
}

/// One hop in the outbound response shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HopRecord {
    pub ip: String,
    pub hostname: String,
    pub rtt: f64,
    pub location: Location,
    pub is_private: bool,
}

impl From<&Hop> for HopRecord {
    fn from(hop: &Hop) -> Self {
        Self {
            ip: hop.ip.to_string(),
            hostname: hop.hostname.clone(),
            rtt: round2(hop.rtt_ms),
            location: hop.location.clone(),
            is_private: hop.is_private,
        }
    }
}

/// Result of one trace request, owned exclusively by its caller.
#[derive(Debug, Clone, Serialize)]
pub struct TraceReport {
    pub target: String,
    pub started_at: DateTime<Utc>,
    pub hops: Vec<HopRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TraceReport {
    pub fn from_hops(target: &str, started_at: DateTime<Utc>, hops: &[Hop]) -> Self {
        Self {
            target: target.to_string(),
            started_at,
            hops: hops.iter().map(HopRecord::from).collect(),
            error: None,
        }
    }

    pub fn from_error(
        target: &str,
        started_at: DateTime<Utc>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            target: target.to_string(),
            started_at,
            hops: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Round to two decimals for the output shape.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
