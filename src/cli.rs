use clap::Parser;

use crate::state::Coordinates;

/// Trace the network path to a host and annotate each hop with an
/// approximate geographic location
#[derive(Parser, Debug, Clone)]
#[command(name = "hoptrace")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Target host to trace (IP address or hostname)
    #[arg(required = true)]
    pub target: String,

    /// Maximum number of hops to probe
    #[arg(short = 'm', long = "max-hops", default_value = "30")]
    pub max_hops: u8,

    /// Latitude of the requesting user (used as fallback for private hops)
    #[arg(long = "lat", requires = "lon", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Longitude of the requesting user (used as fallback for private hops)
    #[arg(long = "lon", requires = "lat", allow_negative_numbers = true)]
    pub lon: Option<f64>,

    /// Path to MaxMind GeoLite2 City database file
    #[arg(long = "geoip-db")]
    pub geoip_db: Option<String>,

    /// Remote path-discovery API endpoint (fallback when no local tool works)
    #[arg(long = "trace-api", env = "HOPTRACE_TRACE_API")]
    pub trace_api: Option<String>,

    /// Output JSON instead of the text report
    #[arg(long = "json")]
    pub json: bool,

    /// Skip reverse DNS lookups
    #[arg(long = "no-dns")]
    pub no_dns: bool,

    /// Enable debug logging
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl Args {
    /// Caller-supplied location, when both coordinates were given
    pub fn user_location(&self) -> Option<Coordinates> {
        match (self.lat, self.lon) {
            (Some(latitude), Some(longitude)) => Some(Coordinates {
                latitude,
                longitude,
            }),
            _ => None,
        }
    }

    /// Validate arguments
    pub fn validate(&self) -> Result<(), String> {
        if self.target.trim().is_empty() {
            return Err("Target cannot be empty".into());
        }

        if self.max_hops == 0 {
            return Err("Max hops must be at least 1".into());
        }

        // Upper bound matches what the platform tools accept
        const MAX_SAFE_HOPS: u8 = 64;
        if self.max_hops > MAX_SAFE_HOPS {
            return Err(format!("Max hops cannot exceed {}", MAX_SAFE_HOPS));
        }

        if let Some(lat) = self.lat
            && !(-90.0..=90.0).contains(&lat)
        {
            return Err(format!("Latitude out of range: {}", lat));
        }

        if let Some(lon) = self.lon
            && !(-180.0..=180.0).contains(&lon)
        {
            return Err(format!("Longitude out of range: {}", lon));
        }

        Ok(())
    }
}
