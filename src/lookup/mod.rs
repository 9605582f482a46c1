pub mod geo;
pub mod public_ip;
pub mod rdns;

pub use geo::{GeoResolver, is_reserved};
pub use public_ip::server_fallback_location;
pub use rdns::DnsLookup;
