use anyhow::Result;
use std::io::Write;

use crate::state::TraceReport;

/// Write a trace report as pretty-printed JSON
pub fn export_json<W: Write>(report: &TraceReport, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, report)?;
    writeln!(writer)?;
    Ok(())
}

/// Render a report to a JSON string
#[allow(dead_code)]
pub fn export_json_string(report: &TraceReport) -> String {
    let mut buf = Vec::new();
    export_json(report, &mut buf).unwrap();
    String::from_utf8(buf).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Hop, Location};
    use chrono::Utc;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn test_json_shape() {
        let hops = vec![Hop::new(
            IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1)),
            "one.one.one.one".to_string(),
            3.14159,
            Location {
                city: "Sydney".to_string(),
                country: "Australia".to_string(),
                latitude: -33.8688,
                longitude: 151.2093,
            },
        )];
        let report = TraceReport::from_hops("1.1.1.1", Utc::now(), &hops);

        let json = export_json_string(&report);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["hops"][0]["ip"], "1.1.1.1");
        assert_eq!(value["hops"][0]["rtt"], 3.14);
        assert_eq!(value["hops"][0]["is_private"], false);
        assert_eq!(value["hops"][0]["location"]["city"], "Sydney");
        // No error key on success
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_json_error_shape() {
        let report = TraceReport::from_error("", Utc::now(), "No target specified");
        let json = export_json_string(&report);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["error"], "No target specified");
        assert_eq!(value["hops"].as_array().unwrap().len(), 0);
    }
}
