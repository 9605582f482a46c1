use std::io::Write;

use crate::state::TraceReport;

/// Generate a text report of the discovered path
pub fn generate_report<W: Write>(report: &TraceReport, mut writer: W) -> std::io::Result<()> {
    writeln!(writer, "hoptrace report for {}", report.target)?;
    writeln!(
        writer,
        "Started: {}",
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    )?;
    writeln!(writer)?;

    if let Some(ref error) = report.error {
        writeln!(writer, "Error: {}", error)?;
        return Ok(());
    }

    if report.hops.is_empty() {
        writeln!(writer, "No hops discovered.")?;
        return Ok(());
    }

    // Header
    writeln!(
        writer,
        "{:>3}  {:<44} {:>9}  {:<28} {:>7}",
        "#", "Host", "RTT", "Location", "Private"
    )?;
    writeln!(writer, "{}", "-".repeat(98))?;

    for (i, hop) in report.hops.iter().enumerate() {
        let host = if hop.hostname == hop.ip {
            hop.ip.clone()
        } else {
            format!("{} ({})", hop.hostname, hop.ip)
        };

        let rtt = if hop.rtt > 0.0 {
            format!("{:.2}ms", hop.rtt)
        } else {
            "-".to_string()
        };

        let location = if hop.location.city.is_empty() && hop.location.country.is_empty() {
            format!("{:.4}, {:.4}", hop.location.latitude, hop.location.longitude)
        } else {
            format!("{}, {}", hop.location.city, hop.location.country)
        };

        writeln!(
            writer,
            "{:>3}  {:<44} {:>9}  {:<28} {:>7}",
            i + 1,
            host,
            rtt,
            location,
            if hop.is_private { "yes" } else { "" }
        )?;
    }

    Ok(())
}

/// Generate report to string
#[allow(dead_code)]
pub fn generate_report_string(report: &TraceReport) -> String {
    let mut buf = Vec::new();
    generate_report(report, &mut buf).unwrap();
    String::from_utf8(buf).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Hop, HopRecord, Location};
    use chrono::Utc;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn test_report_lists_hops_in_order() {
        let hops = vec![
            Hop::new(
                IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1)),
                "192.168.1.1".to_string(),
                0.46,
                Location::UNKNOWN,
            ),
            Hop::new(
                IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)),
                "dns.google".to_string(),
                12.3,
                Location {
                    city: "Mountain View".to_string(),
                    country: "United States".to_string(),
                    latitude: 37.386,
                    longitude: -122.0838,
                },
            ),
        ];
        let report = TraceReport::from_hops("8.8.8.8", Utc::now(), &hops);

        let text = generate_report_string(&report);
        let first = text.find("192.168.1.1").unwrap();
        let second = text.find("dns.google").unwrap();
        assert!(first < second);
        assert!(text.contains("12.30ms"));
    }

    #[test]
    fn test_report_shows_error() {
        let report = TraceReport::from_error("", Utc::now(), "No target specified");
        let text = generate_report_string(&report);
        assert!(text.contains("Error: No target specified"));
    }

    #[test]
    fn test_report_handles_empty_trace() {
        let report = TraceReport {
            target: "8.8.8.8".to_string(),
            started_at: Utc::now(),
            hops: Vec::<HopRecord>::new(),
            error: None,
        };
        let text = generate_report_string(&report);
        assert!(text.contains("No hops discovered."));
    }
}
