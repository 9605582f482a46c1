//! Parsing of raw probe-tool output into candidate hops.
//!
//! Each platform tool speaks its own textual dialect. The dialect is bound
//! once when the tool is selected; parsing never re-branches per line.

use regex::Regex;
use std::net::IpAddr;
use std::sync::OnceLock;

/// Output dialect of a path-discovery tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Windows `tracert`: banner lines, whitespace columns, address last
    WindowsTracert,
    /// Unix `traceroute -n`: hop index, address, timing annotations
    Traceroute,
    /// `tracepath`: `<index>: <address> <annotations>` single-line form
    Tracepath,
}

/// One accepted line of probe output
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedHop {
    /// Hop distance as printed by the tool, when the dialect carries one
    pub index: Option<u32>,
    pub ip: IpAddr,
    /// First timing annotation on the line; `0.0` when none was printed
    pub rtt_ms: f64,
}

/// True iff `text` parses as a valid IPv4 dotted-quad or IPv6 literal.
/// Rejects hostnames, partial addresses and garbage tokens.
pub fn is_valid_address(text: &str) -> bool {
    text.parse::<IpAddr>().is_ok()
}

fn numbered_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(\d+)\s+([0-9A-Fa-f.:]+)(.*)$").unwrap())
}

fn tracepath_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(\d+):\s+([0-9A-Fa-f.:]+)(\s+.*)?$").unwrap())
}

fn rtt_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([0-9]+(?:\.[0-9]+)?)\s*ms").unwrap())
}

/// Parse raw tool output into an ordered hop-candidate list.
///
/// Order is preserved and duplicates are allowed (one entry per accepted
/// line). Unrecognized or garbled lines are skipped, never an error: partial
/// probe output is common and must not abort the trace.
pub fn parse(raw: &str, dialect: Dialect) -> Vec<ParsedHop> {
    let hops = match dialect {
        Dialect::WindowsTracert => parse_windows(raw),
        Dialect::Traceroute => parse_numbered(raw),
        Dialect::Tracepath => parse_tracepath(raw),
    };
    tracing::debug!("Parsed {} hop candidates ({:?} dialect)", hops.len(), dialect);
    hops
}

fn parse_windows(raw: &str) -> Vec<ParsedHop> {
    let mut hops = Vec::new();

    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty()
            || trimmed.contains("Request timed out")
            || trimmed.starts_with("Tracing")
            || trimmed.starts_with("over a maximum")
            || trimmed.starts_with("Trace complete")
        {
            continue;
        }

        let parts: Vec<&str> = trimmed.split_whitespace().collect();
        if parts.len() < 2 {
            continue;
        }

        // Address is the last column; everything before it is index + timings
        let candidate = parts[parts.len() - 1];
        let Ok(ip) = candidate.parse::<IpAddr>() else {
            tracing::debug!("Skipping line without address candidate: {}", trimmed);
            continue;
        };

        hops.push(ParsedHop {
            index: parts[0].parse().ok(),
            ip,
            rtt_ms: extract_rtt(trimmed),
        });
    }

    hops
}

fn parse_numbered(raw: &str) -> Vec<ParsedHop> {
    let mut hops = Vec::new();

    for line in raw.lines() {
        let Some(caps) = numbered_re().captures(line) else {
            continue;
        };
        let Ok(ip) = caps[2].parse::<IpAddr>() else {
            tracing::debug!("Skipping line with invalid address token: {}", line.trim());
            continue;
        };

        hops.push(ParsedHop {
            index: caps[1].parse().ok(),
            ip,
            rtt_ms: caps.get(3).map(|m| extract_rtt(m.as_str())).unwrap_or(0.0),
        });
    }

    hops
}

fn parse_tracepath(raw: &str) -> Vec<ParsedHop> {
    let mut hops = Vec::new();

    for line in raw.lines() {
        // Lines like "1?: [LOCALHOST]  pmtu 1500" fail the address match
        let Some(caps) = tracepath_re().captures(line) else {
            continue;
        };
        let Ok(ip) = caps[2].parse::<IpAddr>() else {
            tracing::debug!("Skipping line with invalid address token: {}", line.trim());
            continue;
        };

        hops.push(ParsedHop {
            index: caps[1].parse().ok(),
            ip,
            rtt_ms: caps.get(3).map(|m| extract_rtt(m.as_str())).unwrap_or(0.0),
        });
    }

    hops
}

/// First `<value> ms` / `<value>ms` annotation on the line, else 0
fn extract_rtt(text: &str) -> f64 {
    rtt_re()
        .captures(text)
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(0.0)
}
