//! Integration tests for the probe→parse→resolve→reconcile pipeline
//!
//! These tests verify the data flow with stubbed probe tools and a loopback
//! HTTP listener, without requiring external network access.

use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use hoptrace::config::Config;
use hoptrace::lookup::GeoResolver;
use hoptrace::probe::{Dialect, PathProber, ProbeError, ProbeTool};
use hoptrace::state::{Coordinates, Location};
use hoptrace::trace::reconcile;

/// GeoResolver with no database and an unreachable remote tier: public
/// addresses resolve to the sentinel immediately, private ones short-circuit.
fn offline_geo() -> Arc<GeoResolver> {
    Arc::new(GeoResolver::new(
        Some(Path::new("/nonexistent/GeoLite2-City.mmdb")),
        reqwest::Client::new(),
        "http://127.0.0.1:1/json".to_string(),
        Duration::from_millis(100),
    ))
}

fn test_prober(trace_api_url: Option<String>, probe_timeout: Duration) -> PathProber {
    let config = Config {
        trace_api_url,
        probe_timeout,
        dns_enabled: false,
        ..Config::default()
    };
    PathProber::new(&config, offline_geo(), None, reqwest::Client::new())
}

/// Serve one canned HTTP response on a loopback listener, returning the URL
async fn serve_once(body: &'static str) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        if let Ok((mut stream, _)) = listener.accept().await {
            let mut buf = [0u8; 2048];
            let _ = stream.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });

    format!("http://{}/trace", addr)
}

/// Write an executable stub script that emits canned probe output
#[cfg(unix)]
fn stub_tool(name: &str, script_body: &str, dialect: Dialect) -> ProbeTool {
    use std::os::unix::fs::PermissionsExt;

    let path = std::env::temp_dir().join(format!("hoptrace-test-{}-{}", name, std::process::id()));
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", script_body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

    ProbeTool {
        command: path,
        dialect,
    }
}

#[tokio::test]
async fn test_remote_fallback_produces_ordered_hops() {
    let url = serve_once(
        r#"{"hops":[{"ip":"1.1.1.1","lat":10.0,"lon":20.0},{"ip":"2.2.2.2","lat":30.0,"lon":40.0}]}"#,
    )
    .await;

    let prober = test_prober(Some(url), Duration::from_secs(60));
    let mut hops = prober.probe_with_tool(None, "example.com").await.unwrap();

    assert_eq!(hops.len(), 2);
    assert_eq!(hops[0].ip, "1.1.1.1".parse::<IpAddr>().unwrap());
    assert_eq!(hops[0].location.latitude, 10.0);
    assert_eq!(hops[0].location.longitude, 20.0);
    assert_eq!(hops[1].ip, "2.2.2.2".parse::<IpAddr>().unwrap());
    assert_eq!(hops[1].location.latitude, 30.0);

    // Both hops carry real coordinates, so reconciliation leaves them public
    reconcile(&mut hops, None, &Location::UNKNOWN);
    assert!(!hops[0].is_private);
    assert!(!hops[1].is_private);
}

#[tokio::test]
async fn test_remote_fallback_skips_invalid_addresses() {
    let url = serve_once(
        r#"{"hops":[{"ip":"not-an-address","lat":1.0,"lon":1.0},{"ip":"9.9.9.9","lat":5.0,"lon":6.0}]}"#,
    )
    .await;

    let prober = test_prober(Some(url), Duration::from_secs(60));
    let hops = prober.probe_with_tool(None, "example.com").await.unwrap();

    assert_eq!(hops.len(), 1);
    assert_eq!(hops[0].ip, "9.9.9.9".parse::<IpAddr>().unwrap());
}

#[cfg(unix)]
#[tokio::test]
async fn test_local_tool_output_flows_through_pipeline() {
    // Stub "traceroute" emitting one private and one documentation-range hop
    let tool = stub_tool(
        "traceroute-ok",
        "echo 'traceroute to example.com (192.0.2.10), 30 hops max'\n\
         echo ' 1  192.168.1.1  0.415 ms'\n\
         echo ' 2  * * *'\n\
         echo ' 3  192.0.2.10  12.345 ms'",
        Dialect::Traceroute,
    );

    let prober = test_prober(None, Duration::from_secs(10));
    let mut hops = prober
        .probe_with_tool(Some(&tool), "example.com")
        .await
        .unwrap();

    assert_eq!(hops.len(), 2);
    assert_eq!(hops[0].ip, "192.168.1.1".parse::<IpAddr>().unwrap());
    assert_eq!(hops[0].rtt_ms, 0.415);
    // DNS disabled: hostname falls back to the address text
    assert_eq!(hops[0].hostname, "192.168.1.1");
    assert_eq!(hops[1].ip, "192.0.2.10".parse::<IpAddr>().unwrap());
    // No geo source available, so both are unmapped before reconciliation
    assert!(hops[0].location.is_unmapped());
    assert!(hops[1].location.is_unmapped());

    let caller = Coordinates {
        latitude: 40.0,
        longitude: -74.0,
    };
    reconcile(&mut hops, Some(&caller), &Location::UNKNOWN);
    assert!(hops.iter().all(|h| h.is_private));
    assert!(hops.iter().all(|h| h.location.latitude == 40.0));

    let _ = std::fs::remove_file(&tool.command);
}

#[cfg(unix)]
#[tokio::test]
async fn test_hanging_tool_hits_timeout_and_falls_back() {
    // A tool that never finishes must be bounded by the wall-clock timeout,
    // not hang the request; with no remote endpoint the result is empty.
    let tool = stub_tool("traceroute-hang", "sleep 30", Dialect::Traceroute);

    let prober = test_prober(None, Duration::from_millis(300));
    let start = std::time::Instant::now();
    let hops = prober
        .probe_with_tool(Some(&tool), "example.com")
        .await
        .unwrap();

    assert!(hops.is_empty());
    assert!(start.elapsed() < Duration::from_secs(5));

    let _ = std::fs::remove_file(&tool.command);
}

#[cfg(unix)]
#[tokio::test]
async fn test_failing_tool_falls_back_to_remote() {
    let url = serve_once(r#"{"hops":[{"ip":"9.9.9.9","lat":5.0,"lon":6.0}]}"#).await;
    let tool = stub_tool("traceroute-fail", "exit 3", Dialect::Traceroute);

    let prober = test_prober(Some(url), Duration::from_secs(10));
    let hops = prober
        .probe_with_tool(Some(&tool), "example.com")
        .await
        .unwrap();

    assert_eq!(hops.len(), 1);
    assert_eq!(hops[0].ip, "9.9.9.9".parse::<IpAddr>().unwrap());

    let _ = std::fs::remove_file(&tool.command);
}

#[tokio::test]
async fn test_no_probe_source_is_distinguishable_from_empty() {
    let prober = test_prober(None, Duration::from_secs(10));
    let result = prober.probe_with_tool(None, "example.com").await;
    assert!(matches!(result, Err(ProbeError::NoProbeSource)));
}
