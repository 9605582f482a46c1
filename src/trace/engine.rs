use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;

use crate::config::Config;
use crate::lookup::{DnsLookup, GeoResolver, server_fallback_location};
use crate::probe::PathProber;
use crate::state::{TraceReport, TraceRequest};
use crate::trace::reconcile::reconcile;

/// Runs one trace request end to end: probe, resolve, reconcile, report.
///
/// The geo and DNS caches are the only state shared across requests; both
/// are internally locked and read-mostly, so concurrent traces need no
/// further coordination.
pub struct Tracer {
    config: Config,
    geo: Arc<GeoResolver>,
    prober: PathProber,
    client: reqwest::Client,
}

impl Tracer {
    pub fn new(config: Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("hoptrace/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        let geo = Arc::new(GeoResolver::new(
            config.geoip_db.as_deref(),
            client.clone(),
            config.geo_api_url.clone(),
            config.geo_api_timeout,
        ));

        let dns = config.dns_enabled.then(|| Arc::new(DnsLookup::new()));

        let prober = PathProber::new(&config, geo.clone(), dns, client.clone());

        Ok(Self {
            config,
            geo,
            prober,
            client,
        })
    }

    /// Produce a fresh report for one request. Pipeline failures become an
    /// error payload, never partial data.
    pub async fn trace(&self, request: TraceRequest) -> TraceReport {
        let started_at = Utc::now();
        let target = request.target.trim().to_string();

        if target.is_empty() {
            return TraceReport::from_error(&target, started_at, "No target specified");
        }

        let mut hops = match self.prober.probe(&target).await {
            Ok(hops) => hops,
            Err(e) => {
                tracing::error!("Trace of {} failed: {}", target, e);
                return TraceReport::from_error(&target, started_at, e.to_string());
            }
        };

        // Server-side fallback position, derived once per request
        let server_location = server_fallback_location(
            &self.client,
            &self.geo,
            &self.config.public_ip_url,
            self.config.public_ip_timeout,
        )
        .await;

        reconcile(&mut hops, request.user_location.as_ref(), &server_location);

        TraceReport::from_hops(&target, started_at, &hops)
    }
}
