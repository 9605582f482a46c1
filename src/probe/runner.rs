use futures::future::join_all;
use std::net::IpAddr;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

use crate::config::Config;
use crate::lookup::{DnsLookup, GeoResolver};
use crate::probe::parser::{self, ParsedHop};
use crate::probe::remote::{RemoteHop, RemoteTraceClient};
use crate::probe::tool::{ProbeTool, select_tool};
use crate::state::Hop;

/// Failures of the probing pipeline.
///
/// Everything except `NoProbeSource` is recoverable: it routes the request to
/// the remote fallback (or an empty result) instead of the caller.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// No local tool exists and no remote endpoint is configured, so no
    /// probe was attempted at all
    #[error("no path-discovery tool found and no remote trace API configured")]
    NoProbeSource,

    /// The selected tool could not be spawned
    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool did not complete within the wall-clock bound
    #[error("{command} did not complete within {timeout_secs}s")]
    Timeout { command: String, timeout_secs: u64 },

    /// Waiting on the child process failed
    #[error("failed to collect output of {command}: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool completed with a non-zero status
    #[error("{command} exited with {status}")]
    ToolFailed {
        command: String,
        status: std::process::ExitStatus,
    },
}

/// Runs one path probe: selects the best available system tool, executes it
/// under a wall-clock bound, parses and enriches its output, and falls back
/// to the remote path-discovery service when the local path yields nothing.
pub struct PathProber {
    max_hops: u8,
    probe_timeout: Duration,
    geo: Arc<GeoResolver>,
    dns: Option<Arc<DnsLookup>>,
    remote: Option<RemoteTraceClient>,
}

impl PathProber {
    pub fn new(
        config: &Config,
        geo: Arc<GeoResolver>,
        dns: Option<Arc<DnsLookup>>,
        client: reqwest::Client,
    ) -> Self {
        let remote = config.trace_api_url.as_ref().map(|endpoint| {
            RemoteTraceClient::new(client.clone(), endpoint.clone(), config.trace_api_timeout)
        });

        Self {
            max_hops: config.max_hops,
            probe_timeout: config.probe_timeout,
            geo,
            dns,
            remote,
        }
    }

    /// Discover the path to `target`.
    ///
    /// A probing source that was attempted but produced nothing yields an
    /// empty hop list; `NoProbeSource` is returned only when there was
    /// nothing to attempt (no local tool, no remote endpoint).
    pub async fn probe(&self, target: &str) -> Result<Vec<Hop>, ProbeError> {
        let tool = select_tool();
        self.probe_with_tool(tool.as_ref(), target).await
    }

    /// Probe with an already-selected tool (None = no local tool available)
    pub async fn probe_with_tool(
        &self,
        tool: Option<&ProbeTool>,
        target: &str,
    ) -> Result<Vec<Hop>, ProbeError> {
        match tool {
            Some(tool) => match self.local_probe(tool, target).await {
                Ok(hops) => Ok(hops),
                Err(e) => {
                    tracing::warn!("Local probe via {} failed: {}", tool.name(), e);
                    Ok(self.remote_probe(target).await)
                }
            },
            None if self.remote.is_some() => Ok(self.remote_probe(target).await),
            None => Err(ProbeError::NoProbeSource),
        }
    }

    /// Spawn the tool, bound its runtime, parse and enrich its output
    async fn local_probe(&self, tool: &ProbeTool, target: &str) -> Result<Vec<Hop>, ProbeError> {
        let args = tool.args(target, self.max_hops);
        tracing::info!("Running {} {}", tool.name(), args.join(" "));

        // kill_on_drop reaps the child when the timeout abandons the wait
        let child = Command::new(&tool.command)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProbeError::Spawn {
                command: tool.name(),
                source,
            })?;

        let output = match tokio::time::timeout(self.probe_timeout, child.wait_with_output()).await
        {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => {
                return Err(ProbeError::Io {
                    command: tool.name(),
                    source,
                });
            }
            Err(_) => {
                return Err(ProbeError::Timeout {
                    command: tool.name(),
                    timeout_secs: self.probe_timeout.as_secs(),
                });
            }
        };

        if !output.status.success() {
            return Err(ProbeError::ToolFailed {
                command: tool.name(),
                status: output.status,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        tracing::debug!("{} output:\n{}", tool.name(), stdout);

        let candidates = parser::parse(&stdout, tool.dialect);
        Ok(self.enrich(candidates).await)
    }

    /// Resolve location and hostname for each candidate, concurrently but
    /// order-preserving
    async fn enrich(&self, candidates: Vec<ParsedHop>) -> Vec<Hop> {
        let futures: Vec<_> = candidates
            .into_iter()
            .map(|candidate| async move {
                let location = self.geo.resolve(candidate.ip).await;
                let hostname = self.hostname_for(candidate.ip).await;
                Hop::new(candidate.ip, hostname, candidate.rtt_ms, location)
            })
            .collect();

        join_all(futures).await
    }

    /// Run the remote fallback; any failure collapses to an empty result
    async fn remote_probe(&self, target: &str) -> Vec<Hop> {
        let Some(remote) = &self.remote else {
            tracing::warn!("No remote path-discovery endpoint configured; returning empty trace");
            return Vec::new();
        };

        match remote.fetch(target).await {
            Ok(records) => self.hops_from_remote(records).await,
            Err(e) => {
                tracing::warn!("Remote path-discovery failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Map remote hops (locations inline) into the normalized shape
    async fn hops_from_remote(&self, records: Vec<RemoteHop>) -> Vec<Hop> {
        let futures: Vec<_> = records
            .into_iter()
            .filter_map(|record| {
                let ip: IpAddr = match record.ip.parse() {
                    Ok(ip) => ip,
                    Err(_) => {
                        tracing::debug!("Skipping remote hop with invalid address: {}", record.ip);
                        return None;
                    }
                };
                let location = record.location();
                Some(async move {
                    let hostname = self.hostname_for(ip).await;
                    Hop::new(ip, hostname, 0.0, location)
                })
            })
            .collect();

        join_all(futures).await
    }

    async fn hostname_for(&self, ip: IpAddr) -> String {
        match &self.dns {
            Some(dns) => dns
                .reverse_lookup(ip)
                .await
                .unwrap_or_else(|| ip.to_string()),
            None => ip.to_string(),
        }
    }
}
