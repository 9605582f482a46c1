use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod export;
mod lookup;
mod probe;
mod state;
mod trace;

use cli::Args;
use config::Config;
use export::{export_json, generate_report};
use state::TraceRequest;
use trace::Tracer;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Diagnostics go to stderr so JSON output stays clean
    let default_filter = if args.verbose {
        "hoptrace=debug"
    } else {
        "hoptrace=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from(&args);
    let request = TraceRequest::new(args.target.clone(), args.user_location());

    let tracer = Tracer::new(config)?;
    let report = tracer.trace(request).await;

    let stdout = std::io::stdout().lock();
    if args.json {
        export_json(&report, stdout)?;
    } else {
        generate_report(&report, stdout)?;
    }

    if report.error.is_some() {
        std::process::exit(1);
    }

    Ok(())
}
