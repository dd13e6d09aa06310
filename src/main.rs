//! Risk Fusion Engine - Main Entry Point
//!
//! Reads transactions as JSON lines from stdin, scores each one and writes
//! the verdict as a JSON line to stdout. Logs go to stderr.

use anyhow::{Context, Result};
use risk_fusion_engine::{
    config::{AppConfig, LoggingConfig},
    engine::DecisionEngine,
    error::EngineError,
    types::Transaction,
};
use std::io::{self, BufRead, Write};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_logging(&config.logging)?;

    info!("Starting Risk Fusion Engine");
    info!(
        ledger = %config.ledger.path.display(),
        home_locations = ?config.detection.home_locations,
        geo_fraud_threshold = config.geo_velocity.fraud_threshold,
        "Configuration loaded successfully"
    );

    let engine = DecisionEngine::from_config(&config).context("Failed to start decision engine")?;
    let high_risk_threshold = config.presentation.high_risk_threshold;

    let stdin = io::stdin();
    let stdout = io::stdout();
    let skipped = process_stream(&engine, stdin.lock(), stdout.lock(), high_risk_threshold)?;

    info!(
        skipped = skipped,
        ledger_records = engine.ledger().len(),
        "Input exhausted, shutting down"
    );
    engine.metrics().print_summary();

    Ok(())
}

/// Score every JSON line of `input`, writing one verdict line per accepted
/// transaction. Returns how many lines were skipped.
fn process_stream<R: BufRead, W: Write>(
    engine: &DecisionEngine,
    input: R,
    mut out: W,
    high_risk_threshold: f64,
) -> Result<u64> {
    let mut skipped: u64 = 0;

    for (index, line) in input.lines().enumerate() {
        let line_no = index + 1;
        let line = match line {
            Ok(line) => line,
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                warn!(line = line_no, error = %e, "Skipping unreadable input line");
                skipped += 1;
                continue;
            }
            Err(e) => return Err(e).context("Failed to read transaction input"),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let tx = match parse_transaction(line) {
            Ok(tx) => tx,
            Err(e) => {
                warn!(line = line_no, error = %e, "Skipping invalid transaction");
                skipped += 1;
                continue;
            }
        };

        match engine.analyze(&tx) {
            Ok(verdict) => {
                let high_risk = verdict.risk_factors.high_risk(high_risk_threshold);
                if !high_risk.is_empty() {
                    info!(
                        line = line_no,
                        factors = ?high_risk.iter().map(|f| f.name()).collect::<Vec<_>>(),
                        overall_risk = verdict.overall_risk,
                        "High-risk factors"
                    );
                }

                serde_json::to_writer(&mut out, &verdict).context("Failed to write verdict")?;
                writeln!(out).context("Failed to write verdict")?;
                out.flush().context("Failed to write verdict")?;
            }
            Err(e) if e.is_fatal() => {
                error!(line = line_no, error = %e, "Decision engine failure, aborting");
                engine.metrics().print_summary();
                return Err(e).context("Decision engine failed");
            }
            Err(e) => {
                warn!(line = line_no, error = %e, "Transaction rejected");
                skipped += 1;
            }
        }

        let count = engine.metrics().decisions.load(std::sync::atomic::Ordering::Relaxed);
        if count > 0 && count % 100 == 0 {
            let stats = engine.metrics().get_processing_stats();
            info!(
                processed = count,
                throughput = format!("{:.1} tx/s", engine.metrics().get_throughput()),
                avg_latency_us = stats.mean_us,
                "Processing milestone"
            );
        }
    }

    Ok(skipped)
}

fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .context("Invalid logging.level")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);

    match config.format.as_str() {
        "json" => builder.json().init(),
        _ => builder.init(),
    }
    Ok(())
}

/// Decode one input line and apply the boundary range checks.
fn parse_transaction(line: &str) -> Result<Transaction, EngineError> {
    let tx: Transaction =
        serde_json::from_str(line).map_err(|e| EngineError::InvalidInput(e.to_string()))?;
    tx.validate()?;
    Ok(tx)
}
