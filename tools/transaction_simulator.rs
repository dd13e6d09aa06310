//! Transaction Simulator
//!
//! Generates test transactions as JSON lines on stdout, for piping into the
//! engine:
//!
//! ```text
//! transaction-simulator 200 0.1 0.05 | risk-fusion-engine
//! ```
//!
//! Arguments: count, fraud rate, geo-jump rate, delay in milliseconds.

use anyhow::Context;
use rand::Rng;
use risk_fusion_engine::types::{Location, Transaction};
use std::io::Write;
use std::time::Duration;
use tracing::info;

/// Transaction generator for testing
struct TransactionGenerator {
    rng: rand::rngs::ThreadRng,
    last_location: Location,
    last_hour: u8,
}

impl TransactionGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            last_location: Location::Delhi,
            last_hour: 12,
        }
    }

    /// Daytime purchase from a home city with a good biometric match
    fn generate_legitimate(&mut self) -> Transaction {
        let location = self.random_choice(&[Location::Delhi, Location::Mumbai]);
        let tx = Transaction::new(
            (self.rng.gen_range(10.0..500.0_f64) * 100.0).round() / 100.0,
            self.rng.gen_range(8..21),
            self.rng.gen_range(0..4),
            location,
            self.rng.gen_range(0.85..1.0),
        );
        self.remember(&tx);
        tx
    }

    /// Large night-time burst from abroad with a poor biometric match
    fn generate_suspicious(&mut self) -> Transaction {
        let location = self.random_choice(&[
            Location::London,
            Location::NewYork,
            Location::Toronto,
            Location::Canada,
            Location::Sydney,
            Location::Tokyo,
        ]);
        let hour = if self.rng.gen_bool(0.5) {
            self.rng.gen_range(0..6)
        } else {
            23
        };
        let tx = Transaction::new(
            (self.rng.gen_range(5_000.0..15_000.0_f64) * 100.0).round() / 100.0,
            hour,
            self.rng.gen_range(8..25),
            location,
            self.rng.gen_range(0.05..0.45),
        );
        self.remember(&tx);
        tx
    }

    /// Ordinary purchase placed far from the previous one within the hour
    fn generate_geo_jump(&mut self) -> Transaction {
        let location = match self.last_location {
            Location::Delhi | Location::Mumbai | Location::Tokyo => Location::Sydney,
            _ => Location::Delhi,
        };
        let tx = Transaction::new(
            (self.rng.gen_range(20.0..400.0_f64) * 100.0).round() / 100.0,
            self.last_hour,
            self.rng.gen_range(0..3),
            location,
            self.rng.gen_range(0.8..1.0),
        );
        self.remember(&tx);
        tx
    }

    fn remember(&mut self, tx: &Transaction) {
        self.last_location = tx.location;
        self.last_hour = tx.hour;
    }

    fn random_choice(&mut self, choices: &[Location]) -> Location {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("transaction_simulator=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let count: u64 = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(100);
    let fraud_rate: f64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(0.1);
    let geo_jump_rate: f64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(0.05);
    let delay_ms: u64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(0);

    if !(0.0..=1.0).contains(&fraud_rate) || !(0.0..=1.0).contains(&geo_jump_rate) {
        anyhow::bail!("rates must be within 0.0-1.0");
    }

    info!(
        count = count,
        fraud_rate = fraud_rate,
        geo_jump_rate = geo_jump_rate,
        delay_ms = delay_ms,
        "Starting transaction simulator"
    );

    let mut generator = TransactionGenerator::new();
    let mut rng = rand::thread_rng();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let mut legitimate_count = 0;
    let mut suspicious_count = 0;
    let mut geo_jump_count = 0;

    for i in 0..count {
        let roll: f64 = rng.gen();
        let transaction = if roll < fraud_rate {
            suspicious_count += 1;
            generator.generate_suspicious()
        } else if roll < fraud_rate + geo_jump_rate {
            geo_jump_count += 1;
            generator.generate_geo_jump()
        } else {
            legitimate_count += 1;
            generator.generate_legitimate()
        };

        serde_json::to_writer(&mut out, &transaction).context("Failed to write transaction")?;
        writeln!(out).context("Failed to write transaction")?;

        if (i + 1) % 100 == 0 {
            info!(
                "Generated {}/{} transactions ({} legitimate, {} suspicious, {} geo jumps)",
                i + 1,
                count,
                legitimate_count,
                suspicious_count,
                geo_jump_count
            );
        }

        if delay_ms > 0 {
            out.flush().context("Failed to write transaction")?;
            std::thread::sleep(Duration::from_millis(delay_ms));
        }
    }
    out.flush().context("Failed to write transaction")?;

    info!(
        "Completed! Generated {} transactions ({} legitimate, {} suspicious, {} geo jumps)",
        count, legitimate_count, suspicious_count, geo_jump_count
    );

    Ok(())
}
