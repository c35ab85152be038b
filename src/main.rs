use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_stream::wrappers::ReceiverStream;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use loyalty_eng::csv::{read_members, read_purchases, write_journal, write_members};
use loyalty_eng::engine::Journal;
use loyalty_eng::{Engine, EngineConfig};

/// Settle a batch of loyalty purchases and print the resulting member balances.
#[derive(Parser)]
#[command(name = "loyalty-eng")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Members csv file
    members: PathBuf,

    /// Purchases csv file, settled in order
    purchases: PathBuf,

    /// TOML engine configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write settled transactions to this csv file
    #[arg(long)]
    journal: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    let journal = Arc::new(Journal::new());
    let engine = Engine::with_sink(config, journal.clone());

    for result in read_members(&cli.members)? {
        match result {
            Ok(member) => {
                if let Err(e) = engine.register(member) {
                    warn!("{e}");
                }
            }
            Err(e) => {
                warn!("{e}");
            }
        }
    }

    let purchases = read_purchases(cli.purchases.clone())?;
    let (request_sender, request_receiver) = tokio::sync::mpsc::channel(16);

    tokio::spawn(async move {
        for result in purchases {
            match result {
                Ok(request) => {
                    if request_sender.send(request).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("{e}");
                }
            }
        }
    });

    engine.run(ReceiverStream::new(request_receiver)).await;

    let report = engine.scan_for_fraud().await;
    if report.suspicious_count > 0 {
        warn!(
            total = report.total_members,
            suspicious = report.suspicious_count,
            "fraud heuristic flagged members"
        );
    }

    let mut members = engine.members().snapshot().await;
    members.sort_by(|a, b| a.membership_no.cmp(&b.membership_no));
    write_members(io::stdout().lock(), &members)?;

    if let Some(path) = &cli.journal {
        let file = File::create(path)
            .with_context(|| format!("failed to create journal {}", path.display()))?;
        write_journal(file, &journal.entries())?;
    }

    Ok(())
}
