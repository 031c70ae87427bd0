//! `event-relay` command line.
//!
//! - `run` reads lines from stdin (`LEVEL: text` or plain text) and delivers
//!   them through the configured engine and sink until EOF or Ctrl-C.
//! - `timestamp` formats and parses precision timestamps.
//! - `check-config` loads and validates a configuration file.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use event_relay::config::{load_config, RelayConfig, TokenWatcher};
use event_relay::gate::{DeliveryGate, FileTokenRepository, InMemoryTokenRepository, TokenRepository};
use event_relay::lifecycle::wait_for_signal;
use event_relay::observability::{logging, metrics};
use event_relay::sink::build_sink;
use event_relay::time::{PrecisionTimestamp, Zone};
use event_relay::{DeliveryEngine, Severity, Tracker};

#[derive(Parser)]
#[command(name = "event-relay", version)]
#[command(about = "Deliver timestamped event records to pluggable sinks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deliver stdin lines through the delivery engine
    Run {
        /// Configuration file (TOML); defaults apply when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Source key used for gating and stamped on every record
        #[arg(short, long, default_value = "stdin")]
        source: String,
    },
    /// Precision timestamp utilities
    Timestamp {
        #[command(subcommand)]
        action: TimestampCommand,
    },
    /// Load and validate a configuration file
    CheckConfig {
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[derive(Subcommand)]
enum TimestampCommand {
    /// Print the current time
    Now {
        #[arg(short, long)]
        pattern: Option<String>,
        #[arg(short = 'z', long)]
        tz: Option<String>,
    },
    /// Format microseconds since the Unix epoch
    Format {
        micros: i64,
        #[arg(short, long)]
        pattern: Option<String>,
        #[arg(short = 'z', long)]
        tz: Option<String>,
    },
    /// Parse text and print microseconds since the Unix epoch
    Parse {
        text: String,
        #[arg(short, long)]
        pattern: Option<String>,
        #[arg(short = 'z', long)]
        tz: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, source } => run(config.as_deref(), source).await,
        Commands::Timestamp { action } => timestamp(action),
        Commands::CheckConfig { config } => {
            load_config(&config).with_context(|| format!("invalid configuration {}", config.display()))?;
            println!("{}: ok", config.display());
            Ok(())
        }
    }
}

async fn run(config_path: Option<&Path>, source: String) -> anyhow::Result<()> {
    let config = match config_path {
        Some(path) => load_config(path).with_context(|| format!("loading {}", path.display()))?,
        None => RelayConfig::default(),
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "event-relay starting");

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .context("parsing metrics address")?;
        metrics::init_metrics(addr);
    }

    // Token table, optionally hot-reloaded. The watcher stops when dropped.
    let mut _watcher = None;
    let repository: Arc<dyn TokenRepository> = match &config.gate.token_file {
        Some(path) => {
            let repo = Arc::new(FileTokenRepository::open(path)?);
            if config.gate.watch {
                let (watcher, _) = TokenWatcher::new(repo.clone());
                _watcher = Some(watcher.run().context("starting token watcher")?);
            }
            repo
        }
        None => Arc::new(InMemoryTokenRepository::new()),
    };
    let gate = DeliveryGate::new(repository, config.gate.default_threshold);

    let sink = build_sink(&config.sink, &config.timestamp).await?;
    let engine = Arc::new(DeliveryEngine::new(config.engine.clone(), sink));
    engine.start()?;
    let tracker = Tracker::new(source, gate, engine.clone());
    let session = tracker.begin("session");
    let mut relayed = 0u64;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let signal = wait_for_signal();
    tokio::pin!(signal);

    loop {
        tokio::select! {
            res = &mut signal => {
                match res {
                    Ok(name) => tracing::info!(signal = name, "Signal received, shutting down"),
                    Err(e) => tracing::error!(error = %e, "Failed to listen for signals"),
                }
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                let (severity, text) = split_level(&line);
                match tracker.track(severity, "input", text).await {
                    Ok(true) => relayed += 1,
                    Ok(false) => {}
                    Err(e) => tracing::warn!(error = %e, "Record not submitted"),
                }
            }
        }
    }

    if let Err(e) = tracker
        .finish(session, Severity::Info, format!("{relayed} lines relayed"))
        .await
    {
        tracing::warn!(error = %e, "Session record not submitted");
    }

    let report = engine.shutdown(config.engine.drain_timeout()).await;
    tracing::info!(
        drained = report.drained,
        submitted = report.stats.submitted,
        delivered = report.stats.delivered,
        dropped = report.stats.dropped,
        failed = report.stats.failed,
        skipped = report.stats.skipped,
        discarded = report.stats.discarded,
        recycled = report.stats.recycled,
        "Shutdown complete"
    );
    Ok(())
}

/// `"ERROR: disk full"` → `(Error, "disk full")`; anything else is INFO.
fn split_level(line: &str) -> (Severity, &str) {
    if let Some((level, rest)) = line.split_once(':') {
        if let Ok(severity) = level.trim().parse::<Severity>() {
            return (severity, rest.trim_start());
        }
    }
    (Severity::Info, line)
}

fn timestamp(action: TimestampCommand) -> anyhow::Result<()> {
    let zone = |tz: Option<String>| tz.as_deref().map(Zone::parse).transpose();

    match action {
        TimestampCommand::Now { pattern, tz } => {
            let now = PrecisionTimestamp::now();
            println!("{}", now.format(pattern.as_deref(), zone(tz)?)?);
        }
        TimestampCommand::Format { micros, pattern, tz } => {
            let ts = PrecisionTimestamp::from_micros(micros)?;
            println!("{}", ts.format(pattern.as_deref(), zone(tz)?)?);
        }
        TimestampCommand::Parse { text, pattern, tz } => {
            let ts = PrecisionTimestamp::parse(&text, pattern.as_deref(), zone(tz)?)?;
            println!("{}", ts.total_micros());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_level() {
        assert_eq!(split_level("ERROR: disk full"), (Severity::Error, "disk full"));
        assert_eq!(split_level("warn:retrying"), (Severity::Warning, "retrying"));
        assert_eq!(split_level("user: alice logged in"), (Severity::Info, "user: alice logged in"));
        assert_eq!(split_level("plain text"), (Severity::Info, "plain text"));
    }
}
