//! Grid Pilot entry point.
//!
//! Defaults to paper trading against the in-memory venue; live trading is
//! opt-in via `run --live`.

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use grid_pilot::config::Config;
use grid_pilot::exchange::{BinanceExchange, Exchange, MockExchange};
use grid_pilot::history::HistoryStore;
use grid_pilot::notify::{LogNotifier, Notifier, TelegramNotifier};
use grid_pilot::utils::SystemClock;
use grid_pilot::Engine;
use rust_decimal_macros::dec;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "grid-pilot")]
#[command(version, about = "Grid trading and hedging engine for Binance perpetuals")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the trading engine (paper mode unless --live)
    Run {
        /// Trade with real funds against the live venue
        #[arg(long)]
        live: bool,
    },

    /// Print recorded trade history for one day
    History {
        /// Day to show (YYYY-MM-DD, default today)
        #[arg(short, long)]
        day: Option<String>,
    },

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;
    init_logging(&config.engine.log_dir)?;

    match cli.command {
        Some(Commands::History { day }) => show_history(&config, day.as_deref()),
        Some(Commands::Config) => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Some(Commands::Run { live }) => run_engine(config, live).await,
        None => run_engine(config, false).await,
    }
}

async fn run_engine(config: Config, live: bool) -> Result<()> {
    config.validate()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        instruments = config.instruments.len(),
        live,
        "grid-pilot starting"
    );

    let notifier: Arc<dyn Notifier> = if config.telegram.enabled {
        Arc::new(TelegramNotifier::new(
            config.telegram.bot_token.clone(),
            config.telegram.chat_id.clone(),
        ))
    } else {
        Arc::new(LogNotifier)
    };

    let exchange: Arc<dyn Exchange> = if live {
        warn!("⚠️ LIVE TRADING MODE - real funds at risk");
        Arc::new(BinanceExchange::new(&config.binance)?)
    } else {
        info!("paper trading against the in-memory venue");
        Arc::new(MockExchange::new(dec!(10000)))
    };

    let mut engine = Engine::new(config, exchange, notifier, Arc::new(SystemClock))?;

    let shutdown = engine.shutdown_handle();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("🛑 shutdown signal received");
        shutdown.store(true, Ordering::SeqCst);
    });

    engine.run().await
}

fn show_history(config: &Config, day: Option<&str>) -> Result<()> {
    let day = match day {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .with_context(|| format!("invalid day: {raw}"))?,
        None => Utc::now().date_naive(),
    };

    let store = HistoryStore::new(&config.engine.history_dir, Arc::new(SystemClock))?;
    let records = store.load_day(day);
    if records.is_empty() {
        println!("no records for {day}");
        return Ok(());
    }
    for record in records {
        println!(
            "{} {} {} {} {} @ {}",
            record.timestamp,
            record.instrument,
            record.action,
            record.side.as_deref().unwrap_or("-"),
            record.amount,
            record.price
        );
    }
    Ok(())
}

fn init_logging(log_dir: &str) -> Result<()> {
    use tracing_subscriber::fmt::writer::MakeWriterExt;

    std::fs::create_dir_all(log_dir)?;

    let file_appender = tracing_appender::rolling::daily(log_dir, "grid-pilot.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    // Keep the writer guard alive for the program duration
    Box::leak(Box::new(guard));

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("grid_pilot=debug".parse()?)
                .add_directive(Level::INFO.into()),
        )
        .with_writer(std::io::stdout.and(file_writer))
        .with_target(true)
        .with_ansi(true)
        .init();

    Ok(())
}
