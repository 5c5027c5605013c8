use clap::{Parser, Subcommand};
use sluice::{FileStore, MutationQueue, QueueConfig};
use sluice_edgar::EdgarClient;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Tickers fetched by `sluice seed` when none are given.
const SEED_TICKERS: &[&str] = &[
    "ORCL", "WMT", "AMZN", "AAPL", "MSFT", "GOOGL", "BRK.A", "NVDA", "META", "TSLA", "JPM", "JNJ",
    "ACN", "FDX", "HD", "UNH", "TGT", "NFLX", "CRM", "CMG",
];

#[derive(Parser)]
#[command(name = "sluice", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch company profiles from the SEC mapping API
    Seed {
        /// Comma-separated tickers (defaults to the built-in seed list)
        #[arg(long, value_delimiter = ',')]
        tickers: Option<Vec<String>>,
        /// Print each company as a JSON line
        #[arg(long)]
        json: bool,
    },
    /// Inspect or reset the persisted offline queue
    Queue {
        #[arg(long, env = "SLUICE_DATA_DIR", default_value = "./data")]
        data_dir: PathBuf,
        #[command(subcommand)]
        action: QueueAction,
    },
}

#[derive(Subcommand, Clone, Copy)]
enum QueueAction {
    /// Number of pending operations
    Size,
    /// Pending operations, one JSON object per line
    List,
    /// Discard every pending operation
    Clear,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run_seed(
    tickers: Option<Vec<String>>,
    json: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let client = EdgarClient::from_env()?;
    let tickers: Vec<String> = match tickers {
        Some(list) => list
            .into_iter()
            .map(|t| t.trim().to_uppercase())
            .filter(|t| !t.is_empty())
            .collect(),
        None => SEED_TICKERS.iter().map(|t| t.to_string()).collect(),
    };

    tracing::info!("[EDGAR] seeding {} tickers", tickers.len());
    let result = client.fetch_companies(&tickers).await;

    for company in result.succeeded() {
        if json {
            println!("{}", serde_json::to_string(company)?);
        } else {
            println!(
                "{}\t{}\t{}",
                company.ticker,
                if company.cik.is_empty() { "-" } else { company.cik.as_str() },
                company.name
            );
        }
    }

    eprintln!(
        "Fetched {}/{} companies",
        result.succeeded().len(),
        result.total()
    );
    if !result.failed().is_empty() {
        eprintln!("Failed: {}", result.failed().join(", "));
    }

    if result.succeeded().is_empty() && result.total() > 0 {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_queue(
    data_dir: PathBuf,
    action: QueueAction,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = QueueConfig::from_env()?;
    let store = Arc::new(FileStore::open(&data_dir)?);
    let queue = MutationQueue::load(store, config.storage_key.clone()).await;

    match action {
        QueueAction::Size => println!("{}", queue.size()),
        QueueAction::List => {
            for op in queue.pending() {
                println!("{}", serde_json::to_string(&op)?);
            }
        }
        QueueAction::Clear => {
            let removed = queue.clear().await;
            println!("Cleared {} pending operations", removed);
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let outcome = match cli.command {
        Command::Seed { tickers, json } => run_seed(tickers, json).await,
        Command::Queue { data_dir, action } => run_queue(data_dir, action).await,
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
