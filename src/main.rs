use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use wagerd::application::engine::WageringEngine;
use wagerd::config::EngineConfig;
use wagerd::domain::ports::{LedgerStoreBox, RandomSourceBox};
use wagerd::infrastructure::in_memory::{InMemoryLedgerStore, InMemorySessionStore};
use wagerd::infrastructure::random::{SeededRandom, ThreadRandom};
use wagerd::interfaces::csv::balance_writer::BalanceWriter;
use wagerd::interfaces::csv::command_reader::{CommandOutput, CommandReader};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input command script (CSV: op, user, game, amount, arg)
    input: PathBuf,

    /// Path to persistent ledger database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Seed for reproducible game outcomes. Defaults to the thread RNG.
    #[arg(long)]
    seed: Option<u64>,

    /// Engine configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();
}

#[cfg(feature = "storage-rocksdb")]
fn open_ledger(db_path: Option<PathBuf>, config: &EngineConfig) -> Result<LedgerStoreBox> {
    use wagerd::infrastructure::rocksdb::RocksDBLedgerStore;

    match db_path {
        Some(path) => {
            info!(path = %path.display(), "opening persistent ledger");
            let store = RocksDBLedgerStore::open_with_currency(path, config.currency.clone())
                .into_diagnostic()?;
            Ok(Box::new(store))
        }
        None => Ok(Box::new(InMemoryLedgerStore::with_currency(
            config.currency.clone(),
        ))),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_ledger(db_path: Option<PathBuf>, config: &EngineConfig) -> Result<LedgerStoreBox> {
    if db_path.is_some() {
        warn!(
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(Box::new(InMemoryLedgerStore::with_currency(
        config.currency.clone(),
    )))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path).into_diagnostic()?,
        None => EngineConfig::default(),
    };

    let random: RandomSourceBox = match cli.seed {
        Some(seed) => Box::new(SeededRandom::new(seed)),
        None => Box::new(ThreadRandom),
    };
    let ledger = open_ledger(cli.db_path, &config)?;
    let engine = WageringEngine::new(ledger, Box::new(InMemorySessionStore::new()), config)
        .with_random(random);

    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = CommandReader::new(file);
    for (row, command) in reader.commands().enumerate() {
        let command = match command {
            Ok(command) => command,
            Err(e) => {
                warn!(row = row + 1, error = %e, "invalid command");
                continue;
            }
        };

        let user = command.user();
        match command.execute(&engine).await {
            Ok(output) => {
                let json = serde_json::to_string(&output).into_diagnostic()?;
                if matches!(output, CommandOutput::Status(_)) {
                    info!(row = row + 1, user, status = %json, "session status");
                } else {
                    debug!(row = row + 1, user, output = %json, "command applied");
                }
            }
            Err(e) if e.is_recoverable() => {
                warn!(row = row + 1, user, error = %e, "command rejected");
            }
            Err(e) => return Err(e).into_diagnostic(),
        }
    }

    let balances = engine.balances().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = BalanceWriter::new(stdout.lock());
    writer.write_balances(balances).into_diagnostic()?;

    Ok(())
}
