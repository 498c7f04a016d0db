//! Cardbank CLI - card accounts in the terminal
//!
//! Usage:
//! ```bash
//! cardbank                          # uses ./card.db
//! cardbank -fileName bank.db        # legacy spelling
//! cardbank --file-name bank.db --seed 0
//! RUST_LOG=debug cardbank           # logs go to stderr
//! ```

use anyhow::{Context, Result};
use cardbank_core::CardIssuer;
use cardbank_persistence::LedgerStore;
use cardbank_session::Session;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io;
use tracing_subscriber::EnvFilter;

/// Cardbank - create card accounts, log in, deposit and transfer
#[derive(Parser, Debug)]
#[command(name = "cardbank")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Database file path
    #[arg(long = "file-name", visible_alias = "fileName", default_value = "card.db")]
    pub file_name: String,

    /// Seed for card number and PIN generation (random if omitted)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Log level when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// Unrecognised arguments, ignored
    #[arg(hide = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub rest: Vec<String>,
}

/// Options that take a value, in every accepted spelling
const VALUE_OPTIONS: [&str; 5] = ["-fileName", "--fileName", "--file-name", "--seed", "--log-level"];

/// Move known options to the front so stray arguments before them cannot
/// swallow them, and rewrite the single-dash `-fileName` into `--fileName`.
fn normalize_args<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut known: Vec<String> = args.next().into_iter().collect();
    let mut rest = Vec::new();

    while let Some(arg) = args.next() {
        let (name, inline_value) = match arg.split_once('=') {
            Some((name, value)) => (name.to_string(), Some(value.to_string())),
            None => (arg.clone(), None),
        };
        if !VALUE_OPTIONS.contains(&name.as_str()) {
            rest.push(arg);
            continue;
        }

        let name = if name == "-fileName" { "--fileName".to_string() } else { name };
        match inline_value {
            Some(value) => known.push(format!("{name}={value}")),
            None => {
                known.push(name);
                known.extend(args.next());
            }
        }
    }

    known.extend(rest);
    known
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse_from(normalize_args(std::env::args()));
    init_tracing(&cli.log_level);

    if !cli.rest.is_empty() {
        tracing::debug!(ignored = ?cli.rest, "ignoring extra arguments");
    }

    if cli.file_name.is_empty() {
        println!("no db filename argument");
        return Ok(());
    }

    let store = LedgerStore::open(&cli.file_name)
        .await
        .with_context(|| format!("db connect error: {}", cli.file_name))?;
    tracing::info!(
        path = %cli.file_name,
        accounts = store.count().await.unwrap_or(0),
        "ledger opened"
    );

    let rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut session = Session::new(&store, CardIssuer::new(rng), stdin.lock(), stdout.lock());
    let outcome = session.run().await;

    store.close().await;
    outcome.context("interactive session failed")?;
    Ok(())
}
