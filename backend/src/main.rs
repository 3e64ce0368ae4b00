//! Lending board demo driver.
//!
//! Loads postings from a JSON seed file into an in-memory board, then either
//! runs a smart match query against the configured model or reports the
//! lifecycle state of every posting.
//!
//! # Examples
//! ```sh
//! LENDBOARD_API_KEY=... lendboard match --postings demos/chargers.json \
//!     --role borrower --query "Need a phone charger for tonight"
//! lendboard lifecycle --postings demos/chargers.json
//! ```
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, Result, eyre};
use lendboard::config::ModelSettings;
use lendboard::domain::smart_match::{MatchPrompt, MatchQuery};
use lendboard::domain::{Posting, PostingBoard, Role, SmartMatchResult, SmartMatchService};
use lendboard::outbound::gemini::GeminiMatchModel;
use lendboard::outbound::memory::InMemoryPostingRepository;
use lendboard::outbound::seed_file::{load_seed_file, seed_board};
use mockable::{Clock, DefaultClock};
use ortho_config::OrthoConfig;
use tokio::runtime::Builder;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

/// `lendboard` command arguments.
#[derive(Debug, Parser)]
#[command(
    name = "lendboard",
    about = "Campus lending board with model-assisted matching",
    version
)]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Rank complementary postings for a natural-language query.
    Match {
        /// JSON seed file with the postings to load.
        #[arg(long = "postings", value_name = "path")]
        postings: PathBuf,
        /// Role of the person asking (`lender` or `borrower`).
        #[arg(long = "role", value_name = "role")]
        role: Role,
        /// What the person needs or offers.
        #[arg(long = "query", value_name = "text")]
        query: String,
        /// Print the prompt instead of calling the model.
        #[arg(long = "dry-run")]
        dry_run: bool,
    },
    /// Expire lapsed postings and print every posting's status.
    Lifecycle {
        /// JSON seed file with the postings to load.
        #[arg(long = "postings", value_name = "path")]
        postings: PathBuf,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(error) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .with_writer(std::io::stderr)
        .try_init()
    {
        warn!(%error, "tracing init failed");
    }

    let args = CliArgs::parse();
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("create Tokio runtime")?;
    runtime.block_on(run(args.command))
}

async fn run(command: Command) -> Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    match command {
        Command::Match {
            postings,
            role,
            query,
            dry_run,
        } => {
            let board = Arc::new(load_board(&postings, clock.clone())?);
            let query = MatchQuery::new(query, role, clock.utc());
            if dry_run {
                let candidates = board.select_candidates(query.role, query.requested_at)?;
                let prompt = MatchPrompt::build(&query, &candidates)?;
                println!("{}", prompt.as_str());
                return Ok(());
            }

            let settings = ModelSettings::load_from_iter([OsString::from("lendboard")])
                .map_err(|error| eyre!("load model settings: {error}"))?;
            let model = GeminiMatchModel::new(settings.gemini_config()?)?;
            let service = SmartMatchService::new(board, Arc::new(model), clock);
            let results = service.smart_match(query).await?;
            print_matches(&results);
        }
        Command::Lifecycle { postings } => {
            let board = load_board(&postings, clock.clone())?;
            let expired = board.sweep_expired(clock.utc())?;
            for posting in board.list()? {
                println!("{}", describe(&posting));
            }
            println!("expired_now={expired}");
        }
    }
    Ok(())
}

fn load_board(
    path: &std::path::Path,
    clock: Arc<dyn Clock>,
) -> Result<PostingBoard<InMemoryPostingRepository>> {
    let seeds = load_seed_file(path)?;
    let board = PostingBoard::new(InMemoryPostingRepository::default(), clock);
    seed_board(&board, seeds)?;
    Ok(board)
}

fn print_matches(results: &[SmartMatchResult]) {
    if results.is_empty() {
        println!("No matches found.");
        return;
    }
    for (rank, result) in results.iter().enumerate() {
        println!(
            "{}. {} by {} - {}",
            rank + 1,
            result.posting.name(),
            result.posting.owner(),
            result.rationale
        );
    }
}

fn describe(posting: &Posting) -> String {
    format!(
        "{id}\t{status}\t{role}\t{owner}\t{name}",
        id = posting.id(),
        status = posting.status(),
        role = posting.role(),
        owner = posting.owner(),
        name = posting.name(),
    )
}
