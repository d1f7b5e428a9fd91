//! blocstack CLI
//!
//! Feeds digests into a file-backed accumulator and inspects its state.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use blocstack::config::{DEFAULT_BATCH_CAPACITY, DEFAULT_PUBLISH_TOPIC};
use blocstack::{Address, Config, Digest, Engine, FlushOutcome, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// blocstack
#[derive(Parser, Debug)]
#[command(name = "blocstack")]
#[command(about = "Append-only digest accumulator over a content-addressed store")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./blocstack_data")]
    data_dir: PathBuf,

    /// Digests per batch before a flush
    #[arg(short, long, default_value_t = DEFAULT_BATCH_CAPACITY)]
    batch_capacity: usize,

    /// Topic manifest addresses are published on
    #[arg(short, long, default_value = DEFAULT_PUBLISH_TOPIC)]
    topic: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add the SHA-256 of every input line (stdin when no files are given)
    Ingest {
        files: Vec<PathBuf>,
    },

    /// Add digests given as CID strings or 64-char hex
    AddMultihash {
        #[arg(required = true)]
        values: Vec<String>,
    },

    /// Add SHA-256("Alice{n}") for n in 0..count
    Demo {
        #[arg(short, long, default_value = "1000")]
        count: u64,
    },

    /// Print the current manifest
    Show,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,blocstack=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    tracing::info!("blocstack v{}", blocstack::VERSION);
    tracing::info!("Data directory: {}", args.data_dir.display());

    let config = Config::builder()
        .data_dir(&args.data_dir)
        .batch_capacity(args.batch_capacity)
        .publish_topic(&args.topic)
        .build();

    let engine = match Engine::open(config) {
        Ok(e) => e,
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&engine, args.command) {
        tracing::error!("Command failed: {}", e);
        std::process::exit(1);
    }
}

fn run(engine: &Engine, command: Commands) -> Result<()> {
    match command {
        Commands::Ingest { files } => {
            let mut added = 0u64;
            if files.is_empty() {
                added += ingest_lines(engine, io::stdin().lock())?;
            } else {
                for path in files {
                    added += ingest_lines(engine, BufReader::new(File::open(&path)?))?;
                }
            }
            finish(engine, added)
        }
        Commands::AddMultihash { values } => {
            let mut added = 0u64;
            for value in values {
                let digest = Digest::from(*Address::parse(&value)?.as_bytes());
                report(engine.add(digest)?);
                added += 1;
            }
            finish(engine, added)
        }
        Commands::Demo { count } => {
            for n in 0..count {
                report(engine.add(Digest::sha256(format!("Alice{n}").as_bytes()))?);
            }
            finish(engine, count)
        }
        Commands::Show => show(engine),
    }
}

fn ingest_lines<R: BufRead>(engine: &Engine, reader: R) -> Result<u64> {
    let mut added = 0;
    for line in reader.lines() {
        let line = line?;
        report(engine.add(Digest::sha256(line.as_bytes()))?);
        added += 1;
    }
    Ok(added)
}

/// Pending digests do not survive the process, so flush the remainder
fn finish(engine: &Engine, added: u64) -> Result<()> {
    report(engine.flush()?);
    if engine.head_is_stale() {
        engine.sync_head()?;
    }
    println!("added {added} digests");
    show(engine)
}

fn report(outcome: Option<FlushOutcome>) {
    if let Some(outcome) = outcome {
        println!(
            "flush: {} digests settled at level {} ({} merges) -> manifest {}",
            outcome.flushed, outcome.level, outcome.merges, outcome.manifest_address
        );
    }
}

fn show(engine: &Engine) -> Result<()> {
    let manifest = engine.manifest();
    match engine.head()? {
        Some(head) => println!("manifest {} (version {})", head.manifest, head.version),
        None => println!("no manifest yet"),
    }
    for entry in manifest.entries() {
        println!("  level {:>3}  {}", entry.level, entry.address);
    }
    println!(
        "settled digests: {}, pending: {}",
        engine.accumulator().settled_digests(),
        engine.pending_len()
    );
    Ok(())
}
