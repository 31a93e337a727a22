//! Command-line front-end: thin adapters over the library API.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use hmsearch::{format_hex, parse_hex, HmIndex, OpenMode};

#[derive(Parser)]
#[command(name = "hmsearch", about = "Hamming-distance hash index", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Create and initialise a new database.
    Initdb {
        path: PathBuf,
        /// Hash width in bits; a positive multiple of 8.
        hash_bits: u32,
        /// Largest Hamming distance lookups will answer.
        max_error: u32,
        /// Expected number of hashes (backend sizing hint).
        num_hashes: u64,
    },
    /// Insert hashes given as hex arguments, or one per line on stdin.
    Insert {
        path: PathBuf,
        hashes: Vec<String>,
    },
    /// Look up hashes, printing `HEX DISTANCE` for every match.
    Lookup {
        path: PathBuf,
        hashes: Vec<String>,
    },
    /// Print every partition bucket, for debugging.
    Dump { path: PathBuf },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("hmsearch: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.cmd {
        Cmd::Initdb {
            path,
            hash_bits,
            max_error,
            num_hashes,
        } => {
            HmIndex::init(&path, hash_bits, max_error, num_hashes)
                .with_context(|| path.display().to_string())?;
        }

        Cmd::Insert { path, hashes } => {
            let mut db = HmIndex::open(&path, OpenMode::ReadWrite)
                .with_context(|| path.display().to_string())?;
            for hexhash in each_hash(hashes)? {
                // Bad items are reported and skipped; store failures
                // abort.
                match parse_hex(&hexhash) {
                    Ok(hash) => match db.insert(&hash) {
                        Ok(()) => {}
                        Err(hmsearch::HmError::InvalidInput(e)) => {
                            eprintln!("hmsearch: {hexhash}: {e}");
                        }
                        Err(e) => return Err(e).with_context(|| hexhash.clone()),
                    },
                    Err(e) => eprintln!("hmsearch: {e}"),
                }
            }
            db.close().context("closing database")?;
        }

        Cmd::Lookup { path, hashes } => {
            let db = HmIndex::open(&path, OpenMode::ReadOnly)
                .with_context(|| path.display().to_string())?;
            let stdout = io::stdout();
            let mut out = stdout.lock();
            for hexhash in each_hash(hashes)? {
                let query = parse_hex(&hexhash)?;
                for hit in db.lookup(&query, None).with_context(|| hexhash.clone())? {
                    writeln!(out, "{} {}", format_hex(&hit.hash), hit.distance)?;
                }
            }
        }

        Cmd::Dump { path } => {
            let db = HmIndex::open(&path, OpenMode::ReadOnly)
                .with_context(|| path.display().to_string())?;
            let stdout = io::stdout();
            db.dump(&mut stdout.lock())?;
        }
    }
    Ok(())
}

/// Hashes from the argument list, or whitespace-separated from stdin
/// when no arguments were given.
fn each_hash(args: Vec<String>) -> Result<Vec<String>> {
    if !args.is_empty() {
        return Ok(args);
    }
    let mut hashes = Vec::new();
    for line in io::stdin().lock().lines() {
        let line = line.context("reading stdin")?;
        hashes.extend(line.split_whitespace().map(str::to_owned));
    }
    Ok(hashes)
}
