//! CLI entry point: download the configured batch over FTP and write every
//! record to stdout, one per line.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use tracing::{info, warn};

use ftp_ingest::config::FtpConfig;
use ftp_ingest::reader::{LineReaderFactory, ReadContext};
use ftp_ingest::source::FtpSource;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a JSON config file (defaults to the per-user config location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override a config property, e.g. -D host=ftp.example.com (repeatable,
    /// key is case-insensitive)
    #[arg(short = 'D', long = "property", value_name = "KEY=VALUE")]
    properties: Vec<String>,

    /// Pass only records at or after this RFC 3339 time to the reader
    #[arg(long)]
    since: Option<DateTime<Utc>>,

    /// Pass only records at or before this RFC 3339 time to the reader
    #[arg(long)]
    until: Option<DateTime<Utc>>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG takes priority over the verbosity flags.
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    // Logs go to stderr; stdout carries only records.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = FtpConfig::load(args.config.as_deref())?;
    for property in &args.properties {
        let Some((key, value)) = property.split_once('=') else {
            bail!("invalid property override '{property}', expected KEY=VALUE");
        };
        if !config.apply_property(key, value.trim()) {
            warn!(key, "ignoring unrecognized property");
        }
    }

    let context = ReadContext {
        since: args.since,
        until: args.until,
        filter_lists: Vec::new(),
    };
    let mut source = FtpSource::init(&config, context, Box::new(LineReaderFactory))?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut count = 0usize;
    while let Some(record) = source.next_record() {
        out.write_all(&record.data)?;
        out.write_all(b"\n")?;
        count += 1;
    }
    source.close();

    info!(records = count, "record stream complete");
    Ok(())
}
