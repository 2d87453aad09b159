use std::fmt;

use storage::repository::Storage;
use storage::seed::seed_demo;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    per_format: usize,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidPerFormat { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidPerFormat { raw } => {
                write!(f, "invalid --per-format value: {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("PORTAL_DB_URL")
            .unwrap_or_else(|_| "sqlite://portal.sqlite3?mode=rwc".into());
        let mut per_format = std::env::var("PORTAL_SEED_PER_FORMAT")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(12);

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--per-format" => {
                    let value = require_value(&mut args, "--per-format")?;
                    per_format = value
                        .parse::<usize>()
                        .map_err(|_| ArgsError::InvalidPerFormat { raw: value.clone() })?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self { db_url, per_format })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>     SQLite URL (default: sqlite://portal.sqlite3?mode=rwc)");
    eprintln!("  --per-format <n>      Questions per empty demo format (default: 12)");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  PORTAL_DB_URL, PORTAL_SEED_PER_FORMAT");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let report = seed_demo(&storage, args.per_format).await?;

    println!(
        "Seeded {} formats ({} questions inserted, {} formats already populated) into {}",
        report.formats, report.questions_inserted, report.formats_skipped, args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
