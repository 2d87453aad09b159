//! Command-line and environment configuration.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::Parser;
use services::PracticeConfig;
use thiserror::Error;

/// Upper bound for the start offset: one day.
pub const MAX_START_OFFSET_SECS: i64 = 86_400;

/// Student practice portal HTTP server.
#[derive(Parser, Debug, Clone)]
#[command(name = "server")]
#[command(about = "Serves practice question batches and tracks practice sessions")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// SQLite database URL or path
    #[arg(long = "db", env = "PORTAL_DB_URL", default_value = "sqlite://portal.sqlite3")]
    pub db_url: String,

    /// Seconds added to the request time to form a session's start time
    #[arg(long, env = "SESSION_START_OFFSET_SECS", default_value_t = 5)]
    pub start_offset_secs: i64,

    /// Load the demo question bank at startup
    #[arg(long, env = "USE_SEED_DATA", default_value = "false")]
    pub seed: bool,

    /// Questions per empty demo format when seeding
    #[arg(long, env = "SEED_PER_FORMAT", default_value_t = 12)]
    pub seed_per_format: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("SESSION_START_OFFSET_SECS must not be negative (got {0})")]
    NegativeOffset(i64),
    #[error("SESSION_START_OFFSET_SECS must be at most {MAX_START_OFFSET_SECS} (got {0})")]
    OffsetTooLarge(i64),
    #[error("invalid database url: {0}")]
    InvalidDbUrl(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Args {
    /// # Errors
    ///
    /// Returns `ConfigError` for values clap cannot reject on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.start_offset_secs < 0 {
            return Err(ConfigError::NegativeOffset(self.start_offset_secs));
        }
        if self.start_offset_secs > MAX_START_OFFSET_SECS {
            return Err(ConfigError::OffsetTooLarge(self.start_offset_secs));
        }
        if self.db_url.trim().is_empty() {
            return Err(ConfigError::InvalidDbUrl(self.db_url.clone()));
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `ConfigError` if the offset fails [`Args::validate`].
    pub fn practice_config(&self) -> Result<PracticeConfig, ConfigError> {
        self.validate()?;
        let start_offset = chrono::Duration::try_seconds(self.start_offset_secs)
            .ok_or(ConfigError::OffsetTooLarge(self.start_offset_secs))?;
        Ok(PracticeConfig { start_offset })
    }

    /// Filter used when `RUST_LOG` is unset.
    #[must_use]
    pub fn default_log_filter(&self) -> String {
        let level = &self.log_level;
        format!("server={level},services={level},storage={level}")
    }
}

/// Turn a bare path or `sqlite:` URL into an absolute `sqlite://` URL.
#[must_use]
pub fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite://") {
        return trimmed.to_string();
    }

    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Create the database file (and its parent directory) if missing, since
/// the driver will not create it for a plain `sqlite://` URL.
///
/// # Errors
///
/// Returns `ConfigError` if the URL has no path or the file cannot be created.
pub fn prepare_sqlite_file(db_url: &str) -> Result<(), ConfigError> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ConfigError::InvalidDbUrl(db_url.to_string()))?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ConfigError::InvalidDbUrl(db_url.to_string()));
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let args = Args::parse_from(["server"]);
        assert_eq!(args.listen.port(), 8080);
        assert_eq!(args.start_offset_secs, 5);
        assert!(!args.seed);
        assert_eq!(
            args.practice_config().unwrap().start_offset,
            chrono::Duration::seconds(5)
        );
        assert_eq!(
            args.default_log_filter(),
            "server=info,services=info,storage=info"
        );
    }

    #[test]
    fn negative_offset_is_rejected() {
        let args = Args::parse_from(["server", "--start-offset-secs=-1"]);
        assert!(matches!(
            args.validate(),
            Err(ConfigError::NegativeOffset(-1))
        ));
    }

    #[test]
    fn oversized_offset_is_rejected_before_use() {
        let args = Args::parse_from(["server", "--start-offset-secs=10000000000000"]);
        assert!(matches!(
            args.validate(),
            Err(ConfigError::OffsetTooLarge(10_000_000_000_000))
        ));
        assert!(args.practice_config().is_err());

        let args = Args::parse_from(["server", "--start-offset-secs=86400"]);
        assert_eq!(
            args.practice_config().unwrap().start_offset,
            chrono::Duration::days(1)
        );
    }

    #[test]
    fn relative_paths_become_absolute_urls() {
        assert_eq!(normalize_sqlite_url("sqlite::memory:"), "sqlite::memory:");
        assert_eq!(
            normalize_sqlite_url("sqlite:///tmp/p.db"),
            "sqlite:///tmp/p.db"
        );
        assert_eq!(normalize_sqlite_url("/tmp/p.db"), "sqlite:///tmp/p.db");
        assert!(normalize_sqlite_url("sqlite:p.db").starts_with("sqlite:///"));
    }
}
