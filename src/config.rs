use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::models::Importance;
use crate::scheduler::IntervalTable;

pub const DEFAULT_DB_NAME: &str = "lc_tracker.db";
pub const DEFAULT_BACKUP_KEEP: usize = 2;
pub const DEFAULT_LOG_FILTER: &str = "warn";
pub const TUI_LOG_NAME: &str = "lctrack.log";

pub const DEFAULT_TAGS: &[&str] = &[
    "Array",
    "DP",
    "Greedy",
    "HashMap",
    "Two Pointers",
    "Sliding Window",
    "Graph",
    "Tree",
    "Stack",
    "Binary Search",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: PathBuf,
    pub backup_dir: PathBuf,
    pub backup_keep: usize,
    pub log_filter: String,
    /// Log destination while the TUI holds the terminal.
    pub tui_log_path: PathBuf,
    pub default_tags: Vec<String>,
    pub intervals: IntervalTable,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let db_path = match std::env::var("LCTRACK_DB") {
            Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
            _ => default_db_path(),
        };

        let backup_dir = match std::env::var("LCTRACK_BACKUP_DIR") {
            Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => db_path
                .parent()
                .map(|p| p.join("backups"))
                .unwrap_or_else(|| PathBuf::from("backups")),
        };

        let backup_keep = std::env::var("LCTRACK_BACKUP_KEEP")
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_BACKUP_KEEP);

        let log_filter =
            std::env::var("LCTRACK_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());

        let tui_log_path = db_path
            .parent()
            .map(|p| p.join(TUI_LOG_NAME))
            .unwrap_or_else(|| PathBuf::from(TUI_LOG_NAME));

        Ok(Self {
            db_path,
            backup_dir,
            backup_keep,
            log_filter,
            tui_log_path,
            default_tags: DEFAULT_TAGS.iter().map(|t| t.to_string()).collect(),
            intervals: intervals_from_env()?,
        })
    }

    /// Create the directory holding the database file.
    pub fn ensure_db_dir(&self) -> Result<()> {
        match self.db_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => Ok(std::fs::create_dir_all(dir)?),
            _ => Ok(()),
        }
    }
}

fn interval_var(tier: Importance) -> &'static str {
    match tier {
        Importance::Low => "LCTRACK_INTERVALS_LOW",
        Importance::Medium => "LCTRACK_INTERVALS_MEDIUM",
        Importance::High => "LCTRACK_INTERVALS_HIGH",
    }
}

// Unset tiers keep their default sequence.
fn intervals_from_env() -> Result<IntervalTable> {
    let defaults = IntervalTable::default();
    let read = |tier: Importance| -> Result<Vec<u32>> {
        match std::env::var(interval_var(tier)) {
            Ok(raw) if !raw.trim().is_empty() => parse_intervals(tier, &raw),
            _ => Ok(defaults.sequence(tier).to_vec()),
        }
    };

    IntervalTable::new(
        read(Importance::Low)?,
        read(Importance::Medium)?,
        read(Importance::High)?,
    )
}

/// Comma-separated day counts, e.g. `1,3,7,14`.
pub fn parse_intervals(tier: Importance, raw: &str) -> Result<Vec<u32>> {
    raw.split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<u32>().map_err(|_| Error::InvalidIntervals {
                tier,
                reason: format!("'{}' is not a whole number of days", part),
            })
        })
        .collect()
}

fn default_db_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lc-tracker")
        .join(DEFAULT_DB_NAME)
}
