use std::collections::HashMap;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::extractor::SeriesMatcher;

pub const ATCODER_BASE_URL: &str = "https://atcoder.jp";

/// Contest names of the tracked series. The single capture group is the contest number.
pub const ABC_SERIES_PATTERN: &str = r"AtCoder Beginner Contest (\d+)";

/// Unrated participations are dropped only when the user was below this rating.
pub const UNRATED_RATING_THRESHOLD: i64 = 2000;

/// Remote table holding one row per (user, abc).
pub const CONTEST_RESULT_TABLE: &str = "contest_result";

/// HTTP timeout for both the history endpoint and the remote table.
pub const HTTP_TIMEOUT_SECS: u64 = 30;

pub const WINDOW_UNBOUNDED_START: &str = "000000";
pub const WINDOW_UNBOUNDED_END: &str = "999999";

#[derive(Debug, Clone, Parser)]
#[command(name = "contest-sync")]
#[command(about = "Sync AtCoder Beginner Contest results into the contest_result table")]
pub struct Args {
    /// Remote table endpoint: a Supabase project URL, or `sqlite:<path>` for a local mirror.
    /// Not needed with --dry-run.
    #[arg(env = "SUPABASE_URL")]
    pub database_url: Option<String>,

    /// Access key for the Supabase REST API
    #[arg(env = "SUPABASE_KEY")]
    pub api_key: Option<String>,

    /// JSON array of AtCoder user names
    #[arg(long, env = "USERS_FILE", default_value = "users.json")]
    pub users_file: PathBuf,

    /// JSON object mapping user -> {"start": "YYYYMM", "end": "YYYYMM"}
    #[arg(long, env = "PERIODS_FILE", default_value = "user_periods.json")]
    pub periods_file: PathBuf,

    #[arg(long, env = "ATCODER_BASE_URL", default_value = ATCODER_BASE_URL)]
    pub history_base_url: String,

    /// Regex with one capture group that yields the contest number
    #[arg(long, default_value = ABC_SERIES_PATTERN)]
    pub series_pattern: String,

    /// Fetch and transform only, never touch the remote table
    #[arg(long)]
    pub dry_run: bool,

    /// Write every user's derived records to this file as JSON
    #[arg(long)]
    pub dump: Option<PathBuf>,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Inclusive `[start, end]` range of `YYYYMM` periods a user's contests are counted in.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccountingWindow {
    #[serde(default = "unbounded_start")]
    pub start: String,
    #[serde(default = "unbounded_end")]
    pub end: String,
}

fn unbounded_start() -> String {
    WINDOW_UNBOUNDED_START.to_string()
}

fn unbounded_end() -> String {
    WINDOW_UNBOUNDED_END.to_string()
}

impl Default for AccountingWindow {
    fn default() -> Self {
        Self::new(WINDOW_UNBOUNDED_START, WINDOW_UNBOUNDED_END)
    }
}

impl AccountingWindow {
    pub fn new(start: &str, end: &str) -> Self {
        Self {
            start: start.to_string(),
            end: end.to_string(),
        }
    }

    /// Both bounds and `period` are fixed-width `YYYYMM`, so string order is date order.
    pub fn contains(&self, period: &str) -> bool {
        period >= self.start.as_str() && period <= self.end.as_str()
    }

    fn validate(&self, user: &str) -> Result<()> {
        for bound in [&self.start, &self.end] {
            if bound.len() != 6 || !bound.bytes().all(|b| b.is_ascii_digit()) {
                return Err(AppError::Config(format!(
                    "period bound {bound:?} for {user} is not YYYYMM"
                )));
            }
        }
        if self.start > self.end {
            return Err(AppError::Config(format!(
                "period for {user} starts ({}) after it ends ({})",
                self.start, self.end
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub api_key: Option<String>,
    pub history_base_url: String,
    pub users: Vec<String>,
    pub windows: HashMap<String, AccountingWindow>,
    pub series: SeriesMatcher,
    pub dry_run: bool,
    pub dump: Option<PathBuf>,
}

impl Config {
    pub fn load(args: Args) -> Result<Self> {
        let users = parse_users(&read_file(&args.users_file)?)?;
        if users.is_empty() {
            return Err(AppError::Config(format!(
                "{} lists no users",
                args.users_file.display()
            )));
        }

        let windows = if args.periods_file.exists() {
            parse_windows(&read_file(&args.periods_file)?)?
        } else {
            HashMap::new()
        };

        Ok(Self {
            database_url: args.database_url.filter(|u| !u.is_empty()),
            api_key: args.api_key.filter(|k| !k.is_empty()),
            history_base_url: args.history_base_url,
            users,
            windows,
            series: SeriesMatcher::new(&args.series_pattern)?,
            dry_run: args.dry_run,
            dump: args.dump,
        })
    }

    /// Users without an entry are counted over every period.
    pub fn window_for(&self, user: &str) -> AccountingWindow {
        self.windows.get(user).cloned().unwrap_or_default()
    }
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))
}

pub fn parse_users(raw: &str) -> Result<Vec<String>> {
    let users: Vec<String> = serde_json::from_str(raw)?;
    Ok(users
        .into_iter()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .collect())
}

pub fn parse_windows(raw: &str) -> Result<HashMap<String, AccountingWindow>> {
    let windows: HashMap<String, AccountingWindow> = serde_json::from_str(raw)?;
    for (user, window) in &windows {
        window.validate(user)?;
    }
    Ok(windows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_bounds_are_inclusive() {
        let w = AccountingWindow::new("202304", "202503");
        assert!(w.contains("202304"));
        assert!(w.contains("202503"));
        assert!(!w.contains("202303"));
        assert!(!w.contains("202604"));
    }

    #[test]
    fn default_window_is_unbounded() {
        let w = AccountingWindow::default();
        assert!(w.contains("000001"));
        assert!(w.contains("209912"));
    }

    #[test]
    fn parse_windows_fills_missing_bounds() {
        let windows = parse_windows(
            r#"{
                "alice": {"start": "202304", "end": "202703"},
                "bob": {"start": "202404"}
            }"#,
        )
        .unwrap();
        assert_eq!(windows["alice"], AccountingWindow::new("202304", "202703"));
        assert_eq!(windows["bob"].start, "202404");
        assert_eq!(windows["bob"].end, WINDOW_UNBOUNDED_END);
    }

    #[test]
    fn parse_windows_rejects_bad_bounds() {
        let err = parse_windows(r#"{"alice": {"start": "2023-04", "end": "202703"}}"#).unwrap_err();
        assert!(matches!(err, AppError::Config(_)), "got {err}");

        let err = parse_windows(r#"{"alice": {"start": "202704", "end": "202303"}}"#).unwrap_err();
        assert!(matches!(err, AppError::Config(_)), "got {err}");
    }

    #[test]
    fn parse_users_skips_blank_entries() {
        let users = parse_users(r#"["lX57", " ", "ngng628 "]"#).unwrap();
        assert_eq!(users, vec!["lX57".to_string(), "ngng628".to_string()]);
    }

    #[test]
    fn args_accept_positional_endpoint_and_key() {
        let args = Args::try_parse_from([
            "contest-sync",
            "https://example.supabase.co",
            "secret",
            "--dry-run",
        ])
        .unwrap();
        assert_eq!(args.database_url.as_deref(), Some("https://example.supabase.co"));
        assert_eq!(args.api_key.as_deref(), Some("secret"));
        assert!(args.dry_run);
        assert_eq!(args.series_pattern, ABC_SERIES_PATTERN);
    }

    #[test]
    fn dry_run_needs_no_endpoint() {
        let args = Args::try_parse_from(["contest-sync", "--dry-run"]).unwrap();
        assert!(args.dry_run);
    }

    #[test]
    fn window_for_unknown_user_is_unbounded() {
        let cfg = Config {
            database_url: Some("sqlite::memory:".to_string()),
            api_key: None,
            history_base_url: ATCODER_BASE_URL.to_string(),
            users: vec!["alice".to_string()],
            windows: parse_windows(r#"{"alice": {"start": "202304", "end": "202503"}}"#).unwrap(),
            series: SeriesMatcher::new(ABC_SERIES_PATTERN).unwrap(),
            dry_run: true,
            dump: None,
        };
        assert_eq!(cfg.window_for("alice"), AccountingWindow::new("202304", "202503"));
        assert_eq!(cfg.window_for("carol"), AccountingWindow::default());
    }
}
