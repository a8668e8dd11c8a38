pub mod models;
pub mod sqlite;
pub mod supabase;

pub use models::ContestResultRow;
pub use sqlite::SqliteStore;
pub use supabase::SupabaseStore;

use crate::config::Config;
use crate::error::{AppError, Result};

/// Keyed access to the `contest_result` table.
pub trait ResultStore {
    async fn find(&self, user: &str, abc: i64) -> Result<Option<ContestResultRow>>;
    async fn insert(&self, row: &ContestResultRow) -> Result<()>;
    /// Overwrite the row with the same `(user, abc)`.
    async fn update(&self, row: &ContestResultRow) -> Result<()>;
}

/// The table backend selected by the database URL.
pub enum Backend {
    Supabase(SupabaseStore),
    Sqlite(SqliteStore),
}

impl Backend {
    pub async fn connect(cfg: &Config) -> Result<Self> {
        let url = cfg.database_url.as_deref().ok_or_else(|| {
            AppError::Config("a database URL is required unless --dry-run is set".to_string())
        })?;

        if url.starts_with("sqlite:") {
            return Ok(Backend::Sqlite(SqliteStore::connect(url).await?));
        }

        let api_key = cfg.api_key.as_deref().ok_or_else(|| {
            AppError::Config("an API key is required for the Supabase backend".to_string())
        })?;
        Ok(Backend::Supabase(SupabaseStore::new(url, api_key)?))
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Backend::Supabase(_) => "supabase",
            Backend::Sqlite(_) => "sqlite",
        }
    }
}

impl ResultStore for Backend {
    async fn find(&self, user: &str, abc: i64) -> Result<Option<ContestResultRow>> {
        match self {
            Backend::Supabase(s) => s.find(user, abc).await,
            Backend::Sqlite(s) => s.find(user, abc).await,
        }
    }

    async fn insert(&self, row: &ContestResultRow) -> Result<()> {
        match self {
            Backend::Supabase(s) => s.insert(row).await,
            Backend::Sqlite(s) => s.insert(row).await,
        }
    }

    async fn update(&self, row: &ContestResultRow) -> Result<()> {
        match self {
            Backend::Supabase(s) => s.update(row).await,
            Backend::Sqlite(s) => s.update(row).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ABC_SERIES_PATTERN, ATCODER_BASE_URL};
    use crate::extractor::SeriesMatcher;
    use std::collections::HashMap;

    fn config(database_url: Option<&str>, api_key: Option<&str>) -> Config {
        Config {
            database_url: database_url.map(str::to_string),
            api_key: api_key.map(str::to_string),
            history_base_url: ATCODER_BASE_URL.to_string(),
            users: vec!["alice".to_string()],
            windows: HashMap::new(),
            series: SeriesMatcher::new(ABC_SERIES_PATTERN).unwrap(),
            dry_run: false,
            dump: None,
        }
    }

    #[tokio::test]
    async fn connect_requires_database_url() {
        let err = Backend::connect(&config(None, Some("secret"))).await.err().unwrap();
        assert!(matches!(err, AppError::Config(_)), "got {err}");
    }

    #[tokio::test]
    async fn connect_requires_key_for_supabase() {
        let err = Backend::connect(&config(Some("https://example.supabase.co"), None))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AppError::Config(_)), "got {err}");
    }

    #[tokio::test]
    async fn connect_selects_backend_from_url() {
        let sqlite = Backend::connect(&config(Some("sqlite::memory:"), None)).await.unwrap();
        assert_eq!(sqlite.describe(), "sqlite");

        let supabase = Backend::connect(&config(Some("https://example.supabase.co"), Some("secret")))
            .await
            .unwrap();
        assert_eq!(supabase.describe(), "supabase");
    }
}
