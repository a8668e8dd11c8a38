use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::info;

use crate::db::{ContestResultRow, ResultStore};
use crate::error::Result;

/// Local SQLite mirror of `contest_result`, schema in `migrations/`.
pub struct SqliteStore {
    pool: sqlx::SqlitePool,
}

impl SqliteStore {
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        // One connection: the sync is sequential, and `sqlite::memory:` is per-connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Database ready at {url}");
        Ok(Self { pool })
    }
}

impl ResultStore for SqliteStore {
    async fn find(&self, user: &str, abc: i64) -> Result<Option<ContestResultRow>> {
        let row = sqlx::query_as::<_, ContestResultRow>(
            r#"
            SELECT "user", abc, general_place, old_rating, new_rating,
                   highest, performance, season, update_highest
            FROM contest_result
            WHERE "user" = ? AND abc = ?
            "#,
        )
        .bind(user)
        .bind(abc)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert(&self, row: &ContestResultRow) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO contest_result (
                "user", abc, general_place, old_rating, new_rating,
                highest, performance, season, update_highest
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.user)
        .bind(row.abc)
        .bind(row.general_place)
        .bind(row.old_rating)
        .bind(row.new_rating)
        .bind(row.highest)
        .bind(row.performance)
        .bind(&row.season)
        .bind(row.update_highest)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, row: &ContestResultRow) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE contest_result SET
                general_place = ?, old_rating = ?, new_rating = ?,
                highest = ?, performance = ?, season = ?, update_highest = ?
            WHERE "user" = ? AND abc = ?
            "#,
        )
        .bind(row.general_place)
        .bind(row.old_rating)
        .bind(row.new_rating)
        .bind(row.highest)
        .bind(row.performance)
        .bind(&row.season)
        .bind(row.update_highest)
        .bind(&row.user)
        .bind(row.abc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
