use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response};

use crate::config::{CONTEST_RESULT_TABLE, HTTP_TIMEOUT_SECS};
use crate::db::{ContestResultRow, ResultStore};
use crate::error::{AppError, Result};

/// `contest_result` behind Supabase's PostgREST API (`/rest/v1/<table>`).
pub struct SupabaseStore {
    client: reqwest::Client,
    table_url: String,
    api_key: String,
}

impl SupabaseStore {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            table_url: format!(
                "{}/rest/v1/{}",
                base_url.trim_end_matches('/'),
                CONTEST_RESULT_TABLE
            ),
            api_key: api_key.to_string(),
        })
    }

    fn request(&self, method: Method) -> RequestBuilder {
        self.client
            .request(method, &self.table_url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    fn key_filter(user: &str, abc: i64) -> [(&'static str, String); 2] {
        [("user", format!("eq.{user}")), ("abc", format!("eq.{abc}"))]
    }
}

async fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(AppError::Remote { status, body })
}

impl ResultStore for SupabaseStore {
    async fn find(&self, user: &str, abc: i64) -> Result<Option<ContestResultRow>> {
        let resp = self
            .request(Method::GET)
            .query(&[("select", "*")])
            .query(&Self::key_filter(user, abc))
            .send()
            .await?;
        let rows: Vec<ContestResultRow> = check(resp).await?.json().await?;
        Ok(rows.into_iter().next())
    }

    async fn insert(&self, row: &ContestResultRow) -> Result<()> {
        let resp = self
            .request(Method::POST)
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    async fn update(&self, row: &ContestResultRow) -> Result<()> {
        let resp = self
            .request(Method::PATCH)
            .header("Prefer", "return=minimal")
            .query(&Self::key_filter(&row.user, row.abc))
            .json(row)
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }
}
