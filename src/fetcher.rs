use std::time::Duration;

use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::config::HTTP_TIMEOUT_SECS;
use crate::error::Result;
use crate::types::ContestRecord;

/// Pulls a user's public contest history from the history endpoint.
pub struct HistoryFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HistoryFetcher {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn history_url(&self, user: &str) -> String {
        format!("{}/users/{}/history/json", self.base_url, user)
    }

    /// Full history, oldest first. A non-200 answer is logged and yields an
    /// empty history so the remaining users still get processed; transport
    /// and decode failures are errors.
    pub async fn fetch_history(&self, user: &str) -> Result<Vec<ContestRecord>> {
        let url = self.history_url(user);
        let resp = self.client.get(&url).send().await?;

        let status = resp.status();
        if status != StatusCode::OK {
            warn!(
                user = %user,
                status = status.as_u16(),
                "Failed to fetch data for {user}: {}",
                status.as_u16()
            );
            return Ok(Vec::new());
        }

        let records: Vec<ContestRecord> = resp.json().await?;
        debug!(user = %user, count = records.len(), "Fetched {} history entries", records.len());
        Ok(records)
    }
}
