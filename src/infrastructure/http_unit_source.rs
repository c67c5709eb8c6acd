// HTTP implementation of the unit directory source
use crate::application::unit_source::UnitSource;
use crate::domain::unit::UnitRecord;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpUnitSource {
    client: reqwest::Client,
    url: String,
}

impl HttpUnitSource {
    pub fn new(base_url: &str, units_path: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            url: units_url(base_url, units_path),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// `{base_url}/api/{units_path}`
pub fn units_url(base_url: &str, units_path: &str) -> String {
    format!(
        "{}/api/{}",
        base_url.trim_end_matches('/'),
        units_path.trim_start_matches('/')
    )
}

#[async_trait]
impl UnitSource for HttpUnitSource {
    async fn fetch_units(&self) -> Result<Vec<UnitRecord>> {
        tracing::debug!("Fetching units from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to send request to unit directory")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Unit directory request failed with status {}: {}", status, body);
        }

        // A `null` body is treated like an empty list
        let records = response
            .json::<Option<Vec<UnitRecord>>>()
            .await
            .context("Failed to parse unit directory response")?;

        Ok(records.unwrap_or_default())
    }
}
