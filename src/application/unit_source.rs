// Source of selectable target units
use crate::domain::unit::UnitRecord;
use async_trait::async_trait;

#[async_trait]
pub trait UnitSource: Send + Sync {
    /// Fetch the raw unit list once
    async fn fetch_units(&self) -> anyhow::Result<Vec<UnitRecord>>;
}
