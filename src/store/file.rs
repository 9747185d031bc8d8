use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

use super::{RecordStore, parse_documents};
use crate::record::RawRecord;

/// Reads documents from a JSON / NDJSON export on disk.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl RecordStore for JsonFileStore {
    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    async fn fetch_all_records(&self) -> Result<Vec<RawRecord>> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let records = parse_documents(&bytes)?;
        info!(record_count = records.len(), "Loaded documents from file");
        Ok(records)
    }
}
