use anyhow::Result;
use tracing::info;

use super::{RecordStore, parse_documents};
use crate::fetch::{HttpClient, fetch_bytes};
use crate::record::RawRecord;

/// Fetches a document export from a URL.
pub struct HttpJsonStore<C> {
    client: C,
    url: String,
}

impl<C: HttpClient> HttpJsonStore<C> {
    pub fn new(client: C, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait::async_trait]
impl<C: HttpClient> RecordStore for HttpJsonStore<C> {
    #[tracing::instrument(skip(self), fields(url = %self.url))]
    async fn fetch_all_records(&self) -> Result<Vec<RawRecord>> {
        let bytes = fetch_bytes(&self.client, &self.url).await?;
        let records = parse_documents(&bytes)?;
        info!(record_count = records.len(), bytes = bytes.len(), "Fetched documents");
        Ok(records)
    }
}
