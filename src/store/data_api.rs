use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use super::{RecordStore, parse_documents};
use crate::config::StoreConfig;
use crate::fetch::auth::ApiKey;
use crate::fetch::{BasicClient, HttpClient, post_json};
use crate::record::RawRecord;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FindRequest<'a> {
    data_source: &'a str,
    database: &'a str,
    collection: &'a str,
    filter: Map<String, Value>,
    sort: Value,
    limit: usize,
    skip: usize,
}

/// Documents requested per `find` call. The data API caps a single
/// response, so the collection is read page by page.
const DEFAULT_PAGE_SIZE: usize = 1000;

/// Reads the whole collection through a document-store data API
/// (`POST {endpoint}/action/find`).
pub struct DataApiStore<C> {
    client: C,
    config: StoreConfig,
    page_size: usize,
}

impl DataApiStore<ApiKey<BasicClient>> {
    /// Builds a store that authenticates with the configured API key.
    pub fn from_config(config: StoreConfig) -> Result<Self> {
        let client = ApiKey::data_api(BasicClient::new(), &config.api_key)
            .context("invalid data API key")?;
        Ok(Self::new(client, config))
    }
}

impl<C: HttpClient> DataApiStore<C> {
    pub fn new(client: C, config: StoreConfig) -> Self {
        Self {
            client,
            config,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn find_url(&self) -> String {
        format!("{}/action/find", self.config.endpoint.trim_end_matches('/'))
    }

    fn find_request(&self, skip: usize) -> FindRequest<'_> {
        FindRequest {
            data_source: &self.config.data_source,
            database: &self.config.database,
            collection: &self.config.collection,
            filter: Map::new(),
            sort: json!({ "_id": 1 }),
            limit: self.page_size,
            skip,
        }
    }
}

#[async_trait::async_trait]
impl<C: HttpClient> RecordStore for DataApiStore<C> {
    #[tracing::instrument(
        skip(self),
        fields(database = %self.config.database, collection = %self.config.collection)
    )]
    async fn fetch_all_records(&self) -> Result<Vec<RawRecord>> {
        let url = self.find_url();
        let mut records = Vec::new();
        let mut pages = 0usize;

        loop {
            let skip = records.len();
            let bytes = post_json(&self.client, &url, &self.find_request(skip))
                .await
                .with_context(|| format!("data API find request failed (skip {})", skip))?;
            let page = parse_documents(&bytes)?;
            let page_len = page.len();
            pages += 1;
            debug!(skip, page_len, "Fetched data API page");

            records.extend(page);
            if page_len < self.page_size {
                break;
            }
        }

        info!(record_count = records.len(), pages, "Fetched documents from data API");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Serves `total` numbered documents, honoring `skip` and `limit`.
    struct PagedCollection {
        total: usize,
        requests: Mutex<Vec<(usize, usize)>>,
    }

    impl PagedCollection {
        fn new(total: usize) -> Self {
            Self {
                total,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl HttpClient for PagedCollection {
        async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            let body: Value = req
                .body()
                .and_then(|b| b.as_bytes())
                .map(|bytes| serde_json::from_slice(bytes).unwrap())
                .unwrap();
            let skip = body["skip"].as_u64().unwrap() as usize;
            let limit = body["limit"].as_u64().unwrap() as usize;
            self.requests.lock().unwrap().push((skip, limit));

            let documents: Vec<Value> = (skip..self.total.min(skip + limit))
                .map(|i| json!({ "_id": i, "cctv_no": "A", "n": i }))
                .collect();
            let payload = json!({ "documents": documents }).to_string();
            Ok(http::Response::new(payload).into())
        }
    }

    fn config() -> StoreConfig {
        StoreConfig {
            endpoint: "https://data.example.com/app/v1/".to_string(),
            api_key: "secret".to_string(),
            data_source: "Cluster0".to_string(),
            database: "cctv_data".to_string(),
            collection: "cctv_records".to_string(),
        }
    }

    #[test]
    fn test_find_url_and_body() {
        let store = DataApiStore::from_config(config()).unwrap();
        assert_eq!(store.find_url(), "https://data.example.com/app/v1/action/find");
        assert_eq!(
            serde_json::to_value(store.find_request(2000)).unwrap(),
            json!({
                "dataSource": "Cluster0",
                "database": "cctv_data",
                "collection": "cctv_records",
                "filter": {},
                "sort": {"_id": 1},
                "limit": 1000,
                "skip": 2000
            })
        );
    }

    #[tokio::test]
    async fn test_fetch_reads_every_page() {
        let store = DataApiStore::new(PagedCollection::new(5), config()).with_page_size(2);
        let records = store.fetch_all_records().await.unwrap();

        let seen: Vec<_> = records.iter().map(|r| r["n"].as_u64().unwrap()).collect();
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
        assert!(records.iter().all(|r| !r.contains_key("_id")));
        assert_eq!(
            *store.client.requests.lock().unwrap(),
            vec![(0, 2), (2, 2), (4, 2)]
        );
    }

    #[tokio::test]
    async fn test_fetch_stops_after_empty_page() {
        let store = DataApiStore::new(PagedCollection::new(4), config()).with_page_size(2);
        let records = store.fetch_all_records().await.unwrap();

        assert_eq!(records.len(), 4);
        assert_eq!(store.client.requests.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_invalid_key_is_rejected() {
        let mut bad = config();
        bad.api_key = "new\nline".to_string();
        assert!(DataApiStore::from_config(bad).is_err());
    }
}
