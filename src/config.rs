use anyhow::{Context, Result};

/// Connection settings for the document-store data API.
///
/// Read from the environment (a `.env` file is loaded by the binary):
///
/// | Variable            | Default        |
/// |---------------------|----------------|
/// | `CCTV_DATA_API_URL` | required       |
/// | `CCTV_DATA_API_KEY` | required       |
/// | `CCTV_DATA_SOURCE`  | `Cluster0`     |
/// | `CCTV_DATABASE`     | `cctv_data`    |
/// | `CCTV_COLLECTION`   | `cctv_records` |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub endpoint: String,
    pub api_key: String,
    pub data_source: String,
    pub database: String,
    pub collection: String,
}

impl StoreConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let or = |name: &str, default: &str| get(name).unwrap_or_else(|| default.to_string());

        Ok(Self {
            endpoint: get("CCTV_DATA_API_URL").context("CCTV_DATA_API_URL must be set")?,
            api_key: get("CCTV_DATA_API_KEY").context("CCTV_DATA_API_KEY must be set")?,
            data_source: or("CCTV_DATA_SOURCE", "Cluster0"),
            database: or("CCTV_DATABASE", "cctv_data"),
            collection: or("CCTV_COLLECTION", "cctv_records"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_applied() {
        let config = StoreConfig::from_lookup(lookup(&[
            ("CCTV_DATA_API_URL", "https://data.example.com/app/v1"),
            ("CCTV_DATA_API_KEY", "k"),
        ]))
        .unwrap();
        assert_eq!(config.data_source, "Cluster0");
        assert_eq!(config.database, "cctv_data");
        assert_eq!(config.collection, "cctv_records");
    }

    #[test]
    fn test_overrides_and_blank_values() {
        let config = StoreConfig::from_lookup(lookup(&[
            ("CCTV_DATA_API_URL", "https://data.example.com/app/v1"),
            ("CCTV_DATA_API_KEY", "k"),
            ("CCTV_DATABASE", "traffic"),
            ("CCTV_COLLECTION", "  "),
        ]))
        .unwrap();
        assert_eq!(config.database, "traffic");
        assert_eq!(config.collection, "cctv_records");
    }

    #[test]
    fn test_missing_required_variables() {
        let err = StoreConfig::from_lookup(lookup(&[("CCTV_DATA_API_KEY", "k")])).unwrap_err();
        assert!(err.to_string().contains("CCTV_DATA_API_URL"));
        assert!(StoreConfig::from_lookup(lookup(&[("CCTV_DATA_API_URL", "u")])).is_err());
    }
}
