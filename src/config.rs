use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Environment variable names
pub mod env_vars {
    /// Path of a JSON file with [`super::CatalogConfig`] overrides.
    pub const CONFIG_PATH: &str = "NOTEBOOK_CATALOG_CONFIG";
    /// Log filter, `env_logger` syntax.
    pub const LOG: &str = "NOTEBOOK_CATALOG_LOG";
}

/// Default values
pub mod defaults {
    pub const LIST_PAGE_SIZE: usize = 40;
    pub const LINKED_LIST_PAGE_SIZE: usize = 40;
    pub const RECORD_CACHE_CAPACITY: u64 = 100;
    pub const ALL_NOTEBOOKS_LABEL: &str = crate::catalog::DEFAULT_ALL_NOTEBOOKS_LABEL;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub list_page_size: usize,
    pub linked_list_page_size: usize,
    pub record_cache_capacity: u64,
    /// Whether notebooks created locally are queued for sync.
    pub new_notebooks_synchronizable: bool,
    pub track_note_counts: bool,
    pub all_notebooks_label: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            list_page_size: defaults::LIST_PAGE_SIZE,
            linked_list_page_size: defaults::LINKED_LIST_PAGE_SIZE,
            record_cache_capacity: defaults::RECORD_CACHE_CAPACITY,
            new_notebooks_synchronizable: false,
            track_note_counts: true,
            all_notebooks_label: defaults::ALL_NOTEBOOKS_LABEL.to_string(),
        }
    }
}

impl CatalogConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: CatalogConfig = serde_json::from_str(json)?;
        Ok(config.sanitized())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&content)?;
        log::info!("[Config] Loaded {}", path.display());
        Ok(config)
    }

    /// Config from the file named by `NOTEBOOK_CATALOG_CONFIG`, or defaults
    /// when unset or unreadable.
    pub fn from_env() -> Self {
        let Ok(path) = std::env::var(env_vars::CONFIG_PATH) else {
            return Self::default();
        };
        match Self::load(Path::new(&path)) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("[Config] Using defaults, can't load {}: {}", path, e);
                Self::default()
            }
        }
    }

    /// A page size of zero would never drain a listing.
    fn sanitized(mut self) -> Self {
        if self.list_page_size == 0 {
            log::warn!("[Config] list_page_size 0 replaced by {}", defaults::LIST_PAGE_SIZE);
            self.list_page_size = defaults::LIST_PAGE_SIZE;
        }
        if self.linked_list_page_size == 0 {
            log::warn!(
                "[Config] linked_list_page_size 0 replaced by {}",
                defaults::LINKED_LIST_PAGE_SIZE
            );
            self.linked_list_page_size = defaults::LINKED_LIST_PAGE_SIZE;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = CatalogConfig::default();
        assert_eq!(config.list_page_size, 40);
        assert_eq!(config.linked_list_page_size, 40);
        assert_eq!(config.record_cache_capacity, 100);
        assert!(!config.new_notebooks_synchronizable);
        assert!(config.track_note_counts);
        assert_eq!(config.all_notebooks_label, "All notebooks");
    }

    #[test]
    fn test_partial_json_keeps_other_defaults() {
        let config = CatalogConfig::from_json_str(r#"{"list_page_size": 10}"#).unwrap();
        assert_eq!(config.list_page_size, 10);
        assert_eq!(config.linked_list_page_size, 40);
    }

    #[test]
    fn test_zero_page_size_is_replaced() {
        let config = CatalogConfig::from_json_str(r#"{"list_page_size": 0}"#).unwrap();
        assert_eq!(config.list_page_size, defaults::LIST_PAGE_SIZE);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"all_notebooks_label": "Everything", "track_note_counts": false}}"#).unwrap();

        let config = CatalogConfig::load(file.path()).unwrap();
        assert_eq!(config.all_notebooks_label, "Everything");
        assert!(!config.track_note_counts);
    }

    #[test]
    fn test_bad_input_is_config_error() {
        let err = CatalogConfig::from_json_str("{ nope").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);

        let dir = tempfile::tempdir().unwrap();
        let err = CatalogConfig::load(&dir.path().join("missing.json")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
