use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::knowledge::{SourceConfig, SourceKind};
use crate::semantic::{
    RankOptions, DEFAULT_MIN_SCORE, DEFAULT_MODEL, DEFAULT_RECOMMEND_LIMIT, DEFAULT_SEARCH_LIMIT,
};

const CONFIG_FILE: &str = "config.yaml";

/// Default model download timeout in seconds
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 300;

const DEFAULT_LISTEN: &str = "0.0.0.0:8080";

const DEFAULT_LAWS_FILE: &str = "laws_with_embeddings.json";
const DEFAULT_SCHEMES_FILE: &str = "schemes_with_embeddings.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config is malformed: {0}")]
    Parse(#[from] serde_yml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Configuration for query-time ranking
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Model name for embeddings (e.g., "all-MiniLM-L6-v2")
    #[serde(default = "default_model")]
    pub model: String,

    /// Relevance floor; only scores strictly above it are returned
    #[serde(default = "default_min_score")]
    pub min_score: f32,

    /// Maximum number of search results
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Maximum number of recommendations
    #[serde(default = "default_recommend_limit")]
    pub recommend_limit: usize,

    /// Timeout for model download in seconds
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            min_score: DEFAULT_MIN_SCORE,
            limit: DEFAULT_SEARCH_LIMIT,
            recommend_limit: DEFAULT_RECOMMEND_LIMIT,
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
        }
    }
}

impl SearchConfig {
    pub fn rank_options(&self) -> RankOptions {
        RankOptions {
            min_score: self.min_score,
            limit: self.limit,
        }
    }
}

/// Where the knowledge base snapshot lives
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KnowledgeBaseConfig {
    /// Snapshot files, relative paths resolve against the base directory
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceConfig>,

    /// Serve with an empty corpus instead of refusing to start when a
    /// snapshot file is missing
    #[serde(default)]
    pub allow_missing: bool,

    /// Expected embedding dimensions; inferred from the data when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<usize>,
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            allow_missing: false,
            dimensions: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_min_score() -> f32 {
    DEFAULT_MIN_SCORE
}

fn default_limit() -> usize {
    DEFAULT_SEARCH_LIMIT
}

fn default_recommend_limit() -> usize {
    DEFAULT_RECOMMEND_LIMIT
}

fn default_download_timeout_secs() -> u64 {
    DEFAULT_DOWNLOAD_TIMEOUT_SECS
}

fn default_listen() -> String {
    DEFAULT_LISTEN.to_string()
}

fn default_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig {
            path: DEFAULT_LAWS_FILE.into(),
            kind: SourceKind::Law,
        },
        SourceConfig {
            path: DEFAULT_SCHEMES_FILE.into(),
            kind: SourceKind::Scheme,
        },
    ]
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub knowledge_base: KnowledgeBaseConfig,
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: PathBuf,
}

impl Config {
    /// Directory holding config.yaml, snapshot files and the model cache.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Check value ranges. Run again after applying command-line overrides.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let search = &self.search;
        if !search.min_score.is_finite() || !(-1.0..=1.0).contains(&search.min_score) {
            return Err(ConfigError::Invalid(format!(
                "search.min_score must be between -1.0 and 1.0, got {}",
                search.min_score
            )));
        }
        if search.limit == 0 {
            return Err(ConfigError::Invalid("search.limit must be greater than 0".into()));
        }
        if search.recommend_limit == 0 {
            return Err(ConfigError::Invalid(
                "search.recommend_limit must be greater than 0".into(),
            ));
        }
        if search.download_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "search.download_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.knowledge_base.sources.is_empty() {
            return Err(ConfigError::Invalid(
                "knowledge_base.sources must list at least one file".into(),
            ));
        }
        if self.knowledge_base.dimensions == Some(0) {
            return Err(ConfigError::Invalid(
                "knowledge_base.dimensions must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Load `config.yaml` from `base_path`, creating it with defaults if absent.
    pub fn load_with(base_path: &Path) -> Result<Self, ConfigError> {
        let path = base_path.join(CONFIG_FILE);
        let io_err = |source| ConfigError::Io {
            path: path.clone(),
            source,
        };

        if !path.exists() {
            std::fs::create_dir_all(base_path).map_err(io_err)?;
            std::fs::write(&path, serde_yml::to_string(&Self::default())?).map_err(io_err)?;
            log::info!("Wrote default config to {}", path.display());
        }

        let config_str = std::fs::read_to_string(&path).map_err(io_err)?;
        let mut config: Self = serde_yml::from_str(&config_str)?;
        config.base_path = base_path.to_path_buf();
        config.validate()?;

        Ok(config)
    }
}

/// Resolve the base directory: explicit value, else `~/.local/share/kbsearch`.
pub fn resolve_base_path(explicit: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }

    let home = homedir::my_home()?
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory, pass --base-path"))?;
    Ok(home.join(".local").join("share").join("kbsearch"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.search.min_score, 0.1);
        assert_eq!(config.search.limit, 10);
        assert_eq!(config.search.recommend_limit, 5);
        assert_eq!(config.knowledge_base.sources.len(), 2);
        assert!(!config.knowledge_base.allow_missing);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_with_creates_default_file() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().join("nested");

        let config = Config::load_with(&base).unwrap();
        assert!(base.join(CONFIG_FILE).exists());
        assert_eq!(config.base_path(), base.as_path());
        assert_eq!(config.search.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join(CONFIG_FILE),
            "search:\n  limit: 3\nknowledge_base:\n  allow_missing: true\n  sources:\n    - path: kb.json\n      kind: mixed\n",
        )
        .unwrap();

        let config = Config::load_with(tmp.path()).unwrap();
        assert_eq!(config.search.limit, 3);
        assert_eq!(config.search.min_score, DEFAULT_MIN_SCORE);
        assert!(config.knowledge_base.allow_missing);
        assert_eq!(config.knowledge_base.sources[0].kind, SourceKind::Mixed);
        assert_eq!(config.server.listen, DEFAULT_LISTEN);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let tmp = tempfile::tempdir().unwrap();

        for bad in [
            "search:\n  min_score: 1.5\n",
            "search:\n  limit: 0\n",
            "search:\n  recommend_limit: 0\n",
            "knowledge_base:\n  sources: []\n",
        ] {
            std::fs::write(tmp.path().join(CONFIG_FILE), bad).unwrap();
            let result = Config::load_with(tmp.path());
            assert!(matches!(result, Err(ConfigError::Invalid(_))), "accepted: {bad}");
        }
    }

    #[test]
    fn test_overrides_revalidated() {
        let mut config = Config::default();
        config.search.limit = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.search.min_score = 5.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.search.min_score = -0.5;
        config.search.limit = 3;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_malformed_yaml_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(CONFIG_FILE), "search: [unclosed").unwrap();

        assert!(matches!(Config::load_with(tmp.path()), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_explicit_base_path_wins() {
        let path = PathBuf::from("/srv/kb");
        assert_eq!(resolve_base_path(Some(path.clone())).unwrap(), path);
    }
}
