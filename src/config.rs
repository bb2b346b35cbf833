//! TOML configuration.
//!
//! Every section and field is optional. Resolution order:
//!
//! 1. `--config <file>` if given (the file must exist).
//! 2. `./codesearch.toml` if present.
//! 3. Built-in defaults.
//!
//! ```toml
//! [db]
//! dir = "."
//!
//! [embedding]
//! timeout_secs = 60
//! max_retries = 4
//!
//! [providers.litellm]
//! url = "http://localhost:4000"
//! api_key = "sk-1234"
//!
//! [providers.ollama]
//! url = "http://localhost:11434"
//!
//! [search]
//! min_similarity = 0.03
//! limit = 10
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "codesearch.toml";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    /// Directory holding one `<alias>.db` file per project.
    #[serde(default = "default_db_dir")]
    pub dir: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            dir: default_db_dir(),
        }
    }
}

fn default_db_dir() -> PathBuf {
    PathBuf::from(".")
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    60
}
fn default_max_retries() -> u32 {
    4
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub litellm: ProviderConfig,
    #[serde(default)]
    pub ollama: ProviderConfig,
}

/// Overrides for one provider. Unset fields use the provider's defaults.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ProviderConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f64,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_similarity: default_min_similarity(),
            limit: default_limit(),
        }
    }
}

fn default_min_similarity() -> f64 {
    0.03
}
fn default_limit() -> usize {
    10
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.embedding.timeout_secs == 0 {
            bail!("embedding.timeout_secs must be > 0");
        }
        if self.search.limit < 1 {
            bail!("search.limit must be >= 1");
        }
        if !(0.0..1.0).contains(&self.search.min_similarity) {
            bail!("search.min_similarity must be in [0.0, 1.0)");
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

/// Load `explicit`, else `./codesearch.toml` if it exists, else defaults.
pub fn resolve_config(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        return load_config(path);
    }
    let local = Path::new(DEFAULT_CONFIG_FILE);
    if local.is_file() {
        return load_config(local);
    }
    Ok(Config::default())
}
