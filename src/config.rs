use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::constants::{
    CLAIMS_FILE, DEFAULT_CONFIG_PATH, DEFAULT_DATA_DIR, DEFAULT_LOG_DIR, DEFAULT_STORE_PATH,
    FOOD_LISTINGS_FILE, PROVIDERS_FILE, RECEIVERS_FILE,
};
use crate::error::{EtlError, Result};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub inputs: InputsConfig,
    pub store: StoreConfig,
    pub validation: ValidationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InputsConfig {
    pub data_dir: PathBuf,
    pub providers: String,
    pub receivers: String,
    pub food_listings: String,
    pub claims: String,
}

impl Default for InputsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            providers: PROVIDERS_FILE.to_string(),
            receivers: RECEIVERS_FILE.to_string(),
            food_listings: FOOD_LISTINGS_FILE.to_string(),
            claims: CLAIMS_FILE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_STORE_PATH),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub reference_policy: ReferencePolicy,
}

/// How dangling foreign keys found during validation are treated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferencePolicy {
    /// Dangling references abort the run
    #[default]
    Strict,
    /// Dangling references are logged and loaded as-is
    Permissive,
}

impl FromStr for ReferencePolicy {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(ReferencePolicy::Strict),
            "permissive" => Ok(ReferencePolicy::Permissive),
            other => Err(EtlError::Config(format!(
                "Unknown reference policy '{}' (expected 'strict' or 'permissive')",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_LOG_DIR),
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, `etl.toml` in the working
    /// directory is used when present and built-in defaults otherwise.
    /// `FOOD_ETL_*` environment variables are applied on top.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            EtlError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Apply environment overrides through a lookup function so tests need not touch process env
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("FOOD_ETL_DATA_DIR").filter(|v| !v.trim().is_empty()) {
            self.inputs.data_dir = PathBuf::from(dir);
        }
        if let Some(store) = lookup("FOOD_ETL_STORE_PATH").filter(|v| !v.trim().is_empty()) {
            self.store.path = PathBuf::from(store);
        }
        if let Some(policy) = lookup("FOOD_ETL_REFERENCE_POLICY").filter(|v| !v.trim().is_empty()) {
            self.validation.reference_policy = policy.parse()?;
        }
        if let Some(dir) = lookup("FOOD_ETL_LOG_DIR").filter(|v| !v.trim().is_empty()) {
            self.logging.dir = PathBuf::from(dir);
        }
        Ok(())
    }
}
