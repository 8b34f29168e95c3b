//! Batch configuration
//!
//! Read from TOML. Lookup order: an explicit path, `./coachbench.toml`,
//! `$COACHBENCH_CONFIG_DIR/config.toml`, then the platform config directory.
//! Every field has a default, so no file at all is fine.

pub mod types;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{EvalError, Result};

pub use types::{EvalConfig, GatewayConfig, MaxTokens};

const CONFIG_DIR: &str = "coachbench";
const CONFIG_FILE: &str = "config.toml";
const LOCAL_CONFIG_FILE: &str = "coachbench.toml";
const CONFIG_DIR_ENV_VAR: &str = "COACHBENCH_CONFIG_DIR";

impl EvalConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| EvalError::io_operation("read config", path.display(), e))?;
        let config: EvalConfig = toml::from_str(&content).map_err(|e| EvalError::InvalidConfig {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        config.validate(path)?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| EvalError::Other(format!("failed to serialize config: {}", e)))?;
        fs::write(path, content)
            .map_err(|e| EvalError::io_operation("write config", path.display(), e))?;
        Ok(())
    }

    /// Resolve the configuration for this process.
    ///
    /// An explicit path must exist; the implicit locations are optional.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        for candidate in Self::search_paths() {
            if candidate.is_file() {
                debug!(path = %candidate.display(), "using config file");
                return Self::load(&candidate);
            }
        }
        Ok(Self::default())
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        if let Ok(dir) = std::env::var(CONFIG_DIR_ENV_VAR) {
            paths.push(PathBuf::from(dir).join(CONFIG_FILE));
        } else if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join(CONFIG_DIR).join(CONFIG_FILE));
        }
        paths
    }

    fn validate(&self, path: &Path) -> Result<()> {
        let invalid = |reason: &str| EvalError::InvalidConfig {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };
        if self.min_answers_per_phase == 0 {
            return Err(invalid("min_answers_per_phase must be at least 1"));
        }
        if self.bucket_exchange_cap == 0 {
            return Err(invalid("bucket_exchange_cap must be at least 1"));
        }
        if self.scenarios_per_model == 0 {
            return Err(invalid("scenarios_per_model must be at least 1"));
        }
        if !(0.0..=2.0).contains(&self.candidate_temperature)
            || !(0.0..=2.0).contains(&self.judge_temperature)
        {
            return Err(invalid("temperatures must be within 0.0..=2.0"));
        }
        Ok(())
    }
}
