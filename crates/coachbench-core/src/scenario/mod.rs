//! Scenario bank
//!
//! Scenarios are YAML files, one persona each. A directory of them forms the
//! bank a batch draws from.

pub mod types;

pub use types::*;

use std::collections::HashSet;
use std::path::Path;

use tracing::debug;

use crate::error::{EvalError, Result};

/// Load a scenario from a YAML file.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Scenario> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| EvalError::io_operation("read", path.display(), e))?;
    let scenario: Scenario =
        serde_yaml::from_str(&content).map_err(|e| EvalError::InvalidScenario {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    if scenario.id.trim().is_empty() {
        return Err(EvalError::InvalidScenario {
            path: path.to_path_buf(),
            reason: "empty id".to_string(),
        });
    }
    if scenario.persona.trim().is_empty() {
        return Err(EvalError::InvalidScenario {
            path: path.to_path_buf(),
            reason: "empty persona".to_string(),
        });
    }
    Ok(scenario)
}

/// Load every `*.yaml` / `*.yml` file in a directory, sorted by id.
pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Vec<Scenario>> {
    let dir = dir.as_ref();
    let entries = std::fs::read_dir(dir)
        .map_err(|e| EvalError::io_operation("read directory", dir.display(), e))?;

    let mut scenarios = Vec::new();
    let mut seen = HashSet::new();
    for entry in entries {
        let path = entry?.path();
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e == "yaml" || e == "yml");
        if !is_yaml {
            continue;
        }
        let scenario = load(&path)?;
        if !seen.insert(scenario.id.clone()) {
            return Err(EvalError::InvalidScenario {
                path,
                reason: format!("duplicate scenario id '{}'", scenario.id),
            });
        }
        debug!(id = %scenario.id, path = %path.display(), "loaded scenario");
        scenarios.push(scenario);
    }

    scenarios.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(scenarios)
}

/// Find a scenario by id
pub fn find<'a>(scenarios: &'a [Scenario], id: &str) -> Result<&'a Scenario> {
    scenarios
        .iter()
        .find(|s| s.id == id)
        .ok_or_else(|| EvalError::ScenarioNotFound { id: id.to_string() })
}
