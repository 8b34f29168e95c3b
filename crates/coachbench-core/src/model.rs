//! Model descriptors and the roles they play in a run

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EvalError;

/// Provider tag used when a model string carries no `provider:` prefix
pub const DEFAULT_PROVIDER: &str = "openai";

/// The three roles a model can be bound to for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelRole {
    /// The model under evaluation, playing the coach
    Candidate,
    /// The model simulating the human persona
    SyntheticUser,
    /// The model scoring completed runs
    Judge,
}

impl ModelRole {
    pub const ALL: [ModelRole; 3] = [
        ModelRole::Candidate,
        ModelRole::SyntheticUser,
        ModelRole::Judge,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelRole::Candidate => "candidate",
            ModelRole::SyntheticUser => "synthetic_user",
            ModelRole::Judge => "judge",
        }
    }

    /// Suffix used for role-specific credential environment variables
    pub fn env_key(&self) -> &'static str {
        match self {
            ModelRole::Candidate => "CANDIDATE",
            ModelRole::SyntheticUser => "SYNTHETIC",
            ModelRole::Judge => "JUDGE",
        }
    }
}

impl fmt::Display for ModelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a model as known to the gateway
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Identifier sent to the provider (e.g. `gpt-4o-mini`)
    pub id: String,
    /// Human-readable name for tables
    pub display_name: String,
    /// Provider tag (e.g. `openai`, `openrouter`, `ollama`, `mock`)
    pub provider: String,
}

impl ModelDescriptor {
    pub fn new(provider: impl Into<String>, id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            display_name: id.clone(),
            id,
            provider: provider.into(),
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Local providers are reachable without a credential
    pub fn requires_credential(&self) -> bool {
        !matches!(self.provider.as_str(), "ollama" | "local" | "mock")
    }
}

impl fmt::Display for ModelDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.id)
    }
}

/// Parses `provider:model` or a bare `model` (which gets the default provider).
impl FromStr for ModelDescriptor {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (provider, id) = match s.split_once(':') {
            Some((provider, id)) => (provider.trim(), id.trim()),
            None => (DEFAULT_PROVIDER, s),
        };
        if provider.is_empty() || id.is_empty() {
            return Err(EvalError::invalid_value("model string", s));
        }
        Ok(ModelDescriptor::new(provider, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_provider() {
        let model: ModelDescriptor = "openrouter:meta-llama/llama-3-70b".parse().unwrap();
        assert_eq!(model.provider, "openrouter");
        assert_eq!(model.id, "meta-llama/llama-3-70b");
        assert_eq!(model.display_name, "meta-llama/llama-3-70b");
    }

    #[test]
    fn test_parse_bare_model_uses_default_provider() {
        let model: ModelDescriptor = "gpt-4o-mini".parse().unwrap();
        assert_eq!(model.provider, DEFAULT_PROVIDER);
        assert_eq!(model.to_string(), "openai:gpt-4o-mini");
    }

    #[test]
    fn test_parse_rejects_empty_parts() {
        assert!("openai:".parse::<ModelDescriptor>().is_err());
        assert!(":gpt-4o".parse::<ModelDescriptor>().is_err());
        assert!("".parse::<ModelDescriptor>().is_err());
    }

    #[test]
    fn test_local_providers_need_no_credential() {
        assert!(!ModelDescriptor::new("ollama", "llama3").requires_credential());
        assert!(!ModelDescriptor::new("mock", "coach").requires_credential());
        assert!(ModelDescriptor::new("openai", "gpt-4o").requires_credential());
    }
}
