//! Model gateway
//!
//! Every model call in the pipeline goes through [`ModelGateway::call`]. A
//! request names the role the model plays and the purpose of the call; the
//! completion carries its own token usage, which callers fold into the run's
//! ledger.

pub mod mock;
pub mod openai;
pub mod response;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{ModelDescriptor, ModelRole};
use crate::profile::BucketKind;
use crate::usage::TokenUsage;

pub use mock::MockGateway;
pub use openai::OpenAiGateway;
pub use response::{parse_body, ResponseShape};

/// Errors returned by a gateway call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("missing credential for {role} model")]
    MissingCredential { role: ModelRole },

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("model returned an empty response")]
    EmptyResponse,

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

impl GatewayError {
    /// Stable identifier used in structured error output
    pub fn category(&self) -> &'static str {
        match self {
            GatewayError::MissingCredential { .. } => "missing_credential",
            GatewayError::Transport(_) => "transport",
            GatewayError::Status { .. } => "status",
            GatewayError::EmptyResponse => "empty_response",
            GatewayError::MalformedResponse(_) => "malformed_response",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

/// What a call is for; drives tracing labels and the mock gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPurpose {
    DiscoveryTurn { exchange: u32 },
    DiscoveryCompletion,
    Extraction,
    BucketTurn { bucket: BucketKind },
    BucketSummary(BucketKind),
    Overlap,
    DecisionTurn { exchange: u32 },
    Persona,
    Judge,
}

impl fmt::Display for CallPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallPurpose::DiscoveryTurn { exchange } => write!(f, "discovery_turn#{}", exchange),
            CallPurpose::DiscoveryCompletion => f.write_str("discovery_completion"),
            CallPurpose::Extraction => f.write_str("extraction"),
            CallPurpose::BucketTurn { bucket } => write!(f, "bucket_turn/{}", bucket.as_str()),
            CallPurpose::BucketSummary(bucket) => write!(f, "bucket_summary/{}", bucket.as_str()),
            CallPurpose::Overlap => f.write_str("overlap"),
            CallPurpose::DecisionTurn { exchange } => write!(f, "decision_turn#{}", exchange),
            CallPurpose::Persona => f.write_str("persona"),
            CallPurpose::Judge => f.write_str("judge"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CallRequest<'a> {
    pub role: ModelRole,
    pub model: &'a ModelDescriptor,
    pub messages: &'a [ChatMessage],
    pub params: CallParams,
    pub purpose: CallPurpose,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub text: String,
    pub usage: TokenUsage,
}

#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Perform one completion. No retries.
    async fn call(&self, request: &CallRequest<'_>) -> Result<Completion, GatewayError>;

    /// Preflight check that a model can be called in a role at all
    fn ensure_ready(&self, _role: ModelRole, _model: &ModelDescriptor) -> Result<(), GatewayError> {
        Ok(())
    }

    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(GatewayError::EmptyResponse.category(), "empty_response");
        assert_eq!(
            GatewayError::Status {
                status: 502,
                body: "bad gateway".into()
            }
            .to_string(),
            "provider returned 502: bad gateway"
        );
    }

    #[test]
    fn test_chat_message_wire_format() {
        let json = serde_json::to_value(ChatMessage::assistant("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "assistant", "content": "hi"}));
    }

    #[test]
    fn test_purpose_labels() {
        assert_eq!(
            CallPurpose::BucketTurn {
                bucket: BucketKind::PaidFor
            }
            .to_string(),
            "bucket_turn/paid_for"
        );
        assert_eq!(CallPurpose::DiscoveryTurn { exchange: 4 }.to_string(), "discovery_turn#4");
    }
}
