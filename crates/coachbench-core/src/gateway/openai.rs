//! OpenAI-compatible chat completions client

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::response::parse_body;
use super::{CallRequest, Completion, GatewayError, ModelGateway};
use crate::model::{ModelDescriptor, ModelRole};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Shared fallback credential variable
pub const FALLBACK_KEY_VAR: &str = "OPENAI_API_KEY";

/// Role-specific credential variable, e.g. `COACHBENCH_JUDGE_API_KEY`
pub fn role_key_var(role: ModelRole) -> String {
    format!("COACHBENCH_{}_API_KEY", role.env_key())
}

pub struct OpenAiGateway {
    client: reqwest::Client,
    base_url: String,
    keys: HashMap<ModelRole, String>,
}

impl OpenAiGateway {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            keys: HashMap::new(),
        })
    }

    pub fn with_api_key(mut self, role: ModelRole, key: impl Into<String>) -> Self {
        self.keys.insert(role, key.into());
        self
    }

    /// Pick up credentials from the environment for every role
    pub fn with_env_keys(mut self) -> Self {
        let fallback = non_empty_var(FALLBACK_KEY_VAR);
        for role in ModelRole::ALL {
            if let Some(key) = non_empty_var(&role_key_var(role)).or_else(|| fallback.clone()) {
                self.keys.insert(role, key);
            }
        }
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn key_for(&self, role: ModelRole, model: &ModelDescriptor) -> Result<Option<&str>, GatewayError> {
        match self.keys.get(&role) {
            Some(key) => Ok(Some(key.as_str())),
            None if model.requires_credential() => Err(GatewayError::MissingCredential { role }),
            None => Ok(None),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[async_trait]
impl ModelGateway for OpenAiGateway {
    async fn call(&self, request: &CallRequest<'_>) -> Result<Completion, GatewayError> {
        let key = self.key_for(request.role, request.model)?;

        let body = json!({
            "model": request.model.id,
            "messages": request.messages,
            "temperature": request.params.temperature,
            "max_tokens": request.params.max_tokens,
        });

        let mut http = self.client.post(self.endpoint()).json(&body);
        if let Some(key) = key {
            http = http.header("Authorization", format!("Bearer {}", key));
        }

        let response = http
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let completion = parse_body(&text)?;
        debug!(
            role = %request.role,
            model = %request.model,
            purpose = %request.purpose,
            input_tokens = completion.usage.input,
            output_tokens = completion.usage.output,
            "gateway call"
        );
        Ok(completion)
    }

    fn ensure_ready(&self, role: ModelRole, model: &ModelDescriptor) -> Result<(), GatewayError> {
        self.key_for(role, model).map(|_| ())
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
