//! Provider response bodies
//!
//! Providers answer in one of three shapes: a chat completion, a stream of
//! deltas (server-sent events), or plain text. [`parse_body`] resolves a raw
//! HTTP body to a [`Completion`] or a typed error.

use serde::Deserialize;

use super::{Completion, GatewayError};
use crate::usage::TokenUsage;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UsageBody {
    #[serde(default, alias = "input_tokens", alias = "prompt_eval_count")]
    pub prompt_tokens: u64,
    #[serde(default, alias = "output_tokens", alias = "eval_count")]
    pub completion_tokens: u64,
}

impl From<&UsageBody> for TokenUsage {
    fn from(usage: &UsageBody) -> Self {
        TokenUsage::new(usage.prompt_tokens, usage.completion_tokens)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageBody {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: MessageBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeltaChoice {
    pub delta: MessageBody,
}

/// Known response shapes, tried in order
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ResponseShape {
    Chat {
        choices: Vec<ChatChoice>,
        #[serde(default)]
        usage: Option<UsageBody>,
    },
    Delta {
        choices: Vec<DeltaChoice>,
        #[serde(default)]
        usage: Option<UsageBody>,
    },
    Raw {
        #[serde(alias = "output_text", alias = "response", alias = "content")]
        text: String,
        #[serde(flatten)]
        usage: Option<UsageBody>,
    },
}

impl ResponseShape {
    /// Generated text, if the shape carries any
    pub fn text(&self) -> Option<&str> {
        match self {
            ResponseShape::Chat { choices, .. } => {
                choices.first().and_then(|c| c.message.content.as_deref())
            }
            ResponseShape::Delta { choices, .. } => {
                choices.first().and_then(|c| c.delta.content.as_deref())
            }
            ResponseShape::Raw { text, .. } => Some(text.as_str()),
        }
    }

    pub fn usage(&self) -> TokenUsage {
        let usage = match self {
            ResponseShape::Chat { usage, .. }
            | ResponseShape::Delta { usage, .. }
            | ResponseShape::Raw { usage, .. } => usage.as_ref(),
        };
        usage.map(TokenUsage::from).unwrap_or_default()
    }
}

/// Resolve a raw HTTP body into a completion.
///
/// Bodies that are not JSON at all are taken as raw text. An empty or
/// whitespace-only result is [`GatewayError::EmptyResponse`].
pub fn parse_body(body: &str) -> Result<Completion, GatewayError> {
    let trimmed = body.trim_start();
    let completion = if trimmed.starts_with("data:") {
        parse_event_stream(trimmed)?
    } else if trimmed.starts_with('{') {
        let shape: ResponseShape = serde_json::from_str(trimmed)
            .map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;
        Completion {
            text: shape.text().unwrap_or_default().to_string(),
            usage: shape.usage(),
        }
    } else {
        Completion {
            text: body.to_string(),
            usage: TokenUsage::default(),
        }
    };

    if completion.text.trim().is_empty() {
        return Err(GatewayError::EmptyResponse);
    }
    Ok(completion)
}

/// Concatenate the deltas of a server-sent event stream
fn parse_event_stream(body: &str) -> Result<Completion, GatewayError> {
    let mut completion = Completion::default();
    for line in body.lines() {
        let Some(data) = line.trim().strip_prefix("data:") else {
            continue;
        };
        let data = data.trim();
        if data.is_empty() || data == "[DONE]" {
            continue;
        }
        let shape: ResponseShape = serde_json::from_str(data)
            .map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;
        if let Some(text) = shape.text() {
            completion.text.push_str(text);
        }
        completion.usage += shape.usage();
    }
    Ok(completion)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_completion_shape() {
        let body = r#"{
            "choices": [{"message": {"role": "assistant", "content": "Hello there"}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3}
        }"#;
        let completion = parse_body(body).unwrap();
        assert_eq!(completion.text, "Hello there");
        assert_eq!(completion.usage, TokenUsage::new(12, 3));
    }

    #[test]
    fn test_usage_aliases() {
        let body = r#"{
            "choices": [{"message": {"content": "ok"}}],
            "usage": {"input_tokens": 5, "output_tokens": 7}
        }"#;
        assert_eq!(parse_body(body).unwrap().usage, TokenUsage::new(5, 7));
    }

    #[test]
    fn test_event_stream_concatenates_deltas() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n\
                    data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n\
                    data: {\"choices\":[{\"delta\":{}}],\"usage\":{\"prompt_tokens\":4,\"completion_tokens\":2}}\n\n\
                    data: [DONE]\n";
        let completion = parse_body(body).unwrap();
        assert_eq!(completion.text, "Hello");
        assert_eq!(completion.usage, TokenUsage::new(4, 2));
    }

    #[test]
    fn test_raw_shapes() {
        let ollama = r#"{"response": "from ollama", "prompt_eval_count": 9, "eval_count": 4}"#;
        let completion = parse_body(ollama).unwrap();
        assert_eq!(completion.text, "from ollama");
        assert_eq!(completion.usage, TokenUsage::new(9, 4));

        assert_eq!(parse_body("plain words").unwrap().text, "plain words");
    }

    #[test]
    fn test_empty_and_malformed() {
        let empty = r#"{"choices": [{"message": {"content": "   "}}]}"#;
        assert_eq!(parse_body(empty), Err(GatewayError::EmptyResponse));

        let null_content = r#"{"choices": [{"message": {"content": null}}]}"#;
        assert_eq!(parse_body(null_content), Err(GatewayError::EmptyResponse));

        assert!(matches!(
            parse_body(r#"{"unexpected": 1}"#),
            Err(GatewayError::MalformedResponse(_))
        ));
    }
}
