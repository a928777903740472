//! Remote usage probe.
//!
//! Sends minimal requests to an inference API and reads back the reported
//! input-token usage. Provider dispatch keys off the model-id prefix:
//! `openai/…` uses the chat-completions shape, `anthropic/…` the messages
//! shape (system messages become the top-level `system` parameter there).

use anyhow::{bail, Context};
use serde_json::{json, Value};
use tokentally::prompt::{Message, MessageContent, MessageRole, ToolDefinition};

/// Environment variable holding the API key.
pub const TOKENTALLY_API_KEY: &str = "TOKENTALLY_API_KEY";

/// Anything that can report the server-side input-token count of a prompt.
///
/// The calibration arithmetic is written against this trait so tests can
/// substitute a canned oracle.
pub trait UsageOracle {
    /// The reported `input_tokens` for one prompt.
    fn input_tokens(
        &mut self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> anyhow::Result<u64>;
}

/// A [`UsageOracle`] backed by a real inference API.
pub struct UsageProbe {
    client: reqwest::blocking::Client,
    api_key: String,
    model: String,
    provider: Provider,
    base_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Provider {
    OpenAi,
    Anthropic,
}

impl UsageProbe {
    /// Build a probe for `model`, reading the key from the environment.
    ///
    /// `base_url` overrides the provider endpoint (used against proxies).
    pub fn from_env(
        model: &str,
        base_url: Option<String>,
    ) -> anyhow::Result<Self> {
        let api_key = std::env::var(TOKENTALLY_API_KEY)
            .with_context(|| format!("{TOKENTALLY_API_KEY} is not set"))?;

        let provider = match model.split_once('/') {
            Some(("openai", _)) => Provider::OpenAi,
            Some(("anthropic", _)) => Provider::Anthropic,
            _ => bail!("cannot infer provider from model id {model:?}"),
        };

        Ok(Self {
            client: reqwest::blocking::Client::new(),
            api_key,
            model: model.to_string(),
            provider,
            base_url,
        })
    }

    fn model_name(&self) -> &str {
        match self.model.split_once('/') {
            Some((_, name)) => name,
            None => &self.model,
        }
    }

    fn endpoint(&self) -> String {
        let default = match self.provider {
            Provider::OpenAi => "https://api.openai.com/v1/chat/completions",
            Provider::Anthropic => "https://api.anthropic.com/v1/messages",
        };
        match &self.base_url {
            Some(base) => format!("{}{}", base.trim_end_matches('/'), match self.provider {
                Provider::OpenAi => "/v1/chat/completions",
                Provider::Anthropic => "/v1/messages",
            }),
            None => default.to_string(),
        }
    }

    fn openai_body(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Value {
        let messages: Vec<Value> = messages
            .iter()
            .map(|m| json!({"role": m.role.as_str(), "content": text_of(m)}))
            .collect();

        let mut body = json!({
            "model": self.model_name(),
            "messages": messages,
            "max_tokens": 1,
        });
        if !tools.is_empty() {
            let tools: Vec<Value> = tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.input_schema.to_json(),
                        }
                    })
                })
                .collect();
            body["tools"] = tools.into();
        }
        body
    }

    fn anthropic_body(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Value {
        // System messages are a top-level parameter, not messages.
        let mut system_parts: Vec<String> = Vec::new();
        let mut user_messages: Vec<Value> = Vec::new();
        for m in messages {
            match m.role {
                MessageRole::System => system_parts.push(text_of(m)),
                _ => user_messages.push(json!({
                    "role": m.role.as_str(),
                    "content": text_of(m),
                })),
            }
        }

        let mut body = json!({
            "model": self.model_name(),
            "messages": user_messages,
            "max_tokens": 1,
        });
        if !system_parts.is_empty() {
            body["system"] = system_parts.join("\n\n").into();
        }
        if !tools.is_empty() {
            let tools: Vec<Value> = tools
                .iter()
                .map(|t| {
                    json!({
                        "name": t.name,
                        "description": t.description,
                        "input_schema": t.input_schema.to_json(),
                    })
                })
                .collect();
            body["tools"] = tools.into();
        }
        body
    }
}

impl UsageOracle for UsageProbe {
    fn input_tokens(
        &mut self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> anyhow::Result<u64> {
        let (body, usage_field) = match self.provider {
            Provider::OpenAi => (self.openai_body(messages, tools), "prompt_tokens"),
            Provider::Anthropic => (self.anthropic_body(messages, tools), "input_tokens"),
        };

        let request = self.client.post(self.endpoint()).json(&body);
        let request = match self.provider {
            Provider::OpenAi => request.bearer_auth(&self.api_key),
            Provider::Anthropic => request
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", "2023-06-01"),
        };

        let response = request.send().context("probe request failed")?;
        let status = response.status();
        let payload: Value = response.json().context("probe response is not JSON")?;

        if !status.is_success() {
            bail!("probe request returned {status}: {payload}");
        }

        payload["usage"][usage_field]
            .as_u64()
            .with_context(|| format!("probe response has no usage.{usage_field}"))
    }
}

/// Flatten a message body to plain text (the battery only uses text).
fn text_of(message: &Message) -> String {
    match &message.content {
        MessageContent::Text(text) => text.clone(),
        MessageContent::Parts(parts) => parts
            .iter()
            .filter_map(|part| match part {
                tokentally::prompt::ContentPart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokentally::prompt::{SchemaNode, SchemaProperty};

    fn make_probe(model: &str) -> UsageProbe {
        UsageProbe {
            client: reqwest::blocking::Client::new(),
            api_key: "k".into(),
            model: model.into(),
            provider: if model.starts_with("openai/") {
                Provider::OpenAi
            } else {
                Provider::Anthropic
            },
            base_url: None,
        }
    }

    #[test]
    fn test_openai_body_shape() {
        let probe = make_probe("openai/gpt-5");
        let tools = [ToolDefinition::new(
            "getWeather",
            SchemaNode::object([SchemaProperty::new("location", SchemaNode::String)]),
        )];
        let body = probe.openai_body(&[Message::user("hi")], &tools);

        assert_eq!(body["model"], "gpt-5");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["tools"][0]["function"]["name"], "getWeather");
        assert_eq!(
            body["tools"][0]["function"]["parameters"]["type"],
            "object"
        );
    }

    #[test]
    fn test_anthropic_system_split() {
        let probe = make_probe("anthropic/claude-sonnet-4.5");
        let body = probe.anthropic_body(
            &[Message::system("rules"), Message::user("hi")],
            &[],
        );

        assert_eq!(body["system"], "rules");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
    }
}
