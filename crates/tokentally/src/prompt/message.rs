//! # Chat Messages

use serde::{Deserialize, Serialize};

/// One message of a chat prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// The speaker role.
    pub role: MessageRole,

    /// The message body.
    pub content: MessageContent,
}

impl Message {
    /// Create a system message with string content.
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: MessageContent::Text(text.into()),
        }
    }

    /// Create a user message with string content.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: MessageContent::Text(text.into()),
        }
    }

    /// Create an assistant message with string content.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: MessageContent::Text(text.into()),
        }
    }

    /// Create a message with structured content parts.
    pub fn with_parts(
        role: MessageRole,
        parts: Vec<ContentPart>,
    ) -> Self {
        Self {
            role,
            content: MessageContent::Parts(parts),
        }
    }
}

/// Message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instructions.
    System,

    /// End-user input.
    User,

    /// Model output.
    Assistant,

    /// Tool result carrier (role `"tool"`).
    Tool,
}

impl MessageRole {
    /// The wire form of the role, as tokenized by the accountant.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

/// Message content: a plain string, or an array of content parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text content.
    Text(String),

    /// Structured content parts.
    Parts(Vec<ContentPart>),
}

/// One element of a structured message body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ContentPart {
    /// A text span.
    Text {
        /// The text.
        text: String,
    },

    /// A tool invocation emitted by the model.
    ToolCall {
        /// Correlates the call with its result.
        tool_call_id: String,

        /// The invoked tool's name.
        tool_name: String,

        /// The call arguments; serialized compactly when counted.
        input: serde_json::Value,
    },

    /// The result of a tool invocation.
    ToolResult {
        /// Correlates the result with its call.
        tool_call_id: String,

        /// The tool output; strings count as-is, other values are
        /// serialized compactly.
        output: serde_json::Value,
    },

    /// An image part (counted with a fixed placeholder).
    Image,

    /// A file part (counted with a fixed placeholder).
    File,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&MessageRole::Assistant).unwrap(),
            "\"assistant\""
        );
        assert_eq!(MessageRole::Tool.as_str(), "tool");
    }

    #[test]
    fn test_content_untagged() {
        let message: Message = serde_json::from_str(
            r#"{"role": "user", "content": "Hello!"}"#,
        )
        .unwrap();
        assert_eq!(message, Message::user("Hello!"));

        let message: Message = serde_json::from_str(
            r#"{
                "role": "assistant",
                "content": [
                    {"type": "text", "text": "checking"},
                    {"type": "tool-call", "tool_call_id": "c1",
                     "tool_name": "getWeather", "input": {"location": "Paris"}}
                ]
            }"#,
        )
        .unwrap();
        match &message.content {
            MessageContent::Parts(parts) => {
                assert_eq!(parts.len(), 2);
                assert!(matches!(parts[1], ContentPart::ToolCall { .. }));
            }
            other => panic!("unexpected content: {other:?}"),
        }
    }

    #[test]
    fn test_unit_parts_roundtrip() {
        let json = serde_json::to_string(&ContentPart::Image).unwrap();
        assert_eq!(json, r#"{"type":"image"}"#);
        let back: ContentPart = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ContentPart::Image);
    }
}
