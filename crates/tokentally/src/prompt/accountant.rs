//! # Prompt Accountant
//!
//! Combines the BPE engine, a model config, and the schema walker into a
//! total input-token estimate with a per-component breakdown. The output
//! is deterministic in its inputs; all tokenization is delegated to the
//! engine.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::bpe::BpeTokenizer;
use crate::errors::TallyResult;
use crate::models::ModelConfig;
use crate::prompt::message::{ContentPart, Message, MessageContent};
use crate::prompt::schema::{walk_schema, ToolDefinition};
use crate::types::TokenType;

/// Fixed token estimate recorded for an image content part.
///
/// An approximation with no documented derivation; known to drift on
/// image-heavy prompts.
pub const IMAGE_PART_TOKENS: usize = 85;

/// Fixed token estimate recorded for a file content part.
///
/// An approximation with no documented derivation, like
/// [`IMAGE_PART_TOKENS`].
pub const FILE_PART_TOKENS: usize = 100;

/// The accountant's result: overall total, per-message breakdown, and the
/// tool-definition block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptCount {
    /// Total estimated input tokens.
    pub total: usize,

    /// Per-message breakdown, in message order.
    pub messages: Vec<MessageCount>,

    /// The tool-definition block.
    pub tools: ToolsCount,
}

/// One message's share of the total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageCount {
    /// Message total: framing, role, and all content parts.
    pub total: usize,

    /// Per-part breakdown, in part order.
    pub content: Vec<PartCount>,
}

/// The reported kind of a counted content part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PartKind {
    /// A text part (also recorded for image/file placeholders).
    Text,

    /// A tool-call part.
    ToolCall,

    /// A tool-result part.
    ToolResult,
}

/// One content part's share of its message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartCount {
    /// The part kind.
    #[serde(rename = "type")]
    pub kind: PartKind,

    /// The part total, multiplier applied.
    pub total: usize,

    /// For tool calls: the serialized-input share alone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<usize>,

    /// For tool results: the output share alone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<usize>,
}

impl PartCount {
    fn text(total: usize) -> Self {
        Self {
            kind: PartKind::Text,
            total,
            input: None,
            output: None,
        }
    }
}

/// The tool block's share of the total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolsCount {
    /// Tool block total; zero when no tools are present.
    pub total: usize,

    /// Per-definition breakdown, keyed by tool name in definition order.
    ///
    /// A name-keyed map: a duplicated tool name keeps one record (the
    /// last definition wins), and it serializes as a JSON object.
    pub definitions: IndexMap<String, ToolDefCount>,
}

/// One tool definition's share of the tool block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefCount {
    /// The tool name.
    pub name: String,

    /// Description tokens, including the per-description overhead; zero
    /// when the tool has no description.
    pub description: usize,

    /// Input-schema tokens from the schema walk.
    #[serde(rename = "inputSchema")]
    pub input_schema: usize,
}

/// Round `raw * multiplier`, half away from zero.
fn reported(
    raw: usize,
    multiplier: f64,
) -> usize {
    (raw as f64 * multiplier).round() as usize
}

/// Serialize a tool input/output value the way the accountant counts it:
/// compact JSON, keys in insertion order; bare strings count as-is.
fn count_value<T: TokenType>(
    engine: &mut BpeTokenizer<T>,
    value: &serde_json::Value,
) -> usize {
    match value {
        serde_json::Value::String(text) => engine.count(text),
        other => {
            let json = serde_json::to_string(other)
                .unwrap_or_else(|_| other.to_string());
            engine.count(&json)
        }
    }
}

/// Estimate the input tokens of a chat prompt.
///
/// ## Arguments
/// * `engine` - A BPE engine over the config's encoding.
/// * `config` - The model's overhead coefficients and content multiplier.
/// * `messages` - The ordered messages.
/// * `tools` - The tool definitions, in declaration order.
///
/// ## Returns
/// The nested [`PromptCount`], or an error when a tool schema is invalid.
pub fn count_prompt<T: TokenType>(
    engine: &mut BpeTokenizer<T>,
    config: &ModelConfig,
    messages: &[Message],
    tools: &[ToolDefinition],
) -> TallyResult<PromptCount> {
    let overheads = &config.tokens;
    let multiplier = config.content_multiplier;

    let mut total = overheads.base_overhead as usize;
    let mut message_counts = Vec::with_capacity(messages.len());

    for message in messages {
        let mut message_total =
            overheads.per_message as usize + engine.count(message.role.as_str());
        let mut parts = Vec::new();

        let count_text = |engine: &mut BpeTokenizer<T>, text: &str| {
            PartCount::text(reported(engine.count(text), multiplier))
        };

        match &message.content {
            MessageContent::Text(text) => {
                parts.push(count_text(engine, text));
            }
            MessageContent::Parts(content) => {
                for part in content {
                    let counted = match part {
                        ContentPart::Text { text } => count_text(engine, text),
                        ContentPart::ToolCall {
                            tool_name, input, ..
                        } => {
                            let raw_input = count_value(engine, input);
                            let raw_name = engine.count(tool_name);
                            PartCount {
                                kind: PartKind::ToolCall,
                                total: reported(raw_input + raw_name, multiplier),
                                input: Some(reported(raw_input, multiplier)),
                                output: None,
                            }
                        }
                        ContentPart::ToolResult {
                            tool_call_id,
                            output,
                        } => {
                            let raw_output = count_value(engine, output);
                            let raw_id = engine.count(tool_call_id);
                            PartCount {
                                kind: PartKind::ToolResult,
                                total: reported(raw_output + raw_id, multiplier),
                                input: None,
                                output: Some(reported(raw_output, multiplier)),
                            }
                        }
                        ContentPart::Image => PartCount::text(IMAGE_PART_TOKENS),
                        ContentPart::File => PartCount::text(FILE_PART_TOKENS),
                    };
                    parts.push(counted);
                }
            }
        }

        message_total += parts.iter().map(|part| part.total).sum::<usize>();
        total += message_total;
        message_counts.push(MessageCount {
            total: message_total,
            content: parts,
        });
    }

    let mut tools_count = ToolsCount {
        total: 0,
        definitions: IndexMap::with_capacity(tools.len()),
    };
    if !tools.is_empty() {
        tools_count.total = overheads.tools_exist as usize;
        for (idx, tool) in tools.iter().enumerate() {
            let name_tokens = engine.count(&tool.name);
            let description_tokens = match &tool.description {
                Some(description) => {
                    overheads.per_desc as usize + engine.count(description)
                }
                None => 0,
            };
            let schema_tokens = walk_schema(engine, overheads, &tool.input_schema)?;

            tools_count.total += name_tokens + description_tokens + schema_tokens;
            if idx > 0 {
                tools_count.total += overheads.per_tool as usize;
            }
            tools_count.definitions.insert(
                tool.name.clone(),
                ToolDefCount {
                    name: tool.name.clone(),
                    description: description_tokens,
                    input_schema: schema_tokens,
                },
            );
        }
    }
    total += tools_count.total;

    Ok(PromptCount {
        total,
        messages: message_counts,
        tools: tools_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bpe::testing::byte_complete_tokenizer;
    use crate::models::{ModelPricing, TokenOverheads};
    use crate::prompt::message::MessageRole;
    use crate::prompt::schema::{SchemaNode, SchemaProperty};

    fn test_config(multiplier: f64) -> ModelConfig {
        ModelConfig {
            name: "Test".into(),
            encoding: "o200k_base".into(),
            context_window: 8192,
            max_tokens: 1024,
            content_multiplier: multiplier,
            pricing: ModelPricing::default(),
            tokens: TokenOverheads {
                base_overhead: 3,
                per_message: 6,
                tools_exist: 30,
                per_tool: 7,
                per_desc: 2,
                per_first_prop: 5,
                per_additional_prop: 3,
                per_prop_desc: 2,
                per_enum: 3,
                per_nested_object: 4,
                per_array_of_objects: 5,
            },
        }
    }

    fn weather_tool() -> ToolDefinition {
        ToolDefinition::new(
            "hello",
            SchemaNode::object([SchemaProperty::new("world", SchemaNode::String)]),
        )
    }

    #[test]
    fn test_empty_prompt() {
        let mut engine = byte_complete_tokenizer();
        let count = count_prompt(&mut engine, &test_config(1.0), &[], &[]).unwrap();

        assert_eq!(count.total, 3);
        assert!(count.messages.is_empty());
        assert_eq!(count.tools.total, 0);
        assert!(count.tools.definitions.is_empty());
    }

    #[test]
    fn test_string_message() {
        let mut engine = byte_complete_tokenizer();
        let config = test_config(1.0);

        // "hello world" is 2 tokens; "user" merges to 4 byte tokens.
        let role_tokens = engine.count("user");
        let messages = [Message::user("hello world")];
        let count = count_prompt(&mut engine, &config, &messages, &[]).unwrap();

        assert_eq!(count.messages.len(), 1);
        let message = &count.messages[0];
        assert_eq!(message.content, vec![PartCount::text(2)]);
        assert_eq!(message.total, 6 + role_tokens + 2);
        assert_eq!(count.total, 3 + message.total);
    }

    #[test]
    fn test_sum_law() {
        let mut engine = byte_complete_tokenizer();
        let config = test_config(1.0);

        let messages = [
            Message::system("hello"),
            Message::user("hello world hello"),
            Message::with_parts(
                MessageRole::Assistant,
                vec![
                    ContentPart::Text {
                        text: "world".into(),
                    },
                    ContentPart::ToolCall {
                        tool_call_id: "call-1".into(),
                        tool_name: "hello".into(),
                        input: serde_json::json!({"world": "hello"}),
                    },
                ],
            ),
            Message::with_parts(
                MessageRole::Tool,
                vec![ContentPart::ToolResult {
                    tool_call_id: "call-1".into(),
                    output: serde_json::json!({"hello": ["world", 42]}),
                }],
            ),
        ];
        let tools = [
            weather_tool(),
            ToolDefinition::new(
                "world",
                SchemaNode::object([SchemaProperty::new("hello", SchemaNode::Number)]),
            )
            .with_description("hello world"),
        ];

        let count = count_prompt(&mut engine, &config, &messages, &tools).unwrap();

        // Root total is exactly base + messages + tools.
        let message_sum: usize = count.messages.iter().map(|m| m.total).sum();
        assert_eq!(
            count.total,
            config.tokens.base_overhead as usize + message_sum + count.tools.total
        );

        // Each message total is exactly framing + role + parts.
        for (message, counted) in messages.iter().zip(&count.messages) {
            let parts: usize = counted.content.iter().map(|p| p.total).sum();
            assert_eq!(
                counted.total,
                config.tokens.per_message as usize
                    + engine.count(message.role.as_str())
                    + parts
            );
        }

        // The tool block covers its coefficients plus per-definition sums.
        let def_sum: usize = count
            .tools
            .definitions
            .values()
            .map(|d| engine.count(&d.name) + d.description + d.input_schema)
            .sum();
        assert_eq!(
            count.tools.total,
            config.tokens.tools_exist as usize + config.tokens.per_tool as usize + def_sum
        );
    }

    #[test]
    fn test_tool_call_part_shares() {
        let mut engine = byte_complete_tokenizer();
        let config = test_config(1.0);

        let input = serde_json::json!({"world": "hello"});
        let raw_input = engine.count(&serde_json::to_string(&input).unwrap());
        let raw_name = engine.count("hello");

        let messages = [Message::with_parts(
            MessageRole::Assistant,
            vec![ContentPart::ToolCall {
                tool_call_id: "c1".into(),
                tool_name: "hello".into(),
                input,
            }],
        )];
        let count = count_prompt(&mut engine, &config, &messages, &[]).unwrap();

        let part = &count.messages[0].content[0];
        assert_eq!(part.kind, PartKind::ToolCall);
        assert_eq!(part.total, raw_input + raw_name);
        assert_eq!(part.input, Some(raw_input));
        assert_eq!(part.output, None);
    }

    #[test]
    fn test_tool_result_string_output() {
        let mut engine = byte_complete_tokenizer();
        let config = test_config(1.0);

        // String outputs count as-is, without JSON quoting.
        let raw_output = engine.count("hello world");
        let raw_id = engine.count("c1");

        let messages = [Message::with_parts(
            MessageRole::Tool,
            vec![ContentPart::ToolResult {
                tool_call_id: "c1".into(),
                output: serde_json::Value::String("hello world".into()),
            }],
        )];
        let count = count_prompt(&mut engine, &config, &messages, &[]).unwrap();

        let part = &count.messages[0].content[0];
        assert_eq!(part.total, raw_output + raw_id);
        assert_eq!(part.output, Some(raw_output));
    }

    #[test]
    fn test_image_file_placeholders() {
        let mut engine = byte_complete_tokenizer();
        let config = test_config(1.0);

        let messages = [Message::with_parts(
            MessageRole::User,
            vec![ContentPart::Image, ContentPart::File],
        )];
        let count = count_prompt(&mut engine, &config, &messages, &[]).unwrap();

        assert_eq!(
            count.messages[0].content,
            vec![
                PartCount::text(IMAGE_PART_TOKENS),
                PartCount::text(FILE_PART_TOKENS)
            ]
        );
    }

    #[test]
    fn test_multiplier_law() {
        let mut engine = byte_complete_tokenizer();

        // "hello" then four " world" pieces: raw = 5.
        let messages = [Message::user("hello world world world world")];
        let base = count_prompt(&mut engine, &test_config(1.0), &messages, &[]).unwrap();
        let doubled = count_prompt(&mut engine, &test_config(2.0), &messages, &[]).unwrap();

        // reported scales exactly with the multiplier.
        assert_eq!(base.messages[0].content[0].total, 5);
        assert_eq!(doubled.messages[0].content[0].total, 10);
    }

    #[test]
    fn test_multiplier_rounds_half_away_from_zero() {
        let mut engine = byte_complete_tokenizer();

        // raw = 2; 2 * 1.25 = 2.5 rounds to 3.
        let messages = [Message::user("hello world")];
        let count = count_prompt(&mut engine, &test_config(1.25), &messages, &[]).unwrap();
        assert_eq!(count.messages[0].content[0].total, 3);
    }

    #[test]
    fn test_single_tool_no_per_tool() {
        let mut engine = byte_complete_tokenizer();
        let config = test_config(1.0);

        let count = count_prompt(&mut engine, &config, &[], &[weather_tool()]).unwrap();

        // tools_exist(30) + name(1) + schema(world 1 + first 5); no
        // per-tool charge for the first definition.
        assert_eq!(count.tools.total, 30 + 1 + 6);
        let def = &count.tools.definitions["hello"];
        assert_eq!(def.name, "hello");
        assert_eq!(def.description, 0);
        assert_eq!(def.input_schema, 6);
        assert_eq!(count.total, 3 + count.tools.total);
    }

    #[test]
    fn test_duplicate_tool_names_keep_one_record() {
        let mut engine = byte_complete_tokenizer();
        let config = test_config(1.0);

        let tools = [weather_tool(), weather_tool()];
        let count = count_prompt(&mut engine, &config, &[], &tools).unwrap();

        // One keyed record survives, but the block total still charges
        // both definitions.
        assert_eq!(count.tools.definitions.len(), 1);
        assert_eq!(count.tools.total, 30 + (1 + 6) + 7 + (1 + 6));
    }

    #[test]
    fn test_large_tool_result_bound() {
        let mut engine = byte_complete_tokenizer();
        let config = test_config(1.0);

        // A 5000-element array of objects serialized into a tool result
        // dominates everything else in the prompt.
        let items: Vec<serde_json::Value> = (0..5000)
            .map(|i| serde_json::json!({"id": i, "name": format!("record-{i}"), "active": true}))
            .collect();
        let messages = [Message::with_parts(
            MessageRole::Tool,
            vec![ContentPart::ToolResult {
                tool_call_id: "c1".into(),
                output: serde_json::Value::Array(items),
            }],
        )];

        let count = count_prompt(&mut engine, &config, &messages, &[]).unwrap();
        let part = &count.messages[0].content[0];

        assert!(part.output.unwrap() > 40_000, "output = {:?}", part.output);
        assert!(count.messages[0].total >= part.output.unwrap());
        assert!(count.total >= 40_000);
    }

    #[test]
    fn test_count_serializes() {
        let mut engine = byte_complete_tokenizer();
        let config = test_config(1.0);

        let messages = [Message::user("hello")];
        let count = count_prompt(&mut engine, &config, &messages, &[weather_tool()]).unwrap();

        let json = serde_json::to_value(&count).unwrap();
        assert_eq!(json["total"], serde_json::json!(count.total));
        assert_eq!(json["messages"][0]["content"][0]["type"], "text");

        // Definitions serialize as a name-keyed object.
        assert_eq!(json["tools"]["definitions"]["hello"]["inputSchema"], 6);
    }
}
