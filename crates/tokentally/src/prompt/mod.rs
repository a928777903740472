//! # Prompt Accounting
//!
//! Structured chat prompts (ordered messages with mixed content parts,
//! plus tool definitions with typed input schemas) and the accountant that
//! turns them into a total token count with a per-component breakdown.

mod accountant;
mod message;
mod schema;

pub use accountant::{
    count_prompt,
    MessageCount,
    PartCount,
    PartKind,
    PromptCount,
    ToolDefCount,
    ToolsCount,
    FILE_PART_TOKENS,
    IMAGE_PART_TOKENS,
};
pub use message::{ContentPart, Message, MessageContent, MessageRole};
pub use schema::{walk_schema, SchemaNode, SchemaProperty, ToolDefinition};
