//! # Tool Schemas
//!
//! A tagged tree over tool input schemas, and the walker that prices it
//! with a model's overhead coefficients. Object properties are an ordered
//! list: the first property of each object costs differently from the
//! rest, so iteration order is part of the contract.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::bpe::BpeTokenizer;
use crate::errors::{TallyError, TallyResult};
use crate::models::TokenOverheads;
use crate::types::TokenType;

/// A tool exposed to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name.
    pub name: String,

    /// Optional human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// The typed input schema; must be an object at the root.
    pub input_schema: SchemaNode,
}

impl ToolDefinition {
    /// Create a tool definition without a description.
    pub fn new(
        name: impl Into<String>,
        input_schema: SchemaNode,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            input_schema,
        }
    }

    /// Set the description.
    pub fn with_description(
        self,
        description: impl Into<String>,
    ) -> Self {
        Self {
            description: Some(description.into()),
            ..self
        }
    }
}

/// One named property of an object schema.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaProperty {
    /// The property name.
    pub name: String,

    /// Optional property description.
    pub description: Option<String>,

    /// The property's type node.
    pub node: SchemaNode,
}

impl SchemaProperty {
    /// Create a property without a description.
    pub fn new(
        name: impl Into<String>,
        node: SchemaNode,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            node,
        }
    }

    /// Set the description.
    pub fn with_description(
        self,
        description: impl Into<String>,
    ) -> Self {
        Self {
            description: Some(description.into()),
            ..self
        }
    }
}

/// A node of a tool input schema.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    /// An object with ordered named properties.
    Object {
        /// The properties, in declaration order.
        properties: Vec<SchemaProperty>,
    },

    /// A string.
    String,

    /// A number (integer or float).
    Number,

    /// A boolean.
    Boolean,

    /// A string enumeration.
    Enum {
        /// The allowed values.
        values: Vec<String>,
    },

    /// An array with a typed element.
    Array {
        /// The element type.
        element: Box<SchemaNode>,
    },
}

impl SchemaNode {
    /// Build an object node from properties.
    pub fn object(properties: impl IntoIterator<Item = SchemaProperty>) -> Self {
        Self::Object {
            properties: properties.into_iter().collect(),
        }
    }

    /// Build an array node.
    pub fn array(element: SchemaNode) -> Self {
        Self::Array {
            element: Box::new(element),
        }
    }

    /// Build an enum node.
    pub fn enumeration<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        Self::Enum {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a JSON Schema document into a [`SchemaNode`].
    ///
    /// Understands the subset tool schemas use: `type`, `properties`,
    /// `description`, `enum`, and `items`. Anything else is an
    /// [`TallyError::InvalidSchemaNode`].
    pub fn from_json(value: &serde_json::Value) -> TallyResult<Self> {
        let Some(map) = value.as_object() else {
            return Err(TallyError::InvalidSchemaNode(format!(
                "expected a schema object, got {value}"
            )));
        };

        if let Some(values) = map.get("enum") {
            let Some(values) = values.as_array() else {
                return Err(TallyError::InvalidSchemaNode("enum must be an array".into()));
            };
            let values = values
                .iter()
                .map(|v| match v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect();
            return Ok(Self::Enum { values });
        }

        let type_name = map.get("type").and_then(|t| t.as_str()).ok_or_else(|| {
            TallyError::InvalidSchemaNode("schema node is missing \"type\"".into())
        })?;

        match type_name {
            "object" => {
                let mut properties = Vec::new();
                if let Some(props) = map.get("properties") {
                    let Some(props) = props.as_object() else {
                        return Err(TallyError::InvalidSchemaNode(
                            "\"properties\" must be an object".into(),
                        ));
                    };
                    // serde_json's preserve_order map keeps declaration order.
                    for (name, child) in props {
                        let description = child
                            .get("description")
                            .and_then(|d| d.as_str())
                            .map(String::from);
                        properties.push(SchemaProperty {
                            name: name.clone(),
                            description,
                            node: Self::from_json(child)?,
                        });
                    }
                }
                Ok(Self::Object { properties })
            }
            "string" => Ok(Self::String),
            "number" | "integer" => Ok(Self::Number),
            "boolean" => Ok(Self::Boolean),
            "array" => {
                let items = map.get("items").ok_or_else(|| {
                    TallyError::InvalidSchemaNode("array node is missing \"items\"".into())
                })?;
                Ok(Self::array(Self::from_json(items)?))
            }
            other => Err(TallyError::InvalidSchemaNode(format!(
                "unsupported schema type {other:?}"
            ))),
        }
    }

    /// Serialize to the JSON Schema subset understood by [`Self::from_json`].
    pub fn to_json(&self) -> serde_json::Value {
        self.to_json_with_description(None)
    }

    fn to_json_with_description(
        &self,
        description: Option<&str>,
    ) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        match self {
            Self::Object { properties } => {
                map.insert("type".into(), "object".into());
                let mut props = serde_json::Map::new();
                for property in properties {
                    props.insert(
                        property.name.clone(),
                        property
                            .node
                            .to_json_with_description(property.description.as_deref()),
                    );
                }
                map.insert("properties".into(), props.into());
            }
            Self::String => {
                map.insert("type".into(), "string".into());
            }
            Self::Number => {
                map.insert("type".into(), "number".into());
            }
            Self::Boolean => {
                map.insert("type".into(), "boolean".into());
            }
            Self::Enum { values } => {
                map.insert("type".into(), "string".into());
                map.insert(
                    "enum".into(),
                    values.iter().cloned().map(Into::into).collect::<Vec<serde_json::Value>>().into(),
                );
            }
            Self::Array { element } => {
                map.insert("type".into(), "array".into());
                map.insert("items".into(), element.to_json_with_description(None));
            }
        }
        if let Some(description) = description {
            map.insert("description".into(), description.into());
        }
        map.into()
    }
}

impl Serialize for SchemaNode {
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SchemaNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Self::from_json(&value).map_err(D::Error::custom)
    }
}

/// Price a tool input schema with a model's overhead coefficients.
///
/// The root must be an object. Each property costs its tokenized name plus
/// a first-vs-subsequent position coefficient, plus description and
/// type-specific coefficients; object and array-of-object properties
/// recurse with the property counter reset inside the child object.
///
/// ## Returns
/// Total tokens for the subtree, or [`TallyError::InvalidSchemaNode`] when
/// the root is not an object.
pub fn walk_schema<T: TokenType>(
    engine: &mut BpeTokenizer<T>,
    overheads: &TokenOverheads,
    root: &SchemaNode,
) -> TallyResult<usize> {
    match root {
        SchemaNode::Object { properties } => Ok(walk_object(engine, overheads, properties)),
        other => Err(TallyError::InvalidSchemaNode(format!(
            "tool schema root must be an object, got {other:?}"
        ))),
    }
}

fn walk_object<T: TokenType>(
    engine: &mut BpeTokenizer<T>,
    overheads: &TokenOverheads,
    properties: &[SchemaProperty],
) -> usize {
    let mut total = 0;

    for (idx, property) in properties.iter().enumerate() {
        total += engine.count(&property.name);
        total += if idx == 0 {
            overheads.per_first_prop
        } else {
            overheads.per_additional_prop
        } as usize;

        if let Some(description) = &property.description {
            total += overheads.per_prop_desc as usize + engine.count(description);
        }

        total += node_tokens(engine, overheads, &property.node);
    }

    total
}

/// Type-specific cost of one node; scalars contribute nothing.
fn node_tokens<T: TokenType>(
    engine: &mut BpeTokenizer<T>,
    overheads: &TokenOverheads,
    node: &SchemaNode,
) -> usize {
    match node {
        SchemaNode::Enum { values } => {
            overheads.per_enum as usize
                + values.iter().map(|value| engine.count(value)).sum::<usize>()
        }
        SchemaNode::Object { properties } => {
            overheads.per_nested_object as usize + walk_object(engine, overheads, properties)
        }
        SchemaNode::Array { element } => match element.as_ref() {
            SchemaNode::Object { properties } => {
                overheads.per_array_of_objects as usize
                    + walk_object(engine, overheads, properties)
            }
            other => node_tokens(engine, overheads, other),
        },
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bpe::testing::byte_complete_tokenizer;

    fn test_overheads() -> TokenOverheads {
        TokenOverheads {
            per_first_prop: 100,
            per_additional_prop: 10,
            per_prop_desc: 7,
            per_enum: 5,
            per_nested_object: 3,
            per_array_of_objects: 4,
            ..Default::default()
        }
    }

    #[test]
    fn test_root_must_be_object() {
        let mut engine = byte_complete_tokenizer();
        let err = walk_schema(&mut engine, &test_overheads(), &SchemaNode::String).unwrap_err();
        assert!(matches!(err, TallyError::InvalidSchemaNode(_)));
    }

    #[test]
    fn test_property_positions_and_descriptions() {
        let mut engine = byte_complete_tokenizer();
        let ov = test_overheads();

        // "hello" is 1 token, "world" is 1 token in the test table.
        let schema = SchemaNode::object([
            SchemaProperty::new("hello", SchemaNode::String),
            SchemaProperty::new("world", SchemaNode::Number).with_description("hello world"),
        ]);

        // hello: 1 + first(100); world: 1 + addl(10) + desc(7 + 2).
        assert_eq!(walk_schema(&mut engine, &ov, &schema).unwrap(), 121);
    }

    #[test]
    fn test_enum_values() {
        let mut engine = byte_complete_tokenizer();
        let ov = test_overheads();

        let schema = SchemaNode::object([SchemaProperty::new(
            "hello",
            SchemaNode::enumeration(["hello", "world"]),
        )]);

        // name 1 + first 100 + enum 5 + values (1 + 1).
        assert_eq!(walk_schema(&mut engine, &ov, &schema).unwrap(), 108);
    }

    #[test]
    fn test_nested_object_law() {
        let mut engine = byte_complete_tokenizer();
        let ov = test_overheads();

        let leaf = || SchemaProperty::new("hello", SchemaNode::String);
        let flat = SchemaNode::object([leaf()]);
        let nested = SchemaNode::object([SchemaProperty::new("world", SchemaNode::object([leaf()]))]);

        let flat_tokens = walk_schema(&mut engine, &ov, &flat).unwrap();
        let nested_tokens = walk_schema(&mut engine, &ov, &nested).unwrap();

        // Subtracting the wrapper's name and position overhead leaves
        // exactly the nested-object coefficient.
        let wrapper = engine.count("world") + ov.per_first_prop as usize;
        assert_eq!(
            nested_tokens - wrapper - flat_tokens,
            ov.per_nested_object as usize
        );
    }

    #[test]
    fn test_array_variants() {
        let mut engine = byte_complete_tokenizer();
        let ov = test_overheads();

        // Array of objects pays its coefficient plus the element walk.
        let of_objects = SchemaNode::object([SchemaProperty::new(
            "hello",
            SchemaNode::array(SchemaNode::object([SchemaProperty::new(
                "world",
                SchemaNode::String,
            )])),
        )]);
        assert_eq!(
            walk_schema(&mut engine, &ov, &of_objects).unwrap(),
            1 + 100 + 4 + (1 + 100)
        );

        // Array of scalars contributes nothing beyond the property.
        let of_strings = SchemaNode::object([SchemaProperty::new(
            "hello",
            SchemaNode::array(SchemaNode::String),
        )]);
        assert_eq!(walk_schema(&mut engine, &ov, &of_strings).unwrap(), 101);
    }

    #[test]
    fn test_from_json() {
        let value = serde_json::json!({
            "type": "object",
            "properties": {
                "location": {"type": "string", "description": "The city"},
                "unit": {"enum": ["metric", "imperial"]},
                "tags": {"type": "array", "items": {"type": "string"}},
                "extra": {"type": "object", "properties": {"flag": {"type": "boolean"}}}
            }
        });
        let schema = SchemaNode::from_json(&value).unwrap();

        let SchemaNode::Object { properties } = &schema else {
            panic!("expected object root");
        };
        assert_eq!(properties.len(), 4);
        assert_eq!(properties[0].name, "location");
        assert_eq!(properties[0].description.as_deref(), Some("The city"));
        assert!(matches!(properties[1].node, SchemaNode::Enum { .. }));
        assert!(matches!(properties[2].node, SchemaNode::Array { .. }));

        // Round-trips through the serializer.
        let back = SchemaNode::from_json(&schema.to_json()).unwrap();
        assert_eq!(back, schema);
    }

    #[test]
    fn test_from_json_rejects_malformed() {
        for bad in [
            serde_json::json!("string"),
            serde_json::json!({"type": "tuple"}),
            serde_json::json!({"type": "array"}),
            serde_json::json!({}),
        ] {
            assert!(SchemaNode::from_json(&bad).is_err(), "accepted {bad}");
        }
    }
}
