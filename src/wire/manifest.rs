//! The `x-func-param-datatypes` type manifest.

use serde::{Deserialize, Serialize};

use crate::wire::value::Value;
use crate::wire::WireError;

/// `typeof`-style tag for one non-binary argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    String,
    Number,
    Boolean,
    Object,
    Undefined,
    Null,
}

impl TypeTag {
    /// Tag for a value, or `None` for binary values, which carry no entry.
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Undefined => Some(TypeTag::Undefined),
            Value::Null => Some(TypeTag::Null),
            Value::Bool(_) => Some(TypeTag::Boolean),
            Value::Number(_) => Some(TypeTag::Number),
            Value::String(_) => Some(TypeTag::String),
            Value::Bytes(_) => None,
            _ => Some(TypeTag::Object),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TypeTag::String => "string",
            TypeTag::Number => "number",
            TypeTag::Boolean => "boolean",
            TypeTag::Object => "object",
            TypeTag::Undefined => "undefined",
            TypeTag::Null => "null",
        }
    }
}

/// Ordered tags, one per non-binary argument.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeManifest(Vec<TypeTag>);

impl TypeManifest {
    pub fn new(tags: Vec<TypeTag>) -> Self {
        Self(tags)
    }

    /// Parse the header value, a JSON array of tag strings.
    pub fn parse(header: &str) -> Result<Self, WireError> {
        serde_json::from_str(header)
            .map(Self)
            .map_err(|e| WireError::InvalidManifest(e.to_string()))
    }

    /// Render as the header value.
    pub fn to_header(&self) -> String {
        let tags: Vec<String> = self.0.iter().map(|t| format!("\"{}\"", t.as_str())).collect();
        format!("[{}]", tags.join(","))
    }

    pub fn get(&self, index: usize) -> Option<TypeTag> {
        self.0.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn tags(&self) -> &[TypeTag] {
        &self.0
    }
}

impl FromIterator<TypeTag> for TypeManifest {
    fn from_iter<I: IntoIterator<Item = TypeTag>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
