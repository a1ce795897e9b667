//! Tagged-JSON convention for containers JSON cannot express.
//!
//! `Map`, `Set`, `Date` and `RegExp` travel as `{"__t": <tag>, "__v": <payload>}`:
//!
//! | tag      | payload                         |
//! |----------|---------------------------------|
//! | `Map`    | `[[key, value], ...]`           |
//! | `Set`    | `[value, ...]`                  |
//! | `Date`   | epoch milliseconds              |
//! | `RegExp` | `{"source": "...", "flags": ""}` |
//!
//! Revival is depth-first: a payload is revived before the container that
//! wraps it. An unknown tag or a payload of the wrong shape revives to the
//! payload itself. Objects whose only keys are `__t` and `__v` are therefore
//! reserved.

use std::collections::BTreeMap;

use serde_json::{Map as JsonMap, Number, Value as Json};

use crate::wire::value::Value;
use crate::wire::WireError;

pub const TAG_KEY: &str = "__t";
pub const PAYLOAD_KEY: &str = "__v";

/// Largest integer an IEEE double represents exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Container kinds with a tagged wire form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Map,
    Set,
    Date,
    RegExp,
}

impl Tag {
    pub fn as_str(self) -> &'static str {
        match self {
            Tag::Map => "Map",
            Tag::Set => "Set",
            Tag::Date => "Date",
            Tag::RegExp => "RegExp",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Map" => Some(Tag::Map),
            "Set" => Some(Tag::Set),
            "Date" => Some(Tag::Date),
            "RegExp" => Some(Tag::RegExp),
            _ => None,
        }
    }
}

/// Convert a value to JSON, tagging containers on the way out.
///
/// `Undefined` becomes `null` inside arrays and is omitted from objects.
/// Binary values cannot be embedded and fail with `NestedBinary`.
pub fn to_json(value: &Value) -> Result<Json, WireError> {
    Ok(match value {
        Value::Undefined | Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Number(n) => number_to_json(*n),
        Value::String(s) => Json::String(s.clone()),
        Value::Array(items) => Json::Array(items.iter().map(to_json).collect::<Result<_, _>>()?),
        Value::Object(fields) => {
            let mut out = JsonMap::new();
            for (key, field) in fields {
                if matches!(field, Value::Undefined) {
                    continue;
                }
                out.insert(key.clone(), to_json(field)?);
            }
            Json::Object(out)
        }
        Value::Map(entries) => {
            let pairs = entries
                .iter()
                .map(|(k, v)| Ok(Json::Array(vec![to_json(k)?, to_json(v)?])))
                .collect::<Result<Vec<_>, WireError>>()?;
            tagged(Tag::Map, Json::Array(pairs))
        }
        Value::Set(items) => tagged(
            Tag::Set,
            Json::Array(items.iter().map(to_json).collect::<Result<_, _>>()?),
        ),
        Value::Date(millis) => tagged(Tag::Date, Json::Number((*millis).into())),
        Value::RegExp { source, flags } => {
            let mut payload = JsonMap::new();
            payload.insert("source".into(), Json::String(source.clone()));
            payload.insert("flags".into(), Json::String(flags.clone()));
            tagged(Tag::RegExp, Json::Object(payload))
        }
        Value::Bytes(_) => return Err(WireError::NestedBinary),
    })
}

/// Convert JSON to a value, reviving tagged containers bottom-up.
pub fn from_json(json: Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(b),
        Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        Json::String(s) => Value::String(s),
        Json::Array(items) => Value::Array(items.into_iter().map(from_json).collect()),
        Json::Object(mut fields) => {
            let tag = match fields.get(TAG_KEY) {
                Some(Json::String(tag)) if fields.len() == 2 && fields.contains_key(PAYLOAD_KEY) => {
                    Some(tag.clone())
                }
                _ => None,
            };
            if let Some(tag) = tag {
                let payload = fields.remove(PAYLOAD_KEY).map(from_json).unwrap_or_default();
                return revive(&tag, payload);
            }
            Value::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, from_json(v)))
                    .collect::<BTreeMap<_, _>>(),
            )
        }
    }
}

/// Build the container for `tag` from an already revived payload.
fn revive(tag: &str, payload: Value) -> Value {
    let Some(kind) = Tag::parse(tag) else {
        tracing::debug!(tag = %tag, "Unknown container tag, keeping payload");
        return payload;
    };

    match (kind, payload) {
        (Tag::Map, Value::Array(items)) => {
            if !items.iter().all(|item| matches!(item, Value::Array(pair) if pair.len() == 2)) {
                return Value::Array(items);
            }
            Value::Map(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::Array(mut pair) => {
                            let v = pair.pop()?;
                            let k = pair.pop()?;
                            Some((k, v))
                        }
                        _ => None,
                    })
                    .collect(),
            )
        }
        (Tag::Set, Value::Array(items)) => Value::Set(items),
        (Tag::Date, Value::Number(millis)) if millis.is_finite() => Value::Date(millis as i64),
        (Tag::RegExp, Value::Object(mut fields)) => {
            match (fields.remove("source"), fields.remove("flags")) {
                (Some(Value::String(source)), flags) => Value::RegExp {
                    source,
                    flags: flags.and_then(|f| f.as_str().map(str::to_owned)).unwrap_or_default(),
                },
                (source, flags) => {
                    // put the payload back together untouched
                    if let Some(source) = source {
                        fields.insert("source".into(), source);
                    }
                    if let Some(flags) = flags {
                        fields.insert("flags".into(), flags);
                    }
                    Value::Object(fields)
                }
            }
        }
        (kind, payload) => {
            tracing::debug!(tag = kind.as_str(), "Malformed container payload, keeping payload");
            payload
        }
    }
}

fn tagged(tag: Tag, payload: Json) -> Json {
    let mut out = JsonMap::new();
    out.insert(TAG_KEY.into(), Json::String(tag.as_str().into()));
    out.insert(PAYLOAD_KEY.into(), payload);
    Json::Object(out)
}

/// Integral numbers serialize without a fraction; non-finite ones as `null`.
fn number_to_json(n: f64) -> Json {
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        Json::Number((n as i64).into())
    } else {
        Number::from_f64(n).map(Json::Number).unwrap_or(Json::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_map_and_set_are_tagged() {
        let value = Value::Map(vec![(Value::from("a"), Value::from(1))]);
        assert_eq!(to_json(&value).unwrap(), json!({"__t": "Map", "__v": [["a", 1]]}));

        let value = Value::Set(vec![Value::from(1), Value::from(2.5)]);
        assert_eq!(to_json(&value).unwrap(), json!({"__t": "Set", "__v": [1, 2.5]}));
    }

    #[test]
    fn test_nested_containers_revive_bottom_up() {
        let json = json!({
            "when": {"__t": "Date", "__v": 1700000000000i64},
            "index": {"__t": "Map", "__v": [[{"__t": "Set", "__v": [1]}, "one"]]},
            "pattern": {"__t": "RegExp", "__v": {"source": "^a+$", "flags": "gi"}}
        });
        let value = from_json(json);
        assert_eq!(value.get("when"), Some(&Value::Date(1_700_000_000_000)));
        assert_eq!(
            value.get("index"),
            Some(&Value::Map(vec![(Value::Set(vec![Value::from(1)]), Value::from("one"))]))
        );
        assert_eq!(
            value.get("pattern"),
            Some(&Value::RegExp {
                source: "^a+$".into(),
                flags: "gi".into()
            })
        );
    }

    #[test]
    fn test_unknown_tag_returns_payload() {
        let value = from_json(json!({"__t": "BigInt", "__v": {"__t": "Set", "__v": ["x"]}}));
        assert_eq!(value, Value::Set(vec![Value::from("x")]));
    }

    #[test]
    fn test_malformed_payload_returns_payload() {
        assert_eq!(from_json(json!({"__t": "Date", "__v": "soon"})), Value::from("soon"));
        assert_eq!(
            from_json(json!({"__t": "Map", "__v": [[1, 2, 3]]})),
            Value::Array(vec![Value::from(vec![1, 2, 3])])
        );
    }

    #[test]
    fn test_extra_keys_are_plain_object() {
        let value = from_json(json!({"__t": "Set", "__v": [], "other": true}));
        assert!(matches!(value, Value::Object(ref fields) if fields.len() == 3));
    }

    #[test]
    fn test_nested_binary_rejected() {
        let value = Value::Array(vec![Value::Bytes(crate::wire::value::Blob::new("f", "x"))]);
        assert!(matches!(to_json(&value), Err(WireError::NestedBinary)));
    }

    #[test]
    fn test_numbers_and_undefined() {
        let value = Value::object([
            ("int", Value::from(3.0)),
            ("nan", Value::from(f64::NAN)),
            ("gone", Value::Undefined),
        ]);
        assert_eq!(to_json(&value).unwrap(), json!({"int": 3, "nan": null}));
        assert_eq!(
            to_json(&Value::Array(vec![Value::Undefined])).unwrap(),
            json!([null])
        );
    }
}
