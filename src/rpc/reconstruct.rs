//! Typed argument reconstruction.
//!
//! Parts bind to arguments by arrival order; part names are informational.
//! The manifest holds one tag per non-binary part (plain fields and `.json`
//! parts) and is consumed in the same order.

use crate::multipart::Part;
use crate::rpc::RpcError;
use crate::wire::{from_json, Blob, TypeManifest, TypeTag, Value, JSON_FILENAME};
use crate::wire::value::parse_number;

/// Rebuild positional arguments from decoded parts.
pub fn reconstruct(parts: Vec<Part>, manifest: &TypeManifest) -> Result<Vec<Value>, RpcError> {
    let typed = parts.iter().filter(|p| takes_manifest_entry(p)).count();
    if typed != manifest.len() {
        return Err(RpcError::Protocol(format!(
            "Type manifest lists {} arguments but the request carries {typed}",
            manifest.len()
        )));
    }

    let mut tags = manifest.tags().iter().copied();
    let mut args = Vec::with_capacity(parts.len());

    for (position, part) in parts.into_iter().enumerate() {
        if !takes_manifest_entry(&part) {
            args.push(Value::Bytes(Blob {
                filename: part.filename.unwrap_or_default(),
                content_type: part.content_type,
                data: part.data,
            }));
            continue;
        }

        // counted above, so a tag is always available here
        let tag = tags.next().unwrap_or(TypeTag::String);

        let value = if part.filename.is_some() {
            let json = serde_json::from_slice(&part.data).map_err(|e| {
                RpcError::Protocol(format!("Argument {position}: invalid JSON: {e}"))
            })?;
            from_json(json)
        } else {
            coerce(&part.text(), tag)
                .ok_or_else(|| RpcError::Protocol(format!("Argument {position}: {:?} is not a number", part.text())))?
        };
        args.push(value);
    }

    Ok(args)
}

/// Plain fields and `.json` parts carry a manifest entry; files do not.
fn takes_manifest_entry(part: &Part) -> bool {
    match part.filename.as_deref() {
        None => true,
        Some(name) => name == JSON_FILENAME,
    }
}

/// Coerce a plain field. `None` only for unparsable numbers; an empty
/// `number` field is rejected rather than read as zero.
fn coerce(text: &str, tag: TypeTag) -> Option<Value> {
    Some(match tag {
        TypeTag::Number => Value::Number(parse_number(text)?),
        TypeTag::Boolean => Value::Bool(text == "true"),
        TypeTag::Undefined => Value::Undefined,
        TypeTag::Null => Value::Null,
        TypeTag::Object => match text {
            "null" => Value::Null,
            "undefined" => Value::Undefined,
            _ => Value::String(text.to_string()),
        },
        TypeTag::String => Value::String(text.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;

    fn field(name: &str, text: &str) -> Part {
        Part {
            name: name.to_string(),
            filename: None,
            content_type: None,
            data: Bytes::copy_from_slice(text.as_bytes()),
        }
    }

    fn file(name: &str, filename: &str, data: &str) -> Part {
        Part {
            filename: Some(filename.to_string()),
            ..field(name, data)
        }
    }

    fn manifest(tags: &[TypeTag]) -> TypeManifest {
        TypeManifest::new(tags.to_vec())
    }

    #[test]
    fn test_scalar_coercion() {
        let parts = vec![
            field("0", "2.5"),
            field("1", "true"),
            field("2", "false"),
            field("3", "undefined"),
            field("4", "null"),
            field("5", "null"),
        ];
        let tags = [
            TypeTag::Number,
            TypeTag::Boolean,
            TypeTag::Boolean,
            TypeTag::Undefined,
            TypeTag::Null,
            TypeTag::String,
        ];
        let args = reconstruct(parts, &manifest(&tags)).unwrap();
        assert_eq!(
            args,
            vec![
                Value::from(2.5),
                Value::Bool(true),
                Value::Bool(false),
                Value::Undefined,
                Value::Null,
                Value::from("null"),
            ]
        );
    }

    #[test]
    fn test_files_skip_the_manifest() {
        let parts = vec![
            file("0", "photo.png", "\u{1}png"),
            file("1", JSON_FILENAME, r#"{"tags":{"__t":"Set","__v":["a"]}}"#),
            field("2", "7"),
        ];
        let args = reconstruct(parts, &manifest(&[TypeTag::Object, TypeTag::Number])).unwrap();
        assert!(matches!(&args[0], Value::Bytes(blob) if blob.filename == "photo.png"));
        assert_eq!(
            args[1],
            Value::object([("tags", Value::Set(vec![Value::from("a")]))])
        );
        assert_eq!(args[2], Value::from(7));
    }

    #[test]
    fn test_binding_ignores_part_names() {
        let parts = vec![field("b", "first"), field("a", "second")];
        let args = reconstruct(parts, &manifest(&[TypeTag::String, TypeTag::String])).unwrap();
        assert_eq!(args, vec![Value::from("first"), Value::from("second")]);
    }

    #[test]
    fn test_empty_filename_part_takes_a_tag() {
        let mut parser = crate::multipart::MultipartParser::new("b", Default::default());
        parser
            .feed(b"--b\r\nContent-Disposition: form-data; name=\"0\"; filename=\"\"\r\n\r\nhi\r\n--b--")
            .unwrap();
        let args = reconstruct(parser.finish(), &manifest(&[TypeTag::String])).unwrap();
        assert_eq!(args, vec![Value::from("hi")]);
    }

    #[test]
    fn test_manifest_length_mismatch() {
        let parts = vec![field("0", "1"), field("1", "2")];
        let err = reconstruct(parts.clone(), &manifest(&[TypeTag::Number])).unwrap_err();
        assert!(matches!(err, RpcError::Protocol(_)));

        let err = reconstruct(parts, &manifest(&[TypeTag::Number; 3])).unwrap_err();
        assert!(matches!(err, RpcError::Protocol(_)));
    }

    #[test]
    fn test_bad_number_and_bad_json() {
        let err = reconstruct(vec![field("0", "twelve")], &manifest(&[TypeTag::Number])).unwrap_err();
        assert!(err.to_string().contains("twelve"));

        let err = reconstruct(vec![field("0", "")], &manifest(&[TypeTag::Number])).unwrap_err();
        assert!(matches!(err, RpcError::Protocol(_)));

        let err = reconstruct(
            vec![file("0", JSON_FILENAME, "{oops")],
            &manifest(&[TypeTag::Object]),
        )
        .unwrap_err();
        assert!(matches!(err, RpcError::Protocol(ref msg) if msg.contains("invalid JSON")));
    }
}
