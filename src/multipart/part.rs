//! Decoded form parts and part-header parsing.

use axum::body::Bytes;

/// One named section of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// Field name from `Content-Disposition`.
    pub name: String,
    /// Present for file-like parts, absent for plain fields.
    pub filename: Option<String>,
    /// The part's own `Content-Type`, if it declared one.
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl Part {
    pub fn is_file(&self) -> bool {
        self.filename.is_some()
    }

    /// The body as UTF-8 text, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

/// Header fields of a part that is still being read.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct PartHead {
    pub name: Option<String>,
    pub filename: Option<String>,
    pub content_type: Option<String>,
}

impl PartHead {
    /// Parse a raw header block (lines separated by CRLF, no terminator).
    /// Parts without a usable `Content-Disposition` keep `name == None` and
    /// are dropped when they complete.
    pub fn parse(raw: &[u8]) -> Self {
        let text = String::from_utf8_lossy(raw);
        let mut head = PartHead::default();

        for line in text.split("\r\n") {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match key.trim().to_ascii_lowercase().as_str() {
                "content-disposition" => {
                    for (param, val) in disposition_params(value) {
                        match param.as_str() {
                            "name" if !val.is_empty() => head.name = Some(val),
                            "filename" if !val.is_empty() => head.filename = Some(val),
                            _ => {}
                        }
                    }
                }
                "content-type" => head.content_type = Some(value.to_string()),
                _ => {}
            }
        }
        head
    }
}

/// Split `form-data; name="a"; filename="b.txt"` into lowercase-keyed
/// parameters. Quoted values may contain `;` and backslash escapes.
fn disposition_params(value: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let mut chars = value.chars().peekable();

    // disposition type
    for c in chars.by_ref() {
        if c == ';' {
            break;
        }
    }

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace() || *c == ';') {
            chars.next();
        }
        let mut key = String::new();
        while let Some(&c) = chars.peek() {
            if c == '=' || c == ';' {
                break;
            }
            key.push(c);
            chars.next();
        }
        if key.is_empty() && chars.peek().is_none() {
            break;
        }
        let mut val = String::new();
        if chars.peek() == Some(&'=') {
            chars.next();
            if chars.peek() == Some(&'"') {
                chars.next();
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                val.push(escaped);
                            }
                        }
                        '"' => break,
                        _ => val.push(c),
                    }
                }
                // skip anything up to the next separator
                while chars.peek().is_some_and(|c| *c != ';') {
                    chars.next();
                }
            } else {
                while let Some(&c) = chars.peek() {
                    if c == ';' {
                        break;
                    }
                    val.push(c);
                    chars.next();
                }
                val = val.trim().to_string();
            }
        }
        params.push((key.trim().to_ascii_lowercase(), val));
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_disposition() {
        let head = PartHead::parse(b"Content-Disposition: form-data; name=\"0\"");
        assert_eq!(head.name.as_deref(), Some("0"));
        assert_eq!(head.filename, None);
    }

    #[test]
    fn test_file_disposition_with_type() {
        let head = PartHead::parse(
            b"Content-Disposition: form-data; name=\"1\"; filename=\"a;b.txt\"\r\nContent-Type: text/plain",
        );
        assert_eq!(head.name.as_deref(), Some("1"));
        assert_eq!(head.filename.as_deref(), Some("a;b.txt"));
        assert_eq!(head.content_type.as_deref(), Some("text/plain"));
    }

    #[test]
    fn test_filename_does_not_shadow_name() {
        let head = PartHead::parse(b"content-disposition: form-data; filename=\"f.bin\"; name=\"upload\"");
        assert_eq!(head.name.as_deref(), Some("upload"));
        assert_eq!(head.filename.as_deref(), Some("f.bin"));
    }

    #[test]
    fn test_missing_or_empty_name() {
        assert_eq!(PartHead::parse(b"Content-Type: text/plain").name, None);
        assert_eq!(PartHead::parse(b"Content-Disposition: form-data; name=\"\"").name, None);
    }

    #[test]
    fn test_empty_filename_is_a_plain_field() {
        let head = PartHead::parse(b"Content-Disposition: form-data; name=\"0\"; filename=\"\"");
        assert_eq!(head.name.as_deref(), Some("0"));
        assert_eq!(head.filename, None);
    }

    #[test]
    fn test_escaped_quote_in_filename() {
        let head = PartHead::parse(br#"Content-Disposition: form-data; name="x"; filename="say \"hi\".txt""#);
        assert_eq!(head.filename.as_deref(), Some("say \"hi\".txt"));
    }
}
