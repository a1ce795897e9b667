//! Route pattern matching.
//!
//! # Responsibilities
//! - Compile `/users/:id/*` style patterns once at registration
//! - Match a request path segment by segment, binding parameters
//!
//! # Design Decisions
//! - Literal segments compare verbatim; no character has special meaning
//! - `:name` must span a whole segment and never matches an empty one
//! - A trailing `/*` binds the remainder, possibly empty, to `wildcard`
//! - No regex to guarantee O(n) matching

/// Parameter name bound by a trailing `/*`.
pub const WILDCARD: &str = "wildcard";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A compiled path pattern.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    source: String,
    segments: Vec<Segment>,
    wildcard: bool,
}

impl RoutePattern {
    pub fn compile(pattern: &str) -> Self {
        let (body, wildcard) = match pattern.strip_suffix("/*") {
            Some(body) => (body, true),
            None => (pattern, false),
        };

        let segments = body
            .split('/')
            .map(|segment| match segment.strip_prefix(':') {
                Some(name) if !name.is_empty() => Segment::Param(name.to_string()),
                _ => Segment::Literal(segment.to_string()),
            })
            .collect();

        Self {
            source: pattern.to_string(),
            segments,
            wildcard,
        }
    }

    /// The pattern as registered.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Parameter names in capture order, `wildcard` last.
    pub fn param_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .segments
            .iter()
            .filter_map(|s| match s {
                Segment::Param(name) => Some(name.as_str()),
                Segment::Literal(_) => None,
            })
            .collect();
        if self.wildcard {
            names.push(WILDCARD);
        }
        names
    }

    /// Match `path` (no query string), returning the bound parameters.
    pub fn matches(&self, path: &str) -> Option<Vec<(String, String)>> {
        let parts: Vec<&str> = path.split('/').collect();
        let fixed = self.segments.len();
        if parts.len() < fixed || (!self.wildcard && parts.len() != fixed) {
            return None;
        }

        let mut params = Vec::new();
        for (segment, part) in self.segments.iter().zip(&parts) {
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Param(name) if !part.is_empty() => {
                    params.push((name.clone(), part.to_string()));
                }
                _ => return None,
            }
        }

        if self.wildcard {
            params.push((WILDCARD.to_string(), parts[fixed..].join("/")));
        }
        Some(params)
    }
}
