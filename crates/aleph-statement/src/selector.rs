use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::{StatementError, StatementResult};

/// A path into a JSON record.
///
/// Written either as a dot path (`a.b.c`) or, when a key itself contains a
/// dot, as a JSON array of segments (`["a.b", "c"]`). Object members are
/// matched by key, array elements by numeric index.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Selector {
    segments: Vec<String>,
}

/// Parse a selector string. Surrounding whitespace is ignored.
pub fn parse_selector(selector: &str) -> StatementResult<Selector> {
    let trimmed = selector.trim();
    let syntax = |reason: &str| StatementError::SelectorSyntax {
        selector: selector.to_string(),
        reason: reason.to_string(),
    };

    if trimmed.is_empty() {
        return Err(syntax("selector is empty"));
    }

    let segments = if trimmed.starts_with('[') {
        let items: Vec<Value> =
            serde_json::from_str(trimmed).map_err(|e| syntax(&e.to_string()))?;
        items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                Value::Number(n) => Ok(n.to_string()),
                other => Err(syntax(&format!("segment {other} is not a string or number"))),
            })
            .collect::<StatementResult<Vec<String>>>()?
    } else {
        let parts: Vec<String> = trimmed.split('.').map(str::to_string).collect();
        if parts.iter().any(String::is_empty) {
            return Err(syntax("empty path segment"));
        }
        parts
    };

    if segments.is_empty() {
        return Err(syntax("selector has no segments"));
    }
    Ok(Selector { segments })
}

impl Selector {
    /// Build a selector from already split segments.
    pub fn from_segments<I, S>(segments: I) -> StatementResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(StatementError::SelectorSyntax {
                selector: "[]".into(),
                reason: "selector has no segments".into(),
            });
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Walk `value` along this path.
    pub fn resolve<'a>(&self, value: &'a Value) -> StatementResult<&'a Value> {
        let mut current = value;
        for segment in &self.segments {
            let next = match current {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            };
            current = next.ok_or_else(|| StatementError::PathNotFound {
                path: self.to_string(),
            })?;
        }
        Ok(current)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.iter().any(|s| s.contains('.')) {
            let json = serde_json::to_string(&self.segments).map_err(|_| fmt::Error)?;
            write!(f, "{json}")
        } else {
            write!(f, "{}", self.segments.join("."))
        }
    }
}

impl FromStr for Selector {
    type Err = StatementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_selector(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_dot_path() {
        let sel = parse_selector("a.b.c").unwrap();
        assert_eq!(sel.segments(), &["a", "b", "c"]);
    }

    #[test]
    fn parses_json_array() {
        let sel = parse_selector(r#" ["a.b", "c"] "#).unwrap();
        assert_eq!(sel.segments(), &["a.b", "c"]);
    }

    #[test]
    fn numeric_segments_become_strings() {
        let sel = parse_selector(r#"["items", 0]"#).unwrap();
        assert_eq!(sel.segments(), &["items", "0"]);
    }

    #[test]
    fn malformed_array_is_syntax_error() {
        let err = parse_selector(r#"["a", "#).unwrap_err();
        assert!(matches!(err, StatementError::SelectorSyntax { .. }));
    }

    #[test]
    fn object_segment_is_syntax_error() {
        let err = parse_selector(r#"["a", {"b": 1}]"#).unwrap_err();
        assert!(matches!(err, StatementError::SelectorSyntax { .. }));
    }

    #[test]
    fn empty_inputs_rejected() {
        assert!(parse_selector("   ").is_err());
        assert!(parse_selector("[]").is_err());
        assert!(parse_selector("a..b").is_err());
    }

    #[test]
    fn resolves_nested_keys_and_indices() {
        let record = json!({"meta": {"ids": ["first", "second"]}, "a.b": {"c": 7}});
        let sel = parse_selector("meta.ids.1").unwrap();
        assert_eq!(sel.resolve(&record).unwrap(), &json!("second"));
        let dotted = parse_selector(r#"["a.b", "c"]"#).unwrap();
        assert_eq!(dotted.resolve(&record).unwrap(), &json!(7));
    }

    #[test]
    fn missing_path_is_typed_error() {
        let record = json!({"a": {"b": 1}});
        let sel = parse_selector("a.x").unwrap();
        assert_eq!(
            sel.resolve(&record).unwrap_err(),
            StatementError::PathNotFound { path: "a.x".into() }
        );
        let through_scalar = parse_selector("a.b.c").unwrap();
        assert!(through_scalar.resolve(&record).is_err());
    }

    #[test]
    fn display_roundtrips() {
        for text in ["a.b.c", r#"["a.b","c"]"#] {
            let sel = parse_selector(text).unwrap();
            assert_eq!(sel.to_string(), text);
            assert_eq!(parse_selector(&sel.to_string()).unwrap(), sel);
        }
    }
}
