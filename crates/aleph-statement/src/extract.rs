use std::collections::BTreeSet;

use regex::Regex;
use serde_json::Value;

use crate::error::{StatementError, StatementResult};
use crate::selector::Selector;
use crate::statement::PartialStatement;

/// An anchored id-trimming pattern.
///
/// The pattern is anchored at both ends (`^`/`$` are added when missing) and
/// must contain at least one capture group. The extracted id is the
/// concatenation of every participating capture group, in order. E.g.
/// `(dpla_)http.*/(.*)` turns `dpla_http://dp.la/api/items/2e49bf37` into
/// `dpla_2e49bf37`.
#[derive(Clone, Debug)]
pub struct IdPattern {
    regex: Regex,
}

impl IdPattern {
    pub fn new(pattern: &str) -> StatementResult<Self> {
        let mut anchored = pattern.to_string();
        if !anchored.starts_with('^') {
            anchored.insert(0, '^');
        }
        if !anchored.ends_with('$') {
            anchored.push('$');
        }

        let regex = Regex::new(&anchored).map_err(|e| StatementError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        // captures_len counts the implicit whole-match group.
        if regex.captures_len() < 2 {
            return Err(StatementError::IdExtraction(
                "idRegex must contain at least one capture group".into(),
            ));
        }
        Ok(Self { regex })
    }

    /// The anchored pattern text.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Apply the pattern to a full id.
    pub fn extract(&self, full_id: &str) -> StatementResult<String> {
        let captures = self.regex.captures(full_id).ok_or_else(|| {
            StatementError::IdExtraction(format!(
                "idRegex \"{}\" failed to match on id string \"{full_id}\"",
                self.regex.as_str()
            ))
        })?;
        Ok(captures
            .iter()
            .skip(1)
            .flatten()
            .map(|m| m.as_str())
            .collect())
    }
}

/// Compiled id extraction settings for a publish run.
#[derive(Clone, Debug)]
pub struct IdExtractor {
    pub content_selector: Option<Selector>,
    pub id_selector: Selector,
    pub id_pattern: Option<IdPattern>,
}

impl IdExtractor {
    pub fn new(
        id_selector: Selector,
        content_selector: Option<Selector>,
        id_pattern: Option<IdPattern>,
    ) -> Self {
        Self {
            content_selector,
            id_selector,
            id_pattern,
        }
    }

    /// Build the partial statement for one input record.
    ///
    /// With a content selector the record is narrowed first, and the narrowed
    /// subtree becomes both the id source and the statement body.
    pub fn extract(&self, record: Value) -> StatementResult<PartialStatement> {
        let body = match &self.content_selector {
            Some(selector) => selector
                .resolve(&record)
                .map_err(|e| self.failure(&record, &e.to_string()))?
                .clone(),
            None => record,
        };
        let id = self.extract_from(&body)?;
        let tags = extract_tags(&body);
        Ok(PartialStatement::new(body, vec![id], tags))
    }

    fn extract_from(&self, body: &Value) -> StatementResult<String> {
        let raw = self
            .id_selector
            .resolve(body)
            .map_err(|e| self.failure(body, &e.to_string()))?;
        let full_id = match raw {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Null => return Err(self.failure(body, "id is null")),
            _ => return Err(self.failure(body, "id is not a string or number")),
        };
        if full_id.is_empty() {
            return Err(self.failure(body, "id is empty"));
        }

        let id = match &self.id_pattern {
            Some(pattern) => pattern.extract(&full_id)?,
            None => full_id,
        };
        if id.is_empty() {
            return Err(self.failure(body, "id is empty after applying idRegex"));
        }
        Ok(id)
    }

    fn failure(&self, record: &Value, reason: &str) -> StatementError {
        let pretty = serde_json::to_string_pretty(record).unwrap_or_else(|_| record.to_string());
        StatementError::IdExtraction(format!(
            "Unable to extract id using idSelector {} ({reason}). Input record: \n{pretty}",
            self.id_selector
        ))
    }
}

/// Extract the id of a single record.
///
/// Compiles `id_pattern` on each call; publish runs use a prebuilt
/// [`IdExtractor`] instead.
pub fn extract_id(
    raw: &Value,
    content_selector: Option<&Selector>,
    id_selector: &Selector,
    id_pattern: Option<&str>,
) -> StatementResult<String> {
    let pattern = id_pattern.map(IdPattern::new).transpose()?;
    let extractor = IdExtractor::new(id_selector.clone(), content_selector.cloned(), pattern);
    let body = match content_selector {
        Some(selector) => selector
            .resolve(raw)
            .map_err(|e| extractor.failure(raw, &e.to_string()))?,
        None => raw,
    };
    extractor.extract_from(body)
}

/// Extension point for deriving tags from a statement body. Always empty.
pub fn extract_tags(_body: &Value) -> BTreeSet<String> {
    BTreeSet::new()
}
