//! Per-namespace record of the statements a node has accepted.
//!
//! The log only appends and looks statements up by id. It is not an index:
//! there is no querying by ref, publisher, or content.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{StatementError, StatementResult};
use crate::statement::StatementRecord;

#[derive(Debug, Default)]
struct LogInner {
    by_namespace: HashMap<String, Vec<StatementRecord>>,
    ids: HashMap<String, (String, usize)>,
}

/// Append-only, in-memory statement log.
#[derive(Debug, Default)]
pub struct StatementLog {
    inner: RwLock<LogInner>,
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> StatementError {
    StatementError::Log(format!("lock poisoned: {e}"))
}

impl StatementLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append statements, skipping ids already present.
    ///
    /// Returns the number of statements newly recorded.
    pub fn record(&self, statements: Vec<StatementRecord>) -> StatementResult<usize> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        let mut recorded = 0;
        for stmt in statements {
            if inner.ids.contains_key(&stmt.id) {
                tracing::debug!(id = %stmt.id, "statement already recorded");
                continue;
            }
            let namespace = stmt.namespace.clone();
            let id = stmt.id.clone();
            let entries = inner.by_namespace.entry(namespace.clone()).or_default();
            entries.push(stmt);
            let position = entries.len() - 1;
            inner.ids.insert(id, (namespace, position));
            recorded += 1;
        }
        Ok(recorded)
    }

    /// Look up a statement by id.
    pub fn get(&self, id: &str) -> StatementResult<Option<StatementRecord>> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner
            .ids
            .get(id)
            .and_then(|(ns, pos)| inner.by_namespace.get(ns).and_then(|v| v.get(*pos)))
            .cloned())
    }

    /// Total number of recorded statements.
    pub fn len(&self) -> StatementResult<usize> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner.ids.len())
    }

    pub fn is_empty(&self) -> StatementResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Number of statements recorded in `namespace`.
    pub fn namespace_len(&self, namespace: &str) -> StatementResult<usize> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner.by_namespace.get(namespace).map_or(0, Vec::len))
    }

    /// Sorted list of namespaces with at least one statement.
    pub fn namespaces(&self) -> StatementResult<Vec<String>> {
        let inner = self.inner.read().map_err(poisoned)?;
        let mut names: Vec<String> = inner.by_namespace.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
