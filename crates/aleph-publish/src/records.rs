use std::path::Path;

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

use crate::error::{PublishError, PublishResult};

/// Boxed reader for input chosen at runtime.
pub type DynInput = Box<dyn AsyncBufRead + Unpin + Send>;

/// Lazily parsed newline-delimited JSON records.
///
/// Blank lines are skipped. A line that is not valid JSON ends the stream
/// with [`PublishError::MalformedRecord`].
pub struct RecordStream<R> {
    lines: Lines<R>,
    line: usize,
}

impl<R> RecordStream<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
        }
    }

    /// The next record, or `None` at end of input.
    pub async fn next_record(&mut self) -> PublishResult<Option<Value>> {
        while let Some(text) = self.lines.next_line().await? {
            self.line += 1;
            if text.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(&text).map_err(|e| PublishError::MalformedRecord {
                line: self.line,
                reason: e.to_string(),
            })?;
            return Ok(Some(record));
        }
        Ok(None)
    }

    /// Number of input lines consumed so far.
    pub fn lines_read(&self) -> usize {
        self.line
    }
}

impl RecordStream<DynInput> {
    /// Records from `path`, or from standard input when `None`.
    pub async fn open(path: Option<&Path>) -> PublishResult<Self> {
        let reader: DynInput = match path {
            Some(path) => Box::new(BufReader::new(tokio::fs::File::open(path).await?)),
            None => Box::new(BufReader::new(tokio::io::stdin())),
        };
        Ok(Self::new(reader))
    }
}
