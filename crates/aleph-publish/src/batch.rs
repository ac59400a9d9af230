use aleph_statement::PartialStatement;

/// Default number of statements per batch.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// A sealed, ordered group of partial statements.
#[derive(Debug)]
pub struct Batch {
    index: usize,
    statements: Vec<PartialStatement>,
}

impl Batch {
    /// Position of this batch in the run, starting at 0.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn statements(&self) -> &[PartialStatement] {
        &self.statements
    }

    pub fn into_statements(self) -> Vec<PartialStatement> {
        self.statements
    }
}

/// Folds statements into fixed-capacity batches.
#[derive(Debug)]
pub struct Batcher {
    capacity: usize,
    next_index: usize,
    pending: Vec<PartialStatement>,
}

impl Batcher {
    /// A capacity of 0 is treated as 1. Nothing is allocated up front, so
    /// any capacity is accepted.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            next_index: 0,
            pending: Vec::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Add a statement, returning the sealed batch once capacity is reached.
    pub fn push(&mut self, statement: PartialStatement) -> Option<Batch> {
        self.pending.push(statement);
        if self.pending.len() >= self.capacity {
            Some(self.seal())
        } else {
            None
        }
    }

    /// Seal whatever is pending. `None` if nothing is.
    pub fn finish(mut self) -> Option<Batch> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.seal())
        }
    }

    fn seal(&mut self) -> Batch {
        let statements = std::mem::take(&mut self.pending);
        let batch = Batch {
            index: self.next_index,
            statements,
        };
        self.next_index += 1;
        batch
    }
}
