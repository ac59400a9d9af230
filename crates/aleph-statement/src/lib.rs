//! Statement model for aleph nodes.
//!
//! A statement binds a publisher, a namespace, a content reference, and a
//! list of external identifiers (refs). Statements are built from arbitrary
//! JSON records: a [`Selector`] picks the id out of the record, an optional
//! [`IdPattern`] trims it, and the record body becomes the statement object.
//!
//! The object of a statement starts out embedded ([`PartialStatement`]) and
//! must be swapped for a [`ContentRef`](aleph_types::ContentRef) before it can
//! be published ([`SimpleStatement`]). The swap consumes the partial
//! statement, so it happens exactly once.

pub mod error;
pub mod extract;
pub mod log;
pub mod selector;
pub mod statement;

pub use error::{StatementError, StatementResult};
pub use extract::{extract_id, extract_tags, IdExtractor, IdPattern};
pub use log::StatementLog;
pub use selector::{parse_selector, Selector};
pub use statement::{PartialStatement, SequenceCounter, SimpleStatement, StatementRecord};
