//! The consolidation core
//!
//! Folds validated candidate records into the concept graph:
//! resolver (find-or-create by name) → relationship builder (idempotent
//! directed edges) → occurrence recorder (append-only evidence), driven per
//! document by the orchestrator inside one transaction.

mod occurrence;
mod orchestrator;
mod relations;
mod resolver;

pub use occurrence::record_occurrence;
pub use orchestrator::{
    BatchReport, ConsolidateError, Consolidator, DocumentReport, FailureReason, PaperOutcome,
};
pub use relations::link_related;
pub use resolver::{assign_parent, resolve_concept};
