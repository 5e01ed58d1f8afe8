//! Relationship building — idempotent directed edges
//!
//! Re-encountering an ordered pair is a no-op; the reverse pair is a
//! distinct edge. Targets that don't exist yet are created bare.

use super::resolver::resolve_concept;
use crate::model::Concept;
use crate::storage::{StorageResult, StoreSession};
use tracing::debug;

/// Link `source` to each named peer.
///
/// Empty names and the source's own name are skipped (no self-loops).
/// Returns the number of edges actually created, for telemetry.
pub fn link_related(
    session: &StoreSession<'_>,
    source: &Concept,
    related: &[String],
    relation_type: &str,
    strength: f64,
) -> StorageResult<usize> {
    let mut created = 0;

    for name in related {
        let name = name.trim();
        if name.is_empty() || name == source.name {
            continue;
        }

        let target = resolve_concept(session, name, None, None)?;
        if session.relation_exists(source.id, target.id)? {
            continue;
        }

        match session.insert_relation(source.id, target.id, relation_type, strength) {
            Ok(_) => {
                debug!(source = %source.name, target = %target.name, "created relation");
                created += 1;
            }
            // Lost pair race: the edge exists, which is all we wanted
            Err(e) if e.is_unique_violation() => {}
            Err(e) => return Err(e),
        }
    }

    Ok(created)
}
