//! Concept resolution — find-or-create by exact name
//!
//! Resolution by name is the sole deduplication key: the same name always
//! lands on the same row, whichever document introduced it. Optional scalar
//! fields fill first-write-wins, per field independently.

use crate::model::Concept;
use crate::storage::{StorageResult, StoreSession};
use tracing::debug;

/// Refuse to extend parent chains past this depth. A chain this long means
/// the stored hierarchy already contains a cycle.
const MAX_ANCESTOR_DEPTH: usize = 64;

/// Resolve a name to its concept row, creating the row when absent.
///
/// On a hit, non-empty `category`/`description` values land only while the
/// stored field is still empty. On a miss, the new row is immediately
/// usable as a foreign-key target within the calling transaction. A lost
/// insert race against the unique name constraint falls back to one
/// re-query.
pub fn resolve_concept(
    session: &StoreSession<'_>,
    name: &str,
    category: Option<&str>,
    description: Option<&str>,
) -> StorageResult<Concept> {
    if let Some(mut concept) = session.find_concept_by_name(name)? {
        if let Some(category) = category {
            if session.fill_concept_category(concept.id, category)? {
                concept.category = Some(category.to_string());
            }
        }
        if let Some(description) = description {
            if session.fill_concept_description(concept.id, description)? {
                concept.description = Some(description.to_string());
            }
        }
        return Ok(concept);
    }

    match session.insert_concept(name, category, description) {
        Ok(concept) => Ok(concept),
        Err(e) if e.is_unique_violation() => {
            debug!(name, "lost concept insert race, re-querying");
            session.find_concept_by_name(name)?.ok_or(e)
        }
        Err(e) => Err(e),
    }
}

/// Assign `parent_name` as the concept's parent when it has none.
///
/// Self-parenting is ignored, as is any assignment that would close a cycle
/// through the existing parent chain. The parent is find-or-created bare.
/// Returns whether an assignment was made.
pub fn assign_parent(
    session: &StoreSession<'_>,
    concept: &Concept,
    parent_name: &str,
) -> StorageResult<bool> {
    if concept.parent_id.is_some() || parent_name == concept.name {
        return Ok(false);
    }

    let parent = resolve_concept(session, parent_name, None, None)?;
    if parent.id == concept.id {
        return Ok(false);
    }
    if would_cycle(session, concept, &parent)? {
        debug!(
            concept = %concept.name,
            parent = %parent.name,
            "ignoring parent assignment that would form a cycle"
        );
        return Ok(false);
    }

    session.set_concept_parent(concept.id, parent.id)
}

/// Walk the prospective parent's ancestor chain looking for the concept.
fn would_cycle(
    session: &StoreSession<'_>,
    concept: &Concept,
    parent: &Concept,
) -> StorageResult<bool> {
    let mut cursor = Some(parent.id);
    let mut hops = 0;
    while let Some(id) = cursor {
        if id == concept.id {
            return Ok(true);
        }
        hops += 1;
        if hops > MAX_ANCESTOR_DEPTH {
            return Ok(true);
        }
        cursor = session.parent_of(id)?;
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{OpenStore, SqliteStore, StorageError};

    fn store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    #[test]
    fn resolve_creates_then_finds() {
        let store = store();
        store
            .with_tx::<_, StorageError>(|s| {
                let first = resolve_concept(s, "Recursion", Some("Algorithms"), None)?;
                let second = resolve_concept(s, "Recursion", None, None)?;
                assert_eq!(first.id, second.id);
                assert_eq!(second.category.as_deref(), Some("Algorithms"));
                assert_eq!(s.concept_count()?, 1);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn resolve_is_case_sensitive() {
        let store = store();
        store
            .with_tx::<_, StorageError>(|s| {
                resolve_concept(s, "Recursion", None, None)?;
                resolve_concept(s, "recursion", None, None)?;
                assert_eq!(s.concept_count()?, 2);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn fields_fill_first_write_wins_independently() {
        let store = store();
        store
            .with_tx::<_, StorageError>(|s| {
                resolve_concept(s, "Recursion", None, Some("self-reference"))?;
                let filled =
                    resolve_concept(s, "Recursion", Some("Algorithms"), Some("other text"))?;
                // Category was empty, fills; description was set, keeps
                assert_eq!(filled.category.as_deref(), Some("Algorithms"));
                assert_eq!(filled.description.as_deref(), Some("self-reference"));
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn parent_assignment_creates_missing_parent() {
        let store = store();
        store
            .with_tx::<_, StorageError>(|s| {
                let child = resolve_concept(s, "Merge Sort", None, None)?;
                assert!(assign_parent(s, &child, "Sorting")?);

                let parent = s.find_concept_by_name("Sorting")?.unwrap();
                assert_eq!(s.parent_of(child.id)?, Some(parent.id));
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn self_parent_is_ignored() {
        let store = store();
        store
            .with_tx::<_, StorageError>(|s| {
                let concept = resolve_concept(s, "Recursion", None, None)?;
                assert!(!assign_parent(s, &concept, "Recursion")?);
                assert_eq!(s.parent_of(concept.id)?, None);
                assert_eq!(s.concept_count()?, 1);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn existing_parent_is_not_overwritten() {
        let store = store();
        store
            .with_tx::<_, StorageError>(|s| {
                let child = resolve_concept(s, "Merge Sort", None, None)?;
                assert!(assign_parent(s, &child, "Sorting")?);

                let child = s.find_concept_by_name("Merge Sort")?.unwrap();
                assert!(!assign_parent(s, &child, "Algorithms")?);

                let sorting = s.find_concept_by_name("Sorting")?.unwrap();
                assert_eq!(s.parent_of(child.id)?, Some(sorting.id));
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn cycle_forming_assignment_is_ignored() {
        let store = store();
        store
            .with_tx::<_, StorageError>(|s| {
                // A -> B (A's parent is B)
                let a = resolve_concept(s, "A", None, None)?;
                assert!(assign_parent(s, &a, "B")?);

                // B -> A would close the loop
                let b = s.find_concept_by_name("B")?.unwrap();
                assert!(!assign_parent(s, &b, "A")?);
                assert_eq!(s.parent_of(b.id)?, None);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn deep_chain_cycle_is_caught() {
        let store = store();
        store
            .with_tx::<_, StorageError>(|s| {
                // C -> B -> A, then A -> C would cycle through two hops
                let c = resolve_concept(s, "C", None, None)?;
                assert!(assign_parent(s, &c, "B")?);
                let b = s.find_concept_by_name("B")?.unwrap();
                assert!(assign_parent(s, &b, "A")?);

                let a = s.find_concept_by_name("A")?.unwrap();
                assert!(!assign_parent(s, &a, "C")?);
                Ok(())
            })
            .unwrap();
    }
}
