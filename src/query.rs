//! Read-side queries over committed graph state
//!
//! Views consumed by the CLI and by downstream tooling. All functions read
//! whatever state has been committed; nothing here mutates the store.

use crate::model::{Concept, ConceptRelation};
use crate::storage::{SqliteStore, StorageResult};
use serde::Serialize;
use std::collections::BTreeMap;

/// A concept with its occurrence count.
#[derive(Debug, Clone, Serialize)]
pub struct ConceptFrequency {
    pub concept: Concept,
    pub occurrences: i64,
}

/// Everything known about one concept.
#[derive(Debug, Clone, Serialize)]
pub struct ConceptDetail {
    pub concept: Concept,
    pub parent: Option<Concept>,
    pub children: Vec<Concept>,
    /// Outgoing relations, paired with their target
    pub related_to: Vec<(ConceptRelation, Concept)>,
    /// Incoming relations, paired with their source
    pub related_from: Vec<(ConceptRelation, Concept)>,
    pub occurrences: i64,
}

/// Concepts ranked by how often they occur, most frequent first.
pub fn concept_frequency(
    store: &SqliteStore,
    limit: Option<usize>,
) -> StorageResult<Vec<ConceptFrequency>> {
    let ranked = store.with_session(|s| s.concept_frequency(limit))?;
    Ok(ranked
        .into_iter()
        .map(|(concept, occurrences)| ConceptFrequency {
            concept,
            occurrences,
        })
        .collect())
}

/// Concepts grouped by category. Only categorized concepts appear.
pub fn concepts_by_category(
    store: &SqliteStore,
) -> StorageResult<BTreeMap<String, Vec<Concept>>> {
    let concepts = store.with_session(|s| s.categorized_concepts())?;

    let mut categories: BTreeMap<String, Vec<Concept>> = BTreeMap::new();
    for concept in concepts {
        if let Some(category) = concept.category.clone() {
            categories.entry(category).or_default().push(concept);
        }
    }
    Ok(categories)
}

/// Concepts occurring in papers from the given year, ranked by count.
pub fn concepts_for_year(
    store: &SqliteStore,
    year: i32,
) -> StorageResult<Vec<ConceptFrequency>> {
    let ranked = store.with_session(|s| s.concepts_for_year(year))?;
    Ok(ranked
        .into_iter()
        .map(|(concept, occurrences)| ConceptFrequency {
            concept,
            occurrences,
        })
        .collect())
}

/// Full detail for the named concept, or `None` when unknown.
pub fn concept_detail(store: &SqliteStore, name: &str) -> StorageResult<Option<ConceptDetail>> {
    store.with_session(|s| {
        let Some(concept) = s.find_concept_by_name(name)? else {
            return Ok(None);
        };

        let parent = match concept.parent_id {
            Some(parent_id) => s.concept(parent_id)?,
            None => None,
        };

        Ok(Some(ConceptDetail {
            parent,
            children: s.concept_children(concept.id)?,
            related_to: s.relations_from(concept.id)?,
            related_from: s.relations_to(concept.id)?,
            occurrences: s.occurrence_count_for_concept(concept.id)?,
            concept,
        }))
    })
}

/// Concepts whose name contains `term`.
pub fn search_concepts(store: &SqliteStore, term: &str) -> StorageResult<Vec<Concept>> {
    store.with_session(|s| s.search_concepts(term))
}
