//! Common test utilities for consolidation integration tests
//!
//! Shared helpers for building in-memory stores, registering papers, and
//! counting graph state.
#![allow(dead_code)]

use gnosis::{Config, Consolidator, OpenStore, Paper, SqliteStore};

/// Fresh in-memory store with the full schema.
pub fn test_store() -> SqliteStore {
    SqliteStore::open_in_memory().unwrap()
}

/// Register one paper; filename doubles as the mock-extractor key.
pub fn register_paper(store: &SqliteStore, filename: &str) -> Paper {
    store
        .with_session(|s| s.insert_paper(2021, 7, "q8", filename))
        .unwrap()
}

/// A consolidator with default configuration.
pub fn consolidator() -> Consolidator {
    Consolidator::new(Config::default())
}

pub fn concept_count(store: &SqliteStore) -> i64 {
    store.with_session(|s| s.concept_count()).unwrap()
}

pub fn relation_count(store: &SqliteStore) -> i64 {
    store.with_session(|s| s.relation_count()).unwrap()
}

/// Reload a paper to observe its committed processed flag.
pub fn reload_paper(store: &SqliteStore, paper: &Paper) -> Paper {
    store
        .with_session(|s| s.paper(paper.id))
        .unwrap()
        .expect("paper should exist")
}
