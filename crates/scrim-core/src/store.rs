//! Persistence seam for components.
//!
//! Persistence is an external collaborator: this crate owns the
//! transformation from deployment request to component mutation, the store
//! owns durability and per-id write serialization. [`ComponentStore`] is the
//! full seam; [`InMemoryComponentStore`] is the reference implementation
//! used in tests and embedded deployments.
//!
//! The store is trusted with two invariants the pipeline relies on:
//! identifiers are never reused once allocated, and concurrent writes to the
//! same id are serialized (last write observed wins at the field level).

use std::collections::BTreeMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

use crate::component::{Component, ComponentId, ComponentPatch, RenderMode};

/// Failures surfaced by the persistence collaborator.
///
/// Store failures abort a deployment and are propagated verbatim; they are
/// never downgraded or swallowed by the pipeline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The target component does not exist.
    #[error("component {0} does not exist")]
    MissingComponent(ComponentId),

    /// An opaque storage failure.
    #[error("storage failure: {0}")]
    Storage(String),
}

/// Storage collaborator for component records.
///
/// Implementations must provide single-writer-per-id semantics; the pipeline
/// performs no locking of its own.
pub trait ComponentStore: Send + Sync {
    /// Allocates a new component under a fresh, never-reused id.
    ///
    /// The record starts with the given title and slug, empty markup and
    /// style, no script, and the default mode; field content arrives through
    /// a subsequent [`ComponentStore::update`].
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when allocation fails.
    fn allocate(&self, title: &str, slug: &str) -> Result<ComponentId, StoreError>;

    /// Applies a field-level patch to an existing component.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingComponent`] when the id is unknown.
    fn update(&self, id: ComponentId, patch: ComponentPatch) -> Result<(), StoreError>;

    /// Fetches a component by id.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] only on storage failure; an unknown id is
    /// `Ok(None)`.
    fn get(&self, id: ComponentId) -> Result<Option<Component>, StoreError>;

    /// Finds a component by exact title match.
    ///
    /// Matching is byte-exact with no case or whitespace normalization;
    /// when several components share a title the lowest id wins.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] only on storage failure.
    fn find_by_title(&self, title: &str) -> Result<Option<ComponentId>, StoreError>;

    /// Finds a component by slug.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] only on storage failure.
    fn find_by_slug(&self, slug: &str) -> Result<Option<Component>, StoreError>;
}

/// In-memory reference store.
///
/// Thread-safe; ids are allocated from a monotonic counter starting at 1 and
/// never reused, even after hypothetical deletion. Id zero is never
/// allocated: on the wire it means "no explicit target".
#[derive(Debug)]
pub struct InMemoryComponentStore {
    components: RwLock<BTreeMap<u64, Component>>,
    next_id: AtomicU64,
}

impl Default for InMemoryComponentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryComponentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            components: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Number of stored components.
    #[must_use]
    pub fn count(&self) -> usize {
        self.components
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

impl ComponentStore for InMemoryComponentStore {
    fn allocate(&self, title: &str, slug: &str) -> Result<ComponentId, StoreError> {
        let id = ComponentId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let component = Component {
            id,
            title: title.to_string(),
            slug: slug.to_string(),
            markup: String::new(),
            style: String::new(),
            script: None,
            mode: RenderMode::default(),
        };
        self.components
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(id.get(), component);
        Ok(id)
    }

    fn update(&self, id: ComponentId, patch: ComponentPatch) -> Result<(), StoreError> {
        let mut components = self
            .components
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let component = components
            .get_mut(&id.get())
            .ok_or(StoreError::MissingComponent(id))?;
        patch.apply(component);
        Ok(())
    }

    fn get(&self, id: ComponentId) -> Result<Option<Component>, StoreError> {
        Ok(self
            .components
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&id.get())
            .cloned())
    }

    fn find_by_title(&self, title: &str) -> Result<Option<ComponentId>, StoreError> {
        Ok(self
            .components
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .values()
            .find(|c| c.title == title)
            .map(|c| c.id))
    }

    fn find_by_slug(&self, slug: &str) -> Result<Option<Component>, StoreError> {
        Ok(self
            .components
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .values()
            .find(|c| c.slug == slug)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::FieldWrite;

    #[test]
    fn allocates_monotonic_never_reused_ids() {
        let store = InMemoryComponentStore::new();
        let a = store.allocate("A", "a").unwrap();
        let b = store.allocate("B", "b").unwrap();
        assert!(b.get() > a.get());
        assert_eq!(store.count(), 2);
    }

    #[test]
    fn update_applies_patch_fields() {
        let store = InMemoryComponentStore::new();
        let id = store.allocate("Hero", "hero").unwrap();
        store
            .update(
                id,
                ComponentPatch {
                    markup: FieldWrite::Set("<b>Hi</b>".into()),
                    mode: FieldWrite::Set(RenderMode::Slot),
                    ..ComponentPatch::default()
                },
            )
            .unwrap();

        let component = store.get(id).unwrap().unwrap();
        assert_eq!(component.markup, "<b>Hi</b>");
        assert_eq!(component.mode, RenderMode::Slot);
        assert_eq!(component.title, "Hero");
    }

    #[test]
    fn update_of_unknown_id_is_a_missing_component() {
        let store = InMemoryComponentStore::new();
        let err = store
            .update(ComponentId::new(99), ComponentPatch::default())
            .unwrap_err();
        assert_eq!(err, StoreError::MissingComponent(ComponentId::new(99)));
    }

    #[test]
    fn title_lookup_is_exact_and_prefers_lowest_id() {
        let store = InMemoryComponentStore::new();
        let first = store.allocate("Hero", "hero").unwrap();
        let _second = store.allocate("Hero", "hero-2").unwrap();
        let _other = store.allocate("hero", "hero-3").unwrap();

        assert_eq!(store.find_by_title("Hero").unwrap(), Some(first));
        // Case differs: no match.
        assert_eq!(store.find_by_title("HERO").unwrap(), None);
    }

    #[test]
    fn slug_lookup_returns_the_record() {
        let store = InMemoryComponentStore::new();
        let id = store.allocate("Hero Banner", "hero-banner").unwrap();
        let found = store.find_by_slug("hero-banner").unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(store.find_by_slug("missing").unwrap(), None);
    }
}
