//! Process-wide catalog snapshots
//!
//! A snapshot pairs a catalog with the alias index built from it. Requests
//! take an `Arc` clone and keep it for their whole lifetime; a reload builds
//! a new snapshot and swaps the shared reference. The lock is held only for
//! the clone or the swap.

use querygate_core::SchemaCatalog;
use std::sync::{Arc, PoisonError, RwLock};

use crate::alias::AliasIndex;
use crate::loader::{load, SchemaLoadError};
use crate::source::SchemaSource;

/// An immutable catalog plus its alias index
#[derive(Debug)]
pub struct CatalogSnapshot {
    catalog: SchemaCatalog,
    index: AliasIndex,
    generation: u64,
}

impl CatalogSnapshot {
    pub fn new(catalog: SchemaCatalog) -> Self {
        let index = build_index(&catalog);
        Self {
            catalog,
            index,
            generation: 0,
        }
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    pub fn index(&self) -> &AliasIndex {
        &self.index
    }

    /// Number of swaps before this snapshot was installed
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

fn build_index(catalog: &SchemaCatalog) -> AliasIndex {
    let index = AliasIndex::build(catalog);
    for warning in index.warnings() {
        tracing::warn!(code = %warning.code, "{}", warning.message);
    }
    index
}

/// Shared, swappable reference to the current snapshot
#[derive(Debug)]
pub struct CatalogHandle {
    current: RwLock<Arc<CatalogSnapshot>>,
}

impl CatalogHandle {
    pub fn new(catalog: SchemaCatalog) -> Self {
        Self {
            current: RwLock::new(Arc::new(CatalogSnapshot::new(catalog))),
        }
    }

    /// The snapshot in effect right now
    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Install a new catalog and return the snapshot it replaced
    pub fn swap(&self, catalog: SchemaCatalog) -> Arc<CatalogSnapshot> {
        self.install(catalog).0
    }

    /// Load `source` and swap it in, returning the installed snapshot. A
    /// failed load leaves the current snapshot untouched.
    pub fn reload(&self, source: &SchemaSource) -> Result<Arc<CatalogSnapshot>, SchemaLoadError> {
        let catalog = load(source)?;
        Ok(self.install(catalog).1)
    }

    fn install(&self, catalog: SchemaCatalog) -> (Arc<CatalogSnapshot>, Arc<CatalogSnapshot>) {
        // Index building happens outside the lock
        let index = build_index(&catalog);

        // Generations follow install order
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let generation = guard.generation + 1;
        let next = Arc::new(CatalogSnapshot {
            catalog,
            index,
            generation,
        });
        let previous = std::mem::replace(&mut *guard, Arc::clone(&next));
        drop(guard);

        tracing::info!(
            generation,
            fingerprint = %next.catalog.fingerprint(),
            previous = %previous.catalog.fingerprint(),
            "Swapped catalog snapshot"
        );

        (previous, next)
    }
}
