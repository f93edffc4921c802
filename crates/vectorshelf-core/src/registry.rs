//! Process-wide library registry.
//!
//! The registry lock only ever guards the id -> library map; it is always
//! released before any library-level work runs. Library handles are
//! `Arc<Library>`, so an in-flight operation holds its own reference and the
//! library's internal lock keeps that operation safe even if `delete` drops
//! the registry's entry for it mid-flight.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::document::Metadata;
use crate::error::{CoreError, CoreResult};
use crate::index::IndexParams;
use crate::library::{Library, LibrarySnapshot};

#[derive(Default)]
pub struct LibraryRegistry {
    libraries: Mutex<HashMap<Uuid, Arc<Library>>>,
}

impl LibraryRegistry {
    pub fn new() -> Self {
        Self {
            libraries: Mutex::new(HashMap::new()),
        }
    }

    pub fn create(
        &self,
        name: impl Into<String>,
        index_params: IndexParams,
        metadata: Metadata,
    ) -> Arc<Library> {
        let library = Arc::new(Library::new(name, index_params, metadata));
        let mut libraries = self.libraries.lock().expect("registry lock poisoned");
        libraries.insert(library.id, Arc::clone(&library));
        library
    }

    pub fn get(&self, id: Uuid) -> CoreResult<Arc<Library>> {
        let libraries = self.libraries.lock().expect("registry lock poisoned");
        libraries
            .get(&id)
            .cloned()
            .ok_or(CoreError::NotFound { kind: "library", id })
    }

    pub async fn list(&self) -> Vec<LibrarySnapshot> {
        let handles: Vec<Arc<Library>> = {
            let libraries = self.libraries.lock().expect("registry lock poisoned");
            libraries.values().cloned().collect()
        };
        let mut snapshots = Vec::with_capacity(handles.len());
        for lib in handles {
            snapshots.push(lib.snapshot().await);
        }
        snapshots
    }

    pub async fn update_metadata(
        &self,
        id: Uuid,
        tags: Option<Vec<String>>,
        username: Option<String>,
    ) -> CoreResult<()> {
        let library = self.get(id)?;
        library.update_metadata(tags, username).await;
        Ok(())
    }

    pub fn delete(&self, id: Uuid) -> CoreResult<()> {
        let mut libraries = self.libraries.lock().expect("registry lock poisoned");
        libraries
            .remove(&id)
            .map(|_| ())
            .ok_or(CoreError::NotFound { kind: "library", id })
    }
}
