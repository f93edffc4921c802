//! Document record bookkeeping.
//!
//! The core's [`vectorshelf_core::Library`] only ever sees chunks and
//! `document_id`s — it has no notion of a document's title or raw text once
//! chunked. This store holds the `Document` records themselves so the HTTP
//! surface can list and fetch them; it is plain bookkeeping, not on the hot
//! search path, so a blocking mutex is enough.

use std::collections::HashMap;
use std::sync::Mutex;

use uuid::Uuid;
use vectorshelf_core::Document;

#[derive(Default)]
pub struct DocumentStore {
    documents: Mutex<HashMap<Uuid, Document>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self {
            documents: Mutex::new(HashMap::new()),
        }
    }

    pub fn put(&self, document: Document) {
        let mut documents = self.documents.lock().expect("document store lock poisoned");
        documents.insert(document.id, document);
    }

    pub fn get(&self, id: Uuid) -> Option<Document> {
        let documents = self.documents.lock().expect("document store lock poisoned");
        documents.get(&id).cloned()
    }

    pub fn delete(&self, id: Uuid) -> Option<Document> {
        let mut documents = self.documents.lock().expect("document store lock poisoned");
        documents.remove(&id)
    }

    pub fn list_for_library(&self, library_id: Uuid) -> Vec<Document> {
        let documents = self.documents.lock().expect("document store lock poisoned");
        documents
            .values()
            .filter(|d| d.library_id == library_id)
            .cloned()
            .collect()
    }
}
