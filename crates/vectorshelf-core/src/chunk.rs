//! Chunk records and the per-library chunk store.
//!
//! The store is a plain record keeper — it has no idea an index exists and
//! never touches one. [`crate::library::Library`] is the only thing that
//! drives both the store and the index together.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::document::Metadata;
use crate::vector::Vector;

/// A single indexed fragment of a document's text.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: Uuid,
    pub document_id: Uuid,
    pub text: String,
    pub embedding: Vector,
    pub metadata: Metadata,
}

/// Ordered map from chunk id to chunk record, scoped to one library.
#[derive(Debug, Default)]
pub struct ChunkStore {
    chunks: BTreeMap<Uuid, Chunk>,
}

impl ChunkStore {
    pub fn new() -> Self {
        Self {
            chunks: BTreeMap::new(),
        }
    }

    pub fn put(&mut self, chunk: Chunk) {
        self.chunks.insert(chunk.id, chunk);
    }

    pub fn get(&self, id: &Uuid) -> Option<&Chunk> {
        self.chunks.get(id)
    }

    pub fn delete(&mut self, id: &Uuid) -> Option<Chunk> {
        self.chunks.remove(id)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn iter_ids(&self) -> impl Iterator<Item = &Uuid> {
        self.chunks.keys()
    }

    pub fn iter_by_document<'a>(
        &'a self,
        document_id: &'a Uuid,
    ) -> impl Iterator<Item = &'a Chunk> + 'a {
        self.chunks
            .values()
            .filter(move |c| &c.document_id == document_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn meta() -> Metadata {
        Metadata {
            creation_time: Utc::now(),
            last_update: Utc::now(),
            username: "tester".into(),
            tags: vec![],
        }
    }

    fn chunk(id: Uuid, doc: Uuid) -> Chunk {
        Chunk {
            id,
            document_id: doc,
            text: "hello".into(),
            embedding: vec![1.0, 0.0],
            metadata: meta(),
        }
    }

    #[test]
    fn put_then_get_roundtrips() {
        let mut store = ChunkStore::new();
        let id = Uuid::new_v4();
        let doc = Uuid::new_v4();
        store.put(chunk(id, doc));
        assert_eq!(store.get(&id).unwrap().document_id, doc);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn delete_removes_and_returns() {
        let mut store = ChunkStore::new();
        let id = Uuid::new_v4();
        store.put(chunk(id, Uuid::new_v4()));
        let removed = store.delete(&id);
        assert!(removed.is_some());
        assert!(store.is_empty());
        assert!(store.delete(&id).is_none());
    }

    #[test]
    fn iter_by_document_filters_correctly() {
        let mut store = ChunkStore::new();
        let doc_a = Uuid::new_v4();
        let doc_b = Uuid::new_v4();
        store.put(chunk(Uuid::new_v4(), doc_a));
        store.put(chunk(Uuid::new_v4(), doc_a));
        store.put(chunk(Uuid::new_v4(), doc_b));

        assert_eq!(store.iter_by_document(&doc_a).count(), 2);
        assert_eq!(store.iter_by_document(&doc_b).count(), 1);
    }

    #[test]
    fn iter_ids_covers_every_chunk() {
        let mut store = ChunkStore::new();
        let ids: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
        for &id in &ids {
            store.put(chunk(id, Uuid::new_v4()));
        }
        let mut seen: Vec<Uuid> = store.iter_ids().copied().collect();
        seen.sort();
        let mut expected = ids.clone();
        expected.sort();
        assert_eq!(seen, expected);
    }
}
