//! The library container: one chunk store plus one index behind a single
//! reader-writer lock.
//!
//! Chunk store and index are kept in the same [`tokio::sync::RwLock`] on
//! purpose — `add_chunks`, `remove_chunks`, and `search` all need both
//! halves of the state to move together, and a single lock is the only way
//! to guarantee that a reader never observes the store and the index mid
//! update. `tokio::sync::RwLock` is documented FIFO-fair, which is what
//! keeps a steady stream of readers from starving a writer queued behind
//! them.

use std::time::Instant;

use uuid::Uuid;

use crate::chunk::{Chunk, ChunkStore};
use crate::document::Metadata;
use crate::error::{CoreError, CoreResult};
use crate::index::{build_index, IndexParams, IndexType, VectorIndex};
use crate::vector::{normalize, Vector};

/// A chunk on its way into a library: everything but its id and its
/// normalized embedding.
pub struct PendingChunk {
    pub document_id: Uuid,
    pub text: String,
    pub embedding: Vector,
    pub metadata: Metadata,
}

/// The result of a [`Library::search`] call.
#[derive(Debug)]
pub struct SearchOutcome {
    pub results: Vec<(Chunk, f32)>,
    pub total_chunks_searched: usize,
    pub query_time_ms: f64,
}

struct LibraryState {
    name: String,
    metadata: Metadata,
    dimension: Option<usize>,
    chunk_store: ChunkStore,
    index: Box<dyn VectorIndex>,
}

pub struct Library {
    pub id: Uuid,
    pub index_type: IndexType,
    pub index_params: IndexParams,
    state: tokio::sync::RwLock<LibraryState>,
}

impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("id", &self.id)
            .field("index_type", &self.index_type)
            .field("index_params", &self.index_params)
            .finish_non_exhaustive()
    }
}

/// A point-in-time copy of a library's non-chunk fields, for listing and
/// status endpoints.
pub struct LibrarySnapshot {
    pub id: Uuid,
    pub name: String,
    pub metadata: Metadata,
    pub index_type: IndexType,
    pub chunk_count: usize,
}

impl Library {
    pub fn new(name: impl Into<String>, index_params: IndexParams, metadata: Metadata) -> Self {
        let index_type = index_params.index_type();
        Self {
            id: Uuid::new_v4(),
            index_type,
            index_params: index_params.clone(),
            state: tokio::sync::RwLock::new(LibraryState {
                name: name.into(),
                metadata,
                dimension: None,
                chunk_store: ChunkStore::new(),
                index: build_index(&index_params),
            }),
        }
    }

    pub async fn snapshot(&self) -> LibrarySnapshot {
        let state = self.state.read().await;
        LibrarySnapshot {
            id: self.id,
            name: state.name.clone(),
            metadata: state.metadata.clone(),
            index_type: self.index_type,
            chunk_count: state.chunk_store.len(),
        }
    }

    pub async fn update_metadata(&self, tags: Option<Vec<String>>, username: Option<String>) {
        let mut state = self.state.write().await;
        if let Some(tags) = tags {
            state.metadata.tags = tags;
        }
        if let Some(username) = username {
            state.metadata.username = username;
        }
        state.metadata.touch();
    }

    /// Validates, normalizes, and inserts every pending chunk as one unit.
    /// Nothing is mutated unless every chunk validates; if insertion into
    /// the index itself fails partway (fresh ids make this vanishingly
    /// unlikely but not impossible under adversarial input), everything
    /// already committed during this call is rolled back before returning.
    pub async fn add_chunks(&self, pending: Vec<PendingChunk>) -> CoreResult<Vec<Uuid>> {
        let mut state = self.state.write().await;
        self.add_chunks_locked(&mut state, pending)
    }

    /// Atomically replaces every existing chunk of `document_id` with
    /// `pending`, all under one write-lock acquisition. Used by the
    /// document processor so an update is never visible half old, half
    /// new.
    pub async fn install_document_chunks(
        &self,
        document_id: Uuid,
        pending: Vec<PendingChunk>,
    ) -> CoreResult<Vec<Uuid>> {
        let mut state = self.state.write().await;
        let existing: Vec<Uuid> = state
            .chunk_store
            .iter_by_document(&document_id)
            .map(|c| c.id)
            .collect();
        self.remove_chunks_locked(&mut state, &existing);
        self.add_chunks_locked(&mut state, pending)
    }

    fn add_chunks_locked(
        &self,
        state: &mut LibraryState,
        pending: Vec<PendingChunk>,
    ) -> CoreResult<Vec<Uuid>> {
        let mut established_dim = state.dimension;
        let mut prepared = Vec::with_capacity(pending.len());
        for p in pending {
            let normalized = normalize(&p.embedding)?;
            match established_dim {
                None => established_dim = Some(normalized.len()),
                Some(dim) if dim != normalized.len() => {
                    return Err(CoreError::DimensionMismatch {
                        expected: dim,
                        actual: normalized.len(),
                    });
                }
                Some(_) => {}
            }
            prepared.push(Chunk {
                id: Uuid::new_v4(),
                document_id: p.document_id,
                text: p.text,
                embedding: normalized,
                metadata: p.metadata,
            });
        }

        let mut committed_ids = Vec::with_capacity(prepared.len());
        for chunk in &prepared {
            if let Err(err) = state.index.add(chunk.id, chunk.embedding.clone()) {
                for id in &committed_ids {
                    state.index.remove(*id);
                    state.chunk_store.delete(id);
                }
                return Err(err);
            }
            state.chunk_store.put(chunk.clone());
            committed_ids.push(chunk.id);
        }

        state.dimension = established_dim;
        state.metadata.touch();
        Ok(committed_ids)
    }

    /// Removes the given ids. Absent ids are tolerated (removal is
    /// idempotent); this still counts as a successful mutation.
    pub async fn remove_chunks(&self, ids: &[Uuid]) -> CoreResult<()> {
        let mut state = self.state.write().await;
        self.remove_chunks_locked(&mut state, ids);
        Ok(())
    }

    pub async fn remove_document(&self, document_id: Uuid) -> CoreResult<()> {
        let mut state = self.state.write().await;
        let ids: Vec<Uuid> = state
            .chunk_store
            .iter_by_document(&document_id)
            .map(|c| c.id)
            .collect();
        self.remove_chunks_locked(&mut state, &ids);
        Ok(())
    }

    fn remove_chunks_locked(&self, state: &mut LibraryState, ids: &[Uuid]) {
        for id in ids {
            let in_index = state.index.remove(*id);
            let in_store = state.chunk_store.delete(id).is_some();
            if in_index != in_store {
                tracing::warn!(
                    chunk_id = %id,
                    library_id = %self.id,
                    in_index,
                    in_store,
                    "internal inconsistency: chunk store and index disagree on membership"
                );
            }
        }
        state.metadata.touch();
    }

    pub async fn search(
        &self,
        query_vector: &[f32],
        k: usize,
        min_sim: f32,
    ) -> CoreResult<SearchOutcome> {
        if k < 1 {
            return Err(CoreError::InvalidParameter("k must be >= 1".into()));
        }
        let normalized = normalize(query_vector)?;

        let started = Instant::now();
        let state = self.state.read().await;
        let total_chunks_searched = state.chunk_store.len();
        let matches = state.index.query(&normalized, k, min_sim);

        let mut results = Vec::with_capacity(matches.len());
        for m in matches {
            match state.chunk_store.get(&m.id) {
                Some(chunk) => results.push((chunk.clone(), m.similarity)),
                None => tracing::warn!(
                    chunk_id = %m.id,
                    library_id = %self.id,
                    "internal inconsistency: index returned an id absent from the chunk store"
                ),
            }
        }

        Ok(SearchOutcome {
            results,
            total_chunks_searched,
            query_time_ms: started.elapsed().as_secs_f64() * 1000.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexParams;

    fn pending(document_id: Uuid, x: f32, y: f32) -> PendingChunk {
        PendingChunk {
            document_id,
            text: "hello world".into(),
            embedding: vec![x, y],
            metadata: Metadata::new("tester", vec![]),
        }
    }

    fn pending_with_text(document_id: Uuid, text: &str, x: f32, y: f32) -> PendingChunk {
        PendingChunk {
            document_id,
            text: text.into(),
            embedding: vec![x, y],
            metadata: Metadata::new("tester", vec![]),
        }
    }

    #[tokio::test]
    async fn empty_library_search_returns_empty() {
        let lib = Library::new("lib", IndexParams::Naive, Metadata::new("t", vec![]));
        let out = lib.search(&[1.0, 0.0], 5, 0.0).await.unwrap();
        assert!(out.results.is_empty());
        assert_eq!(out.total_chunks_searched, 0);
    }

    #[tokio::test]
    async fn add_then_self_query_returns_same_chunk() {
        let lib = Library::new("lib", IndexParams::Naive, Metadata::new("t", vec![]));
        let doc = Uuid::new_v4();
        let ids = lib.add_chunks(vec![pending(doc, 1.0, 0.0)]).await.unwrap();

        let out = lib.search(&[1.0, 0.0], 1, 0.0).await.unwrap();
        assert_eq!(out.results.len(), 1);
        assert_eq!(out.results[0].0.id, ids[0]);
        assert!((out.results[0].1 - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn dimension_mismatch_rejects_and_leaves_library_unchanged() {
        let lib = Library::new("lib", IndexParams::Naive, Metadata::new("t", vec![]));
        let doc = Uuid::new_v4();
        lib.add_chunks(vec![pending(doc, 1.0, 0.0)]).await.unwrap();

        let bad = PendingChunk {
            document_id: doc,
            text: "x".into(),
            embedding: vec![1.0, 0.0, 0.0],
            metadata: Metadata::new("t", vec![]),
        };
        let err = lib.add_chunks(vec![bad]).await.unwrap_err();
        assert!(matches!(err, CoreError::DimensionMismatch { .. }));
        assert_eq!(lib.snapshot().await.chunk_count, 1);
    }

    #[tokio::test]
    async fn degenerate_query_vector_fails() {
        let lib = Library::new("lib", IndexParams::Naive, Metadata::new("t", vec![]));
        let err = lib.search(&[0.0, 0.0], 3, 0.0).await.unwrap_err();
        assert!(matches!(err, CoreError::DegenerateVector));
    }

    #[tokio::test]
    async fn remove_document_cascades_to_its_chunks() {
        let lib = Library::new("lib", IndexParams::Naive, Metadata::new("t", vec![]));
        let doc_a = Uuid::new_v4();
        let doc_b = Uuid::new_v4();
        lib.add_chunks(vec![pending(doc_a, 1.0, 0.0), pending(doc_a, 0.9, 0.1)])
            .await
            .unwrap();
        lib.add_chunks(vec![pending(doc_b, 0.0, 1.0)]).await.unwrap();

        lib.remove_document(doc_a).await.unwrap();
        assert_eq!(lib.snapshot().await.chunk_count, 1);
    }

    #[tokio::test]
    async fn remove_chunks_tolerates_absent_ids() {
        let lib = Library::new("lib", IndexParams::Naive, Metadata::new("t", vec![]));
        let bogus = Uuid::new_v4();
        lib.remove_chunks(&[bogus]).await.unwrap();
    }

    #[tokio::test]
    async fn k_less_than_one_is_rejected() {
        let lib = Library::new("lib", IndexParams::Naive, Metadata::new("t", vec![]));
        let err = lib.search(&[1.0, 0.0], 0, 0.0).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidParameter(_)));
    }

    /// A document with chunks A, B, C gets replaced by X, Y while a
    /// background task hammers `search` the whole time. `install_document_chunks`
    /// takes the write lock for the whole remove-then-add, so every search a
    /// reader observes must land entirely before or entirely after the swap —
    /// never a mix of old and new chunks.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn document_replacement_is_never_observed_half_old_half_new() {
        let lib = std::sync::Arc::new(Library::new("lib", IndexParams::Naive, Metadata::new("t", vec![])));
        let doc = Uuid::new_v4();
        lib.add_chunks(vec![
            pending_with_text(doc, "A", 1.0, 0.0),
            pending_with_text(doc, "B", 0.9, 0.1),
            pending_with_text(doc, "C", 0.8, 0.2),
        ])
        .await
        .unwrap();

        let reader_lib = std::sync::Arc::clone(&lib);
        let reader = tokio::spawn(async move {
            for _ in 0..1_000 {
                let out = reader_lib.search(&[1.0, 0.0], 10, -1.0).await.unwrap();
                let texts: std::collections::HashSet<&str> =
                    out.results.iter().map(|(chunk, _)| chunk.text.as_str()).collect();
                let all_old = texts.iter().all(|t| matches!(*t, "A" | "B" | "C"));
                let all_new = texts.iter().all(|t| matches!(*t, "X" | "Y"));
                assert!(all_old || all_new, "observed a mixed chunk set: {texts:?}");
            }
        });

        lib.install_document_chunks(
            doc,
            vec![
                pending_with_text(doc, "X", 0.0, 1.0),
                pending_with_text(doc, "Y", -1.0, 0.0),
            ],
        )
        .await
        .unwrap();

        reader.await.unwrap();
    }
}
