//! Per-library vector index subsystem: the pluggable nearest-neighbor index
//! family, the chunk store, the concurrency-guarded library container, the
//! document processor, and the process-wide library registry.
//!
//! Everything outside this crate — the HTTP surface, the embedding
//! provider, persistence, auth — is a collaborator the rest of this
//! workspace supplies; this crate only defines the interfaces it expects of
//! them ([`processor::EmbeddingProvider`]).

pub mod chunk;
pub mod document;
pub mod error;
pub mod index;
pub mod library;
pub mod processor;
pub mod registry;
pub mod vector;

pub use chunk::{Chunk, ChunkStore};
pub use document::{Document, Metadata};
pub use error::{CoreError, CoreResult};
pub use index::{IndexParams, IndexType, VectorIndex};
pub use library::{Library, LibrarySnapshot, PendingChunk, SearchOutcome};
pub use processor::{chunk_text, DocumentProcessor, EmbeddingProvider};
pub use registry::LibraryRegistry;
