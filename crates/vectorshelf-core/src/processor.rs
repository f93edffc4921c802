//! Document processor: text -> chunks -> embeddings -> atomic library
//! install.
//!
//! The embedding call happens *before* anything touches the library lock —
//! the provider is assumed remote and possibly slow, and suspending there
//! must not stall readers of the target library. Only the final install
//! (remove-old, add-new) takes the lock, and it does so once, via
//! [`Library::install_document_chunks`].

use async_trait::async_trait;
use uuid::Uuid;

use crate::document::Metadata;
use crate::error::{CoreError, CoreResult};
use crate::library::{Library, PendingChunk};
use crate::vector::Vector;

/// External collaborator that turns chunk texts into embeddings, in batch
/// and in order. The core never talks to a model directly.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vector>, String>;
}

/// Split `text` into chunks of at most `chunk_size` characters, preferring
/// to break on whitespace within the last 20% of the window so words
/// aren't sheared in half. Falls back to a hard break when no whitespace is
/// found there. Empty text yields zero chunks.
pub fn chunk_text(text: &str, chunk_size: usize) -> Vec<String> {
    if text.is_empty() || chunk_size == 0 {
        return Vec::new();
    }
    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let ideal_end = (start + chunk_size).min(chars.len());
        let end = if ideal_end == chars.len() {
            ideal_end
        } else {
            let window_start = start + (chunk_size * 4 / 5);
            let break_point = (window_start..ideal_end)
                .rev()
                .find(|&i| chars[i].is_whitespace());
            break_point.map(|i| i + 1).unwrap_or(ideal_end)
        };

        let piece: String = chars[start..end].iter().collect();
        let trimmed = piece.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }
        start = end;
    }
    chunks
}

pub struct DocumentProcessor {
    provider: std::sync::Arc<dyn EmbeddingProvider>,
}

impl DocumentProcessor {
    pub fn new(provider: std::sync::Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider }
    }

    /// Chunks `text`, embeds every chunk in one batch, and installs the
    /// result into `library` under `document_id`, replacing any chunks the
    /// document already owned there.
    pub async fn process(
        &self,
        library: &Library,
        document_id: Uuid,
        text: &str,
        chunk_size: usize,
        username: &str,
    ) -> CoreResult<Vec<Uuid>> {
        let texts = chunk_text(text, chunk_size);
        if texts.is_empty() {
            return library.install_document_chunks(document_id, Vec::new()).await;
        }

        let embeddings = self
            .provider
            .embed(&texts)
            .await
            .map_err(CoreError::EmbeddingProviderError)?;

        if embeddings.len() != texts.len() {
            return Err(CoreError::EmbeddingProviderError(format!(
                "provider returned {} embeddings for {} chunks",
                embeddings.len(),
                texts.len()
            )));
        }

        let pending: Vec<PendingChunk> = texts
            .into_iter()
            .zip(embeddings)
            .map(|(text, embedding)| PendingChunk {
                document_id,
                text,
                embedding,
                metadata: Metadata::new(username, vec![]),
            })
            .collect();

        library.install_document_chunks(document_id, pending).await
    }

    /// Embeds a single query string, for the HTTP layer to turn
    /// `query_text` into the `query_vector` the core's `search` expects.
    pub async fn embed_query(&self, text: &str) -> CoreResult<Vector> {
        let mut embeddings = self
            .provider
            .embed(&[text.to_string()])
            .await
            .map_err(CoreError::EmbeddingProviderError)?;
        embeddings
            .pop()
            .ok_or_else(|| CoreError::EmbeddingProviderError("empty embedding response".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexParams;

    struct EchoProvider {
        dim: usize,
    }

    #[async_trait]
    impl EmbeddingProvider for EchoProvider {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vector>, String> {
            Ok(texts
                .iter()
                .map(|t| {
                    let seed = t.bytes().map(|b| b as f32).sum::<f32>() + 1.0;
                    let mut v = vec![0.0; self.dim];
                    v[0] = seed;
                    v[1 % self.dim] += 1.0;
                    v
                })
                .collect())
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl EmbeddingProvider for FailingProvider {
        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vector>, String> {
            Err("upstream unavailable".into())
        }
    }

    #[test]
    fn chunk_text_splits_on_whitespace_near_boundary() {
        let text = "one two three four five six seven eight nine ten";
        let chunks = chunk_text(text, 20);
        assert!(chunks.iter().all(|c| c.chars().count() <= 20));
        assert!(chunks.iter().all(|c| !c.starts_with(' ') && !c.ends_with(' ')));
        assert_eq!(chunks.join(" "), text);
    }

    #[test]
    fn chunk_text_empty_input_yields_no_chunks() {
        assert!(chunk_text("", 100).is_empty());
    }

    #[test]
    fn chunk_text_hard_breaks_when_no_whitespace_found() {
        let text = "a".repeat(50);
        let chunks = chunk_text(&text, 10);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert_eq!(chunks.join(""), text);
    }

    #[tokio::test]
    async fn process_installs_chunks_into_library() {
        let lib = Library::new("lib", IndexParams::Naive, Metadata::new("t", vec![]));
        let processor = DocumentProcessor::new(std::sync::Arc::new(EchoProvider { dim: 4 }));
        let doc = Uuid::new_v4();

        let ids = processor
            .process(&lib, doc, "hello there friend", 10, "tester")
            .await
            .unwrap();
        assert!(!ids.is_empty());
        assert_eq!(lib.snapshot().await.chunk_count, ids.len());
    }

    #[tokio::test]
    async fn process_replaces_prior_chunks_of_same_document() {
        let lib = Library::new("lib", IndexParams::Naive, Metadata::new("t", vec![]));
        let processor = DocumentProcessor::new(std::sync::Arc::new(EchoProvider { dim: 4 }));
        let doc = Uuid::new_v4();

        processor.process(&lib, doc, "first version of the text", 10, "t").await.unwrap();
        let first_count = lib.snapshot().await.chunk_count;
        assert!(first_count > 0);

        processor.process(&lib, doc, "second", 10, "t").await.unwrap();
        let second_count = lib.snapshot().await.chunk_count;
        assert_eq!(second_count, 1);
    }

    #[tokio::test]
    async fn provider_failure_surfaces_as_embedding_provider_error() {
        let lib = Library::new("lib", IndexParams::Naive, Metadata::new("t", vec![]));
        let processor = DocumentProcessor::new(std::sync::Arc::new(FailingProvider));
        let doc = Uuid::new_v4();

        let err = processor
            .process(&lib, doc, "some text", 10, "t")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::EmbeddingProviderError(_)));
        assert_eq!(lib.snapshot().await.chunk_count, 0);
    }

    #[tokio::test]
    async fn empty_text_installs_zero_chunks() {
        let lib = Library::new("lib", IndexParams::Naive, Metadata::new("t", vec![]));
        let processor = DocumentProcessor::new(std::sync::Arc::new(EchoProvider { dim: 4 }));
        let doc = Uuid::new_v4();

        let ids = processor.process(&lib, doc, "", 10, "t").await.unwrap();
        assert!(ids.is_empty());
    }
}
