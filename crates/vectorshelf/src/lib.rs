pub mod config;
pub mod documents;
pub mod embedding;
pub mod http;
pub mod logging;

use std::sync::Arc;

use vectorshelf_core::{DocumentProcessor, EmbeddingProvider, LibraryRegistry};

use crate::config::Config;
use crate::documents::DocumentStore;
use crate::embedding::{MockEmbedder, OpenAiEmbedder};
use crate::http::AppState;

pub fn build_embedder(config: &Config) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    match config.embedding_provider.kind.as_str() {
        "openai" => {
            let embedder = OpenAiEmbedder::new(&config.embedding_provider)
                .map_err(|e| anyhow::anyhow!(e))?;
            Ok(Arc::new(embedder))
        }
        _ => Ok(Arc::new(MockEmbedder::new(config.embedding_provider.dimensions))),
    }
}

pub fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let embedder = build_embedder(config)?;
    Ok(AppState {
        registry: Arc::new(LibraryRegistry::new()),
        documents: Arc::new(DocumentStore::new()),
        processor: Arc::new(DocumentProcessor::new(embedder)),
    })
}
