//! Document and metadata records.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Bookkeeping attached to every library and document.
///
/// `creation_time` is set once at construction and never mutated;
/// `last_update` is refreshed on every successful mutation.
#[derive(Debug, Clone)]
pub struct Metadata {
    pub creation_time: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
    pub username: String,
    pub tags: Vec<String>,
}

impl Metadata {
    pub fn new(username: impl Into<String>, tags: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            creation_time: now,
            last_update: now,
            username: username.into(),
            tags,
        }
    }

    pub fn touch(&mut self) {
        self.last_update = Utc::now();
    }
}

/// A document owns the set of chunks in its library whose `document_id`
/// matches its own id. Updating `text` replaces that whole chunk set.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: Uuid,
    pub library_id: Uuid,
    pub text: String,
    pub chunk_size: usize,
    pub metadata: Metadata,
}
