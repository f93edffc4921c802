//! The pluggable nearest-neighbor index family.
//!
//! Three implementations — [`naive::NaiveIndex`], [`lsh::LshIndex`], and
//! [`vptree::VpTreeIndex`] — satisfy the same [`VectorIndex`] contract so a
//! [`crate::library::Library`] can be built against any of them
//! interchangeably. None of them owns chunk data; they only ever see ids and
//! vectors.

pub mod lsh;
pub mod naive;
pub mod vptree;

use uuid::Uuid;

use crate::error::CoreResult;
use crate::vector::Vector;

/// One scored hit from [`VectorIndex::query`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexMatch {
    pub id: Uuid,
    pub similarity: f32,
}

/// Which index family a library was created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    Naive,
    Lsh,
    VpTree,
}

impl IndexType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexType::Naive => "naive",
            IndexType::Lsh => "lsh",
            IndexType::VpTree => "vptree",
        }
    }
}

impl std::str::FromStr for IndexType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "naive" => Ok(IndexType::Naive),
            "lsh" => Ok(IndexType::Lsh),
            "vptree" | "vp_tree" | "vp-tree" => Ok(IndexType::VpTree),
            other => Err(format!("unknown index_type: {other}")),
        }
    }
}

/// The small enumerated per-index configuration each index family takes.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexParams {
    Naive,
    Lsh {
        num_tables: usize,
        num_hyperplanes: usize,
        seed: u64,
    },
    VpTree {
        leaf_size: usize,
        seed: u64,
    },
}

impl IndexParams {
    pub fn index_type(&self) -> IndexType {
        match self {
            IndexParams::Naive => IndexType::Naive,
            IndexParams::Lsh { .. } => IndexType::Lsh,
            IndexParams::VpTree { .. } => IndexType::VpTree,
        }
    }

    /// Default parameters for a given index type.
    pub fn defaults(index_type: IndexType) -> Self {
        match index_type {
            IndexType::Naive => IndexParams::Naive,
            IndexType::Lsh => IndexParams::Lsh {
                num_tables: 8,
                num_hyperplanes: 8,
                seed: 0x5653_4853, // "VSHS" — deterministic default seed
            },
            IndexType::VpTree => IndexParams::VpTree {
                leaf_size: 16,
                seed: 0x5653_5450, // "VSTP"
            },
        }
    }
}

/// Common contract implemented by every index family member.
///
/// All vectors passed in are assumed already unit-normalized by the caller
/// (the library container normalizes before ever reaching the index).
pub trait VectorIndex: Send + Sync {
    /// Replace any prior state with `points`. Idempotent on identical input
    /// up to tie-break order.
    fn build(&mut self, points: &[(Uuid, Vector)]);

    /// Insert a single new point. Fails with [`crate::error::CoreError::AlreadyExists`]
    /// if `id` is already present.
    fn add(&mut self, id: Uuid, vector: Vector) -> CoreResult<()>;

    /// Remove a point. Returns whether it was present.
    fn remove(&mut self, id: Uuid) -> bool;

    /// At most `k` matches with `similarity >= min_sim`, sorted by
    /// similarity descending and then id ascending.
    fn query(&self, vector: &[f32], k: usize, min_sim: f32) -> Vec<IndexMatch>;

    /// Number of points currently indexed.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `id` is currently indexed. Used for invariant checks.
    fn contains(&self, id: &Uuid) -> bool;
}

/// Sort (and truncate) a raw candidate list per the common contract: by
/// similarity descending, ties broken by ascending id, filtered by
/// `min_sim`, capped at `k`.
pub(crate) fn finalize_matches(
    mut candidates: Vec<IndexMatch>,
    k: usize,
    min_sim: f32,
) -> Vec<IndexMatch> {
    candidates.retain(|m| m.similarity >= min_sim);
    candidates.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    candidates.truncate(k);
    candidates
}

pub fn build_index(params: &IndexParams) -> Box<dyn VectorIndex> {
    match params {
        IndexParams::Naive => Box::new(naive::NaiveIndex::new()),
        IndexParams::Lsh {
            num_tables,
            num_hyperplanes,
            seed,
        } => Box::new(lsh::LshIndex::new(*num_tables, *num_hyperplanes, *seed)),
        IndexParams::VpTree { leaf_size, seed } => {
            Box::new(vptree::VpTreeIndex::new(*leaf_size, *seed))
        }
    }
}
