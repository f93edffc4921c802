//! Vantage-point tree index over the cosine distance metric.
//!
//! Distance is `1 - cosine(a, b)`, which is a proper metric on unit vectors
//! (it satisfies the triangle inequality), so the usual vantage-point tree
//! pruning applies unmodified. Each internal node picks a random vantage
//! point and partitions the remainder by the median distance to it; a branch
//! is skipped during search only when the triangle inequality proves it
//! cannot contain anything better than the current worst kept candidate.
//!
//! The tree is rebuilt from scratch on every [`VectorIndex::build`] and
//! [`VectorIndex::add`] — simple and correct, and cheap enough at the chunk
//! counts a single library holds. Removal is tombstone-based: `remove` marks
//! a point dead without touching the tree shape, and only triggers a full
//! rebuild once tombstones pass a quarter of the tree.

use std::collections::{HashMap, HashSet};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

use super::{finalize_matches, IndexMatch, VectorIndex};
use crate::error::{CoreError, CoreResult};
use crate::vector::{cosine, Vector};

const TOMBSTONE_REBUILD_RATIO: f32 = 0.25;

fn distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine(a, b)
}

#[derive(Debug)]
enum TreeNode {
    Leaf(Vec<Uuid>),
    Split {
        vantage: Uuid,
        threshold: f32,
        inside: Box<TreeNode>,
        outside: Box<TreeNode>,
    },
}

#[derive(Debug)]
pub struct VpTreeIndex {
    leaf_size: usize,
    seed: u64,
    points: HashMap<Uuid, Vector>,
    /// Insertion order of `points`, kept separately because `HashMap`'s
    /// iteration order is randomized per-process — vantage selection must
    /// see the same id sequence for the same seed across runs, or the tree
    /// shape (and therefore query results) would not be reproducible.
    insertion_order: Vec<Uuid>,
    tombstones: HashSet<Uuid>,
    root: Option<TreeNode>,
}

impl VpTreeIndex {
    pub fn new(leaf_size: usize, seed: u64) -> Self {
        Self {
            leaf_size: leaf_size.max(1),
            seed,
            points: HashMap::new(),
            insertion_order: Vec::new(),
            tombstones: HashSet::new(),
            root: None,
        }
    }

    fn live_ids(&self) -> Vec<Uuid> {
        self.insertion_order
            .iter()
            .filter(|id| self.points.contains_key(*id) && !self.tombstones.contains(*id))
            .copied()
            .collect()
    }

    fn rebuild(&mut self) {
        let ids = self.live_ids();
        let mut rng = StdRng::seed_from_u64(self.seed);
        self.root = build_node(ids, &self.points, self.leaf_size, &mut rng);
    }

    fn compact_if_needed(&mut self) {
        let total = self.points.len().max(1);
        if self.tombstones.len() as f32 / total as f32 > TOMBSTONE_REBUILD_RATIO {
            for id in self.tombstones.drain() {
                self.points.remove(&id);
            }
            self.insertion_order.retain(|id| self.points.contains_key(id));
            self.rebuild();
        }
    }

    fn search(&self, node: &TreeNode, query: &[f32], k: usize, best: &mut Vec<(f32, Uuid)>) {
        match node {
            TreeNode::Leaf(ids) => {
                for id in ids {
                    if self.tombstones.contains(id) {
                        continue;
                    }
                    if let Some(v) = self.points.get(id) {
                        consider(best, k, distance(query, v), *id);
                    }
                }
            }
            TreeNode::Split {
                vantage,
                threshold,
                inside,
                outside,
            } => {
                let vantage_point = match self.points.get(vantage) {
                    Some(v) => v,
                    None => return,
                };
                let d = distance(query, vantage_point);
                if !self.tombstones.contains(vantage) {
                    consider(best, k, d, *vantage);
                }

                let tau = worst(best, k);
                let near_first = d < *threshold;
                let (first, second) = if near_first {
                    (inside.as_ref(), outside.as_ref())
                } else {
                    (outside.as_ref(), inside.as_ref())
                };
                self.search(first, query, k, best);

                let tau = worst(best, k).min(tau);
                if (d - *threshold).abs() <= tau || best.len() < k {
                    self.search(second, query, k, best);
                }
            }
        }
    }
}

/// Insert `(dist, id)` into `best`, kept sorted ascending, capped at `k`.
fn consider(best: &mut Vec<(f32, Uuid)>, k: usize, dist: f32, id: Uuid) {
    if best.len() < k {
        let pos = best.partition_point(|(d, _)| *d <= dist);
        best.insert(pos, (dist, id));
    } else if dist < best.last().map(|(d, _)| *d).unwrap_or(f32::MAX) {
        best.pop();
        let pos = best.partition_point(|(d, _)| *d <= dist);
        best.insert(pos, (dist, id));
    }
}

/// Current worst (largest) kept distance, or `f32::MAX` if fewer than `k`
/// candidates have been found so far (nothing can be pruned yet).
fn worst(best: &[(f32, Uuid)], k: usize) -> f32 {
    if best.len() < k {
        f32::MAX
    } else {
        best.last().map(|(d, _)| *d).unwrap_or(f32::MAX)
    }
}

fn build_node(
    mut ids: Vec<Uuid>,
    points: &HashMap<Uuid, Vector>,
    leaf_size: usize,
    rng: &mut StdRng,
) -> Option<TreeNode> {
    if ids.is_empty() {
        return None;
    }
    if ids.len() <= leaf_size {
        return Some(TreeNode::Leaf(ids));
    }

    let pivot_idx = rng.gen_range(0..ids.len());
    let vantage = ids.swap_remove(pivot_idx);
    let vantage_point = &points[&vantage];

    let mut dists: Vec<(f32, Uuid)> = ids
        .iter()
        .map(|id| (distance(vantage_point, &points[id]), *id))
        .collect();
    dists.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    let mid = dists.len() / 2;
    let threshold = dists[mid].0;
    let (inside_d, outside_d) = dists.split_at(mid);
    let inside_ids: Vec<Uuid> = inside_d.iter().map(|(_, id)| *id).collect();
    let outside_ids: Vec<Uuid> = outside_d.iter().map(|(_, id)| *id).collect();

    let inside = build_node(inside_ids, points, leaf_size, rng)
        .unwrap_or(TreeNode::Leaf(Vec::new()));
    let outside = build_node(outside_ids, points, leaf_size, rng)
        .unwrap_or(TreeNode::Leaf(Vec::new()));

    Some(TreeNode::Split {
        vantage,
        threshold,
        inside: Box::new(inside),
        outside: Box::new(outside),
    })
}

impl VectorIndex for VpTreeIndex {
    fn build(&mut self, points: &[(Uuid, Vector)]) {
        self.points = points.iter().cloned().collect();
        self.insertion_order = points.iter().map(|(id, _)| *id).collect();
        self.tombstones.clear();
        self.rebuild();
    }

    fn add(&mut self, id: Uuid, vector: Vector) -> CoreResult<()> {
        if self.points.contains_key(&id) && !self.tombstones.contains(&id) {
            return Err(CoreError::AlreadyExists { kind: "chunk", id });
        }
        self.tombstones.remove(&id);
        if !self.points.contains_key(&id) {
            self.insertion_order.push(id);
        }
        self.points.insert(id, vector);
        self.rebuild();
        Ok(())
    }

    fn remove(&mut self, id: Uuid) -> bool {
        if !self.points.contains_key(&id) || self.tombstones.contains(&id) {
            return false;
        }
        self.tombstones.insert(id);
        self.compact_if_needed();
        true
    }

    fn query(&self, vector: &[f32], k: usize, min_sim: f32) -> Vec<IndexMatch> {
        let Some(root) = &self.root else {
            return Vec::new();
        };
        if k == 0 {
            return Vec::new();
        }
        let mut best = Vec::with_capacity(k);
        self.search(root, vector, k, &mut best);

        let candidates: Vec<IndexMatch> = best
            .into_iter()
            .map(|(dist, id)| IndexMatch {
                id,
                similarity: 1.0 - dist,
            })
            .collect();
        finalize_matches(candidates, k, min_sim)
    }

    fn len(&self) -> usize {
        self.points.len() - self.tombstones.len()
    }

    fn contains(&self, id: &Uuid) -> bool {
        self.points.contains_key(id) && !self.tombstones.contains(id)
    }
}
