//! Locality-sensitive hashing index via random hyperplane sign bits.
//!
//! `num_tables` independent hash tables, each keyed by a `num_hyperplanes`-bit
//! code computed from the sign of the dot product against a fixed set of
//! random hyperplanes. A query unions the buckets it falls into across every
//! table, then re-scores that candidate set exactly with cosine similarity —
//! the hashing only narrows the scan, it never substitutes for it.
//!
//! Hyperplanes are sampled once, from `seed`, the moment the index first
//! learns its dimensionality (on `build` or the first `add`), and never
//! resampled for the life of the index. Multi-probe querying (widening the
//! bucket search by flipping low-confidence bits) is not implemented; a
//! query that lands in empty buckets across every table returns no matches.
//!
//! Each hyperplane normal's components are drawn from the standard normal
//! distribution, not a uniform cube: a normal vector's direction must be
//! spherically symmetric for the sign-bit hash's collision probability to
//! track the angle between two points the way SimHash depends on. Sampling
//! components uniformly from `[-1, 1]` instead would bias normals toward the
//! cube's diagonals and only be invariant under axis permutation/sign-flip,
//! not arbitrary rotation.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use uuid::Uuid;

use super::{finalize_matches, IndexMatch, VectorIndex};
use crate::error::{CoreError, CoreResult};
use crate::vector::{cosine, Vector};

type BucketCode = u64;

#[derive(Debug)]
pub struct LshIndex {
    num_tables: usize,
    num_hyperplanes: usize,
    seed: u64,
    dim: Option<usize>,
    hyperplanes: Vec<Vec<Vector>>,
    tables: Vec<HashMap<BucketCode, Vec<Uuid>>>,
    points: HashMap<Uuid, Vector>,
}

impl LshIndex {
    pub fn new(num_tables: usize, num_hyperplanes: usize, seed: u64) -> Self {
        Self {
            num_tables,
            num_hyperplanes,
            seed,
            dim: None,
            hyperplanes: Vec::new(),
            tables: vec![HashMap::new(); num_tables],
            points: HashMap::new(),
        }
    }

    fn ensure_hyperplanes(&mut self, dim: usize) {
        if self.dim.is_some() {
            return;
        }
        self.dim = Some(dim);
        let mut rng = StdRng::seed_from_u64(self.seed);
        self.hyperplanes = (0..self.num_tables)
            .map(|_| {
                (0..self.num_hyperplanes)
                    .map(|_| {
                        (0..dim)
                            .map(|_| StandardNormal.sample(&mut rng))
                            .collect()
                    })
                    .collect()
            })
            .collect();
    }

    fn hash(&self, table: usize, v: &[f32]) -> BucketCode {
        let mut code: BucketCode = 0;
        for plane in &self.hyperplanes[table] {
            code <<= 1;
            if cosine(plane, v) >= 0.0 {
                code |= 1;
            }
        }
        code
    }

    fn insert_into_tables(&mut self, id: Uuid, v: &[f32]) {
        for t in 0..self.num_tables {
            let code = self.hash(t, v);
            self.tables[t].entry(code).or_default().push(id);
        }
    }

    fn remove_from_tables(&mut self, id: Uuid, v: &[f32]) {
        for t in 0..self.num_tables {
            let code = self.hash(t, v);
            if let Some(bucket) = self.tables[t].get_mut(&code) {
                bucket.retain(|x| x != &id);
            }
        }
    }
}

impl VectorIndex for LshIndex {
    fn build(&mut self, points: &[(Uuid, Vector)]) {
        self.dim = None;
        self.hyperplanes.clear();
        self.tables = vec![HashMap::new(); self.num_tables];
        self.points.clear();

        if let Some((_, first)) = points.first() {
            self.ensure_hyperplanes(first.len());
        }
        for (id, v) in points {
            self.insert_into_tables(*id, v);
            self.points.insert(*id, v.clone());
        }
    }

    fn add(&mut self, id: Uuid, vector: Vector) -> CoreResult<()> {
        if self.points.contains_key(&id) {
            return Err(CoreError::AlreadyExists { kind: "chunk", id });
        }
        if let Some(dim) = self.dim {
            if dim != vector.len() {
                return Err(CoreError::DimensionMismatch {
                    expected: dim,
                    actual: vector.len(),
                });
            }
        } else {
            self.ensure_hyperplanes(vector.len());
        }
        self.insert_into_tables(id, &vector);
        self.points.insert(id, vector);
        Ok(())
    }

    fn remove(&mut self, id: Uuid) -> bool {
        match self.points.remove(&id) {
            Some(v) => {
                self.remove_from_tables(id, &v);
                true
            }
            None => false,
        }
    }

    fn query(&self, vector: &[f32], k: usize, min_sim: f32) -> Vec<IndexMatch> {
        if self.dim.is_none() {
            return Vec::new();
        }
        let mut candidate_ids: std::collections::HashSet<Uuid> = std::collections::HashSet::new();
        for t in 0..self.num_tables {
            let code = self.hash(t, vector);
            if let Some(bucket) = self.tables[t].get(&code) {
                candidate_ids.extend(bucket.iter().copied());
            }
        }

        let candidates: Vec<IndexMatch> = candidate_ids
            .into_iter()
            .filter_map(|id| {
                self.points.get(&id).map(|v| IndexMatch {
                    id,
                    similarity: cosine(vector, v),
                })
            })
            .collect();
        finalize_matches(candidates, k, min_sim)
    }

    fn len(&self) -> usize {
        self.points.len()
    }

    fn contains(&self, id: &Uuid) -> bool {
        self.points.contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::normalize;

    fn unit(x: f32, y: f32, z: f32) -> Vector {
        normalize(&[x, y, z]).unwrap()
    }

    #[test]
    fn near_duplicate_vectors_are_found() {
        let mut idx = LshIndex::new(8, 6, 42);
        let id = Uuid::new_v4();
        idx.add(id, unit(1.0, 0.01, 0.0)).unwrap();
        idx.add(Uuid::new_v4(), unit(-1.0, 0.0, 0.2)).unwrap();

        let results = idx.query(&unit(1.0, 0.0, 0.0), 5, 0.0);
        assert!(results.iter().any(|m| m.id == id));
    }

    #[test]
    fn add_rejects_duplicate_id() {
        let mut idx = LshIndex::new(4, 4, 7);
        let id = Uuid::new_v4();
        idx.add(id, unit(1.0, 0.0, 0.0)).unwrap();
        let err = idx.add(id, unit(0.0, 1.0, 0.0)).unwrap_err();
        assert!(matches!(err, CoreError::AlreadyExists { .. }));
    }

    #[test]
    fn add_rejects_dimension_mismatch() {
        let mut idx = LshIndex::new(4, 4, 7);
        idx.add(Uuid::new_v4(), unit(1.0, 0.0, 0.0)).unwrap();
        let err = idx
            .add(Uuid::new_v4(), normalize(&[1.0, 0.0]).unwrap())
            .unwrap_err();
        assert!(matches!(err, CoreError::DimensionMismatch { .. }));
    }

    #[test]
    fn remove_drops_point_from_every_table() {
        let mut idx = LshIndex::new(4, 4, 7);
        let id = Uuid::new_v4();
        idx.add(id, unit(1.0, 0.0, 0.0)).unwrap();
        assert!(idx.remove(id));
        assert_eq!(idx.len(), 0);
        assert!(!idx.contains(&id));
        for table in &idx.tables {
            for bucket in table.values() {
                assert!(!bucket.contains(&id));
            }
        }
    }

    #[test]
    fn empty_index_query_returns_nothing() {
        let idx = LshIndex::new(4, 4, 7);
        assert!(idx.query(&[1.0, 0.0], 5, 0.0).is_empty());
    }

    #[test]
    fn deterministic_seed_gives_deterministic_hyperplanes() {
        let mut a = LshIndex::new(2, 3, 99);
        let mut b = LshIndex::new(2, 3, 99);
        a.ensure_hyperplanes(4);
        b.ensure_hyperplanes(4);
        assert_eq!(a.hyperplanes, b.hyperplanes);
    }
}
