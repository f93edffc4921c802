//! Brute-force exact nearest-neighbor index.
//!
//! Scores every point against the query on every call. No preprocessing, no
//! approximation error — the reference the other two index families are
//! measured against.

use uuid::Uuid;

use super::{finalize_matches, IndexMatch, VectorIndex};
use crate::error::{CoreError, CoreResult};
use crate::vector::{cosine, Vector};

#[derive(Debug, Default)]
pub struct NaiveIndex {
    points: Vec<(Uuid, Vector)>,
}

impl NaiveIndex {
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    fn position(&self, id: &Uuid) -> Option<usize> {
        self.points.iter().position(|(pid, _)| pid == id)
    }
}

impl VectorIndex for NaiveIndex {
    fn build(&mut self, points: &[(Uuid, Vector)]) {
        self.points = points.to_vec();
    }

    fn add(&mut self, id: Uuid, vector: Vector) -> CoreResult<()> {
        if self.position(&id).is_some() {
            return Err(CoreError::AlreadyExists { kind: "chunk", id });
        }
        self.points.push((id, vector));
        Ok(())
    }

    fn remove(&mut self, id: Uuid) -> bool {
        match self.position(&id) {
            Some(idx) => {
                self.points.swap_remove(idx);
                true
            }
            None => false,
        }
    }

    fn query(&self, vector: &[f32], k: usize, min_sim: f32) -> Vec<IndexMatch> {
        let candidates: Vec<IndexMatch> = self
            .points
            .iter()
            .map(|(id, v)| IndexMatch {
                id: *id,
                similarity: cosine(vector, v),
            })
            .collect();
        finalize_matches(candidates, k, min_sim)
    }

    fn len(&self) -> usize {
        self.points.len()
    }

    fn contains(&self, id: &Uuid) -> bool {
        self.position(id).is_some()
    }
}
