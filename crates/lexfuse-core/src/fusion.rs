//! Reciprocal Rank Fusion over per-variant ranked lists.
//!
//! Each query variant is searched independently and yields its own ranked
//! list of `(chunk_id, score)` pairs. Raw similarity scales differ between
//! variants (each phrasing has its own embedding), so the lists are merged
//! by rank rather than by score:
//!
//! ```text
//! fused(d) = Σ_L 1 / (K + rank_L(d))        rank is 1-based
//! ```
//!
//! # Ordering
//!
//! 1. `fused_score` descending.
//! 2. Best raw similarity observed for the chunk in any list, descending.
//! 3. `chunk_id` ascending.
//!
//! Truncation to `top_k` happens after fusion, never before.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::models::RankedHit;

/// A chunk id with its fused score, before hydration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusedHit {
    pub chunk_id: String,
    pub fused_score: f64,
    /// Maximum raw similarity across contributing lists.
    pub best_similarity: f64,
    /// Number of lists the chunk appeared in.
    pub appearances: usize,
}

/// Fuse `lists` with smoothing constant `k` and keep the best `top_k`.
///
/// A chunk repeated inside a single list only counts at its best rank.
/// Empty lists (a variant that timed out) contribute nothing.
pub fn fuse(lists: &[Vec<RankedHit>], k: u32, top_k: usize) -> Vec<FusedHit> {
    let mut acc: HashMap<&str, FusedHit> = HashMap::new();

    for list in lists {
        let mut seen_in_list: HashSet<&str> = HashSet::new();
        for (pos, hit) in list.iter().enumerate() {
            if !seen_in_list.insert(hit.chunk_id.as_str()) {
                continue;
            }
            let rank = pos as f64 + 1.0;
            let contribution = 1.0 / (k as f64 + rank);
            let entry = acc
                .entry(hit.chunk_id.as_str())
                .or_insert_with(|| FusedHit {
                    chunk_id: hit.chunk_id.clone(),
                    fused_score: 0.0,
                    best_similarity: f64::NEG_INFINITY,
                    appearances: 0,
                });
            entry.fused_score += contribution;
            entry.appearances += 1;
            if hit.score > entry.best_similarity {
                entry.best_similarity = hit.score;
            }
        }
    }

    let mut fused: Vec<FusedHit> = acc.into_values().collect();
    fused.sort_by(compare_fused);
    fused.truncate(top_k);
    fused
}

/// Total order used for fused results.
pub fn compare_fused(a: &FusedHit, b: &FusedHit) -> Ordering {
    b.fused_score
        .partial_cmp(&a.fused_score)
        .unwrap_or(Ordering::Equal)
        .then(
            b.best_similarity
                .partial_cmp(&a.best_similarity)
                .unwrap_or(Ordering::Equal),
        )
        .then_with(|| a.chunk_id.cmp(&b.chunk_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(ids: &[(&str, f64)]) -> Vec<RankedHit> {
        ids.iter().map(|(id, s)| RankedHit::new(*id, *s)).collect()
    }

    fn ids(hits: &[FusedHit]) -> Vec<&str> {
        hits.iter().map(|h| h.chunk_id.as_str()).collect()
    }

    #[test]
    fn test_empty_input() {
        assert!(fuse(&[], 60, 10).is_empty());
        assert!(fuse(&[Vec::new(), Vec::new()], 60, 10).is_empty());
    }

    #[test]
    fn test_single_list_preserves_order() {
        let l = list(&[("a", 0.9), ("b", 0.8), ("c", 0.7)]);
        let fused = fuse(&[l], 60, 10);
        assert_eq!(ids(&fused), vec!["a", "b", "c"]);
        assert!((fused[0].fused_score - 1.0 / 61.0).abs() < 1e-12);
    }

    #[test]
    fn test_consensus_beats_single_list() {
        let l1 = list(&[("shared", 0.5), ("x", 0.5)]);
        let l2 = list(&[("shared", 0.5), ("y", 0.5)]);
        let l3 = list(&[("z", 0.5), ("shared", 0.5)]);
        let fused = fuse(&[l1, l2, l3], 60, 10);
        assert_eq!(fused[0].chunk_id, "shared");
        assert_eq!(fused[0].appearances, 3);
    }

    #[test]
    fn test_first_in_all_three_beats_first_in_one() {
        let a = list(&[("all", 0.8), ("one", 0.9)]);
        let b = list(&[("all", 0.8)]);
        let c = list(&[("all", 0.8)]);
        let d = list(&[("one", 0.9)]);
        let fused = fuse(&[a, b, c, d], 60, 10);
        let all = fused.iter().find(|h| h.chunk_id == "all").unwrap();
        let one = fused.iter().find(|h| h.chunk_id == "one").unwrap();
        assert!((all.fused_score - 3.0 / 61.0).abs() < 1e-12);
        assert!(all.fused_score > one.fused_score);
    }

    #[test]
    fn test_tie_broken_by_similarity_then_id() {
        let l1 = list(&[("b", 0.4)]);
        let l2 = list(&[("a", 0.4)]);
        let l3 = list(&[("c", 0.9)]);
        let fused = fuse(&[l1, l2, l3], 60, 10);
        assert_eq!(ids(&fused), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_best_similarity_is_max_across_lists() {
        let l1 = list(&[("a", 0.2)]);
        let l2 = list(&[("a", 0.7)]);
        let fused = fuse(&[l1, l2], 60, 10);
        assert!((fused[0].best_similarity - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_truncate_after_fusion() {
        // "d" is last in every list but appears in all of them; truncating
        // each list to 2 before fusion would lose it.
        let l1 = list(&[("a", 0.9), ("b", 0.8), ("d", 0.1)]);
        let l2 = list(&[("c", 0.9), ("e", 0.8), ("d", 0.1)]);
        let l3 = list(&[("f", 0.9), ("g", 0.8), ("d", 0.1)]);
        let fused = fuse(&[l1, l2, l3], 60, 2);
        assert_eq!(fused.len(), 2);
        assert_eq!(fused[0].chunk_id, "d");
    }

    #[test]
    fn test_duplicate_in_one_list_counted_once() {
        let l = list(&[("a", 0.9), ("a", 0.5), ("b", 0.4)]);
        let fused = fuse(&[l], 60, 10);
        let a = fused.iter().find(|h| h.chunk_id == "a").unwrap();
        assert_eq!(a.appearances, 1);
        assert!((a.fused_score - 1.0 / 61.0).abs() < 1e-12);
    }

    #[test]
    fn test_deterministic() {
        let lists = vec![
            list(&[("q", 0.3), ("r", 0.3), ("s", 0.3)]),
            list(&[("s", 0.3), ("r", 0.3), ("q", 0.3)]),
        ];
        let first = fuse(&lists, 60, 10);
        for _ in 0..20 {
            assert_eq!(fuse(&lists, 60, 10), first);
        }
    }

    #[test]
    fn test_scores_strictly_non_increasing() {
        let lists = vec![
            list(&[("a", 0.9), ("b", 0.8), ("c", 0.7), ("d", 0.6)]),
            list(&[("c", 0.95), ("a", 0.85)]),
        ];
        let fused = fuse(&lists, 60, 10);
        for w in fused.windows(2) {
            assert!(w[0].fused_score >= w[1].fused_score);
        }
    }
}
