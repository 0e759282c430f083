// src/ranking/mod.rs
//! Ranking entry: score every candidate against its pool, sort best-first.

pub mod scorer;
pub mod selector;

use crate::post::{CandidatePost, RankedPost};

pub use scorer::{GroupScores, SignalWeights, WEIGHTS};
pub use selector::select_diverse;

/// Rank `posts` at a single instant `now_unix` (captured once per run so ages
/// are comparable). Output is sorted by `rank_score` descending; exact ties
/// keep input order.
pub fn rank(posts: &[CandidatePost], now_unix: i64) -> Vec<RankedPost> {
    let groups = GroupScores::from_pool(posts);

    let mut ranked: Vec<RankedPost> = posts
        .iter()
        .map(|p| {
            let signals = scorer::signals(p, &groups, now_unix);
            RankedPost {
                post: p.clone(),
                rank_score: WEIGHTS.combine(&signals),
                signals,
            }
        })
        .collect();

    ranked.sort_by(|a, b| b.rank_score.total_cmp(&a.rank_score));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn cand(id: &str, group: &str, score: i64, comments: u64, hours_old: i64) -> CandidatePost {
        CandidatePost {
            id: id.into(),
            group: group.into(),
            title: format!("Post {id} with a decent descriptive title"),
            url: format!("https://reddit.com/r/{group}/comments/{id}"),
            score,
            num_comments: comments,
            upvote_ratio: Some(0.95),
            created_utc: NOW - hours_old * 3600,
            is_self: true,
            selftext: None,
        }
    }

    #[test]
    fn empty_pool_ranks_to_empty() {
        assert!(rank(&[], NOW).is_empty());
    }

    #[test]
    fn rank_is_sorted_descending() {
        let posts = vec![
            cand("a", "rust", 10, 1, 20),
            cand("b", "rust", 5000, 300, 2),
            cand("c", "golang", 300, 80, 5),
            cand("d", "golang", 0, 0, 1),
        ];
        let ranked = rank(&posts, NOW);
        assert_eq!(ranked.len(), 4);
        assert!(ranked
            .windows(2)
            .all(|w| w[0].rank_score >= w[1].rank_score));
        assert_eq!(ranked[0].id(), "b");
    }

    #[test]
    fn rank_matches_single_post_score() {
        let posts = vec![cand("a", "rust", 120, 30, 3), cand("b", "rust", 60, 2, 8)];
        let ranked = rank(&posts, NOW);
        for r in &ranked {
            let direct = scorer::score(&r.post, &posts, NOW);
            assert!((direct - r.rank_score).abs() < 1e-12);
        }
    }
}
