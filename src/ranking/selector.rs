// src/ranking/selector.rs
//! Round-robin selection across source groups.
//!
//! Groups are visited in first-seen order of the (already sorted) input, so the
//! group owning the globally best post gets the first turn. Each visit pops the
//! group's best remaining post; exhausted groups are skipped.

use std::collections::{HashMap, VecDeque};

use crate::post::RankedPost;

/// Pick up to `count` posts, trading raw rank for group diversity.
///
/// `ranked` must be sorted best-first. Within a group the relative rank order
/// is preserved. Returns the input unchanged when it already fits in `count`.
pub fn select_diverse(ranked: Vec<RankedPost>, count: usize) -> Vec<RankedPost> {
    if count == 0 || ranked.is_empty() {
        return Vec::new();
    }
    if ranked.len() <= count {
        return ranked;
    }

    let order = group_order(&ranked);
    let slot: HashMap<String, usize> = order
        .iter()
        .enumerate()
        .map(|(i, g)| (g.clone(), i))
        .collect();

    let mut queues: Vec<VecDeque<RankedPost>> = vec![VecDeque::new(); order.len()];
    for post in ranked {
        // every group was registered by `group_order`
        if let Some(&i) = slot.get(post.group()) {
            queues[i].push_back(post);
        }
    }

    let mut selected = Vec::with_capacity(count);
    let mut remaining: usize = queues.iter().map(VecDeque::len).sum();
    let n = queues.len();
    let mut idx = 0usize;
    while selected.len() < count && remaining > 0 {
        if let Some(post) = queues[idx % n].pop_front() {
            selected.push(post);
            remaining -= 1;
        }
        idx += 1;
    }
    selected
}

/// Distinct group names in order of first appearance.
pub fn group_order(ranked: &[RankedPost]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut order = Vec::new();
    for p in ranked {
        if seen.insert(p.group()) {
            order.push(p.group().to_string());
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::{CandidatePost, SignalBreakdown};

    fn rp(group: &str, rank: f64) -> RankedPost {
        RankedPost {
            post: CandidatePost {
                id: format!("{group}_{rank}"),
                group: group.into(),
                title: "t".into(),
                url: "u".into(),
                score: rank as i64,
                num_comments: 0,
                upvote_ratio: None,
                created_utc: 0,
                is_self: false,
                selftext: None,
            },
            rank_score: rank,
            signals: SignalBreakdown::default(),
        }
    }

    fn ids(v: &[RankedPost]) -> Vec<&str> {
        v.iter().map(|p| p.id()).collect()
    }

    #[test]
    fn lone_strong_post_is_not_starved() {
        let input = vec![
            rp("A", 10.0),
            rp("A", 9.0),
            rp("A", 8.0),
            rp("A", 7.0),
            rp("A", 6.0),
            rp("B", 5.0),
        ];
        let out = select_diverse(input, 3);
        assert_eq!(ids(&out), vec!["A_10", "B_5", "A_9"]);
    }

    #[test]
    fn fits_in_count_returns_input_unchanged() {
        let input = vec![rp("A", 3.0), rp("A", 2.0), rp("B", 1.0)];
        let out = select_diverse(input.clone(), 3);
        assert_eq!(out, input);
        let out = select_diverse(input.clone(), 10);
        assert_eq!(out, input);
    }

    #[test]
    fn zero_count_or_empty_input_is_empty() {
        assert!(select_diverse(vec![rp("A", 1.0)], 0).is_empty());
        assert!(select_diverse(Vec::new(), 5).is_empty());
    }

    #[test]
    fn group_order_is_first_seen_not_alphabetical() {
        let input = vec![
            rp("zeta", 9.0),
            rp("alpha", 8.0),
            rp("zeta", 7.0),
            rp("mid", 6.0),
            rp("alpha", 5.0),
        ];
        assert_eq!(group_order(&input), vec!["zeta", "alpha", "mid"]);
        let out = select_diverse(input, 4);
        assert_eq!(ids(&out), vec!["zeta_9", "alpha_8", "mid_6", "zeta_7"]);
    }

    #[test]
    fn exhausted_groups_are_skipped() {
        let input = vec![
            rp("A", 9.0),
            rp("B", 8.0),
            rp("A", 7.0),
            rp("A", 6.0),
            rp("A", 5.0),
        ];
        let out = select_diverse(input, 4);
        assert_eq!(ids(&out), vec!["A_9", "B_8", "A_7", "A_6"]);
    }
}
