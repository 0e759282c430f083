// tests/ranking_properties.rs
//
// Ranking + diverse selection properties over shuffled synthetic pools.

use forum_digest::ranking::{rank, scorer, select_diverse};
use forum_digest::{CandidatePost, RankedPost, SignalBreakdown};
use rand::seq::SliceRandom;

const NOW: i64 = 1_757_090_000;

fn cand(id: &str, group: &str, score: i64, comments: u64, hours_old: i64) -> CandidatePost {
    CandidatePost {
        id: id.to_string(),
        group: group.to_string(),
        title: format!("Discussion about {id} in {group} today"),
        url: format!("https://reddit.com/r/{group}/comments/{id}/"),
        score,
        num_comments: comments,
        upvote_ratio: Some(0.9),
        created_utc: NOW - hours_old * 3600,
        is_self: id.len() % 2 == 0,
        selftext: None,
    }
}

fn synthetic_pool() -> Vec<CandidatePost> {
    let groups = ["rust", "golang", "programming", "linux"];
    let mut pool = Vec::new();
    for (gi, g) in groups.iter().enumerate() {
        for i in 0..12 {
            let score = (i as i64 * 97 + gi as i64 * 31) % 2000 - 5;
            let comments = ((i * 13 + gi * 7) % 400) as u64;
            pool.push(cand(&format!("{g}{i}"), g, score, comments, 1 + (i as i64 % 20)));
        }
    }
    pool
}

fn ranked(group: &str, rank_score: f64) -> RankedPost {
    RankedPost {
        post: cand(&format!("{group}_{rank_score}"), group, 100, 10, 2),
        rank_score,
        signals: SignalBreakdown::default(),
    }
}

#[test]
fn rank_is_sorted_for_any_input_order() {
    let mut pool = synthetic_pool();
    let mut rng = rand::rng();
    for _ in 0..20 {
        pool.shuffle(&mut rng);
        let out = rank(&pool, NOW);
        assert_eq!(out.len(), pool.len());
        assert!(out.windows(2).all(|w| w[0].rank_score >= w[1].rank_score));
        assert!(out
            .iter()
            .all(|r| r.rank_score.is_finite() && (0.0..=1.0).contains(&r.rank_score)));
    }
}

#[test]
fn scores_do_not_depend_on_input_order() {
    let mut pool = synthetic_pool();
    let baseline = rank(&pool, NOW);
    pool.shuffle(&mut rand::rng());
    let shuffled = rank(&pool, NOW);
    for r in &baseline {
        let other = shuffled.iter().find(|s| s.id() == r.id()).unwrap();
        assert_eq!(r.rank_score, other.rank_score);
    }
}

#[test]
fn unique_group_max_gets_full_percentile() {
    let pool = vec![
        cand("a1", "rust", 900, 10, 3),
        cand("a2", "rust", 300, 10, 3),
        cand("a3", "rust", 20, 10, 3),
        cand("b1", "golang", 40, 10, 3),
    ];
    let out = rank(&pool, NOW);
    let top = out.iter().find(|r| r.id() == "a1").unwrap();
    assert_eq!(top.signals.percentile, 1.0);
    let low = out.iter().find(|r| r.id() == "a3").unwrap();
    assert!((low.signals.percentile - 1.0 / 3.0).abs() < 1e-12);
    // a single-post group has no meaningful standing
    let alone = out.iter().find(|r| r.id() == "b1").unwrap();
    assert_eq!(alone.signals.percentile, 0.5);
}

#[test]
fn zero_score_post_ranks_without_panicking() {
    let pool = vec![cand("z", "rust", 0, 0, 1)];
    let out = rank(&pool, NOW);
    assert_eq!(out[0].signals.velocity, 0.0);
    assert_eq!(out[0].signals.engagement, 0.0);
}

#[test]
fn shouting_titles_lose_to_mixed_case() {
    assert!(
        scorer::title_quality("RUST 2024 EDITION IS OUT NOW")
            < scorer::title_quality("Rust 2024 edition is out now")
    );
}

#[test]
fn selection_alternates_groups() {
    let input = vec![
        ranked("A", 10.0),
        ranked("A", 9.0),
        ranked("A", 8.0),
        ranked("A", 7.0),
        ranked("A", 6.0),
        ranked("B", 5.0),
    ];
    let out = select_diverse(input, 3);
    let picked: Vec<(&str, f64)> = out.iter().map(|r| (r.group(), r.rank_score)).collect();
    assert_eq!(picked, vec![("A", 10.0), ("B", 5.0), ("A", 9.0)]);
}

#[test]
fn selection_edge_cases() {
    assert!(select_diverse(Vec::new(), 5).is_empty());
    assert!(select_diverse(vec![ranked("A", 1.0)], 0).is_empty());

    let input = vec![ranked("A", 3.0), ranked("A", 2.0), ranked("B", 1.0)];
    assert_eq!(select_diverse(input.clone(), 3), input);
    assert_eq!(select_diverse(input.clone(), 10), input);
}

#[test]
fn selection_over_ranked_pool_is_fair_and_ordered_within_groups() {
    let out = select_diverse(rank(&synthetic_pool(), NOW), 8);
    assert_eq!(out.len(), 8);
    for g in ["rust", "golang", "programming", "linux"] {
        let in_group: Vec<&RankedPost> = out.iter().filter(|r| r.group() == g).collect();
        assert_eq!(in_group.len(), 2, "four groups share eight slots evenly");
        assert!(in_group[0].rank_score >= in_group[1].rank_score);
    }
}
