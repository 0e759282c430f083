// src/ranking/scorer.rs
//! Multi-signal rank score for a candidate post.
//!
//! Six normalized signals are combined additively with fixed weights that sum
//! to 1.0:
//!
//! | signal        | weight | range  |
//! |---------------|--------|--------|
//! | velocity      | 0.25   | [0,1]  |
//! | engagement    | 0.20   | [0,1]  |
//! | approval      | 0.20   | [0,1]  |
//! | percentile    | 0.15   | (0,1]  |
//! | title_quality | 0.10   | [0,1]  |
//! | content_type  | 0.10   | 0.4..0.8 |
//!
//! Scoring is pure: the pool is only read, and the wall-clock instant is an
//! explicit `now_unix` argument captured once per ranking run.

use std::collections::HashMap;

use crate::post::{CandidatePost, SignalBreakdown};

/// Floor for post age so brand-new posts (or clock skew) don't blow up velocity.
pub const MIN_AGE_HOURS: f64 = 0.1;
/// Approval used when the forum doesn't report an upvote ratio.
pub const DEFAULT_APPROVAL: f64 = 0.5;
/// Percentile used when a post can't be placed within its group.
pub const DEFAULT_PERCENTILE: f64 = 0.5;
/// Body length (chars) above which a self post counts as substantial.
pub const LONG_BODY_CHARS: usize = 200;

/// Fixed signal weights.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SignalWeights {
    pub velocity: f64,
    pub engagement: f64,
    pub approval: f64,
    pub percentile: f64,
    pub title_quality: f64,
    pub content_type: f64,
}

pub const WEIGHTS: SignalWeights = SignalWeights {
    velocity: 0.25,
    engagement: 0.20,
    approval: 0.20,
    percentile: 0.15,
    title_quality: 0.10,
    content_type: 0.10,
};

impl SignalWeights {
    /// Weighted sum of the signals. Not re-normalized.
    pub fn combine(&self, s: &SignalBreakdown) -> f64 {
        self.velocity * s.velocity
            + self.engagement * s.engagement
            + self.approval * s.approval
            + self.percentile * s.percentile
            + self.title_quality * s.title_quality
            + self.content_type * s.content_type
    }
}

/// Raw score per hour since posting. Age is floored to [`MIN_AGE_HOURS`].
pub fn velocity(post: &CandidatePost, now_unix: i64) -> f64 {
    let mut age_hours = (now_unix - post.created_utc) as f64 / 3600.0;
    if age_hours < MIN_AGE_HOURS {
        age_hours = MIN_AGE_HOURS;
    }
    post.score as f64 / age_hours
}

/// Log-compress velocity into [0,1]: `min(log10(v + 1) / 4, 1)`.
/// Negative velocity (downvoted posts) sits at 0.
pub fn velocity_signal(velocity: f64) -> f64 {
    ((velocity.max(0.0) + 1.0).log10() / 4.0).min(1.0)
}

/// Comments per upvote, scaled x10 and clamped to [0,1]. Zero when score is 0.
pub fn engagement(post: &CandidatePost) -> f64 {
    if post.score == 0 {
        return 0.0;
    }
    let ratio = post.num_comments as f64 / post.score as f64;
    (ratio * 10.0).clamp(0.0, 1.0)
}

pub fn approval(post: &CandidatePost) -> f64 {
    post.upvote_ratio
        .filter(|r| r.is_finite())
        .map(|r| r.clamp(0.0, 1.0))
        .unwrap_or(DEFAULT_APPROVAL)
}

/// Heuristic title quality in [0,1]. Prefers informative, non-shouting titles.
pub fn title_quality(title: &str) -> f64 {
    let mut score: f64 = 0.5;

    let words = title.split_whitespace().count();
    if (5..=20).contains(&words) {
        score += 0.2;
    } else if words < 5 {
        score -= 0.1;
    }

    let exclamations = title.matches('!').count();
    let questions = title.matches('?').count();
    if exclamations > 1 || questions > 1 {
        score -= 0.2;
    }

    let shouting = is_all_upper(title);
    if shouting && title.chars().count() > 10 {
        score -= 0.3;
    }

    if title.chars().next().is_some_and(char::is_uppercase) && !shouting {
        score += 0.1;
    }

    score.clamp(0.0, 1.0)
}

/// True when the text has at least one cased letter and none in lower case.
fn is_all_upper(s: &str) -> bool {
    let mut any_upper = false;
    for c in s.chars() {
        if c.is_lowercase() {
            return false;
        }
        if c.is_uppercase() {
            any_upper = true;
        }
    }
    any_upper
}

/// Self posts with a substantial body score highest, links lowest.
pub fn content_type(post: &CandidatePost) -> f64 {
    if !post.is_self {
        return 0.4;
    }
    let body_len = post
        .selftext
        .as_deref()
        .map(|s| s.chars().count())
        .unwrap_or(0);
    if body_len > LONG_BODY_CHARS {
        0.8
    } else {
        0.5
    }
}

/// Descending raw-score lists per source group, built once per pool.
#[derive(Debug, Default)]
pub struct GroupScores<'a> {
    by_group: HashMap<&'a str, Vec<i64>>,
}

impl<'a> GroupScores<'a> {
    pub fn from_pool(pool: &'a [CandidatePost]) -> Self {
        let mut by_group: HashMap<&'a str, Vec<i64>> = HashMap::new();
        for p in pool {
            by_group.entry(p.group.as_str()).or_default().push(p.score);
        }
        for scores in by_group.values_mut() {
            scores.sort_unstable_by(|a, b| b.cmp(a));
        }
        Self { by_group }
    }

    /// `1 - position / group_size`, where `position` is the FIRST index of the
    /// post's raw score in the group's descending score list. Equal scores
    /// therefore share the percentile of the first matching slot.
    ///
    /// Falls back to [`DEFAULT_PERCENTILE`] when the group has no other
    /// members or the score isn't in the list.
    pub fn percentile(&self, post: &CandidatePost) -> f64 {
        let Some(scores) = self.by_group.get(post.group.as_str()) else {
            return DEFAULT_PERCENTILE;
        };
        if scores.len() <= 1 {
            return DEFAULT_PERCENTILE;
        }
        match scores.iter().position(|&s| s == post.score) {
            Some(pos) => 1.0 - (pos as f64 / scores.len() as f64),
            None => DEFAULT_PERCENTILE,
        }
    }
}

/// Compute all six signals for `post` against a prepared pool index.
pub fn signals(post: &CandidatePost, groups: &GroupScores<'_>, now_unix: i64) -> SignalBreakdown {
    SignalBreakdown {
        velocity: velocity_signal(velocity(post, now_unix)),
        engagement: engagement(post),
        approval: approval(post),
        percentile: groups.percentile(post),
        title_quality: title_quality(&post.title),
        content_type: content_type(post),
    }
}

/// Rank score of a single post within `pool` (which should contain the post).
/// For whole runs prefer [`super::rank`], which indexes the pool once.
pub fn score(post: &CandidatePost, pool: &[CandidatePost], now_unix: i64) -> f64 {
    let groups = GroupScores::from_pool(pool);
    WEIGHTS.combine(&signals(post, &groups, now_unix))
}
