// src/post.rs
//! Post records flowing through one digest run: candidates from the fetcher,
//! ranked posts from the scorer, and summarized posts for the email.

use serde::{Deserialize, Serialize};

/// A forum post fetched for possible inclusion in the digest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidatePost {
    pub id: String,
    /// Source group (subreddit) name.
    pub group: String,
    pub title: String,
    pub url: String,
    /// Upvote-like signal; may be zero or negative.
    pub score: i64,
    pub num_comments: u64,
    /// Share of positive reactions in [0,1], when the forum reports it.
    #[serde(default)]
    pub upvote_ratio: Option<f64>,
    /// Unix seconds, UTC.
    pub created_utc: i64,
    /// Self-contained text post (true) vs external link (false).
    pub is_self: bool,
    #[serde(default)]
    pub selftext: Option<String>,
}

/// Per-signal values that went into a rank score, each already normalized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalBreakdown {
    pub velocity: f64,
    pub engagement: f64,
    pub approval: f64,
    pub percentile: f64,
    pub title_quality: f64,
    pub content_type: f64,
}

/// Candidate post plus its computed rank score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPost {
    #[serde(flatten)]
    pub post: CandidatePost,
    pub rank_score: f64,
    pub signals: SignalBreakdown,
}

impl RankedPost {
    pub fn id(&self) -> &str {
        &self.post.id
    }

    pub fn group(&self) -> &str {
        &self.post.group
    }
}

/// Post with AI summary, ready for the digest email or preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigestPost {
    pub post_id: String,
    pub subreddit: String,
    pub title: String,
    pub url: String,
    pub score: i64,
    pub num_comments: u64,
    pub summary: String,
}

impl DigestPost {
    pub fn from_ranked(post: &RankedPost, summary: String) -> Self {
        Self {
            post_id: post.post.id.clone(),
            subreddit: post.post.group.clone(),
            title: post.post.title.clone(),
            url: post.post.url.clone(),
            score: post.post.score,
            num_comments: post.post.num_comments,
            summary,
        }
    }
}
