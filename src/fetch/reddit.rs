// src/fetch/reddit.rs
//! Reddit public JSON listings (`/r/{group}/hot.json`, `/comments/{id}.json`).

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::histogram;
use serde::de::IgnoredAny;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::fetch::{clean_text, PostSource};
use crate::post::CandidatePost;

pub const DEFAULT_BASE_URL: &str = "https://www.reddit.com";
const USER_AGENT: &str = "forum-digest/0.1 (daily subreddit digest)";

#[derive(Debug, Deserialize)]
struct Listing<T> {
    data: ListingData<T>,
}

#[derive(Debug, Deserialize)]
struct ListingData<T> {
    #[serde(default = "Vec::new")]
    children: Vec<Child<T>>,
}

#[derive(Debug, Deserialize)]
struct Child<T> {
    kind: String,
    data: T,
}

#[derive(Debug, Deserialize)]
struct PostData {
    id: String,
    subreddit: String,
    title: String,
    permalink: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    num_comments: u64,
    #[serde(default)]
    upvote_ratio: Option<f64>,
    #[serde(default)]
    created_utc: f64,
    #[serde(default)]
    is_self: bool,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    stickied: bool,
}

#[derive(Debug, Deserialize)]
struct CommentData {
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    stickied: bool,
}

pub struct RedditSource {
    mode: Mode,
}

enum Mode {
    Http {
        base_url: String,
        client: reqwest::Client,
    },
    // group -> listing JSON, post id -> comments JSON
    Fixture {
        listings: HashMap<String, String>,
        comments: HashMap<String, String>,
    },
}

impl RedditSource {
    pub fn http() -> Result<Self> {
        Self::http_with_base(DEFAULT_BASE_URL)
    }

    pub fn http_with_base(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(15))
            .build()
            .context("building reddit http client")?;
        Ok(Self {
            mode: Mode::Http {
                base_url: base_url.trim_end_matches('/').to_string(),
                client,
            },
        })
    }

    /// Serve canned listings; unknown groups/posts are errors.
    pub fn from_fixtures(
        listings: impl IntoIterator<Item = (String, String)>,
        comments: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        Self {
            mode: Mode::Fixture {
                listings: listings.into_iter().collect(),
                comments: comments.into_iter().collect(),
            },
        }
    }

    async fn get_text(client: &reqwest::Client, url: &str) -> Result<String> {
        let resp = client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url} status"))?;
        resp.text().await.with_context(|| format!("GET {url} body"))
    }
}

/// Parse a hot listing into candidates. Stickied posts are skipped.
pub fn parse_listing(body: &str) -> Result<Vec<CandidatePost>> {
    let t0 = std::time::Instant::now();
    let listing: Listing<PostData> =
        serde_json::from_str(body).context("parsing reddit listing json")?;

    let mut out = Vec::with_capacity(listing.data.children.len());
    for child in listing.data.children {
        if child.kind != "t3" || child.data.stickied {
            continue;
        }
        let d = child.data;
        let selftext = (d.is_self && !d.selftext.is_empty()).then_some(d.selftext);
        out.push(CandidatePost {
            url: format!("https://reddit.com{}", d.permalink),
            id: d.id,
            group: d.subreddit,
            title: clean_text(&d.title),
            score: d.score,
            num_comments: d.num_comments,
            upvote_ratio: d.upvote_ratio,
            created_utc: d.created_utc as i64,
            is_self: d.is_self,
            selftext,
        });
    }

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("digest_parse_ms").record(ms);
    Ok(out)
}

/// Parse the comments endpoint (`[post_listing, comment_listing]`) into
/// comment bodies. Deleted/removed and stickied comments are skipped.
pub fn parse_comments(body: &str, limit: usize) -> Result<Vec<String>> {
    let (_post, comments): (IgnoredAny, Listing<CommentData>) =
        serde_json::from_str(body).context("parsing reddit comments json")?;

    Ok(comments
        .data
        .children
        .into_iter()
        .filter(|c| c.kind == "t1" && !c.data.stickied)
        .filter_map(|c| c.data.body)
        .map(|b| b.trim().to_string())
        .filter(|b| !b.is_empty() && b != "[deleted]" && b != "[removed]")
        .take(limit)
        .collect())
}

#[async_trait]
impl PostSource for RedditSource {
    async fn hot_posts(&self, group: &str, limit: usize) -> Result<Vec<CandidatePost>> {
        match &self.mode {
            Mode::Http { base_url, client } => {
                let url = format!("{base_url}/r/{group}/hot.json?limit={limit}&raw_json=1");
                let body = Self::get_text(client, &url).await?;
                let mut posts = parse_listing(&body)?;
                posts.truncate(limit);
                Ok(posts)
            }
            Mode::Fixture { listings, .. } => {
                let body = listings
                    .get(group)
                    .with_context(|| format!("no fixture listing for r/{group}"))?;
                let mut posts = parse_listing(body)?;
                posts.truncate(limit);
                Ok(posts)
            }
        }
    }

    async fn top_comments(&self, post_id: &str, limit: usize) -> Result<Vec<String>> {
        match &self.mode {
            Mode::Http { base_url, client } => {
                let url = format!(
                    "{base_url}/comments/{post_id}.json?limit={limit}&depth=1&sort=top&raw_json=1"
                );
                let body = Self::get_text(client, &url).await?;
                parse_comments(&body, limit)
            }
            Mode::Fixture { comments, .. } => {
                let body = comments
                    .get(post_id)
                    .with_context(|| format!("no fixture comments for {post_id}"))?;
                parse_comments(body, limit)
            }
        }
    }

    fn name(&self) -> &'static str {
        "reddit"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"{
      "kind": "Listing",
      "data": {
        "after": null,
        "children": [
          {"kind": "t3", "data": {"id": "s1", "subreddit": "rust", "title": "Weekly thread",
            "permalink": "/r/rust/comments/s1/weekly/", "score": 5, "num_comments": 2,
            "created_utc": 1700000000.0, "is_self": true, "selftext": "", "stickied": true}},
          {"kind": "t3", "data": {"id": "p1", "subreddit": "rust", "title": "Borrowck &amp; you",
            "permalink": "/r/rust/comments/p1/borrowck/", "score": 420, "num_comments": 37,
            "upvote_ratio": 0.97, "created_utc": 1700003600.5, "is_self": true,
            "selftext": "long body", "stickied": false}},
          {"kind": "t3", "data": {"id": "p2", "subreddit": "rust", "title": "A link",
            "permalink": "/r/rust/comments/p2/a_link/", "score": 12, "num_comments": 0,
            "created_utc": 1700000000, "is_self": false, "selftext": ""}}
        ]
      }
    }"#;

    #[test]
    fn listing_skips_stickied_and_maps_fields() {
        let posts = parse_listing(LISTING).unwrap();
        assert_eq!(posts.len(), 2);
        let p = &posts[0];
        assert_eq!(p.id, "p1");
        assert_eq!(p.group, "rust");
        assert_eq!(p.title, "Borrowck & you");
        assert_eq!(p.url, "https://reddit.com/r/rust/comments/p1/borrowck/");
        assert_eq!(p.created_utc, 1_700_003_600);
        assert_eq!(p.upvote_ratio, Some(0.97));
        assert_eq!(p.selftext.as_deref(), Some("long body"));
        // link posts carry no body and may lack a ratio
        assert_eq!(posts[1].selftext, None);
        assert_eq!(posts[1].upvote_ratio, None);
    }

    #[test]
    fn comments_skip_more_deleted_and_stickied() {
        let body = r#"[
          {"kind": "Listing", "data": {"children": []}},
          {"kind": "Listing", "data": {"children": [
            {"kind": "t1", "data": {"body": "mod note", "stickied": true}},
            {"kind": "t1", "data": {"body": "  first  "}},
            {"kind": "t1", "data": {"body": "[deleted]"}},
            {"kind": "t1", "data": {"body": "second"}},
            {"kind": "t1", "data": {"body": "third"}},
            {"kind": "more", "data": {"count": 12, "children": ["x"]}}
          ]}}
        ]"#;
        assert_eq!(parse_comments(body, 5).unwrap(), vec!["first", "second", "third"]);
        assert_eq!(parse_comments(body, 1).unwrap(), vec!["first"]);
    }

    #[test]
    fn malformed_listing_is_an_error() {
        assert!(parse_listing("{\"data\": 3}").is_err());
    }
}
