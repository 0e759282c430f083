// src/store.rs
//! Persistence for source groups, preferences, and the post cache (sent-state).
//!
//! The whole state is one JSON document. Every mutation rewrites it via a
//! temp file + rename while holding the write lock, so concurrent digest runs
//! (scheduled job vs. a preview request) see serialized writes.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::parse_digest_time;
use crate::post::RankedPost;

pub const DEFAULT_MIN_SCORE: i64 = 50;
pub const DEFAULT_MIN_COMMENTS: u64 = 5;
pub const DEFAULT_POSTS_PER_DIGEST: u32 = 12;
pub const MAX_POSTS_PER_DIGEST: u32 = 100;
pub const DEFAULT_CACHE_RETENTION_DAYS: i64 = 30;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Subreddit already exists: {0}")]
    DuplicateGroup(String),

    #[error("Subreddit not found: {0}")]
    GroupNotFound(u64),

    #[error("Invalid subreddit name: {0:?}")]
    InvalidGroupName(String),

    #[error("Invalid preferences: {0}")]
    InvalidPreferences(String),

    #[error("store io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("store document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// A tracked forum community with its fetch thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceGroup {
    pub id: u64,
    pub name: String,
    pub enabled: bool,
    pub min_upvotes: i64,
    pub min_comments: u64,
    pub created_at: DateTime<Utc>,
}

/// Request shape for adding a group; also used for config seeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewGroup {
    pub name: String,
    #[serde(default = "default_min_score")]
    pub min_upvotes: i64,
    #[serde(default = "default_min_comments")]
    pub min_comments: u64,
}

fn default_min_score() -> i64 {
    DEFAULT_MIN_SCORE
}
fn default_min_comments() -> u64 {
    DEFAULT_MIN_COMMENTS
}

impl NewGroup {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            min_upvotes: DEFAULT_MIN_SCORE,
            min_comments: DEFAULT_MIN_COMMENTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    pub email_address: String,
    pub digest_time: String,
    pub posts_per_digest: u32,
    pub theme: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            email_address: String::new(),
            digest_time: "06:00".to_string(),
            posts_per_digest: DEFAULT_POSTS_PER_DIGEST,
            theme: "auto".to_string(),
        }
    }
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreferencesUpdate {
    pub email_address: Option<String>,
    pub digest_time: Option<String>,
    pub posts_per_digest: Option<u32>,
    pub theme: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedPost {
    pub post_id: String,
    pub subreddit: String,
    pub title: String,
    pub score: i64,
    pub num_comments: u64,
    pub url: String,
    pub created_utc: i64,
    pub fetched_at: DateTime<Utc>,
    pub sent: bool,
    pub sent_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreState {
    #[serde(default)]
    next_group_id: u64,
    #[serde(default)]
    groups: Vec<SourceGroup>,
    #[serde(default)]
    preferences: Preferences,
    #[serde(default)]
    posts: BTreeMap<String, CachedPost>,
}

#[derive(Debug)]
pub struct DigestStore {
    path: Option<PathBuf>,
    inner: RwLock<StoreState>,
}

impl DigestStore {
    /// Open (or create) the JSON store at `path`. `defaults` seeds preferences
    /// only when the file doesn't exist yet.
    pub fn open(path: impl Into<PathBuf>, defaults: Preferences) -> Result<Self, StoreError> {
        let path = path.into();
        let state = match fs::read_to_string(&path) {
            Ok(s) => serde_json::from_str(&s)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let state = StoreState {
                    preferences: defaults,
                    ..StoreState::default()
                };
                if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                    fs::create_dir_all(dir).map_err(|source| StoreError::Io {
                        path: dir.to_path_buf(),
                        source,
                    })?;
                }
                write_document(&path, &state)?;
                state
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        Ok(Self {
            path: Some(path),
            inner: RwLock::new(state),
        })
    }

    /// Non-persistent store (tests, previews without a data dir).
    pub fn in_memory(defaults: Preferences) -> Self {
        Self {
            path: None,
            inner: RwLock::new(StoreState {
                preferences: defaults,
                ..StoreState::default()
            }),
        }
    }

    /// Run `f` on the blocking pool. Mutations fsync + rename under the write
    /// lock, so async callers go through here.
    pub async fn blocking<T, F>(self: &Arc<Self>, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&DigestStore) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(self);
        tokio::task::spawn_blocking(move || f(&store)).await?
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, StoreState> {
        self.inner.read().expect("store lock poisoned")
    }

    /// Apply `f` under the write lock and persist the result.
    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut StoreState) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut guard = self.inner.write().expect("store lock poisoned");
        let mut draft = guard.clone();
        let out = f(&mut draft)?;
        if let Some(path) = &self.path {
            write_document(path, &draft)?;
        }
        *guard = draft;
        Ok(out)
    }

    /* -------- source groups -------- */

    pub fn groups(&self) -> Vec<SourceGroup> {
        self.read().groups.clone()
    }

    pub fn enabled_groups(&self) -> Vec<SourceGroup> {
        self.read()
            .groups
            .iter()
            .filter(|g| g.enabled)
            .cloned()
            .collect()
    }

    pub fn add_group(&self, new: NewGroup, now: DateTime<Utc>) -> Result<SourceGroup, StoreError> {
        let name = normalize_group_name(&new.name)?;
        self.mutate(|st| {
            if st.groups.iter().any(|g| g.name.eq_ignore_ascii_case(&name)) {
                return Err(StoreError::DuplicateGroup(name));
            }
            st.next_group_id += 1;
            let group = SourceGroup {
                id: st.next_group_id,
                name,
                enabled: true,
                min_upvotes: new.min_upvotes,
                min_comments: new.min_comments,
                created_at: now,
            };
            st.groups.push(group.clone());
            Ok(group)
        })
    }

    pub fn delete_group(&self, id: u64) -> Result<(), StoreError> {
        self.mutate(|st| {
            let before = st.groups.len();
            st.groups.retain(|g| g.id != id);
            if st.groups.len() == before {
                return Err(StoreError::GroupNotFound(id));
            }
            Ok(())
        })
    }

    pub fn toggle_group(&self, id: u64) -> Result<SourceGroup, StoreError> {
        self.mutate(|st| {
            let g = st
                .groups
                .iter_mut()
                .find(|g| g.id == id)
                .ok_or(StoreError::GroupNotFound(id))?;
            g.enabled = !g.enabled;
            Ok(g.clone())
        })
    }

    /// Add configured groups, but only into an empty store. Returns how many were added.
    pub fn seed_groups(&self, seeds: &[NewGroup], now: DateTime<Utc>) -> Result<usize, StoreError> {
        if seeds.is_empty() || !self.read().groups.is_empty() {
            return Ok(0);
        }
        let mut added = 0;
        for seed in seeds {
            match self.add_group(seed.clone(), now) {
                Ok(_) => added += 1,
                Err(StoreError::DuplicateGroup(name)) => {
                    tracing::warn!(group = %name, "duplicate seed group ignored");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(added)
    }

    /* -------- preferences -------- */

    pub fn preferences(&self) -> Preferences {
        self.read().preferences.clone()
    }

    pub fn update_preferences(&self, upd: PreferencesUpdate) -> Result<Preferences, StoreError> {
        if let Some(e) = &upd.email_address {
            let e = e.trim();
            if !e.is_empty() && !is_plausible_email(e) {
                return Err(StoreError::InvalidPreferences(format!(
                    "not an email address: {e:?}"
                )));
            }
        }
        if let Some(t) = &upd.digest_time {
            parse_digest_time(t).map_err(|e| StoreError::InvalidPreferences(e.to_string()))?;
        }
        if let Some(n) = upd.posts_per_digest {
            if n == 0 || n > MAX_POSTS_PER_DIGEST {
                return Err(StoreError::InvalidPreferences(format!(
                    "posts_per_digest must be within 1..={MAX_POSTS_PER_DIGEST}, got {n}"
                )));
            }
        }
        self.mutate(|st| {
            let p = &mut st.preferences;
            if let Some(v) = upd.email_address {
                p.email_address = v.trim().to_string();
            }
            if let Some(v) = upd.digest_time {
                p.digest_time = v.trim().to_string();
            }
            if let Some(v) = upd.posts_per_digest {
                p.posts_per_digest = v;
            }
            if let Some(v) = upd.theme {
                p.theme = v;
            }
            Ok(p.clone())
        })
    }

    /* -------- post cache -------- */

    pub fn is_sent(&self, post_id: &str) -> bool {
        self.read().posts.get(post_id).is_some_and(|p| p.sent)
    }

    pub fn cached_post(&self, post_id: &str) -> Option<CachedPost> {
        self.read().posts.get(post_id).cloned()
    }

    /// Insert posts that aren't cached yet. Existing entries (and their sent flag) are kept.
    pub fn cache_posts(&self, posts: &[RankedPost], now: DateTime<Utc>) -> Result<usize, StoreError> {
        self.mutate(|st| {
            let mut inserted = 0;
            for rp in posts {
                let p = &rp.post;
                if st.posts.contains_key(&p.id) {
                    continue;
                }
                st.posts.insert(
                    p.id.clone(),
                    CachedPost {
                        post_id: p.id.clone(),
                        subreddit: p.group.clone(),
                        title: p.title.clone(),
                        score: p.score,
                        num_comments: p.num_comments,
                        url: p.url.clone(),
                        created_utc: p.created_utc,
                        fetched_at: now,
                        sent: false,
                        sent_at: None,
                    },
                );
                inserted += 1;
            }
            Ok(inserted)
        })
    }

    /// Flag cached posts as sent. Unknown ids are ignored.
    pub fn mark_sent(&self, post_ids: &[String], now: DateTime<Utc>) -> Result<usize, StoreError> {
        self.mutate(|st| {
            let mut n = 0;
            for id in post_ids {
                if let Some(p) = st.posts.get_mut(id) {
                    p.sent = true;
                    p.sent_at = Some(now);
                    n += 1;
                }
            }
            Ok(n)
        })
    }

    /// Drop cache entries fetched more than `days` ago.
    pub fn cleanup_older_than(&self, days: i64, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let cutoff = now - ChronoDuration::days(days.max(0));
        self.mutate(|st| {
            let before = st.posts.len();
            st.posts.retain(|_, p| p.fetched_at >= cutoff);
            Ok(before - st.posts.len())
        })
    }
}

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex"));

/// Shape check only; an empty address means "not configured".
pub fn is_plausible_email(s: &str) -> bool {
    EMAIL_RE.is_match(s)
}

/// Trim, drop a leading `r/`, reject empty or non `[A-Za-z0-9_]` names.
pub fn normalize_group_name(raw: &str) -> Result<String, StoreError> {
    let t = raw.trim();
    let t = t
        .strip_prefix("r/")
        .or_else(|| t.strip_prefix("/r/"))
        .unwrap_or(t);
    let valid = !t.is_empty() && t.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(StoreError::InvalidGroupName(raw.to_string()));
    }
    Ok(t.to_string())
}

fn write_document(path: &Path, state: &StoreState) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    let json = serde_json::to_vec_pretty(state)?;
    let tmp = path.with_extension("json.tmp");
    let mut f = fs::File::create(&tmp).map_err(io_err)?;
    f.write_all(&json).map_err(io_err)?;
    f.sync_all().map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)?;
    Ok(())
}
