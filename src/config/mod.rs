// src/config/mod.rs
//! Service settings: optional TOML file, then environment overrides.
//!
//! Resolution order:
//! 1) `$DIGEST_CONFIG_PATH` (must exist when set)
//! 2) `config/digest.toml` (optional)
//! 3) built-in defaults
//!
//! Environment variables (usually from `.env` via dotenvy) override file values.

pub mod ai;

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveTime;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::store::{NewGroup, Preferences, DEFAULT_POSTS_PER_DIGEST, MAX_POSTS_PER_DIGEST};
pub use ai::AiConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config/digest.toml";
pub const ENV_CONFIG_PATH: &str = "DIGEST_CONFIG_PATH";
pub const DEFAULT_DATABASE_PATH: &str = "data/digest_store.json";
pub const DEFAULT_FETCH_LIMIT: usize = 100;
pub const DEFAULT_FROM: &str = "Reddit Digest <digest@localhost>";

fn default_digest_time() -> String {
    "06:00".to_string()
}
fn default_posts_per_digest() -> u32 {
    DEFAULT_POSTS_PER_DIGEST
}
fn default_database_path() -> PathBuf {
    PathBuf::from(DEFAULT_DATABASE_PATH)
}
fn default_fetch_limit() -> usize {
    DEFAULT_FETCH_LIMIT
}
fn default_from() -> String {
    DEFAULT_FROM.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub pass: String,
    #[serde(default = "default_from")]
    pub from: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub user_email: String,
    #[serde(default = "default_digest_time")]
    pub digest_time: String,
    #[serde(default = "default_posts_per_digest")]
    pub posts_per_digest: u32,
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    /// Posts requested per group from the hot listing.
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: usize,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub smtp: Option<SmtpConfig>,
    /// Groups added on first start (empty store only).
    #[serde(default)]
    pub groups: Vec<NewGroup>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            user_email: String::new(),
            digest_time: default_digest_time(),
            posts_per_digest: default_posts_per_digest(),
            database_path: default_database_path(),
            fetch_limit: default_fetch_limit(),
            ai: AiConfig::default(),
            smtp: None,
            groups: Vec::new(),
        }
    }
}

impl Settings {
    /// Load from file (see module docs) and the process environment.
    pub fn load() -> Result<Self> {
        let base = match std::env::var(ENV_CONFIG_PATH) {
            Ok(p) => {
                let pb = PathBuf::from(p);
                if !pb.exists() {
                    bail!("{ENV_CONFIG_PATH} points to non-existent path {}", pb.display());
                }
                Self::from_file(&pb)?
            }
            Err(_) => {
                let p = Path::new(DEFAULT_CONFIG_PATH);
                if p.exists() {
                    Self::from_file(p)?
                } else {
                    Self::default()
                }
            }
        };
        base.with_env(|k| std::env::var(k).ok())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading digest config from {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("parsing digest config {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Apply environment overrides through `lookup`, then validate.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("USER_EMAIL") {
            self.user_email = v;
        }
        if let Some(v) = get("DIGEST_TIME") {
            self.digest_time = v;
        }
        if let Some(v) = get("POSTS_PER_DIGEST") {
            self.posts_per_digest = v
                .parse()
                .with_context(|| format!("POSTS_PER_DIGEST is not a number: {v}"))?;
        }
        if let Some(v) = get("DATABASE_PATH") {
            self.database_path = PathBuf::from(v);
        }
        if let Some(v) = get("AI_ENABLED") {
            self.ai.enabled = matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(v) = get("AI_MODEL") {
            self.ai.model = v;
        }
        if let Some(v) = get("AI_DAILY_LIMIT") {
            self.ai.daily_limit = v
                .parse()
                .with_context(|| format!("AI_DAILY_LIMIT is not a number: {v}"))?;
        }
        if let Some(host) = get("SMTP_HOST") {
            let mut smtp = self.smtp.take().unwrap_or(SmtpConfig {
                host: String::new(),
                user: String::new(),
                pass: String::new(),
                from: default_from(),
            });
            smtp.host = host;
            self.smtp = Some(smtp);
        }
        if let Some(smtp) = self.smtp.as_mut() {
            if let Some(v) = get("SMTP_USER") {
                smtp.user = v;
            }
            if let Some(v) = get("SMTP_PASS") {
                smtp.pass = v;
            }
            if let Some(v) = get("EMAIL_FROM") {
                smtp.from = v;
            }
        }
        self.ai = self.ai.resolve(|k| get(k));

        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        parse_digest_time(&self.digest_time)?;
        if self.posts_per_digest == 0 || self.posts_per_digest > MAX_POSTS_PER_DIGEST {
            bail!("posts_per_digest must be within 1..={MAX_POSTS_PER_DIGEST}");
        }
        Ok(())
    }

    /// Preferences used when the store is created for the first time.
    pub fn default_preferences(&self) -> Preferences {
        Preferences {
            email_address: self.user_email.clone(),
            digest_time: self.digest_time.clone(),
            posts_per_digest: self.posts_per_digest,
            ..Preferences::default()
        }
    }
}

/// Parse `HH:MM` (24h). Single-digit hours are accepted.
pub fn parse_digest_time(s: &str) -> Result<NaiveTime> {
    let (h, m) = s
        .trim()
        .split_once(':')
        .ok_or_else(|| anyhow!("digest time must look like HH:MM, got {s:?}"))?;
    let hour: u32 = h.parse().with_context(|| format!("bad hour in {s:?}"))?;
    let minute: u32 = m.parse().with_context(|| format!("bad minute in {s:?}"))?;
    if m.len() != 2 {
        bail!("minutes must have two digits in {s:?}");
    }
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| anyhow!("digest time out of range: {s:?}"))
}
