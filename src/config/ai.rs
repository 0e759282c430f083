// src/config/ai.rs
use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL: &str = "claude-haiku-4-5-20251001";
pub const ENV_API_KEY: &str = "ANTHROPIC_API_KEY";

fn default_enabled() -> bool {
    true
}
fn default_provider() -> String {
    "anthropic".to_string()
}
fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_daily_limit() -> u32 {
    200
}
fn default_api_key() -> String {
    "ENV".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// "anthropic" | "mock" (case-insensitive)
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Real (non-cached) summary calls allowed per UTC day.
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,
    /// "ENV" means: read from ANTHROPIC_API_KEY.
    #[serde(default = "default_api_key")]
    pub api_key: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            provider: default_provider(),
            model: default_model(),
            daily_limit: default_daily_limit(),
            api_key: default_api_key(),
        }
    }
}

impl AiConfig {
    /// Normalize provider and resolve an "ENV" key through `lookup`.
    /// A missing key is not an error: the provider just returns no summaries.
    pub fn resolve(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        self.provider = self.provider.trim().to_lowercase();
        if self.api_key.trim().eq_ignore_ascii_case("env") {
            self.api_key = lookup(ENV_API_KEY).unwrap_or_default();
        }
        if self.model.trim().is_empty() {
            self.model = default_model();
        }
        self
    }

    pub fn has_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_key_is_resolved_and_provider_normalized() {
        let cfg = AiConfig {
            provider: " Anthropic ".into(),
            ..AiConfig::default()
        }
        .resolve(|k| (k == ENV_API_KEY).then(|| "sk-test".to_string()));
        assert_eq!(cfg.provider, "anthropic");
        assert_eq!(cfg.api_key, "sk-test");
        assert!(cfg.has_key());
    }

    #[test]
    fn missing_env_key_leaves_empty_key() {
        let cfg = AiConfig::default().resolve(|_| None);
        assert!(!cfg.has_key());
        assert_eq!(cfg.model, DEFAULT_MODEL);
    }
}
