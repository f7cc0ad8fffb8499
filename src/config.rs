use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::inference::openai::DEFAULT_BASE_URL;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_DB_PATH: &str = "pocket.db";

/// Runtime settings, read from the environment (and a `.env` file).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantConfig {
    /// Required when talking to the hosted OpenAI endpoint; optional for
    /// local OpenAI-compatible servers.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub db_path: PathBuf,
    pub max_turns: usize,
    pub max_tokens: u32,
    pub history_limit: usize,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.into(),
            model: DEFAULT_MODEL.into(),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            max_turns: 10,
            max_tokens: 1024,
            history_limit: 40,
        }
    }
}

impl AssistantConfig {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is fine.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            api_key: var("OPENAI_API_KEY"),
            base_url: var("OPENAI_BASE_URL").unwrap_or(defaults.base_url),
            model: var("POCKET_MODEL").unwrap_or(defaults.model),
            db_path: var("POCKET_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            max_turns: parse(&lookup, "POCKET_MAX_TURNS", defaults.max_turns)?,
            max_tokens: parse(&lookup, "POCKET_MAX_TOKENS", defaults.max_tokens)?,
            history_limit: parse(&lookup, "POCKET_HISTORY_LIMIT", defaults.history_limit)?,
        })
    }

    /// Fails when the hosted endpoint is configured without a key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let hosted = self.base_url.trim_end_matches('/') == DEFAULT_BASE_URL;
        if hosted && self.api_key.is_none() {
            return Err(ConfigError::Missing("OPENAI_API_KEY"));
        }
        if self.max_turns == 0 {
            return Err(ConfigError::Invalid {
                name: "POCKET_MAX_TURNS",
                value: "0".into(),
            });
        }
        Ok(())
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = AssistantConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AssistantConfig::default());
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.max_turns, 10);
        assert_eq!(config.max_tokens, 1024);
        assert_eq!(config.history_limit, 40);
    }

    #[test]
    fn reads_overrides() {
        let config = AssistantConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_BASE_URL", "http://localhost:1234"),
            ("POCKET_MODEL", "llama3"),
            ("POCKET_DB_PATH", "/tmp/p.db"),
            ("POCKET_MAX_TURNS", " 4 "),
            ("POCKET_HISTORY_LIMIT", ""),
        ]))
        .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.base_url, "http://localhost:1234");
        assert_eq!(config.model, "llama3");
        assert_eq!(config.db_path, PathBuf::from("/tmp/p.db"));
        assert_eq!(config.max_turns, 4);
        assert_eq!(config.history_limit, 40);
    }

    #[test]
    fn rejects_bad_numbers() {
        let err = AssistantConfig::from_lookup(lookup(&[("POCKET_MAX_TOKENS", "muitos")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { name: "POCKET_MAX_TOKENS", .. }
        ));
    }

    #[test]
    fn hosted_endpoint_needs_key() {
        let config = AssistantConfig::default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Missing("OPENAI_API_KEY"))
        ));

        let local = AssistantConfig {
            base_url: "http://localhost:11434".into(),
            ..AssistantConfig::default()
        };
        assert!(local.validate().is_ok());
    }
}
