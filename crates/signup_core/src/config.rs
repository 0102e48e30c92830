//! Runtime configuration.
//!
//! Read from an optional YAML file named by `SIGNUP_CONFIG`, then overridden
//! field by field from the environment (a `.env` file is honoured). Durations
//! are milliseconds.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::resilience::{duration_ms, ResilienceConfig};
use crate::service::LookupFailurePolicy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignupConfig {
    pub bind_addr: String,
    /// User when a request carries no `x-user-id`.
    pub default_user: String,
    /// Prefix of every goal name this deployment creates.
    pub demo_id: String,
    /// Remote registration service; `None` uses the in-process mock.
    pub registration_url: Option<String>,
    /// Remote goal service; `None` uses the in-process mock.
    pub goal_url: Option<String>,
    pub lookup_failure: LookupFailurePolicy,
    pub goal_lookup: ResilienceConfig,
    #[serde(with = "duration_ms")]
    pub event_cache_ttl: Duration,
    /// Whole-request timeout of the HTTP clients.
    #[serde(with = "duration_ms")]
    pub client_timeout: Duration,
}

impl Default for SignupConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            default_user: "demo".to_string(),
            demo_id: "ID00".to_string(),
            registration_url: None,
            goal_url: None,
            lookup_failure: LookupFailurePolicy::default(),
            goal_lookup: ResilienceConfig::standard("goal-lookup"),
            event_cache_ttl: Duration::from_secs(24 * 60 * 60),
            client_timeout: Duration::from_secs(30),
        }
    }
}

impl SignupConfig {
    /// `.env`, then `SIGNUP_CONFIG`, then the individual overrides.
    pub fn load() -> anyhow::Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        let mut config = match std::env::var("SIGNUP_CONFIG") {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Apply `SIGNUP_*` overrides from `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(v) = lookup("SIGNUP_BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Some(v) = lookup("SIGNUP_USER") {
            self.default_user = v;
        }
        if let Some(v) = lookup("SIGNUP_DEMO_ID") {
            self.demo_id = v;
        }
        if let Some(v) = lookup("SIGNUP_REGISTRATION_URL") {
            self.registration_url = non_empty(v);
        }
        if let Some(v) = lookup("SIGNUP_GOAL_URL") {
            self.goal_url = non_empty(v);
        }
        if let Some(v) = lookup("SIGNUP_LOOKUP_FAILURE") {
            self.lookup_failure = v
                .parse()
                .with_context(|| "SIGNUP_LOOKUP_FAILURE".to_string())?;
        }
        Ok(())
    }
}

fn non_empty(v: String) -> Option<String> {
    let v = v.trim();
    (!v.is_empty()).then(|| v.to_string())
}
