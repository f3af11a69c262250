//! Startup configuration.
//!
//! Uses Figment to merge built-in defaults, `lookout.toml`,
//! `lookout.<env>.toml` and `LOOKOUT_*` env vars (`__` separates nesting, so
//! `LOOKOUT_GATEWAY__API_KEY` sets `gateway.api_key`). The result is frozen
//! for the lifetime of a session.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::SortKey;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub endpoint: String,
    /// Passed through unchanged as a bearer token; empty means no header.
    pub api_key: String,
    pub index: String,
    pub primary_key: String,
    pub timeout_ms: u64,
    /// Count each refined facet as if its own selection were absent, so the
    /// other values of an OR-ed facet stay visible.
    pub disjunctive_facets: bool,
}

impl GatewayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:7700".to_string(),
            api_key: String::new(),
            index: "cities".to_string(),
            primary_key: "geonameid".to_string(),
            timeout_ms: 5_000,
            disjunctive_facets: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub debounce_ms: u64,
    pub page_size: u32,
    /// Debounce filter/sort/page changes too instead of dispatching them at once.
    pub debounce_all: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { debounce_ms: 200, page_size: 20, debounce_all: false }
    }
}

/// A server-understood ordering. `index` overrides the gateway index (replica
/// style sorting); `rules` are passed as the index's sort expressions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortStrategy {
    pub key: SortKey,
    pub label: String,
    #[serde(default)]
    pub index: Option<String>,
    #[serde(default)]
    pub rules: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub title_field: String,
    pub detail_fields: Vec<String>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            title_field: "name".to_string(),
            detail_fields: vec!["country".to_string(), "population".to_string(), "timezone".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookoutConfig {
    pub gateway: GatewayConfig,
    pub search: SearchConfig,
    /// Ordered; the first entry is the default strategy.
    pub sorts: Vec<SortStrategy>,
    pub facets: Vec<String>,
    pub display: DisplayConfig,
}

impl Default for LookoutConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            search: SearchConfig::default(),
            sorts: vec![
                SortStrategy { key: SortKey::from("relevance"), label: "Default".to_string(), index: None, rules: vec![] },
                SortStrategy {
                    key: SortKey::from("population_desc"),
                    label: "Population ↓".to_string(),
                    index: None,
                    rules: vec!["population:desc".to_string()],
                },
                SortStrategy {
                    key: SortKey::from("population_asc"),
                    label: "Population ↑".to_string(),
                    index: None,
                    rules: vec!["population:asc".to_string()],
                },
            ],
            facets: vec!["country".to_string(), "timezone".to_string()],
            display: DisplayConfig::default(),
        }
    }
}

impl LookoutConfig {
    /// Load from the working directory using `RUST_ENV` (default `dev`).
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_from(Path::new("."), &env_name)
    }

    pub fn load_from(dir: &Path, env_name: &str) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(dir.join("lookout.toml")));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("lookout.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("lookout.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("lookout.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("LOOKOUT_").split("__"));

        let config: Self = figment.extract()?;
        config.validate()?;
        tracing::debug!(target: "lookout::config", env = env_name, index = %config.gateway.index, "configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.gateway.endpoint.trim().is_empty() {
            return Err(Error::InvalidConfig("gateway.endpoint must not be empty".into()));
        }
        if self.gateway.index.trim().is_empty() {
            return Err(Error::InvalidConfig("gateway.index must not be empty".into()));
        }
        if self.gateway.primary_key.trim().is_empty() {
            return Err(Error::InvalidConfig("gateway.primary_key must not be empty".into()));
        }
        if self.gateway.timeout_ms == 0 {
            return Err(Error::InvalidConfig("gateway.timeout_ms must be at least 1".into()));
        }
        if self.search.page_size == 0 {
            return Err(Error::InvalidConfig("search.page_size must be at least 1".into()));
        }
        if self.sorts.is_empty() {
            return Err(Error::InvalidConfig("at least one sort strategy is required".into()));
        }
        let mut keys = HashSet::new();
        for sort in &self.sorts {
            if !keys.insert(sort.key.as_str()) {
                return Err(Error::InvalidConfig(format!("duplicate sort key '{}'", sort.key)));
            }
        }
        let mut facets = HashSet::new();
        for facet in &self.facets {
            if facet.is_empty() || facet.contains(|c: char| c.is_whitespace() || c == '"' || c == '\'') {
                return Err(Error::InvalidConfig(format!("facet '{facet}' is not a filterable attribute name")));
            }
            if !facets.insert(facet.as_str()) {
                return Err(Error::InvalidConfig(format!("duplicate facet '{facet}'")));
            }
        }
        Ok(())
    }

    pub fn default_sort(&self) -> Option<&SortStrategy> {
        self.sorts.first()
    }

    pub fn sort(&self, key: &SortKey) -> Option<&SortStrategy> {
        self.sorts.iter().find(|s| &s.key == key)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.search.debounce_ms)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
