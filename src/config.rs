// src/config.rs
//! Runtime configuration: engine knobs from env vars, per-catalog threshold
//! overrides from TOML or JSON.
//!
//! Threshold file lookup order:
//! 1) $MATCHER_THRESHOLDS_PATH
//! 2) config/thresholds.toml
//! 3) config/thresholds.json
//! 4) built-in tables (no overrides)
//!
//! File shape (TOML), one table per catalog name:
//! ```toml
//! [Servak]
//! default = 0.65
//! [[Servak.categories]]
//! prefix = "процесор"
//! threshold = 0.97
//! ```

use anyhow::{anyhow, bail, Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::aggregate::FailurePolicy;
use crate::dispatch::DEFAULT_MAX_CONCURRENCY;
use crate::sources::{Catalog, DEFAULT_USER_AGENT};
use crate::thresholds::ThresholdTable;

pub const ENV_MAX_CONCURRENCY: &str = "MATCHER_MAX_CONCURRENCY";
pub const ENV_FAILURE_POLICY: &str = "MATCHER_FAILURE_POLICY";
pub const ENV_USER_AGENT: &str = "MATCHER_USER_AGENT";
pub const ENV_TASK_BUDGET_MS: &str = "MATCHER_TASK_BUDGET_MS";
pub const ENV_THRESHOLDS_PATH: &str = "MATCHER_THRESHOLDS_PATH";
pub const ENV_SNAPSHOT_PATH: &str = "MATCHER_SNAPSHOT_PATH";
pub const ENV_FALLBACK_LINK: &str = "MATCHER_FALLBACK_LINK";

pub const DEFAULT_SNAPSHOT_PATH: &str = "config/snapshot.json";

pub type ThresholdOverrides = HashMap<Catalog, ThresholdTable>;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub max_concurrency: usize,
    pub failure_policy: FailurePolicy,
    pub user_agent: String,
    /// Replaces every source's own budget when set.
    pub task_budget: Option<Duration>,
    /// Append an eBay search link after each component's catalog records.
    pub fallback_link: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            failure_policy: FailurePolicy::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            task_budget: None,
            fallback_link: false,
        }
    }
}

impl EngineConfig {
    /// Defaults overlaid with whatever env vars are set. Malformed values are errors.
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();
        if let Some(v) = env_non_empty(ENV_MAX_CONCURRENCY) {
            let n: usize = v
                .parse()
                .with_context(|| format!("{ENV_MAX_CONCURRENCY}={v:?} is not a number"))?;
            if n == 0 {
                bail!("{ENV_MAX_CONCURRENCY} must be at least 1");
            }
            cfg.max_concurrency = n;
        }
        if let Some(v) = env_non_empty(ENV_FAILURE_POLICY) {
            cfg.failure_policy = v.parse()?;
        }
        if let Some(v) = env_non_empty(ENV_USER_AGENT) {
            cfg.user_agent = v;
        }
        if let Some(v) = env_non_empty(ENV_TASK_BUDGET_MS) {
            let ms: u64 = v
                .parse()
                .with_context(|| format!("{ENV_TASK_BUDGET_MS}={v:?} is not a number"))?;
            cfg.task_budget = (ms > 0).then(|| Duration::from_millis(ms));
        }
        if let Some(v) = env_non_empty(ENV_FALLBACK_LINK) {
            cfg.fallback_link = parse_flag(&v)
                .ok_or_else(|| anyhow!("{ENV_FALLBACK_LINK}={v:?} is not a boolean"))?;
        }
        Ok(cfg)
    }
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Load overrides from an explicit path. Supports TOML or JSON formats.
pub fn load_thresholds_from(path: &Path) -> Result<ThresholdOverrides> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading thresholds from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_thresholds(&content, ext.as_str())
}

pub fn load_thresholds_default() -> Result<ThresholdOverrides> {
    if let Ok(p) = std::env::var(ENV_THRESHOLDS_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_thresholds_from(&pb);
        }
        return Err(anyhow!("{ENV_THRESHOLDS_PATH} points to non-existent path"));
    }
    let toml_p = PathBuf::from("config/thresholds.toml");
    if toml_p.exists() {
        return load_thresholds_from(&toml_p);
    }
    let json_p = PathBuf::from("config/thresholds.json");
    if json_p.exists() {
        return load_thresholds_from(&json_p);
    }
    Ok(HashMap::new())
}

pub fn snapshot_path() -> PathBuf {
    env_non_empty(ENV_SNAPSHOT_PATH)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SNAPSHOT_PATH))
}

fn parse_thresholds(s: &str, hint_ext: &str) -> Result<ThresholdOverrides> {
    let raw: HashMap<String, ThresholdTable> = if hint_ext == "json" {
        serde_json::from_str(s).context("parsing thresholds json")?
    } else if hint_ext == "toml" {
        toml::from_str(s).context("parsing thresholds toml")?
    } else if let Ok(v) = serde_json::from_str(s) {
        v
    } else {
        toml::from_str(s).map_err(|e| anyhow!("unsupported thresholds format: {e}"))?
    };

    let mut out = HashMap::with_capacity(raw.len());
    for (name, table) in raw {
        let catalog = Catalog::from_name(&name)
            .ok_or_else(|| anyhow!("unknown catalog `{name}` in thresholds"))?;
        let table = table
            .validated()
            .with_context(|| format!("thresholds for {}", catalog.name()))?;
        out.insert(catalog, table);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    const TOML: &str = r#"
[Servak]
default = 0.6

[[Servak.categories]]
prefix = "Процесор"
threshold = 0.9

[[Servak.categories]]
prefix = "сервер"
threshold = 0.8

[server-shop]
default = 0.5
"#;

    #[test]
    fn toml_overrides_keep_order_and_fold_prefixes() {
        let o = parse_thresholds(TOML, "toml").unwrap();
        let servak = &o[&Catalog::Servak];
        assert_eq!(servak.categories[0].prefix, "процесор");
        assert_eq!(servak.categories[1].prefix, "сервер");
        assert!((servak.threshold_for("Процесор AMD EPYC") - 0.9).abs() < 1e-9);
        assert!((o[&Catalog::ServerShop].default - 0.5).abs() < 1e-9);
    }

    #[test]
    fn json_is_detected_without_hint() {
        let json = r#"{"HWF": {"default": 0.8}}"#;
        let o = parse_thresholds(json, "").unwrap();
        assert!((o[&Catalog::Hwf].default - 0.8).abs() < 1e-9);
    }

    #[test]
    fn rejects_unknown_catalog_and_bad_values() {
        assert!(parse_thresholds(r#"{"ebay": {"default": 0.5}}"#, "json").is_err());
        assert!(parse_thresholds(r#"{"Prom": {"default": 1.5}}"#, "json").is_err());
    }

    #[serial_test::serial]
    #[test]
    fn engine_config_reads_env() {
        env::set_var(ENV_MAX_CONCURRENCY, "9");
        env::set_var(ENV_FAILURE_POLICY, "placeholder");
        env::set_var(ENV_TASK_BUDGET_MS, "1500");
        env::remove_var(ENV_USER_AGENT);
        let cfg = EngineConfig::from_env().unwrap();
        assert_eq!(cfg.max_concurrency, 9);
        assert_eq!(cfg.failure_policy, FailurePolicy::Placeholder);
        assert_eq!(cfg.task_budget, Some(Duration::from_millis(1500)));
        assert_eq!(cfg.user_agent, DEFAULT_USER_AGENT);

        env::set_var(ENV_MAX_CONCURRENCY, "0");
        assert!(EngineConfig::from_env().is_err());

        env::remove_var(ENV_MAX_CONCURRENCY);
        env::remove_var(ENV_FAILURE_POLICY);
        env::remove_var(ENV_TASK_BUDGET_MS);
        assert_eq!(EngineConfig::from_env().unwrap(), EngineConfig::default());
    }

    #[serial_test::serial]
    #[test]
    fn fallback_link_flag_from_env() {
        env::set_var(ENV_FALLBACK_LINK, "On");
        assert!(EngineConfig::from_env().unwrap().fallback_link);
        env::set_var(ENV_FALLBACK_LINK, "0");
        assert!(!EngineConfig::from_env().unwrap().fallback_link);
        env::set_var(ENV_FALLBACK_LINK, "maybe");
        assert!(EngineConfig::from_env().is_err());
        env::remove_var(ENV_FALLBACK_LINK);
        assert!(!EngineConfig::from_env().unwrap().fallback_link);
    }
}
