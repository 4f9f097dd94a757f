// src/aggregate.rs
//! Groups task outcomes by component, in request order, with sources in
//! registry order regardless of which task finished first.

use anyhow::{bail, Error};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::dispatch::{TaskOutcome, TaskStatus};
use crate::error::FetchError;
use crate::fallback::FallbackLink;
use crate::types::SiteRecord;

/// What a failed retrieval contributes to its component's record list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Nothing; the source is simply absent for that component.
    #[default]
    Omit,
    /// A not-found record, same as a fetch that matched nothing.
    Placeholder,
}

impl FromStr for FailurePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "omit" => Ok(Self::Omit),
            "placeholder" => Ok(Self::Placeholder),
            other => bail!("unknown failure policy `{other}` (expected omit|placeholder)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentResult {
    /// Component text exactly as requested.
    pub name: String,
    pub results: Vec<SiteRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureEntry {
    pub component: String,
    pub site: String,
    pub reason: String,
    pub error: FetchError,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AggregatedResult {
    #[serde(rename = "results")]
    pub components: Vec<ComponentResult>,
    pub failures: Vec<FailureEntry>,
}

impl AggregatedResult {
    /// First entry requested under this exact text.
    pub fn get(&self, component: &str) -> Option<&ComponentResult> {
        self.components.iter().find(|c| c.name == component)
    }

    /// Close every component's list with a marketplace search link.
    pub fn append_fallback(&mut self, link: &FallbackLink) {
        for c in &mut self.components {
            c.results.push(link.record_for(&c.name));
        }
    }

    pub fn found_count(&self) -> usize {
        self.components
            .iter()
            .flat_map(|c| c.results.iter())
            .filter(|r| r.is_found())
            .count()
    }
}

pub fn aggregate(
    components: &[String],
    outcomes: &[TaskOutcome],
    policy: FailurePolicy,
) -> AggregatedResult {
    let mut ordered: Vec<&TaskOutcome> = outcomes.iter().collect();
    ordered.sort_by_key(|o| o.key);

    let mut out = AggregatedResult {
        components: components
            .iter()
            .map(|c| ComponentResult {
                name: c.clone(),
                results: Vec::new(),
            })
            .collect(),
        failures: Vec::new(),
    };

    for o in ordered {
        let Some(slot) = out.components.get_mut(o.key.component) else {
            tracing::warn!(target: "dispatch", key = ?o.key, "outcome for unknown component dropped");
            continue;
        };
        match &o.status {
            TaskStatus::Resolved { resolution } => slot.results.push(resolution.record.clone()),
            TaskStatus::Failed { error } => {
                if policy == FailurePolicy::Placeholder {
                    slot.results.push(SiteRecord::not_found(&o.site));
                }
                out.failures.push(FailureEntry {
                    component: o.component.clone(),
                    site: o.site.clone(),
                    reason: error.to_string(),
                    error: error.clone(),
                });
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::TaskKey;
    use crate::matcher::{MatchVia, Resolution};
    use crate::types::{MatchedRecord, RawListing};

    fn resolved(c: usize, s: usize, site: &str, found: bool) -> TaskOutcome {
        let record = if found {
            SiteRecord::Matched(MatchedRecord::from_listing(site, RawListing::new("item", "10 грн")))
        } else {
            SiteRecord::not_found(site)
        };
        TaskOutcome {
            key: TaskKey { component: c, source: s },
            component: format!("c{c}"),
            site: site.to_string(),
            status: TaskStatus::Resolved {
                resolution: Resolution {
                    record,
                    via: if found { MatchVia::Similarity } else { MatchVia::NoListings },
                    score: 0.0,
                    threshold: 0.5,
                },
            },
            elapsed_ms: 1,
        }
    }

    #[test]
    fn policy_parses_case_insensitively() {
        assert_eq!("Placeholder".parse::<FailurePolicy>().unwrap(), FailurePolicy::Placeholder);
        assert_eq!(" omit ".parse::<FailurePolicy>().unwrap(), FailurePolicy::Omit);
        assert!("drop".parse::<FailurePolicy>().is_err());
    }

    #[test]
    fn groups_in_registry_order() {
        let comps = vec!["c0".to_string(), "c1".to_string()];
        let outcomes = vec![
            resolved(1, 1, "B", true),
            resolved(0, 1, "B", false),
            resolved(1, 0, "A", false),
            resolved(0, 0, "A", true),
        ];
        let agg = aggregate(&comps, &outcomes, FailurePolicy::Omit);
        let sites: Vec<&str> = agg.components[0].results.iter().map(|r| r.site()).collect();
        assert_eq!(sites, vec!["A", "B"]);
        assert!(agg.components[0].results[0].is_found());
        assert!(!agg.components[1].results[0].is_found());
        assert_eq!(agg.found_count(), 2);
    }

    #[test]
    fn component_without_outcomes_still_listed() {
        let comps = vec!["c0".to_string(), "lonely".to_string()];
        let agg = aggregate(&comps, &[resolved(0, 0, "A", true)], FailurePolicy::Omit);
        assert_eq!(agg.components.len(), 2);
        assert!(agg.get("lonely").unwrap().results.is_empty());
    }

    #[test]
    fn serializes_components_under_results() {
        let comps = vec!["c0".to_string()];
        let agg = aggregate(&comps, &[resolved(0, 0, "A", false)], FailurePolicy::Omit);
        let v = serde_json::to_value(&agg).unwrap();
        assert_eq!(v["results"][0]["name"], "c0");
        assert_eq!(v["results"][0]["results"][0]["name"], crate::types::NOT_FOUND_NAME);
        assert!(v["failures"].as_array().unwrap().is_empty());
    }
}
