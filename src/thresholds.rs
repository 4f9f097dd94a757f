// src/thresholds.rs
//! Category classifier: maps a component's category prefix to the minimum
//! similarity a listing title must reach.
//!
//! Tables are ordered; the first entry whose prefix starts the component's
//! category key wins. Each catalog owns an independently tuned table, injected
//! at construction time and never mutated afterwards.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::normalize::compact;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryThreshold {
    pub prefix: String,
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdTable {
    /// Used when no category prefix matches.
    pub default: f64,
    #[serde(default)]
    pub categories: Vec<CategoryThreshold>,
}

impl ThresholdTable {
    pub fn new(default: f64) -> Self {
        Self {
            default,
            categories: Vec::new(),
        }
    }

    /// Append a category; keys are folded to the same spaceless lowercase
    /// form that component category keys use.
    pub fn with(mut self, prefix: &str, threshold: f64) -> Self {
        self.categories.push(CategoryThreshold {
            prefix: compact(prefix),
            threshold,
        });
        self
    }

    /// Threshold for an already folded category key.
    pub fn classify(&self, category_key: &str) -> f64 {
        self.categories
            .iter()
            .find(|c| category_key.starts_with(c.prefix.as_str()))
            .map(|c| c.threshold)
            .unwrap_or(self.default)
    }

    /// Threshold for raw component text.
    pub fn threshold_for(&self, component: &str) -> f64 {
        self.classify(&compact(component))
    }

    /// Fold prefixes and reject thresholds outside (0, 1].
    pub fn validated(mut self) -> Result<Self> {
        check_threshold("default", self.default)?;
        for c in self.categories.iter_mut() {
            check_threshold(&c.prefix, c.threshold)?;
            c.prefix = compact(&c.prefix);
            if c.prefix.is_empty() {
                bail!("category prefix must not be empty");
            }
        }
        Ok(self)
    }
}

fn check_threshold(label: &str, t: f64) -> Result<()> {
    if !t.is_finite() || t <= 0.0 || t > 1.0 {
        bail!("threshold `{label}` = {t} is outside (0, 1]");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn servak_like() -> ThresholdTable {
        ThresholdTable::new(0.65)
            .with("процесор", 0.97)
            .with("накопичувач", 0.7)
            .with("накопичувач SSD", 0.6)
            .with("оперативна пам'ять", 0.48)
    }

    #[test]
    fn prefix_lookup_uses_folded_component() {
        let t = servak_like();
        assert!((t.threshold_for("Процесор Intel Xeon 6230") - 0.97).abs() < 1e-9);
        assert!((t.threshold_for("Оперативна пам'ять DDR4 (16GB)") - 0.48).abs() < 1e-9);
    }

    #[test]
    fn first_matching_entry_wins() {
        let t = servak_like();
        // "накопичувач" precedes "накопичувачssd" in the table.
        assert!((t.threshold_for("Накопичувач SSD Samsung 1TB") - 0.7).abs() < 1e-9);
    }

    #[test]
    fn unknown_category_falls_back_to_default() {
        let t = servak_like();
        assert!((t.threshold_for("Блок живлення 800W") - 0.65).abs() < 1e-9);
        assert!((ThresholdTable::new(0.4).threshold_for("anything") - 0.4).abs() < 1e-9);
    }

    #[test]
    fn validation_rejects_out_of_range() {
        assert!(ThresholdTable::new(0.0).validated().is_err());
        assert!(ThresholdTable::new(1.2).validated().is_err());
        assert!(ThresholdTable::new(0.5)
            .with("сервер", f64::NAN)
            .validated()
            .is_err());
        let ok = ThresholdTable {
            default: 1.0,
            categories: vec![CategoryThreshold {
                prefix: "Жорсткий Диск".into(),
                threshold: 0.6,
            }],
        }
        .validated()
        .unwrap();
        assert_eq!(ok.categories[0].prefix, "жорсткийдиск");
    }
}
