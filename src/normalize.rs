// src/normalize.rs
//! Text normalization for component requests and listing titles.
//!
//! Every catalog compares titles in its own canonical form, so the rules are
//! expressed as a [`Normalization`] value carried by each source's policy.
//! All functions return fresh strings and are idempotent on their own output.

use once_cell::sync::Lazy;
use regex::Regex;

/// Any `(...)` group, including its content.
static RE_PARENS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\([^)]*\)").expect("parens regex"));
/// Content of the first `(...)` group.
static RE_FIRST_GROUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([^)]+)\)").expect("first group regex"));

/// Categories whose parenthetical carries the searchable part (capacity, model).
pub const EXTRACT_TRIGGERS: [&str; 4] = [
    "Оперативна пам'ять",
    "Диск NVMe",
    "Жорсткий диск",
    "Накопичувач SSD",
];

/// Categories whose parenthetical must stay in the compared text.
pub const KEEP_PARENS_PREFIXES: [&str; 2] = ["Відеокарта", "Робоча станція"];

/// How a single string is folded before comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextMode {
    /// Lowercase, whitespace runs collapsed to one space, trimmed.
    #[default]
    Collapse,
    /// Parentheticals removed, all whitespace removed, lowercase.
    Compact,
    /// Lowercase only.
    Lowercase,
}

impl TextMode {
    pub fn apply(self, text: &str) -> String {
        match self {
            TextMode::Collapse => collapse_whitespace(text).to_lowercase(),
            TextMode::Compact => compact(text),
            TextMode::Lowercase => text.to_lowercase(),
        }
    }
}

/// Per-catalog normalization rule for the requested component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalization {
    /// Drop every parenthetical; whitespace collapsed or removed.
    StripParens { mode: TextMode },
    /// Search by the parenthetical content when the component starts with a
    /// trigger prefix, otherwise strip parentheticals.
    ExtractOrStrip { triggers: Vec<String> },
    /// Keep parentheticals for the listed prefixes, compact everything else.
    KeepParensFor { prefixes: Vec<String> },
    /// Lowercase only; compare raw titles.
    LowercaseOnly,
}

impl Normalization {
    pub fn extract_or_strip() -> Self {
        Self::ExtractOrStrip {
            triggers: EXTRACT_TRIGGERS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn keep_parens_for_gpus() -> Self {
        Self::KeepParensFor {
            prefixes: KEEP_PARENS_PREFIXES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Canonical search term for a requested component.
    pub fn normalize(&self, component: &str) -> String {
        match self {
            Normalization::StripParens { mode } => mode.apply(&strip_parens(component)),
            Normalization::ExtractOrStrip { triggers } => {
                let term = if starts_with_any(component, triggers) {
                    first_group(component).unwrap_or_else(|| component.trim().to_string())
                } else {
                    strip_parens(component)
                };
                TextMode::Collapse.apply(&term)
            }
            Normalization::KeepParensFor { .. } | Normalization::LowercaseOnly => {
                self.listing_mode(component).apply(component)
            }
        }
    }

    /// Mode used to fold listing titles when comparing against `component`.
    pub fn listing_mode(&self, component: &str) -> TextMode {
        match self {
            Normalization::StripParens { mode } => *mode,
            Normalization::ExtractOrStrip { .. } => TextMode::Collapse,
            Normalization::KeepParensFor { prefixes } => {
                if starts_with_any(component, prefixes) {
                    TextMode::Collapse
                } else {
                    TextMode::Compact
                }
            }
            Normalization::LowercaseOnly => TextMode::Lowercase,
        }
    }

    /// Human-readable search text for a catalog URL (no case folding).
    pub fn url_term(&self, component: &str) -> String {
        match self {
            Normalization::ExtractOrStrip { .. } => self.normalize(component),
            Normalization::KeepParensFor { prefixes } if starts_with_any(component, prefixes) => {
                component.trim().to_string()
            }
            Normalization::LowercaseOnly => component.to_string(),
            _ => clean_component(component),
        }
    }
}

/// Remove every `(...)` group and collapse whitespace. Case is preserved.
pub fn clean_component(text: &str) -> String {
    collapse_whitespace(&strip_parens(text))
}

/// Lowercase, spaceless, parenthetical-free form. Category tables key on it.
pub fn compact(text: &str) -> String {
    RE_PARENS
        .replace_all(text, "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

fn strip_parens(text: &str) -> String {
    RE_PARENS.replace_all(text, " ").into_owned()
}

fn first_group(text: &str) -> Option<String> {
    RE_FIRST_GROUP
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Case-insensitive prefix check. Folding both sides keeps normalization
/// idempotent: a normalized (lowercased) term still matches its trigger.
fn starts_with_any<S: AsRef<str>>(text: &str, prefixes: &[S]) -> bool {
    let folded = text.trim_start().to_lowercase();
    prefixes
        .iter()
        .any(|p| folded.starts_with(&p.as_ref().to_lowercase()))
}
