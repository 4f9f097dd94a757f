// src/matcher.rs
//! Match resolver: picks the listing that best represents a requested component.
//!
//! Order of evaluation:
//! 1) empty listing set -> not found
//! 2) substring short-circuit (only when the policy defines one)
//! 3) bigram similarity scan against the category threshold
//! 4) best-scoring listing, or the cheapest among all qualifying listings
//!
//! Always yields exactly one record per call.

use serde::Serialize;
use std::collections::HashMap;

use crate::normalize::{compact, Normalization, TextMode};
use crate::thresholds::ThresholdTable;
use crate::types::{ComponentQuery, MatchedRecord, RawListing, SiteRecord};

/// How the best score is compared with the category threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// `score > threshold`
    Exceeds,
    /// `score >= threshold`
    AtLeast,
}

impl Comparison {
    pub fn passes(self, score: f64, threshold: f64) -> bool {
        match self {
            Comparison::Exceeds => score > threshold,
            Comparison::AtLeast => score >= threshold,
        }
    }
}

/// Which listing text, if any, may short-circuit scoring by containing the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortCircuit {
    None,
    Name,
    ShortLabel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Highest similarity wins; earliest listing on ties.
    BestScore,
    /// Among all listings passing the gate, the lowest parsed price wins.
    Cheapest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchVia {
    ShortCircuit,
    Similarity,
    Cheapest,
    NoListings,
    BelowThreshold,
}

/// Outcome of one resolve call, with the evidence behind it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub record: SiteRecord,
    pub via: MatchVia,
    /// Similarity of the chosen listing, or of the best rejected one.
    pub score: f64,
    pub threshold: f64,
}

impl Resolution {
    pub fn is_found(&self) -> bool {
        self.record.is_found()
    }
}

/// Everything a catalog needs to decide which of its listings answers a request.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchPolicy {
    pub site: String,
    pub normalization: Normalization,
    pub thresholds: ThresholdTable,
    pub comparison: Comparison,
    pub short_circuit: ShortCircuit,
    pub selection: Selection,
    /// Ignore listings whose title is blank.
    pub skip_unnamed: bool,
}

impl MatchPolicy {
    pub fn new(site: impl Into<String>, normalization: Normalization, thresholds: ThresholdTable) -> Self {
        Self {
            site: site.into(),
            normalization,
            thresholds,
            comparison: Comparison::Exceeds,
            short_circuit: ShortCircuit::None,
            selection: Selection::BestScore,
            skip_unnamed: false,
        }
    }

    pub fn comparison(mut self, c: Comparison) -> Self {
        self.comparison = c;
        self
    }

    pub fn short_circuit(mut self, s: ShortCircuit) -> Self {
        self.short_circuit = s;
        self
    }

    pub fn selection(mut self, s: Selection) -> Self {
        self.selection = s;
        self
    }

    pub fn skip_unnamed(mut self, skip: bool) -> Self {
        self.skip_unnamed = skip;
        self
    }

    pub fn with_thresholds(mut self, thresholds: ThresholdTable) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Derive the per-catalog view of a requested component.
    pub fn query(&self, component: &str) -> ComponentQuery {
        let category_key = compact(component);
        ComponentQuery {
            original: component.to_string(),
            search_term: self.normalization.normalize(component),
            threshold: self.thresholds.classify(&category_key),
            category_key,
            listing_mode: self.normalization.listing_mode(component),
        }
    }

    pub fn resolve_component(&self, component: &str, listings: Vec<RawListing>) -> Resolution {
        self.resolve(&self.query(component), listings)
    }

    pub fn resolve(&self, query: &ComponentQuery, listings: Vec<RawListing>) -> Resolution {
        let threshold = query.threshold;
        if listings.is_empty() {
            return self.not_found(query, 0.0, MatchVia::NoListings);
        }

        let mut candidates: Vec<(RawListing, String)> = listings
            .into_iter()
            .filter(|l| !(self.skip_unnamed && l.name.trim().is_empty()))
            .map(|l| {
                let folded = query.listing_mode.apply(&l.name);
                (l, folded)
            })
            .collect();

        if let Some(i) = self.short_circuit_hit(query, &candidates) {
            let (listing, folded) = candidates.swap_remove(i);
            let score = similarity_or_zero(&query.search_term, &folded);
            return self.matched(query, listing, score, MatchVia::ShortCircuit);
        }

        let scores: Vec<f64> = candidates
            .iter()
            .map(|(_, folded)| similarity_or_zero(&query.search_term, folded))
            .collect();

        let mut best: Option<(usize, f64)> = None;
        for (i, &s) in scores.iter().enumerate() {
            if s > best.map_or(0.0, |(_, b)| b) {
                best = Some((i, s));
            }
        }
        let best_score = best.map_or(0.0, |(_, s)| s);

        match self.selection {
            Selection::BestScore => match best {
                Some((i, s)) if self.comparison.passes(s, threshold) => {
                    let (listing, _) = candidates.swap_remove(i);
                    self.matched(query, listing, s, MatchVia::Similarity)
                }
                _ => self.not_found(query, best_score, MatchVia::BelowThreshold),
            },
            Selection::Cheapest => {
                // An unpriced pick yields to any later qualifier, priced or not.
                let mut pick: Option<(usize, Option<f64>)> = None;
                for (i, &s) in scores.iter().enumerate() {
                    if s <= 0.0 || !self.comparison.passes(s, threshold) {
                        continue;
                    }
                    let price = parse_price(&candidates[i].0.price);
                    let cheaper = match (pick, price) {
                        (None, _) | (Some((_, None)), _) => true,
                        (Some((_, Some(p))), Some(c)) => c < p,
                        (Some((_, Some(_))), None) => false,
                    };
                    if cheaper {
                        pick = Some((i, price));
                    }
                }
                match pick {
                    Some((i, _)) => {
                        let s = scores[i];
                        let (listing, _) = candidates.swap_remove(i);
                        self.matched(query, listing, s, MatchVia::Cheapest)
                    }
                    None => self.not_found(query, best_score, MatchVia::BelowThreshold),
                }
            }
        }
    }

    fn short_circuit_hit(&self, query: &ComponentQuery, candidates: &[(RawListing, String)]) -> Option<usize> {
        let term = query.search_term.as_str();
        if term.is_empty() {
            return None;
        }
        match self.short_circuit {
            ShortCircuit::None => None,
            ShortCircuit::Name => candidates
                .iter()
                .position(|(_, folded)| !folded.is_empty() && folded.contains(term)),
            ShortCircuit::ShortLabel => candidates.iter().position(|(l, _)| {
                l.short_label
                    .as_deref()
                    .map(|s| TextMode::Collapse.apply(s))
                    .is_some_and(|s| !s.is_empty() && s.contains(term))
            }),
        }
    }

    fn matched(&self, query: &ComponentQuery, listing: RawListing, score: f64, via: MatchVia) -> Resolution {
        tracing::debug!(
            target: "matcher",
            site = %self.site,
            component = %query.original,
            listing = %listing.name,
            score,
            threshold = query.threshold,
            ?via,
            "listing matched"
        );
        Resolution {
            record: SiteRecord::Matched(MatchedRecord::from_listing(&self.site, listing)),
            via,
            score,
            threshold: query.threshold,
        }
    }

    fn not_found(&self, query: &ComponentQuery, score: f64, via: MatchVia) -> Resolution {
        tracing::debug!(
            target: "matcher",
            site = %self.site,
            component = %query.original,
            score,
            threshold = query.threshold,
            ?via,
            "no suitable listing"
        );
        Resolution {
            record: SiteRecord::not_found(&self.site),
            via,
            score,
            threshold: query.threshold,
        }
    }
}

/// Sørensen–Dice coefficient over character bigram multisets, whitespace ignored.
///
/// Identical inputs score 1.0; inputs shorter than two characters score 0.0.
/// Lengths are counted in characters, so Cyrillic titles score the same as
/// their Latin transliterations would.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().filter(|c| !c.is_whitespace()).collect();
    let b: Vec<char> = b.chars().filter(|c| !c.is_whitespace()).collect();
    if a == b {
        return 1.0;
    }
    if a.len() < 2 || b.len() < 2 {
        return 0.0;
    }

    let mut bigrams: HashMap<(char, char), usize> = HashMap::with_capacity(a.len());
    for w in a.windows(2) {
        *bigrams.entry((w[0], w[1])).or_insert(0) += 1;
    }
    let mut shared = 0usize;
    for w in b.windows(2) {
        if let Some(n) = bigrams.get_mut(&(w[0], w[1])) {
            if *n > 0 {
                *n -= 1;
                shared += 1;
            }
        }
    }
    (2 * shared) as f64 / (a.len() + b.len() - 2) as f64
}

// Blank text never matches anything, including another blank.
fn similarity_or_zero(term: &str, folded: &str) -> f64 {
    if term.trim().is_empty() || folded.trim().is_empty() {
        return 0.0;
    }
    similarity(term, folded)
}

/// Parse a catalog price string ("5 000 грн", "1299,50 ₴") into a number.
///
/// Keeps digits and separators, turns the first comma into a decimal point and
/// reads the longest numeric prefix. `None` when no digits remain.
pub fn parse_price(text: &str) -> Option<f64> {
    let kept: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    let kept = kept.replacen(',', ".", 1);

    let mut end = 0;
    let mut seen_dot = false;
    let mut seen_digit = false;
    for (i, c) in kept.char_indices() {
        match c {
            '0'..='9' => {
                seen_digit = true;
                end = i + 1;
            }
            '.' if !seen_dot => seen_dot = true,
            _ => break,
        }
    }
    if !seen_digit {
        return None;
    }
    kept[..end].parse::<f64>().ok()
}
