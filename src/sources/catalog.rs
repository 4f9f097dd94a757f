// src/sources/catalog.rs
//! The catalogs we know how to query, with their per-site calibration.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::matcher::{Comparison, MatchPolicy, Selection, ShortCircuit};
use crate::normalize::{Normalization, TextMode};
use crate::thresholds::ThresholdTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Catalog {
    Prom,
    HardKiev,
    #[serde(rename = "Server-Shop")]
    ServerShop,
    Servak,
    Kyivtech,
    #[serde(rename = "HWF")]
    Hwf,
    ServerParts,
}

impl Catalog {
    /// Registry order; also the per-component result order.
    pub const ALL: [Catalog; 7] = [
        Catalog::Prom,
        Catalog::HardKiev,
        Catalog::ServerShop,
        Catalog::Servak,
        Catalog::Kyivtech,
        Catalog::Hwf,
        Catalog::ServerParts,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Catalog::Prom => "Prom",
            Catalog::HardKiev => "HardKiev",
            Catalog::ServerShop => "Server-Shop",
            Catalog::Servak => "Servak",
            Catalog::Kyivtech => "Kyivtech",
            Catalog::Hwf => "HWF",
            Catalog::ServerParts => "ServerParts",
        }
    }

    /// Case-insensitive lookup by site name; dashes are optional.
    pub fn from_name(name: &str) -> Option<Self> {
        let wanted = name.trim().replace('-', "").to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.name().replace('-', "").to_ascii_lowercase() == wanted)
    }

    pub fn time_budget(self) -> Duration {
        match self {
            Catalog::Prom => Duration::from_secs(12),
            Catalog::Servak => Duration::from_secs(8),
            Catalog::Hwf => Duration::from_millis(6500),
            Catalog::Kyivtech => Duration::from_secs(4),
            Catalog::HardKiev | Catalog::ServerShop | Catalog::ServerParts => {
                Duration::from_secs(5)
            }
        }
    }

    /// Text a catalog prints when the search matched nothing.
    pub fn no_results_marker(self) -> Option<&'static str> {
        match self {
            Catalog::Kyivtech => Some("Немає товарів, що відповідали б критеріям пошуку"),
            _ => None,
        }
    }

    pub fn extra_headers(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Catalog::ServerParts => &[("Cache-Control", "no-cache")],
            _ => &[],
        }
    }

    fn search_base(self) -> (&'static str, &'static str) {
        match self {
            Catalog::Prom => ("https://prom.ua/ua/search", "search_term"),
            Catalog::HardKiev => ("https://hard.kiev.ua/search/", "query"),
            Catalog::ServerShop => ("https://server-shop.ua/ua/search.html", "query"),
            Catalog::Servak => ("https://servak.com.ua/ua/search/", "search"),
            Catalog::Kyivtech => ("https://kyivtech.com.ua/search/", "search"),
            Catalog::Hwf => ("https://hwf.com.ua/katalog/search/", "q"),
            Catalog::ServerParts => ("https://serverparts.com.ua/search/", "search"),
        }
    }

    fn fixed_params(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Catalog::Prom => &[("a10006", "83770"), ("binary_filters", "presence_available")],
            Catalog::Servak => &[("limit", "25")],
            _ => &[],
        }
    }

    /// Search page URL for a requested component.
    pub fn query_url(self, component: &str) -> String {
        let (base, param) = self.search_base();
        let term = self.default_policy().normalization.url_term(component);
        let mut url = Url::parse(base).expect("static catalog search url");
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair(param, &term);
            for (k, v) in self.fixed_params() {
                pairs.append_pair(k, v);
            }
        }
        url.into()
    }

    pub fn default_thresholds(self) -> ThresholdTable {
        match self {
            Catalog::Prom => ThresholdTable::new(0.75)
                .with("процесор", 0.89)
                .with("відеокарта", 0.95)
                .with("сервер", 0.9)
                .with("оперативна пам'ять", 0.89)
                .with("накопичувач", 0.75)
                .with("жорсткий диск", 0.75)
                .with("накопичувач ssd", 0.75)
                .with("материнська плата", 0.89),
            Catalog::Servak => ThresholdTable::new(0.65)
                .with("процесор", 0.97)
                .with("відеокарта", 0.95)
                .with("сервер", 0.88)
                .with("оперативна пам'ять", 0.48)
                .with("накопичувач", 0.7)
                .with("жорсткий диск", 0.6)
                .with("накопичувач ssd", 0.6)
                .with("материнська плата", 0.85),
            Catalog::Kyivtech => ThresholdTable::new(0.4)
                .with("процесор", 0.96)
                .with("відеокарта", 0.88)
                .with("сервер", 0.9)
                .with("оперативна пам'ять", 0.65)
                .with("накопичувач ssd", 0.58)
                .with("робоча станція", 0.85),
            Catalog::HardKiev | Catalog::ServerShop => ThresholdTable::new(0.4),
            Catalog::Hwf => ThresholdTable::new(0.72),
            Catalog::ServerParts => ThresholdTable::new(0.35),
        }
    }

    pub fn default_policy(self) -> MatchPolicy {
        let compact = Normalization::StripParens {
            mode: TextMode::Compact,
        };
        let base = |n: Normalization| MatchPolicy::new(self.name(), n, self.default_thresholds());
        match self {
            Catalog::Prom => base(compact)
                .comparison(Comparison::AtLeast)
                .selection(Selection::Cheapest),
            Catalog::HardKiev => base(Normalization::extract_or_strip()).short_circuit(ShortCircuit::Name),
            Catalog::ServerShop => {
                base(Normalization::extract_or_strip()).short_circuit(ShortCircuit::ShortLabel)
            }
            Catalog::Servak => base(compact).comparison(Comparison::AtLeast),
            Catalog::Kyivtech => base(compact)
                .comparison(Comparison::AtLeast)
                .skip_unnamed(true),
            Catalog::Hwf => base(Normalization::keep_parens_for_gpus()),
            Catalog::ServerParts => base(Normalization::LowercaseOnly),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_lookup() {
        for c in Catalog::ALL {
            assert_eq!(Catalog::from_name(c.name()), Some(c));
        }
        assert_eq!(Catalog::from_name("server-shop"), Some(Catalog::ServerShop));
        assert_eq!(Catalog::from_name("SERVERSHOP"), Some(Catalog::ServerShop));
        assert_eq!(Catalog::from_name("hwf"), Some(Catalog::Hwf));
        assert_eq!(Catalog::from_name("ebay"), None);
    }

    #[test]
    fn budgets_stay_within_reference_range() {
        for c in Catalog::ALL {
            let b = c.time_budget();
            assert!(b >= Duration::from_secs(4) && b <= Duration::from_secs(12), "{c:?}");
        }
    }

    #[test]
    fn prom_url_strips_parentheticals_and_keeps_filters() {
        let url = Catalog::Prom.query_url("Процесор Intel (BOX) i5-10400");
        let parsed = Url::parse(&url).unwrap();
        let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("search_term".into(), "Процесор Intel i5-10400".into()));
        assert_eq!(pairs[1], ("a10006".into(), "83770".into()));
        assert_eq!(pairs[2], ("binary_filters".into(), "presence_available".into()));
        assert!(url.starts_with("https://prom.ua/ua/search?"));
    }

    #[test]
    fn hardkiev_url_searches_by_extracted_term() {
        let url = Catalog::HardKiev.query_url("Оперативна пам'ять DDR4 (16GB 3200MHz)");
        let parsed = Url::parse(&url).unwrap();
        let term = parsed
            .query_pairs()
            .find(|(k, _)| k == "query")
            .map(|(_, v)| v.into_owned());
        assert_eq!(term.as_deref(), Some("16gb 3200mhz"));
    }

    #[test]
    fn serverparts_url_uses_raw_component() {
        let url = Catalog::ServerParts.query_url("HPE (P00924-B21)");
        let parsed = Url::parse(&url).unwrap();
        let term = parsed.query_pairs().next().map(|(_, v)| v.into_owned());
        assert_eq!(term.as_deref(), Some("HPE (P00924-B21)"));
    }

    #[test]
    fn hwf_url_keeps_gpu_parentheses() {
        let url = Catalog::Hwf.query_url("Відеокарта RTX 4070 (12GB)");
        let parsed = Url::parse(&url).unwrap();
        let term = parsed.query_pairs().next().map(|(_, v)| v.into_owned());
        assert_eq!(term.as_deref(), Some("Відеокарта RTX 4070 (12GB)"));
    }

    #[test]
    fn only_kyivtech_declares_no_results_page() {
        assert!(Catalog::Kyivtech.no_results_marker().is_some());
        assert!(Catalog::ALL
            .iter()
            .filter(|c| **c != Catalog::Kyivtech)
            .all(|c| c.no_results_marker().is_none()));
    }
}
