// src/fallback.rs
//! Marketplace search link appended after every component's catalog records.

use reqwest::Url;

use crate::types::{FallbackRecord, SiteRecord, NOT_FOUND_PRICE};

pub const EBAY_SITE: &str = "eBay";
pub const EBAY_SEARCH_URL: &str = "https://www.ebay.com/sch/i.html";
pub const EBAY_QUERY_PARAM: &str = "_nkw";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackLink {
    site: &'static str,
    search_url: &'static str,
    param: &'static str,
}

impl Default for FallbackLink {
    fn default() -> Self {
        Self::ebay()
    }
}

impl FallbackLink {
    pub fn ebay() -> Self {
        Self {
            site: EBAY_SITE,
            search_url: EBAY_SEARCH_URL,
            param: EBAY_QUERY_PARAM,
        }
    }

    pub fn site(&self) -> &'static str {
        self.site
    }

    /// Search URL for the component text as requested (no normalization).
    pub fn url_for(&self, component: &str) -> String {
        let mut url = Url::parse(self.search_url).expect("static fallback search url");
        url.query_pairs_mut().append_pair(self.param, component.trim());
        url.into()
    }

    pub fn record_for(&self, component: &str) -> SiteRecord {
        SiteRecord::Fallback(FallbackRecord {
            site: self.site,
            price: NOT_FOUND_PRICE,
            link: self.url_for(component),
        })
    }
}
