// src/types.rs
use serde::{Deserialize, Serialize};

// Sentinel texts, kept identical to what the catalogs' front end expects.
pub const NOT_FOUND_NAME: &str = "Товар не знайдено";
pub const NOT_FOUND_PRICE: &str = "Ціна не знайдена";
pub const NOT_FOUND_LINK: &str = "Посилання не знайдено";
pub const NOT_FOUND_AVAILABILITY: &str = "Немає даних";
pub const AVAILABILITY_UNSPECIFIED: &str = "Наявність не вказана";

fn default_price() -> String {
    NOT_FOUND_PRICE.to_string()
}

fn default_link() -> String {
    NOT_FOUND_LINK.to_string()
}

fn default_availability() -> String {
    AVAILABILITY_UNSPECIFIED.to_string()
}

/// One item as extracted from a catalog search page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawListing {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_price")]
    pub price: String,
    #[serde(default = "default_link")]
    pub link: String,
    #[serde(default = "default_availability")]
    pub availability: String,
    /// Secondary caption printed under the title (part number / SKU line).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_label: Option<String>,
}

impl RawListing {
    pub fn new(name: impl Into<String>, price: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            price: price.into(),
            link: default_link(),
            availability: default_availability(),
            short_label: None,
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = link.into();
        self
    }

    pub fn with_availability(mut self, availability: impl Into<String>) -> Self {
        self.availability = availability.into();
        self
    }

    pub fn with_short_label(mut self, label: impl Into<String>) -> Self {
        self.short_label = Some(label.into());
        self
    }
}

/// A listing promoted to the answer for one (component, site) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedRecord {
    pub site: String,
    pub name: String,
    pub price: String,
    pub link: String,
    pub availability: String,
}

impl MatchedRecord {
    pub fn from_listing(site: &str, listing: RawListing) -> Self {
        Self {
            site: site.to_string(),
            name: listing.name,
            price: listing.price,
            link: listing.link,
            availability: listing.availability,
        }
    }
}

/// Placeholder for "fetched fine, nothing acceptable". Serializes with the
/// same shape as [`MatchedRecord`] so consumers can render both uniformly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotFoundRecord {
    pub site: String,
    pub name: &'static str,
    pub price: &'static str,
    pub link: &'static str,
    pub availability: &'static str,
}

impl NotFoundRecord {
    pub fn for_site(site: &str) -> Self {
        Self {
            site: site.to_string(),
            name: NOT_FOUND_NAME,
            price: NOT_FOUND_PRICE,
            link: NOT_FOUND_LINK,
            availability: NOT_FOUND_AVAILABILITY,
        }
    }
}

/// Search link on a marketplace that is never scraped, appended after the
/// catalog records when enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FallbackRecord {
    pub site: &'static str,
    pub price: &'static str,
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SiteRecord {
    Matched(MatchedRecord),
    NotFound(NotFoundRecord),
    Fallback(FallbackRecord),
}

impl SiteRecord {
    pub fn not_found(site: &str) -> Self {
        Self::NotFound(NotFoundRecord::for_site(site))
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Matched(_))
    }

    pub fn site(&self) -> &str {
        match self {
            Self::Matched(m) => &m.site,
            Self::NotFound(n) => &n.site,
            Self::Fallback(f) => f.site,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Matched(m) => &m.name,
            Self::NotFound(n) => n.name,
            Self::Fallback(_) => NOT_FOUND_NAME,
        }
    }

    pub fn price(&self) -> &str {
        match self {
            Self::Matched(m) => &m.price,
            Self::NotFound(n) => n.price,
            Self::Fallback(f) => f.price,
        }
    }

    pub fn link(&self) -> &str {
        match self {
            Self::Matched(m) => &m.link,
            Self::NotFound(n) => n.link,
            Self::Fallback(f) => &f.link,
        }
    }

    pub fn availability(&self) -> &str {
        match self {
            Self::Matched(m) => &m.availability,
            Self::NotFound(n) => n.availability,
            Self::Fallback(_) => NOT_FOUND_AVAILABILITY,
        }
    }
}

/// A requested component as seen by one catalog: the original text, the
/// search term derived from it, and the threshold its category demands.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentQuery {
    pub original: String,
    pub search_term: String,
    /// Lowercase, spaceless form used for category prefix lookup.
    pub category_key: String,
    pub threshold: f64,
    #[serde(skip)]
    pub listing_mode: crate::normalize::TextMode,
}
