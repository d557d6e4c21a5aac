//! Parsing configuration for HTML extraction
//!
//! Centralized configuration for the CSS selectors used on listing pages.

use serde::{Deserialize, Serialize};

/// CSS selectors for product listing cards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionSelectors {
    /// One match per product on a listing page
    pub product_card: String,

    /// Detail link; the last `href` path segment is the product id
    pub product_link: String,

    pub name: String,

    pub description: String,

    pub price: String,

    /// Every match is one category label
    pub category: String,

    /// Element holding the script-free image fallback
    pub noscript: String,

    /// Image inside the fallback
    pub image: String,
}

impl Default for ExtractionSelectors {
    fn default() -> Self {
        Self {
            product_card: "div.product-card".to_string(),
            product_link: "a.card-header".to_string(),
            name: "h4.title".to_string(),
            description: "p.description".to_string(),
            price: "div.price-wrapper".to_string(),
            category: "span.css-1pewyd6".to_string(),
            noscript: "noscript".to_string(),
            image: "img".to_string(),
        }
    }
}

impl ExtractionSelectors {
    /// Every configured selector, card container first
    pub fn all(&self) -> [&str; 8] {
        [
            &self.product_card,
            &self.product_link,
            &self.name,
            &self.description,
            &self.price,
            &self.category,
            &self.noscript,
            &self.image,
        ]
    }
}
