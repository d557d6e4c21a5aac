//! Product card parser
//!
//! Extracts one [`ProductRecord`] from one listing card fragment. Missing
//! optional markup degrades the record instead of failing it; only a missing
//! card container or an unparsable price drops the record.

#![allow(clippy::uninlined_format_args)]

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

use super::config::ExtractionSelectors;
use super::error::{ParsingError, ParsingResult};
use super::price::normalize_price;
use super::compile_selector;
use crate::domain::product::ProductRecord;
use crate::infrastructure::config::SyncConfig;

/// Raw price text used when the price element is absent
const MISSING_PRICE_TEXT: &str = "0";

/// Raw text, then its entity-decoded form
const NOSCRIPT_DECODE_PASSES: usize = 2;

/// Parser for single listing cards
pub struct ProductCardParser {
    base_url: String,
    site_origin: Url,
    card_selector_text: String,
    card: Selector,
    link: Selector,
    name: Selector,
    description: Selector,
    price: Selector,
    category: Selector,
    noscript: Selector,
    image: Selector,
}

impl ProductCardParser {
    /// Create a parser with custom selector configuration
    pub fn new(base_url: &str, site_origin: Url, selectors: &ExtractionSelectors) -> ParsingResult<Self> {
        Ok(Self {
            base_url: base_url.to_string(),
            site_origin,
            card_selector_text: selectors.product_card.clone(),
            card: compile_selector(&selectors.product_card)?,
            link: compile_selector(&selectors.product_link)?,
            name: compile_selector(&selectors.name)?,
            description: compile_selector(&selectors.description)?,
            price: compile_selector(&selectors.price)?,
            category: compile_selector(&selectors.category)?,
            noscript: compile_selector(&selectors.noscript)?,
            image: compile_selector(&selectors.image)?,
        })
    }

    pub fn from_config(config: &SyncConfig) -> ParsingResult<Self> {
        let origin = config
            .resolved_site_origin()
            .map_err(|e| ParsingError::UrlResolutionFailed {
                url: config.base_url.clone(),
                reason: e.to_string(),
            })?;
        Self::new(&config.base_url, origin, &config.selectors)
    }

    /// Extract a normalized record from one card's markup.
    pub fn extract(&self, fragment_html: &str) -> ParsingResult<ProductRecord> {
        let document = Html::parse_fragment(fragment_html);
        let card = document.select(&self.card).next().ok_or_else(|| {
            ParsingError::structure_missing(&self.card_selector_text, "listing card container not found in fragment")
        })?;

        let id = self.extract_id(&card);
        if id.is_none() {
            warn!("Listing card has no usable detail link; record has no identity");
        }

        let name = first_text(&card, &self.name).unwrap_or_default();
        let description = first_text(&card, &self.description).unwrap_or_default();

        let price_text = first_text(&card, &self.price).unwrap_or_else(|| {
            warn!(
                "Price element missing for product {}; defaulting to {}",
                id.as_deref().unwrap_or("<none>"),
                MISSING_PRICE_TEXT
            );
            MISSING_PRICE_TEXT.to_string()
        });
        let price = normalize_price(&price_text)?;

        let categories = self.extract_categories(&card);
        let image_url = self
            .extract_image_src(&card)
            .and_then(|src| self.resolve_image_url(&src));

        let source_url = ProductRecord::source_url_for(&self.base_url, id.as_deref());

        debug!(
            "Extracted product {} ({} categories, image: {})",
            id.as_deref().unwrap_or("<none>"),
            categories.len(),
            image_url.is_some()
        );

        Ok(ProductRecord {
            id,
            name,
            description,
            price,
            image_url,
            sale_price: None,
            out_of_stock: false,
            categories,
            source_url,
            created_at: None,
            updated_at: None,
        })
    }

    /// Last path segment of the detail link, ignoring query and fragment
    fn extract_id(&self, card: &ElementRef) -> Option<String> {
        let href = card.select(&self.link).next()?.value().attr("href")?;
        let path = href.split(['?', '#']).next().unwrap_or(href).trim();
        let segment = path.rsplit('/').next()?.trim();
        (!segment.is_empty()).then(|| segment.to_string())
    }

    /// All category labels, trimmed, without blanks or repeats
    fn extract_categories(&self, card: &ElementRef) -> Vec<String> {
        let mut categories: Vec<String> = Vec::new();
        for label in card.select(&self.category) {
            let text = element_text(&label);
            if !text.is_empty() && !categories.contains(&text) {
                categories.push(text);
            }
        }
        categories
    }

    /// Image `src` from the script-free fallback.
    ///
    /// With scripting enabled the HTML5 parser keeps `<noscript>` content as
    /// raw text, so the element lookup usually finds nothing and the text is
    /// parsed again as its own fragment. A card that was serialized back to
    /// markup carries that text entity-escaped (`&lt;img ...&gt;`), which
    /// takes one more decoding pass.
    fn extract_image_src(&self, card: &ElementRef) -> Option<String> {
        for noscript in card.select(&self.noscript) {
            if let Some(src) = noscript.select(&self.image).find_map(|img| img_src(&img)) {
                return Some(src);
            }

            let mut raw: String = noscript.text().collect();
            for _ in 0..NOSCRIPT_DECODE_PASSES {
                let fallback = Html::parse_fragment(&raw);
                if let Some(src) = fallback.select(&self.image).find_map(|img| img_src(&img)) {
                    return Some(src);
                }
                let decoded: String = fallback.root_element().text().collect();
                if decoded == raw {
                    break;
                }
                raw = decoded;
            }
        }
        None
    }

    fn resolve_image_url(&self, src: &str) -> Option<String> {
        match self.site_origin.join(src) {
            Ok(url) => Some(url.to_string()),
            Err(e) => {
                warn!("Dropping image reference '{}': {}", src, e);
                None
            }
        }
    }
}

fn img_src(img: &ElementRef) -> Option<String> {
    img.value()
        .attr("src")
        .map(str::trim)
        .filter(|src| !src.is_empty())
        .map(ToString::to_string)
}

fn element_text(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn first_text(card: &ElementRef, selector: &Selector) -> Option<String> {
    card.select(selector).next().map(|e| element_text(&e))
}
