//! Listing page fetcher
//!
//! Turns one listing page into its product card fragments. Fetch failures
//! are logged and reported as an empty page, which ends pagination.

#![allow(clippy::uninlined_format_args)]

use scraper::{Html, Selector};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::domain::product::Fragment;
use crate::infrastructure::config::SyncConfig;
use crate::infrastructure::http_client::HttpFetch;
use crate::infrastructure::parsing::{ParsingResult, compile_selector};

pub struct PageFetcher {
    http: Arc<dyn HttpFetch>,
    base_url: String,
    card: Selector,
}

impl PageFetcher {
    pub fn new(http: Arc<dyn HttpFetch>, config: &SyncConfig) -> ParsingResult<Self> {
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            card: compile_selector(&config.selectors.product_card)?,
        })
    }

    fn page_url(&self, page: u32) -> String {
        format!("{}?page={}", self.base_url, page)
    }

    /// Fetch page `page` (1-based) and return its cards in document order.
    ///
    /// Any transport or status failure yields an empty list.
    pub async fn fetch_page(&self, page: u32) -> Vec<Fragment> {
        let url = self.page_url(page);
        debug!("Fetching listing page {}: {}", page, url);

        let html = match self.http.get_text(&url).await {
            Ok(html) => html,
            Err(e) => {
                error!("❌ Failed to fetch page {}: {}", page, e);
                return Vec::new();
            }
        };

        let fragments = self.split_cards(&html, page);
        info!("📄 Page {}: found {} product card(s)", page, fragments.len());
        fragments
    }

    fn split_cards(&self, html: &str, page: u32) -> Vec<Fragment> {
        let document = Html::parse_document(html);
        document
            .select(&self.card)
            .enumerate()
            .map(|(index, card)| Fragment::new(card.html(), page, index))
            .collect()
    }
}
