//! Sync orchestrator
//!
//! Drives pagination from page 1 until a page yields no cards. Each card is
//! extracted, stored through the change-aware store, and, when the store
//! reports new or moved image references, turned into image derivatives.

#![allow(clippy::uninlined_format_args)]

use std::sync::Arc;
use std::time::Instant;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::application::change_aware_store::ChangeAwareStore;
use crate::domain::product::{Fragment, ProductRecord};
use crate::domain::repositories::ProductRepository;
use crate::domain::sync_summary::SyncSummary;
use crate::infrastructure::config::SyncConfig;
use crate::infrastructure::http_client::HttpFetch;
use crate::infrastructure::image_processor::{ImageDerivativeGenerator, ImageDownloader};
use crate::infrastructure::page_fetcher::PageFetcher;
use crate::infrastructure::parsing::{ParsingResult, ProductCardParser};

pub struct SyncOrchestrator {
    config: SyncConfig,
    fetcher: PageFetcher,
    parser: ProductCardParser,
    store: ChangeAwareStore,
    downloader: ImageDownloader,
    generator: ImageDerivativeGenerator,
}

impl SyncOrchestrator {
    /// Wire the pipeline from configuration and its two collaborators.
    ///
    /// Fails only on unusable selector or origin configuration.
    pub fn new(
        config: SyncConfig,
        http: Arc<dyn HttpFetch>,
        repo: Arc<dyn ProductRepository>,
    ) -> ParsingResult<Self> {
        let fetcher = PageFetcher::new(http.clone(), &config)?;
        let parser = ProductCardParser::from_config(&config)?;
        let downloader = ImageDownloader::new(http, config.raw_image_dir.clone());
        let generator = ImageDerivativeGenerator::new(config.processed_image_dir.clone(), config.jpeg_quality);

        Ok(Self {
            fetcher,
            parser,
            store: ChangeAwareStore::new(repo),
            downloader,
            generator,
            config,
        })
    }

    /// Run one full synchronization pass.
    pub async fn run(&self) -> SyncSummary {
        let started = Instant::now();
        let mut summary = SyncSummary::default();
        let mut page = 1;

        info!("🚀 Starting catalog sync from {}", self.config.base_url);
        loop {
            let fragments = self.fetcher.fetch_page(page).await;
            summary.pages_fetched += 1;

            if fragments.is_empty() {
                info!("🏁 Page {} is empty, pagination finished", page);
                break;
            }

            for fragment in &fragments {
                self.process_fragment(fragment, &mut summary).await;
            }

            let delay = self.config.inter_page_delay();
            if !delay.is_zero() {
                debug!("Waiting {:?} before page {}", delay, page + 1);
                sleep(delay).await;
            }
            page += 1;
        }

        info!("✅ Sync finished in {:.2?}: {}", started.elapsed(), summary);
        summary
    }

    async fn process_fragment(&self, fragment: &Fragment, summary: &mut SyncSummary) {
        summary.fragments_seen += 1;

        let record = match self.parser.extract(&fragment.html) {
            Ok(record) => record,
            Err(e) => {
                warn!(
                    "⚠️ Skipping card {} on page {} ({}): {}",
                    fragment.index,
                    fragment.page,
                    e.reason(),
                    e
                );
                summary.parse_failures += 1;
                return;
            }
        };
        summary.records_extracted += 1;

        let action = self.store.upsert(&record).await;
        summary.record_action(action);
        debug!("Product {}: {:?}", record.display_id(), action);

        if action.needs_image_work() {
            self.generate_derivatives(&record, summary).await;
        }
    }

    /// Download once, then derive once per category.
    async fn generate_derivatives(&self, record: &ProductRecord, summary: &mut SyncSummary) {
        let (Some(product_id), Some(image_url)) = (record.id.as_deref(), record.image_url.as_deref()) else {
            return;
        };
        if record.categories.is_empty() {
            debug!("Product {} has no categories, no derivatives", product_id);
            return;
        }

        let body = match self.downloader.download(image_url, product_id).await {
            Ok(body) => body,
            Err(e) => {
                error!("❌ Image download failed for product {}: {}", product_id, e);
                summary.image_failures += 1;
                return;
            }
        };

        let bytes = Arc::new(body.bytes);
        let content_type = body.content_type;
        for category in &record.categories {
            let generator = self.generator.clone();
            let bytes = Arc::clone(&bytes);
            let content_type = content_type.clone();
            let category = category.clone();
            let product_id = product_id.to_string();
            let sizes = self.config.image_sizes.clone();

            let outcome = tokio::task::spawn_blocking(move || {
                generator.derive(&bytes, content_type.as_deref(), &category, &product_id, &sizes)
            })
            .await;

            match outcome {
                Ok(Ok(derivation)) => {
                    summary.derivatives_written += derivation.written();
                    summary.image_failures += derivation.failures();
                }
                // Every category derives from the same source bytes, so a
                // source-level failure is counted once and ends the image.
                Ok(Err(e)) => {
                    error!("❌ Image processing failed for product {}: {}", record.display_id(), e);
                    summary.image_failures += 1;
                    break;
                }
                Err(e) => {
                    error!("❌ Image task for product {} did not complete: {}", record.display_id(), e);
                    summary.image_failures += 1;
                    break;
                }
            }
        }
    }
}
