//! End-to-end sync tests against an in-memory catalog site

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use catalog_sync_lib::application::{SyncOrchestrator, write_category_report};
use catalog_sync_lib::domain::{ImageSize, ProductRepository};
use catalog_sync_lib::infrastructure::{
    AppConfig, DatabaseConnection, FetchError, FetchedBody, HttpFetch, SqliteProductRepository, SyncConfig,
};

const BASE_URL: &str = "https://shop.test/products";

const PAGE_ONE: &str = r#"
<html><body>
  <div class="product-card">
    <a class="card-header" href="/products/1"><h4 class="title">Alpha</h4></a>
    <p class="description">First product</p>
    <div class="price-wrapper">10,00 €</div>
    <span class="css-1pewyd6">Action</span>
    <span class="css-1pewyd6">Puzzle</span>
    <noscript><img src="/img/1.png" alt="Alpha"></noscript>
  </div>
  <div class="product-card">
    <a class="card-header" href="/products/2"><h4 class="title">Beta</h4></a>
    <p class="description">Second product</p>
    <div class="price-wrapper">25,50 €</div>
    <span class="css-1pewyd6">Action</span>
    <noscript><img src="/img/2.svg" alt="Beta"></noscript>
  </div>
</body></html>
"#;

const EMPTY_PAGE: &str = "<html><body><p>No more products</p></body></html>";

const SVG: &[u8] = br#"<svg xmlns="http://www.w3.org/2000/svg" width="4" height="4"/>"#;

#[derive(Default)]
struct MockSite {
    pages: HashMap<String, String>,
    images: HashMap<String, FetchedBody>,
    page_requests: Mutex<Vec<String>>,
    image_requests: Mutex<Vec<String>>,
}

#[async_trait]
impl HttpFetch for MockSite {
    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        self.page_requests.lock().unwrap().push(url.to_string());
        self.pages.get(url).cloned().ok_or_else(|| FetchError::Status {
            status: 404,
            url: url.to_string(),
        })
    }

    async fn get_bytes(&self, url: &str) -> Result<FetchedBody, FetchError> {
        self.image_requests.lock().unwrap().push(url.to_string());
        self.images.get(url).cloned().ok_or_else(|| FetchError::Status {
            status: 404,
            url: url.to_string(),
        })
    }
}

fn png_bytes() -> Vec<u8> {
    let img = RgbaImage::from_pixel(40, 20, Rgba([0, 128, 255, 255]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img).write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

fn png_body() -> FetchedBody {
    FetchedBody { bytes: png_bytes(), content_type: Some("image/png".to_string()) }
}

/// Single-page catalog followed by an empty page
fn site_with(page_one: &str, images: Vec<(&str, FetchedBody)>) -> MockSite {
    let mut site = MockSite::default();
    site.pages.insert(format!("{}?page=1", BASE_URL), page_one.to_string());
    site.pages.insert(format!("{}?page=2", BASE_URL), EMPTY_PAGE.to_string());
    for (url, body) in images {
        site.images.insert(url.to_string(), body);
    }
    site
}

fn mock_site() -> Arc<MockSite> {
    Arc::new(site_with(
        PAGE_ONE,
        vec![
            ("https://shop.test/img/1.png", png_body()),
            (
                "https://shop.test/img/2.svg",
                FetchedBody { bytes: SVG.to_vec(), content_type: Some("image/svg+xml".to_string()) },
            ),
        ],
    ))
}

fn sync_config(root: &Path) -> SyncConfig {
    SyncConfig {
        base_url: BASE_URL.to_string(),
        db_location: root.join("products.db"),
        raw_image_dir: root.join("raw"),
        processed_image_dir: root.join("processed"),
        image_sizes: vec![ImageSize::square(20)],
        inter_page_delay_ms: 0,
        max_retries: 1,
        ..SyncConfig::default()
    }
}

async fn sqlite_repository(config: &SyncConfig) -> Arc<SqliteProductRepository> {
    let db = DatabaseConnection::open(&config.db_location).await.unwrap();
    db.migrate().await.unwrap();
    Arc::new(SqliteProductRepository::new(db.pool().clone()))
}

#[tokio::test]
async fn full_sync_stores_products_and_generates_derivatives() {
    let dir = TempDir::new().unwrap();
    let config = sync_config(dir.path());
    let site = mock_site();
    let repo = sqlite_repository(&config).await;

    let orchestrator = SyncOrchestrator::new(config.clone(), site.clone(), repo.clone()).unwrap();
    let summary = orchestrator.run().await;

    assert_eq!(summary.pages_fetched, 2);
    assert_eq!(summary.fragments_seen, 2);
    assert_eq!(summary.records_extracted, 2);
    assert_eq!(summary.inserted, 2);
    assert_eq!(summary.parse_failures, 0);
    assert_eq!(summary.image_failures, 0);
    assert_eq!(summary.derivatives_written, 3);

    // terminates right after the first empty page
    assert_eq!(
        site.page_requests.lock().unwrap().as_slice(),
        [format!("{}?page=1", BASE_URL), format!("{}?page=2", BASE_URL)]
    );
    // one download per product, shared across its categories
    assert_eq!(site.image_requests.lock().unwrap().len(), 2);

    assert_eq!(repo.count().await.unwrap(), 2);
    let alpha = repo.find_by_id("1").await.unwrap().unwrap();
    assert_eq!(alpha.source_url, "https://shop.test/products/1");
    assert_eq!(alpha.image_url.as_deref(), Some("https://shop.test/img/1.png"));

    assert!(config.raw_image_dir.join("1_original").exists());
    assert_eq!(std::fs::read(config.raw_image_dir.join("2.svg")).unwrap(), SVG);

    let processed = &config.processed_image_dir;
    for name in ["Action_1_20x20.jpg", "Puzzle_1_20x20.jpg"] {
        let derivative = image::open(processed.join(name)).unwrap();
        assert_eq!((derivative.width(), derivative.height()), (20, 20), "{}", name);
    }
    assert_eq!(std::fs::read(processed.join("Action_2.svg")).unwrap(), SVG);
}

#[tokio::test]
async fn second_pass_over_unchanged_catalog_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let config = sync_config(dir.path());
    let site = mock_site();
    let repo = sqlite_repository(&config).await;
    let orchestrator = SyncOrchestrator::new(config, site.clone(), repo.clone()).unwrap();

    orchestrator.run().await;
    let before = repo.find_by_id("2").await.unwrap().unwrap();
    let second = orchestrator.run().await;

    assert_eq!(second.skipped, 2);
    assert_eq!(second.writes(), 0);
    assert_eq!(second.derivatives_written, 0);
    assert_eq!(site.image_requests.lock().unwrap().len(), 2);
    assert_eq!(repo.find_by_id("2").await.unwrap().unwrap().updated_at, before.updated_at);
}

#[tokio::test]
async fn image_change_regenerates_derivatives_but_price_change_does_not() {
    let dir = TempDir::new().unwrap();
    let config = sync_config(dir.path());
    let repo = sqlite_repository(&config).await;
    SyncOrchestrator::new(config.clone(), mock_site(), repo.clone()).unwrap().run().await;

    // Alpha moves to a new image, Beta only changes price
    let changed_page = PAGE_ONE.replace("/img/1.png", "/img/1b.png").replace("25,50 €", "30,00 €");
    let site = Arc::new(site_with(&changed_page, vec![("https://shop.test/img/1b.png", png_body())]));

    let summary = SyncOrchestrator::new(config.clone(), site.clone(), repo.clone()).unwrap().run().await;

    assert_eq!(summary.updated, 2);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.derivatives_written, 2);
    assert_eq!(
        site.image_requests.lock().unwrap().as_slice(),
        ["https://shop.test/img/1b.png".to_string()]
    );

    let alpha = repo.find_by_id("1").await.unwrap().unwrap();
    assert_eq!(alpha.image_url.as_deref(), Some("https://shop.test/img/1b.png"));
    let beta = repo.find_by_id("2").await.unwrap().unwrap();
    assert!((beta.price - 30.0).abs() < 1e-9);
}

const MIXED_PAGE: &str = r#"
<html><body>
  <div class="product-card">
    <a class="card-header" href="/products/10"><h4 class="title">Good</h4></a>
    <div class="price-wrapper">10,00 €</div>
    <span class="css-1pewyd6">Action</span>
    <noscript><img src="/img/10.png"></noscript>
  </div>
  <div class="product-card">
    <a class="card-header" href="/products/11"><h4 class="title">No Price</h4></a>
    <div class="price-wrapper">Ask for price</div>
    <span class="css-1pewyd6">Action</span>
  </div>
  <div class="product-card">
    <h4 class="title">No Link</h4>
    <div class="price-wrapper">5,00 €</div>
    <span class="css-1pewyd6">Action</span>
  </div>
  <div class="product-card">
    <a class="card-header" href="/products/12"><h4 class="title">Lost Image</h4></a>
    <div class="price-wrapper">7,00 €</div>
    <span class="css-1pewyd6">Action</span>
    <noscript><img src="/img/missing.png"></noscript>
  </div>
  <div class="product-card">
    <a class="card-header" href="/products/13"><h4 class="title">Broken Image</h4></a>
    <div class="price-wrapper">8,00 €</div>
    <span class="css-1pewyd6">Action</span>
    <span class="css-1pewyd6">Puzzle</span>
    <noscript><img src="/img/13.png"></noscript>
  </div>
</body></html>
"#;

#[tokio::test]
async fn failing_cards_and_images_do_not_stop_the_run() {
    let dir = TempDir::new().unwrap();
    let config = sync_config(dir.path());
    let repo = sqlite_repository(&config).await;
    let site = Arc::new(site_with(
        MIXED_PAGE,
        vec![
            ("https://shop.test/img/10.png", png_body()),
            (
                "https://shop.test/img/13.png",
                FetchedBody { bytes: b"not an image".to_vec(), content_type: Some("image/png".to_string()) },
            ),
        ],
    ));

    let summary = SyncOrchestrator::new(config.clone(), site.clone(), repo.clone()).unwrap().run().await;

    assert_eq!(summary.pages_fetched, 2);
    assert_eq!(summary.fragments_seen, 5);
    assert_eq!(summary.parse_failures, 1);
    assert_eq!(summary.store_failures, 1);
    assert_eq!(summary.inserted, 3);
    // missing download, plus one undecodable source counted once across its two categories
    assert_eq!(summary.image_failures, 2);
    assert_eq!(summary.derivatives_written, 1);

    assert_eq!(repo.count().await.unwrap(), 3);
    assert!(repo.find_by_id("11").await.unwrap().is_none());
    assert!(repo.find_by_id("12").await.unwrap().is_some());
    assert!(config.processed_image_dir.join("Action_10_20x20.jpg").exists());
}

#[tokio::test]
async fn rejected_configuration_leaves_no_database_behind() {
    let dir = TempDir::new().unwrap();
    let mut config = AppConfig::default();
    config.sync = sync_config(dir.path());
    config.sync.request_headers.insert("Bad Header".to_string(), "x".to_string());

    assert!(catalog_sync_lib::run_sync(&config).await.is_err());
    assert!(!config.sync.db_location.exists());

    config.sync.request_headers.remove("Bad Header");
    config.sync.selectors.price = "div[".to_string();

    assert!(catalog_sync_lib::run_sync(&config).await.is_err());
    assert!(!config.sync.db_location.exists());
}

#[tokio::test]
async fn report_lists_products_per_category_by_price() {
    let dir = TempDir::new().unwrap();
    let config = sync_config(dir.path());
    let repo = sqlite_repository(&config).await;
    SyncOrchestrator::new(config, mock_site(), repo.clone()).unwrap().run().await;

    let mut out = Vec::new();
    let sections = write_category_report(repo.as_ref(), &mut out, false).await.unwrap();
    let report = String::from_utf8(out).unwrap();

    assert_eq!(sections, 2);
    let action = report.find("Products in category: Action").unwrap();
    let puzzle = report.find("Products in category: Puzzle").unwrap();
    let action_section = &report[action..puzzle];
    let beta = action_section.find("2,Beta").unwrap();
    let alpha = action_section.find("1,Alpha").unwrap();
    assert!(beta < alpha, "higher price first");
    assert!(report[puzzle..].contains("1,Alpha,First product,10.00"));
    assert!(!report[puzzle..].contains("Beta"));
}

#[tokio::test]
async fn unreachable_first_page_ends_sync_cleanly() {
    let dir = TempDir::new().unwrap();
    let config = sync_config(dir.path());
    let repo = sqlite_repository(&config).await;
    let site = Arc::new(MockSite::default());

    let summary = SyncOrchestrator::new(config, site, repo.clone()).unwrap().run().await;

    assert_eq!(summary.pages_fetched, 1);
    assert_eq!(summary.fragments_seen, 0);
    assert_eq!(repo.count().await.unwrap(), 0);
}

#[tokio::test]
async fn existing_database_skips_sync() {
    let dir = TempDir::new().unwrap();
    let mut config = AppConfig::default();
    config.sync = sync_config(dir.path());
    std::fs::write(&config.sync.db_location, b"").unwrap();

    let outcome = catalog_sync_lib::run_sync(&config).await.unwrap();
    assert!(outcome.is_none());
}
