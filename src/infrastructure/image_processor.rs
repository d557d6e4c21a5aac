//! Product image download and derivative generation
//!
//! Raster sources are fitted (downscale only) onto opaque white canvases of
//! the configured sizes and written as JPEG. Vector sources are copied
//! through unchanged.

#![allow(clippy::uninlined_format_args)]

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageReader, Rgba, RgbaImage};
use std::fs;
use std::io::{BufWriter, Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::product::ImageSize;
use crate::infrastructure::http_client::{FetchError, FetchedBody, HttpFetch};

const UTF8_BOM: &str = "\u{feff}";
const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Failed to download image {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("Failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("Failed to encode {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ImageError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Files produced by one derivation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Derivation {
    /// Vector source copied unchanged
    Passthrough(PathBuf),
    /// One JPEG per size that succeeded; `failures` counts the sizes that did not
    Rasterized { artifacts: Vec<PathBuf>, failures: usize },
}

impl Derivation {
    pub fn written(&self) -> usize {
        match self {
            Self::Passthrough(_) => 1,
            Self::Rasterized { artifacts, .. } => artifacts.len(),
        }
    }

    pub const fn failures(&self) -> usize {
        match self {
            Self::Passthrough(_) => 0,
            Self::Rasterized { failures, .. } => *failures,
        }
    }
}

/// Reduce a string to a safe filename component.
///
/// Trims, maps space, `/`, `\` and `:` to `_`, then keeps only ASCII
/// alphanumerics, `_` and `-`.
pub fn sanitize_filename(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| if matches!(c, ' ' | '/' | '\\' | ':') { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
        .collect()
}

/// Vector sources are recognized by content type or by their leading markup
pub fn is_vector(bytes: &[u8], content_type: Option<&str>) -> bool {
    if content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("svg")) {
        return true;
    }
    let head = &bytes[..bytes.len().min(512)];
    let text = String::from_utf8_lossy(head);
    let text = text.trim_start_matches(UTF8_BOM).trim_start();
    text.starts_with("<?xml") || text.starts_with("<svg")
}

/// Generates fixed-size derivatives into one output directory
#[derive(Debug, Clone)]
pub struct ImageDerivativeGenerator {
    output_dir: PathBuf,
    jpeg_quality: u8,
}

impl ImageDerivativeGenerator {
    pub fn new(output_dir: impl Into<PathBuf>, jpeg_quality: u8) -> Self {
        Self {
            output_dir: output_dir.into(),
            jpeg_quality,
        }
    }

    /// Produce all derivatives of one source image for one category.
    ///
    /// Blocking; run it off the async executor.
    pub fn derive(
        &self,
        bytes: &[u8],
        content_type: Option<&str>,
        category: &str,
        product_id: &str,
        sizes: &[ImageSize],
    ) -> Result<Derivation, ImageError> {
        fs::create_dir_all(&self.output_dir).map_err(|e| ImageError::io(&self.output_dir, e))?;
        let stem = format!("{}_{}", sanitize_filename(category), sanitize_filename(product_id));

        if is_vector(bytes, content_type) {
            let path = self.output_dir.join(format!("{}.svg", stem));
            fs::write(&path, bytes).map_err(|e| ImageError::io(&path, e))?;
            info!("🖼️ Copied vector image to {}", path.display());
            return Ok(Derivation::Passthrough(path));
        }

        let source = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| ImageError::Decode(image::ImageError::IoError(e)))?
            .decode()
            .map_err(ImageError::Decode)?;
        let rgba = source.to_rgba8();

        let mut artifacts = Vec::with_capacity(sizes.len());
        let mut failures = 0;
        for &size in sizes {
            let path = self.output_dir.join(format!("{}_{}.jpg", stem, size));
            let canvas = fit_on_canvas(&rgba, size);
            match self.write_jpeg(&canvas, &path) {
                Ok(()) => {
                    debug!("Wrote derivative {}", path.display());
                    artifacts.push(path);
                }
                Err(e) => {
                    warn!("⚠️ Derivative {} for product {} failed: {}", size, product_id, e);
                    failures += 1;
                }
            }
        }

        info!(
            "🖼️ Generated {} derivative(s) for product {} in category {}",
            artifacts.len(),
            product_id,
            category
        );
        Ok(Derivation::Rasterized { artifacts, failures })
    }

    fn write_jpeg(&self, canvas: &RgbaImage, path: &Path) -> Result<(), ImageError> {
        let rgb = DynamicImage::ImageRgba8(canvas.clone()).to_rgb8();
        let file = fs::File::create(path).map_err(|e| ImageError::io(path, e))?;
        let mut writer = BufWriter::new(file);

        JpegEncoder::new_with_quality(&mut writer, self.jpeg_quality)
            .encode_image(&rgb)
            .map_err(|source| ImageError::Encode {
                path: path.to_path_buf(),
                source,
            })?;
        writer.flush().map_err(|e| ImageError::io(path, e))
    }
}

/// Downscale-only fit, centered on an opaque white canvas of exactly `size`
fn fit_on_canvas(source: &RgbaImage, size: ImageSize) -> RgbaImage {
    let (src_w, src_h) = source.dimensions();
    let scale = f64::min(
        1.0,
        f64::min(
            f64::from(size.width) / f64::from(src_w.max(1)),
            f64::from(size.height) / f64::from(src_h.max(1)),
        ),
    );
    let fit_w = ((f64::from(src_w) * scale).round() as u32).clamp(1, size.width);
    let fit_h = ((f64::from(src_h) * scale).round() as u32).clamp(1, size.height);

    let mut canvas = RgbaImage::from_pixel(size.width, size.height, WHITE);
    let x = i64::from((size.width - fit_w) / 2);
    let y = i64::from((size.height - fit_h) / 2);

    if (fit_w, fit_h) == (src_w, src_h) {
        imageops::overlay(&mut canvas, source, x, y);
    } else {
        let resized = imageops::resize(source, fit_w, fit_h, FilterType::Lanczos3);
        imageops::overlay(&mut canvas, &resized, x, y);
    }
    canvas
}

/// Downloads product images and keeps the raw copy
#[derive(Clone)]
pub struct ImageDownloader {
    http: Arc<dyn HttpFetch>,
    raw_dir: PathBuf,
}

impl ImageDownloader {
    pub fn new(http: Arc<dyn HttpFetch>, raw_dir: impl Into<PathBuf>) -> Self {
        Self {
            http,
            raw_dir: raw_dir.into(),
        }
    }

    /// Fetch `url` once and store it as `{id}.svg` or `{id}_original`.
    pub async fn download(&self, url: &str, product_id: &str) -> Result<FetchedBody, ImageError> {
        let body = self.http.get_bytes(url).await.map_err(|source| ImageError::Download {
            url: url.to_string(),
            source,
        })?;

        tokio::fs::create_dir_all(&self.raw_dir)
            .await
            .map_err(|e| ImageError::io(&self.raw_dir, e))?;

        let id = sanitize_filename(product_id);
        let file_name = if is_vector(&body.bytes, body.content_type.as_deref()) {
            format!("{}.svg", id)
        } else {
            format!("{}_original", id)
        };
        let path = self.raw_dir.join(file_name);
        tokio::fs::write(&path, &body.bytes)
            .await
            .map_err(|e| ImageError::io(&path, e))?;

        debug!("Saved raw image for product {} to {}", product_id, path.display());
        Ok(body)
    }
}
