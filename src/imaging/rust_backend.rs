//! Pure Rust conversion backend with no external binaries.
//!
//! | Step | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF, TIFF, WebP) | `image::ImageReader` with guessed format |
//! | Encode → WebP | `image::codecs::webp::WebPEncoder::new_lossless` |
//!
//! The `image` crate only ships a lossless WebP encoder, so the configured
//! quality has no effect here. Use [`CwebpBackend`](super::CwebpBackend)
//! when lossy output matters.

use super::backend::{BackendError, ImageBackend, ensure_parent_dir};
use super::params::WebpParams;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageReader};
use std::path::Path;

pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })
}

fn save_webp(img: &DynamicImage, path: &Path) -> Result<(), BackendError> {
    // The lossless encoder takes 8-bit RGB(A) and luma only.
    let img = match img {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => img.clone(),
        other if other.color().has_alpha() => DynamicImage::ImageRgba8(other.to_rgba8()),
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    };
    let file = std::fs::File::create(path)?;
    let writer = std::io::BufWriter::new(file);
    img.write_with_encoder(WebPEncoder::new_lossless(writer))
        .map_err(|e| BackendError::ProcessingFailed(format!("WebP encode failed: {}", e)))
}

impl ImageBackend for RustBackend {
    fn name(&self) -> &'static str {
        "rust"
    }

    fn to_webp(&self, params: &WebpParams) -> Result<(), BackendError> {
        let img = load_image(&params.source)?;
        ensure_parent_dir(params)?;
        save_webp(&img, &params.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::Quality;
    use image::{ImageEncoder, RgbImage};

    fn create_test_png(path: &Path, width: u32, height: u32) {
        let img = RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let file = std::fs::File::create(path).unwrap();
        image::codecs::png::PngEncoder::new(std::io::BufWriter::new(file))
            .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
            .unwrap();
    }

    #[test]
    fn converts_png_to_webp() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("photo.png");
        create_test_png(&source, 32, 24);
        let output = tmp.path().join("out/img/photo.webp");

        RustBackend::new()
            .to_webp(&WebpParams {
                source,
                output: output.clone(),
                quality: Quality::default(),
            })
            .unwrap();

        let bytes = std::fs::read(&output).unwrap();
        assert_eq!(crate::sniff::classify(&bytes[..12]), Some("image/webp"));
        assert_eq!(image::image_dimensions(&output).unwrap(), (32, 24));
    }

    #[test]
    fn missing_source_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let result = RustBackend::new().to_webp(&WebpParams {
            source: tmp.path().join("nope.png"),
            output: tmp.path().join("nope.webp"),
            quality: Quality::default(),
        });
        assert!(matches!(result, Err(BackendError::Io(_))));
    }

    #[test]
    fn undecodable_source_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("broken.png");
        std::fs::write(&source, b"\x89PNG\r\n\x1a\nnot really").unwrap();
        let result = RustBackend::new().to_webp(&WebpParams {
            source,
            output: tmp.path().join("broken.webp"),
            quality: Quality::default(),
        });
        assert!(matches!(result, Err(BackendError::ProcessingFailed(_))));
    }
}
