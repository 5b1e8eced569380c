//! Conversion backend trait and shared error type.
//!
//! Two production implementations exist:
//! [`CwebpBackend`](super::cwebp_backend::CwebpBackend) shells out to the
//! `cwebp` encoder, [`RustBackend`](super::rust_backend::RustBackend) encodes
//! in-process with the `image` crate. Both write a `.webp` file next to
//! nothing else; neither is awaited by the rewriter.

use super::params::WebpParams;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Something that can turn one image into a WebP file.
///
/// Implementations run synchronously; detaching them from the caller is
/// the dispatcher's job, not the backend's.
pub trait ImageBackend: Send + Sync {
    /// Short name used in logs and CLI output.
    fn name(&self) -> &'static str;

    /// Encode `params.source` as WebP at `params.output`.
    fn to_webp(&self, params: &WebpParams) -> Result<(), BackendError>;
}

/// Create the output file's parent directory if it is missing.
pub(crate) fn ensure_parent_dir(params: &WebpParams) -> Result<(), BackendError> {
    if let Some(parent) = params.output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Backend that records conversions without running them.
    #[derive(Default)]
    pub struct MockBackend {
        pub conversions: Mutex<Vec<WebpParams>>,
        pub fail: bool,
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub fn get_conversions(&self) -> Vec<WebpParams> {
            self.conversions.lock().unwrap().clone()
        }
    }

    impl ImageBackend for MockBackend {
        fn name(&self) -> &'static str {
            "mock"
        }

        fn to_webp(&self, params: &WebpParams) -> Result<(), BackendError> {
            self.conversions.lock().unwrap().push(params.clone());
            if self.fail {
                return Err(BackendError::ProcessingFailed("mock failure".into()));
            }
            Ok(())
        }
    }

    #[test]
    fn mock_records_conversion() {
        let backend = MockBackend::new();
        backend
            .to_webp(&WebpParams {
                source: "/public/a.jpg".into(),
                output: "/dist/a.webp".into(),
                quality: crate::imaging::Quality::new(70),
            })
            .unwrap();

        let recorded = backend.get_conversions();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].quality.value(), 70);
        assert_eq!(recorded[0].output, std::path::PathBuf::from("/dist/a.webp"));
    }

    #[test]
    fn ensure_parent_dir_creates_nested_dirs() {
        let tmp = tempfile::TempDir::new().unwrap();
        let params = WebpParams {
            source: tmp.path().join("a.png"),
            output: tmp.path().join("deep/er/a.webp"),
            quality: crate::imaging::Quality::default(),
        };
        ensure_parent_dir(&params).unwrap();
        assert!(tmp.path().join("deep/er").is_dir());
    }
}
