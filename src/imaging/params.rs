//! Parameter types for image conversion.
//!
//! These describe *what* to produce, not *how*. The
//! [`dispatch`](super::dispatch) layer builds them from a conversion job and
//! hands them to an [`ImageBackend`](super::ImageBackend), which does the
//! work. Swapping the backend (or mocking it) never touches the rewriter.

use std::path::PathBuf;

/// Quality setting for lossy WebP encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    /// `None` and `Some(0)` both mean "not configured" and fall back to the default.
    pub fn from_config(value: Option<u32>) -> Self {
        value.filter(|&q| q > 0).map(Self::new).unwrap_or_default()
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(80)
    }
}

/// Parameters for a single WebP conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct WebpParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub quality: Quality,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(55).value(), 55);
        assert_eq!(Quality::new(250).value(), 100);
    }

    #[test]
    fn quality_default_is_80() {
        assert_eq!(Quality::default().value(), 80);
        assert_eq!(Quality::from_config(None).value(), 80);
    }

    #[test]
    fn configured_zero_means_default() {
        assert_eq!(Quality::from_config(Some(0)).value(), 80);
    }

    #[test]
    fn configured_quality_passes_through() {
        assert_eq!(Quality::from_config(Some(1)).value(), 1);
        assert_eq!(Quality::from_config(Some(100)).value(), 100);
        assert_eq!(Quality::from_config(Some(65)).value(), 65);
    }
}
