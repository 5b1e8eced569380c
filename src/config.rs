//! Configuration loading, validation, and per-document overrides.
//!
//! ## Config File Location
//!
//! `picture.toml` in the source root (or any file passed with `--config`).
//! Per-document overrides live in a sidecar next to the HTML file:
//!
//! ```text
//! src/
//! ├── picture.toml           # Base config (overrides stock defaults)
//! ├── index.html
//! ├── gallery.html
//! └── gallery.picture.toml   # Override for gallery.html only
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [picture]
//! public_dir = "public"     # Root that <img src> values are relative to
//! output_dir = "dist"       # Root for generated .webp files
//! webp = false              # Generate WebP sources
//! # webp_quality = 80       # 1-100, 80 when unset or 0
//! exclude = []              # MIME types left untouched, e.g. ["image/gif"]
//! jp2 = false               # Reserved, has no effect
//! ie_fallback = false       # Reserved, has no effect
//!
//! [converter]
//! kind = "cwebp"            # "cwebp" (external binary) or "rust" (built in)
//! cwebp_path = "cwebp"
//!
//! [processing]
//! max_processes = 4         # Max parallel documents (omit for auto = CPU cores)
//! ```
//!
//! ## Sidecar Overrides
//!
//! A sidecar holds a flat subset of the `[picture]` keys. It is merged
//! shallowly over the base `[picture]` table: every key present in the
//! sidecar replaces the base value wholesale (an `exclude` list is replaced,
//! not extended); keys it omits keep their base value.
//!
//! Relative paths are resolved against the working directory of the build.
//! Unknown keys are rejected everywhere to catch typos early.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name looked up in the source root.
pub const CONFIG_FILE: &str = "picture.toml";

/// Extension replacing `.html` for a document's sidecar override.
pub const SIDECAR_EXTENSION: &str = "picture.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Top-level configuration loaded from `picture.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Rewriter settings; the part a sidecar can override.
    pub picture: PictureConfig,
    /// Which WebP encoder runs the conversions.
    pub converter: ConverterConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl SiteConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.picture.validate()
    }
}

/// Settings consumed by the picture rewriter for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PictureConfig {
    /// Directory `<img src>` values are resolved against.
    pub public_dir: PathBuf,
    /// Directory converted files are written under.
    pub output_dir: PathBuf,
    /// Emit a WebP `<source>` and convert the image.
    pub webp: bool,
    /// WebP quality, 1-100; `None` or `0` means the default of 80.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webp_quality: Option<u32>,
    /// MIME types whose `<img>` elements are left untouched.
    pub exclude: BTreeSet<String>,
    /// Reserved: JPEG 2000 sources are never generated.
    pub jp2: bool,
    /// Reserved: the JPEG XR fallback is never generated.
    pub ie_fallback: bool,
}

impl Default for PictureConfig {
    fn default() -> Self {
        Self {
            public_dir: PathBuf::from("public"),
            output_dir: PathBuf::from("dist"),
            webp: false,
            webp_quality: None,
            exclude: BTreeSet::new(),
            jp2: false,
            ie_fallback: false,
        }
    }
}

impl PictureConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.public_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "picture.public_dir must not be empty".into(),
            ));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "picture.output_dir must not be empty".into(),
            ));
        }
        if self.webp_quality.is_some_and(|q| q > 100) {
            return Err(ConfigError::Validation(
                "picture.webp_quality must be 1-100 (0 or unset means 80)".into(),
            ));
        }
        Ok(())
    }

    /// Apply a per-document override. Override fields win; absent ones keep `self`.
    pub fn with_override(&self, over: &PictureOverride) -> PictureConfig {
        PictureConfig {
            public_dir: over
                .public_dir
                .clone()
                .unwrap_or_else(|| self.public_dir.clone()),
            output_dir: over
                .output_dir
                .clone()
                .unwrap_or_else(|| self.output_dir.clone()),
            webp: over.webp.unwrap_or(self.webp),
            webp_quality: over.webp_quality.or(self.webp_quality),
            exclude: over.exclude.clone().unwrap_or_else(|| self.exclude.clone()),
            jp2: over.jp2.unwrap_or(self.jp2),
            ie_fallback: over.ie_fallback.unwrap_or(self.ie_fallback),
        }
    }
}

/// Sparse per-document counterpart of [`PictureConfig`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PictureOverride {
    pub public_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub webp: Option<bool>,
    pub webp_quality: Option<u32>,
    pub exclude: Option<BTreeSet<String>>,
    pub jp2: Option<bool>,
    pub ie_fallback: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConverterKind {
    /// External `cwebp` binary.
    #[default]
    Cwebp,
    /// Built-in lossless encoder.
    Rust,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConverterConfig {
    pub kind: ConverterKind,
    /// Binary used when `kind = "cwebp"`.
    pub cwebp_path: String,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            kind: ConverterKind::Cwebp,
            cwebp_path: "cwebp".to_string(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of documents rewritten at once.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)`, never below one
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// The stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load `picture.toml` from `root`, falling back to stock defaults when absent.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let path = root.join(CONFIG_FILE);
    if !path.exists() {
        return resolve_config(stock_defaults_value(), None);
    }
    load_config_file(&path)
}

/// Load a specific config file. The file must exist.
pub fn load_config_file(path: &Path) -> Result<SiteConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    resolve_config(stock_defaults_value(), Some(value))
}

/// Sidecar override path for a document: `page.html` → `page.picture.toml`.
pub fn sidecar_path(document: &Path) -> PathBuf {
    document.with_extension(SIDECAR_EXTENSION)
}

/// Read a document's sidecar override, if it has one.
pub fn load_override(document: &Path) -> Result<Option<PictureOverride>, ConfigError> {
    let path = sidecar_path(document);
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path)?;
    Ok(Some(toml::from_str(&content)?))
}

/// The effective rewriter config for one document: base merged with its sidecar.
pub fn config_for_document(
    base: &PictureConfig,
    document: &Path,
) -> Result<PictureConfig, ConfigError> {
    let config = match load_override(document)? {
        Some(over) => base.with_override(&over),
        None => base.clone(),
    };
    config.validate()?;
    Ok(config)
}

/// A fully-commented stock `picture.toml`, printed by `gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# html-picture configuration
# ==========================
# All settings are optional. Values shown below are the defaults.
# Unknown keys cause an error.
#
# Any document can carry a sidecar override next to it:
#   src/gallery.html  ->  src/gallery.picture.toml
# holding a flat subset of the [picture] keys, e.g.
#   webp = true
#   webp_quality = 60

# ---------------------------------------------------------------------------
# Rewriting
# ---------------------------------------------------------------------------
[picture]
# Directory that <img src="..."> values are relative to.
public_dir = "public"

# Directory converted images are written under, mirroring the src layout.
output_dir = "dist"

# Replace <img> with <picture> offering a WebP <source>.
webp = false

# WebP encoding quality, 1-100. 80 when unset or 0.
# webp_quality = 80

# MIME types (sniffed from file contents) to leave untouched.
# Example: ["image/gif", "image/svg+xml"]
exclude = []

# Reserved for JPEG 2000 and JPEG XR fallbacks. Currently no effect.
jp2 = false
ie_fallback = false

# ---------------------------------------------------------------------------
# Conversion
# ---------------------------------------------------------------------------
[converter]
# "cwebp" runs the external encoder (lossy, honours webp_quality).
# "rust" uses the built-in lossless encoder.
kind = "cwebp"
cwebp_path = "cwebp"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum documents rewritten in parallel.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = SiteConfig::default();
        assert_eq!(config.picture.public_dir, PathBuf::from("public"));
        assert_eq!(config.picture.output_dir, PathBuf::from("dist"));
        assert!(!config.picture.webp);
        assert_eq!(config.picture.webp_quality, None);
        assert!(config.picture.exclude.is_empty());
        assert!(!config.picture.jp2);
        assert!(!config.picture.ie_fallback);
        assert_eq!(config.converter.kind, ConverterKind::Cwebp);
        assert_eq!(config.processing.max_processes, None);
    }

    #[test]
    fn parse_partial_config() {
        let config: SiteConfig = toml::from_str(
            r#"
[picture]
webp = true
exclude = ["image/gif", "image/svg+xml"]
"#,
        )
        .unwrap();
        assert!(config.picture.webp);
        assert!(config.picture.exclude.contains("image/gif"));
        assert!(config.picture.exclude.contains("image/svg+xml"));
        // Defaults preserved
        assert_eq!(config.picture.public_dir, PathBuf::from("public"));
        assert_eq!(config.converter.cwebp_path, "cwebp");
    }

    #[test]
    fn parse_converter_kind() {
        let config: SiteConfig = toml::from_str(
            r#"
[converter]
kind = "rust"
"#,
        )
        .unwrap();
        assert_eq!(config.converter.kind, ConverterKind::Rust);
    }

    // =========================================================================
    // Unknown key rejection
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let result: Result<SiteConfig, _> = toml::from_str(
            r#"
[picture]
webp_qualty = 90
"#,
        );
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown field"));
    }

    #[test]
    fn unknown_section_rejected() {
        let result: Result<SiteConfig, _> = toml::from_str("[pictures]\nwebp = true\n");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_override_key_rejected() {
        let result: Result<PictureOverride, _> = toml::from_str("wepb = true\n");
        assert!(result.is_err());
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn validate_quality_bounds() {
        let mut config = PictureConfig::default();
        config.webp_quality = Some(100);
        assert!(config.validate().is_ok());
        config.webp_quality = Some(0);
        assert!(config.validate().is_ok());
        config.webp_quality = Some(101);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("webp_quality must be 1-100"));
    }

    #[test]
    fn validate_empty_dirs() {
        let mut config = PictureConfig::default();
        config.public_dir = PathBuf::new();
        assert!(config.validate().is_err());

        let mut config = PictureConfig::default();
        config.output_dir = PathBuf::new();
        assert!(config.validate().is_err());
    }

    // =========================================================================
    // Loading
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.picture, PictureConfig::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE),
            r#"
[picture]
public_dir = "static"
webp = true
webp_quality = 65
"#,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.picture.public_dir, PathBuf::from("static"));
        assert!(config.picture.webp);
        assert_eq!(config.picture.webp_quality, Some(65));
        assert_eq!(config.picture.output_dir, PathBuf::from("dist"));
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "this is not valid toml [[[").unwrap();
        assert!(matches!(load_config(tmp.path()), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE),
            "[picture]\nwebp_quality = 200\n",
        )
        .unwrap();
        assert!(matches!(
            load_config(tmp.path()),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn load_config_file_missing_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let result = load_config_file(&tmp.path().join("elsewhere.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    // =========================================================================
    // merge_toml
    // =========================================================================

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str(
            r#"
[picture]
webp = false
public_dir = "public"
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str("[picture]\nwebp = true\n").unwrap();
        let merged = merge_toml(base, overlay);
        let picture = merged.get("picture").unwrap();
        assert_eq!(picture.get("webp").unwrap().as_bool(), Some(true));
        assert_eq!(picture.get("public_dir").unwrap().as_str(), Some("public"));
    }

    #[test]
    fn merge_toml_arrays_are_replaced() {
        let base: toml::Value = toml::from_str(r#"exclude = ["image/gif"]"#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"exclude = ["image/png"]"#).unwrap();
        let merged = merge_toml(base, overlay);
        let exclude = merged.get("exclude").unwrap().as_array().unwrap();
        assert_eq!(exclude.len(), 1);
        assert_eq!(exclude[0].as_str(), Some("image/png"));
    }

    // =========================================================================
    // Per-document overrides
    // =========================================================================

    #[test]
    fn override_fields_take_precedence() {
        let base = PictureConfig {
            webp: false,
            webp_quality: Some(90),
            exclude: ["image/gif".to_string()].into(),
            ..PictureConfig::default()
        };
        let over = PictureOverride {
            webp: Some(true),
            exclude: Some(["image/png".to_string()].into()),
            ..PictureOverride::default()
        };

        let merged = base.with_override(&over);
        assert!(merged.webp);
        assert_eq!(merged.webp_quality, Some(90));
        assert_eq!(merged.exclude, ["image/png".to_string()].into());
        assert_eq!(merged.public_dir, base.public_dir);
    }

    #[test]
    fn empty_override_is_identity() {
        let base = PictureConfig {
            webp: true,
            ..PictureConfig::default()
        };
        assert_eq!(base.with_override(&PictureOverride::default()), base);
    }

    #[test]
    fn sidecar_path_replaces_extension() {
        assert_eq!(
            sidecar_path(Path::new("src/blog/post.html")),
            PathBuf::from("src/blog/post.picture.toml")
        );
    }

    #[test]
    fn config_for_document_without_sidecar_is_base() {
        let tmp = TempDir::new().unwrap();
        let doc = tmp.path().join("index.html");
        fs::write(&doc, "<p>hi</p>").unwrap();
        let base = PictureConfig::default();
        assert_eq!(config_for_document(&base, &doc).unwrap(), base);
    }

    #[test]
    fn config_for_document_applies_sidecar() {
        let tmp = TempDir::new().unwrap();
        let doc = tmp.path().join("gallery.html");
        fs::write(&doc, "<p>hi</p>").unwrap();
        fs::write(
            tmp.path().join("gallery.picture.toml"),
            "webp = true\nwebp_quality = 55\n",
        )
        .unwrap();

        let config = config_for_document(&PictureConfig::default(), &doc).unwrap();
        assert!(config.webp);
        assert_eq!(config.webp_quality, Some(55));
    }

    #[test]
    fn config_for_document_rejects_invalid_sidecar() {
        let tmp = TempDir::new().unwrap();
        let doc = tmp.path().join("bad.html");
        fs::write(tmp.path().join("bad.picture.toml"), "webp_quality = 300\n").unwrap();
        assert!(matches!(
            config_for_document(&PictureConfig::default(), &doc),
            Err(ConfigError::Validation(_))
        ));
    }

    // =========================================================================
    // Processing
    // =========================================================================

    #[test]
    fn effective_threads_auto() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&ProcessingConfig::default()), cores);
    }

    #[test]
    fn effective_threads_user_constrains_down() {
        let config = ProcessingConfig {
            max_processes: Some(1),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    #[test]
    fn effective_threads_zero_means_one() {
        let config = ProcessingConfig {
            max_processes: Some(0),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    // =========================================================================
    // stock_config_toml
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: SiteConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config.picture, PictureConfig::default());
        assert_eq!(config.converter.kind, ConverterKind::Cwebp);
        assert_eq!(config.processing.max_processes, None);
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value();
        assert!(val.get("picture").is_some());
        assert!(val.get("converter").is_some());
        assert!(val.get("processing").is_some());
    }
}
