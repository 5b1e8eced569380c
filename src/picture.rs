//! `<img>` → `<picture>` rewriting.
//!
//! For every eligible `<img>` in a document the rewriter sniffs the image on
//! disk, and unless its MIME type is excluded replaces the element with
//!
//! ```html
//! <picture>
//!   <source srcset="{output_dir}/{dir}/{stem}.webp" type="image/webp">
//!   <img src="{public_dir}/{dir}/{file}" type="{mime}">
//! </picture>
//! ```
//!
//! The `<source>` is only present when WebP output is enabled, and in that
//! case a conversion job is submitted for the image. Submission is
//! fire-and-forget (see [`crate::imaging::dispatch`]): the rewritten markup
//! only depends on the destination path, never on the conversion finishing.
//!
//! A document is rewritten all-or-nothing. Every image is classified before
//! the tree is touched or any job is submitted, so a missing or unreadable
//! image fails the document without side effects.
//!
//! Elements that are left alone:
//!
//! - `<img>` already inside a `<picture>` (rewriting is idempotent)
//! - `<img>` without a usable `src`
//! - remote and inline sources (`http:`, `https:`, `//`, `data:`)
//! - images whose sniffed MIME type is in `exclude`

use crate::config::{self, ConfigError, PictureConfig};
use crate::dom::{self, Document, NodeId};
use crate::imaging::{ConversionJob, Converter, Quality};
use crate::sniff;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Name errors are tagged with.
pub const PLUGIN_NAME: &str = "picture";

const WEBP_MIME: &str = "image/webp";

#[derive(Error, Debug)]
pub enum RewriteError {
    #[error("cannot read image {}: {source}", path.display())]
    ImageRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unrecognised image format: {}", path.display())]
    UnrecognizedImage { path: PathBuf },
    #[error("document is not valid UTF-8: {0}")]
    InvalidEncoding(#[from] std::str::Utf8Error),
    #[error("cannot read document: {0}")]
    DocumentRead(#[from] io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A rewrite failure tagged with the document it happened in.
#[derive(Error, Debug)]
#[error("picture: {}: {source}", document.display())]
pub struct DocumentError {
    pub document: PathBuf,
    #[source]
    pub source: RewriteError,
}

/// Per-document image counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// `<img>` elements found.
    pub images: usize,
    /// Replaced by `<picture>`.
    pub rewritten: usize,
    /// Left alone because of their MIME type.
    pub excluded: usize,
    /// Left alone for any other reason.
    pub skipped: usize,
    /// WebP conversions submitted.
    pub conversions: usize,
}

/// Rewritten HTML plus what happened to its images.
#[derive(Debug, Clone)]
pub struct Rewritten {
    pub html: String,
    pub summary: Summary,
}

/// Why an `<img>` was not considered at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SkipReason {
    AlreadyWrapped,
    NoSource,
    Remote,
}

/// Everything needed to replace one `<img>`.
#[derive(Debug)]
struct Target {
    source: PathBuf,
    mime: &'static str,
    webp: PathBuf,
}

#[derive(Debug)]
enum Outcome {
    Rewrite(Target),
    Excluded,
    Skipped(SkipReason),
}

/// Rewrite `html`, submitting WebP conversions to `converter`.
pub fn rewrite(
    html: &str,
    config: &PictureConfig,
    converter: &dyn Converter,
) -> Result<String, RewriteError> {
    rewrite_with_summary(html, config, converter).map(|r| r.html)
}

pub fn rewrite_with_summary(
    html: &str,
    config: &PictureConfig,
    converter: &dyn Converter,
) -> Result<Rewritten, RewriteError> {
    let mut doc = Document::parse(html);
    let plan = plan(&doc, config)?;
    let mut summary = summarize(&plan);
    let quality = Quality::from_config(config.webp_quality);

    if config.webp {
        for (_, outcome) in &plan {
            if let Outcome::Rewrite(target) = outcome {
                converter.submit(ConversionJob {
                    source: target.source.clone(),
                    destination: target.webp.clone(),
                    quality,
                });
                summary.conversions += 1;
            }
        }
    }

    for (img, outcome) in &plan {
        if let Outcome::Rewrite(target) = outcome {
            let picture = build_picture(&mut doc, *img, target, config.webp);
            doc.replace_child(*img, picture);
        }
    }

    Ok(Rewritten {
        html: doc.to_html(),
        summary,
    })
}

/// Classify every image in `html` without converting or changing anything.
pub fn inspect(html: &str, config: &PictureConfig) -> Result<Summary, RewriteError> {
    let doc = Document::parse(html);
    let plan = plan(&doc, config)?;
    let mut summary = summarize(&plan);
    if config.webp {
        summary.conversions = summary.rewritten;
    }
    Ok(summary)
}

/// Rewrite a document on disk, applying its sidecar override.
pub fn rewrite_file(
    document: &Path,
    base: &PictureConfig,
    converter: &dyn Converter,
) -> Result<Rewritten, DocumentError> {
    with_document(document, base, |html, config| {
        rewrite_with_summary(html, config, converter)
    })
}

/// [`inspect`] for a document on disk, applying its sidecar override.
pub fn inspect_file(document: &Path, base: &PictureConfig) -> Result<Summary, DocumentError> {
    with_document(document, base, inspect)
}

fn with_document<T>(
    document: &Path,
    base: &PictureConfig,
    f: impl FnOnce(&str, &PictureConfig) -> Result<T, RewriteError>,
) -> Result<T, DocumentError> {
    let run = || -> Result<T, RewriteError> {
        let config = config::config_for_document(base, document)?;
        let bytes = fs::read(document)?;
        let html = std::str::from_utf8(&bytes)?;
        f(html, &config)
    };
    run().map_err(|source| DocumentError {
        document: document.to_path_buf(),
        source,
    })
}

fn summarize(plan: &[(NodeId, Outcome)]) -> Summary {
    let mut summary = Summary {
        images: plan.len(),
        ..Summary::default()
    };
    for (_, outcome) in plan {
        match outcome {
            Outcome::Rewrite(_) => summary.rewritten += 1,
            Outcome::Excluded => summary.excluded += 1,
            Outcome::Skipped(_) => summary.skipped += 1,
        }
    }
    summary
}

/// Decide what to do with every `<img>`, in document order.
fn plan(doc: &Document, config: &PictureConfig) -> Result<Vec<(NodeId, Outcome)>, RewriteError> {
    doc.elements_by_tag("img")
        .into_iter()
        .map(|img| decide(doc, img, config).map(|outcome| (img, outcome)))
        .collect()
}

fn decide(doc: &Document, img: NodeId, config: &PictureConfig) -> Result<Outcome, RewriteError> {
    let in_picture = doc
        .parent(img)
        .is_some_and(|p| doc.is_element_named(p, "picture"));
    if in_picture {
        return Ok(Outcome::Skipped(SkipReason::AlreadyWrapped));
    }

    let src = match doc.attr(img, "src").ok_or(SkipReason::NoSource).and_then(local_path) {
        Ok(src) => src,
        Err(reason) => {
            tracing::debug!(?reason, "skipping <img>");
            return Ok(Outcome::Skipped(reason));
        }
    };

    let source = resolve_source(&config.public_dir, src).map_err(|e| RewriteError::ImageRead {
        path: config.public_dir.join(src),
        source: e,
    })?;
    let signature = sniff::read_signature(&source).map_err(|e| RewriteError::ImageRead {
        path: source.clone(),
        source: e,
    })?;
    let Some(mime) = sniff::classify(&signature) else {
        return Err(RewriteError::UnrecognizedImage { path: source });
    };

    if config.exclude.contains(mime) {
        tracing::debug!(src, mime, "excluded");
        return Ok(Outcome::Excluded);
    }

    let base = destination_base(&config.output_dir, src).map_err(|e| RewriteError::ImageRead {
        path: source.clone(),
        source: e,
    })?;
    let webp = with_suffix(&base, "webp");
    tracing::debug!(src, mime, webp = %webp.display(), "rewriting");
    Ok(Outcome::Rewrite(Target { source, mime, webp }))
}

/// Strip query and fragment from a `src` value, rejecting remote and inline URLs.
fn local_path(src: &str) -> Result<&str, SkipReason> {
    let src = src.trim();
    let lower = src.to_ascii_lowercase();
    if ["http:", "https:", "//", "data:"]
        .iter()
        .any(|prefix| lower.starts_with(prefix))
    {
        return Err(SkipReason::Remote);
    }
    let path = src.split(['?', '#']).next().unwrap_or_default();
    if path.is_empty() {
        return Err(SkipReason::NoSource);
    }
    Ok(path)
}

/// `public_dir` joined with `src`, absolute and lexically normalized.
pub fn resolve_source(public_dir: &Path, src: &str) -> io::Result<PathBuf> {
    let joined = public_dir.join(src.trim_start_matches('/'));
    Ok(normalize(&std::path::absolute(joined)?))
}

/// `output_dir/dirname(src)/stem(src)` without an extension.
pub fn destination_base(output_dir: &Path, src: &str) -> io::Result<PathBuf> {
    let rel = Path::new(src.trim_start_matches('/'));
    let dir = rel.parent().unwrap_or(Path::new(""));
    let mut base = output_dir.join(dir);
    if let Some(stem) = rel.file_stem() {
        base.push(stem);
    }
    Ok(normalize(&std::path::absolute(base)?))
}

/// `base` with `.{ext}` appended (the stem may itself contain dots).
fn with_suffix(base: &Path, ext: &str) -> PathBuf {
    let mut s = base.as_os_str().to_os_string();
    s.push(".");
    s.push(ext);
    PathBuf::from(s)
}

/// Resolve `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn build_picture(doc: &mut Document, img: NodeId, target: &Target, webp: bool) -> NodeId {
    let picture = doc.create_element("picture", &[]);
    if webp {
        let srcset = target.webp.to_string_lossy();
        let source = doc.create_element("source", &[("srcset", &srcset), ("type", WEBP_MIME)]);
        doc.append(picture, source);
    }

    let mut attrs = vec![
        dom::attribute("src", &target.source.to_string_lossy()),
        dom::attribute("type", target.mime),
    ];
    attrs.extend(
        doc.attrs(img)
            .iter()
            .filter(|a| !matches!(&*a.name.local, "src" | "type"))
            .cloned(),
    );
    let fallback = doc.create_element_with("img", attrs);
    doc.append(picture, fallback);
    picture
}
