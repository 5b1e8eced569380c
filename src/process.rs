//! Batch rewriting of a directory of HTML documents.
//!
//! ```text
//! src/                        dist/
//! ├── picture.toml
//! ├── index.html        →     ├── index.html
//! ├── gallery.html      →     ├── gallery.html
//! ├── gallery.picture.toml
//! └── blog/
//!     └── post.htm      →     └── blog/post.htm
//! ```
//!
//! Every `*.html` / `*.htm` file under the source directory is rewritten on
//! its own and written to the same relative path under the destination.
//! Documents share nothing: a document that fails (missing image, bad
//! sidecar, unreadable file) is reported and produces no output file, and
//! the rest of the batch carries on.
//!
//! ## Parallel Processing
//!
//! Documents are processed on the global [rayon](https://docs.rs/rayon)
//! pool. WebP conversions are handed to the [`Converter`] and are not
//! waited on, so a finished batch can still have conversions running.
//!
//! ## Progress
//!
//! An optional channel receives a [`DocumentEvent`] per document as it
//! completes, so the CLI can print while work continues.

use crate::config::PictureConfig;
use crate::imaging::Converter;
use crate::picture::{self, DocumentError, Summary};
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use walkdir::WalkDir;

/// File extensions treated as HTML documents.
const DOCUMENT_EXTENSIONS: &[&str] = &["html", "htm"];

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Per-document failure, rendered into the report.
#[derive(Error, Debug)]
enum DocumentFailure {
    #[error(transparent)]
    Rewrite(#[from] DocumentError),
    #[error("picture: {}: cannot write {}: {source}", document.display(), output.display())]
    Write {
        document: PathBuf,
        output: PathBuf,
        source: std::io::Error,
    },
}

/// What to do with each document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Rewrite, submit conversions, write output.
    Rewrite,
    /// Classify images only. Nothing is converted or written.
    Check,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentStatus {
    Rewritten { summary: Summary },
    Checked { summary: Summary },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentReport {
    /// Path relative to the source directory.
    pub path: PathBuf,
    #[serde(flatten)]
    pub status: DocumentStatus,
}

impl DocumentReport {
    pub fn summary(&self) -> Option<&Summary> {
        match &self.status {
            DocumentStatus::Rewritten { summary } | DocumentStatus::Checked { summary } => {
                Some(summary)
            }
            DocumentStatus::Failed { .. } => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.status, DocumentStatus::Failed { .. })
    }
}

/// Outcome of a whole batch, in source path order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub documents: Vec<DocumentReport>,
    /// Image counts summed over successful documents.
    pub totals: Summary,
}

impl BatchReport {
    fn from_documents(documents: Vec<DocumentReport>) -> Self {
        let mut totals = Summary::default();
        for summary in documents.iter().filter_map(DocumentReport::summary) {
            totals.images += summary.images;
            totals.rewritten += summary.rewritten;
            totals.excluded += summary.excluded;
            totals.skipped += summary.skipped;
            totals.conversions += summary.conversions;
        }
        Self { documents, totals }
    }

    pub fn failures(&self) -> impl Iterator<Item = &DocumentReport> {
        self.documents.iter().filter(|d| d.is_failure())
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    pub fn is_success(&self) -> bool {
        self.failure_count() == 0
    }
}

/// Progress events sent while a batch runs.
#[derive(Debug, Clone)]
pub enum DocumentEvent {
    /// Sent once, before any document is processed.
    BatchStarted { documents: usize, mode: Mode },
    /// Sent as each document finishes, in completion order.
    DocumentFinished(DocumentReport),
}

/// All HTML documents under `source`, relative and sorted.
///
/// Anything under `skip` (typically the output directory when it is nested
/// inside the source) is ignored.
pub fn find_documents(source: &Path, skip: Option<&Path>) -> Result<Vec<PathBuf>, ProcessError> {
    // Compared lexically, so both sides must be absolute.
    let root = std::path::absolute(source)?;
    let skip = skip.map(std::path::absolute).transpose()?;
    let mut documents = Vec::new();
    let walker = WalkDir::new(&root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0 || !skip.as_ref().is_some_and(|s| e.path().starts_with(s))
        });
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() || !is_document(entry.path()) {
            continue;
        }
        if let Ok(rel) = entry.path().strip_prefix(&root) {
            documents.push(rel.to_path_buf());
        }
    }
    Ok(documents)
}

fn is_document(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| {
            DOCUMENT_EXTENSIONS
                .iter()
                .any(|ext| e.eq_ignore_ascii_case(ext))
        })
}

/// Rewrite every document under `source` into `dest`.
pub fn build(
    source: &Path,
    dest: &Path,
    config: &PictureConfig,
    converter: &dyn Converter,
    events: Option<Sender<DocumentEvent>>,
) -> Result<BatchReport, ProcessError> {
    run(source, dest, config, converter, Mode::Rewrite, events)
}

/// Classify every image under `source` without converting or writing.
pub fn check(
    source: &Path,
    config: &PictureConfig,
    events: Option<Sender<DocumentEvent>>,
) -> Result<BatchReport, ProcessError> {
    run(
        source,
        source,
        config,
        &crate::imaging::DiscardConverter,
        Mode::Check,
        events,
    )
}

fn run(
    source: &Path,
    dest: &Path,
    config: &PictureConfig,
    converter: &dyn Converter,
    mode: Mode,
    events: Option<Sender<DocumentEvent>>,
) -> Result<BatchReport, ProcessError> {
    let skip = (mode == Mode::Rewrite && dest != source).then_some(dest);
    let documents = find_documents(source, skip)?;
    tracing::info!(
        source = %source.display(),
        documents = documents.len(),
        ?mode,
        "starting batch"
    );
    if let Some(tx) = &events {
        tx.send(DocumentEvent::BatchStarted {
            documents: documents.len(),
            mode,
        })
        .ok();
    }

    let reports: Vec<DocumentReport> = documents
        .par_iter()
        .map(|rel| {
            let report = process_document(rel, source, dest, config, converter, mode);
            if let Some(tx) = &events {
                tx.send(DocumentEvent::DocumentFinished(report.clone())).ok();
            }
            report
        })
        .collect();

    Ok(BatchReport::from_documents(reports))
}

fn process_document(
    rel: &Path,
    source: &Path,
    dest: &Path,
    config: &PictureConfig,
    converter: &dyn Converter,
    mode: Mode,
) -> DocumentReport {
    let path = source.join(rel);
    let status = match mode {
        Mode::Check => picture::inspect_file(&path, config)
            .map(|summary| DocumentStatus::Checked { summary })
            .map_err(DocumentFailure::from),
        Mode::Rewrite => rewrite_document(&path, &dest.join(rel), config, converter)
            .map(|summary| DocumentStatus::Rewritten { summary }),
    };
    let status = status.unwrap_or_else(|e| {
        tracing::warn!("{e}");
        DocumentStatus::Failed {
            error: e.to_string(),
        }
    });
    tracing::info!(document = %rel.display(), "done");
    DocumentReport {
        path: rel.to_path_buf(),
        status,
    }
}

fn rewrite_document(
    path: &Path,
    output: &Path,
    config: &PictureConfig,
    converter: &dyn Converter,
) -> Result<Summary, DocumentFailure> {
    let rewritten = picture::rewrite_file(path, config, converter)?;
    let write = || -> std::io::Result<()> {
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(output, &rewritten.html)
    };
    write().map_err(|source| DocumentFailure::Write {
        document: path.to_path_buf(),
        output: output.to_path_buf(),
        source,
    })?;
    Ok(rewritten.summary)
}

/// Write a batch report as pretty JSON.
pub fn write_report(report: &BatchReport, path: &Path) -> Result<(), ProcessError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json)?;
    Ok(())
}
