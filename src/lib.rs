//! # html-picture
//!
//! Rewrites `<img>` elements in HTML documents into `<picture>` elements
//! that offer a WebP source with the original image as fallback, and
//! produces the WebP files as a side effect.
//!
//! ```text
//! <img src="img/photo.jpg" alt="Dawn">
//!
//!   becomes
//!
//! <picture>
//!   <source srcset="/site/dist/img/photo.webp" type="image/webp">
//!   <img src="/site/public/img/photo.jpg" type="image/jpeg" alt="Dawn">
//! </picture>
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`picture`] | The rewriter: classify every `<img>`, submit conversions, replace with `<picture>` |
//! | [`dom`] | Arena-backed HTML tree built by html5ever, with explicit child replacement and serialization |
//! | [`sniff`] | MIME classification from a file's first 12 bytes |
//! | [`imaging`] | WebP backends (`cwebp`, pure Rust) and the fire-and-forget converter |
//! | [`config`] | `picture.toml` loading, validation, and per-document sidecar overrides |
//! | [`process`] | Batch rewriting of a directory of documents on a rayon pool |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Content Sniffing Over Extensions
//!
//! Whether an image is excluded, and which `type` its fallback advertises,
//! is decided by the bytes on disk. A `.jpg` that is really a PNG is
//! treated as a PNG.
//!
//! ## Conversions Are Not Awaited
//!
//! The markup only needs the destination path, which is a pure function of
//! the configuration and the `src` value. Conversions therefore run on
//! detached threads and their outcome is only logged. A build that exits
//! immediately after rewriting can leave conversions unfinished.
//!
//! ## All-Or-Nothing Documents
//!
//! Every image in a document is classified before the tree is edited or a
//! conversion is submitted. A missing image fails its document cleanly and
//! leaves the other documents in the batch alone.
//!
//! ## Library Usage
//!
//! ```no_run
//! use html_picture::config::PictureConfig;
//! use html_picture::imaging::{CwebpBackend, DetachedConverter};
//! use html_picture::picture;
//!
//! let config = PictureConfig {
//!     webp: true,
//!     ..PictureConfig::default()
//! };
//! let converter = DetachedConverter::new(CwebpBackend::new());
//! let html = picture::rewrite(r#"<img src="photo.jpg">"#, &config, &converter)?;
//! # Ok::<(), html_picture::picture::RewriteError>(())
//! ```

pub mod config;
pub mod dom;
pub mod imaging;
pub mod output;
pub mod picture;
pub mod process;
pub mod sniff;
