//! WebP conversion.
//!
//! | Piece | Role |
//! |---|---|
//! | [`ImageBackend`] | Synchronous "make this WebP" operation |
//! | [`CwebpBackend`] | External `cwebp` encoder (lossy, honours quality) |
//! | [`RustBackend`] | In-process `image` crate encoder (lossless) |
//! | [`Converter`] | Fire-and-forget job submission used by the rewriter |
//! | [`DetachedConverter`] | Runs each job on a never-joined background thread |

pub mod backend;
pub mod cwebp_backend;
pub mod dispatch;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend};
pub use cwebp_backend::CwebpBackend;
pub use dispatch::{ConversionJob, Converter, DetachedConverter, DiscardConverter};
pub use params::{Quality, WebpParams};
pub use rust_backend::RustBackend;

use crate::config::ConverterKind;

/// Build the detached converter selected in the configuration.
pub fn detached_converter(kind: ConverterKind, cwebp_path: &str) -> Box<dyn Converter> {
    match kind {
        ConverterKind::Cwebp => Box::new(DetachedConverter::new(CwebpBackend::with_program(
            cwebp_path,
        ))),
        ConverterKind::Rust => Box::new(DetachedConverter::new(RustBackend::new())),
    }
}
