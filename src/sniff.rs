//! Content-type sniffing from leading bytes.
//!
//! The extension of an image reference says nothing reliable about what is
//! on disk, so classification looks at the file signature instead. Raster
//! formats are recognised by `image::guess_format`; SVG has no binary magic
//! and is recognised by its textual prologue.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Number of leading bytes inspected.
pub const SIGNATURE_LEN: usize = 12;

/// Read up to [`SIGNATURE_LEN`] bytes from the start of a file.
pub fn read_signature(path: &Path) -> io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(SIGNATURE_LEN);
    File::open(path)?
        .take(SIGNATURE_LEN as u64)
        .read_to_end(&mut buf)?;
    Ok(buf)
}

/// Classify a byte signature as a MIME type, or `None` if unrecognised.
pub fn classify(bytes: &[u8]) -> Option<&'static str> {
    if let Ok(format) = image::guess_format(bytes) {
        return Some(format.to_mime_type());
    }
    let text = bytes.trim_ascii_start();
    if text.starts_with(b"<svg") || text.starts_with(b"<?xml") {
        return Some("image/svg+xml");
    }
    None
}
