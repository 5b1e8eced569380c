//! Conversion through Google's `cwebp` command-line encoder.
//!
//! Runs `cwebp -quiet -q <quality> <source> -o <output>` and maps a non-zero
//! exit status to [`BackendError::ProcessingFailed`] with the tool's stderr.

use super::backend::{BackendError, ImageBackend, ensure_parent_dir};
use super::params::WebpParams;
use std::ffi::OsString;
use std::process::Command;

pub struct CwebpBackend {
    program: OsString,
}

impl CwebpBackend {
    /// Use `cwebp` from `PATH`.
    pub fn new() -> Self {
        Self::with_program("cwebp")
    }

    /// Use a specific binary (absolute path or name on `PATH`).
    pub fn with_program(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// The full command line that would convert `params`.
    pub fn command(&self, params: &WebpParams) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-quiet")
            .arg("-q")
            .arg(params.quality.value().to_string())
            .arg(&params.source)
            .arg("-o")
            .arg(&params.output);
        cmd
    }
}

impl Default for CwebpBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBackend for CwebpBackend {
    fn name(&self) -> &'static str {
        "cwebp"
    }

    fn to_webp(&self, params: &WebpParams) -> Result<(), BackendError> {
        ensure_parent_dir(params)?;
        let output = self.command(params).output()?;
        if !output.status.success() {
            return Err(BackendError::ProcessingFailed(format!(
                "cwebp exited with {} for {}: {}",
                output.status,
                params.source.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}
