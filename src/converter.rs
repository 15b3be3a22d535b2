//! The [`Converter`] seam and its LibreOffice implementation.
//!
//! Each invocation gets a private profile inside its own output directory,
//! so any number of conversions can run concurrently without LibreOffice's
//! profile lock files colliding. No mutex or queue serializes calls.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

/// Default wall-clock limit for one conversion. Overridable only through
/// [`LibreOffice::with_timeout`], never through the environment.
pub const CONVERT_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors returned by [`Converter::convert`].
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// The subprocess exceeded the configured timeout.
    #[error("conversion timed out")]
    Timeout,

    /// The subprocess exited successfully but produced no usable PDF.
    #[error("conversion produced no output")]
    NoOutput,

    /// The subprocess failed to run or exited non-zero. The detail string is
    /// for server-side logging only.
    #[error("conversion failed: {0}")]
    Failed(String),
}

/// Converts a staged DOCX file into a PDF inside `out_dir`.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Convert the file at `input`, writing the PDF into `out_dir`.
    /// Returns the absolute path of the generated PDF on success.
    async fn convert(&self, input: &Path, out_dir: &Path) -> Result<PathBuf, ConvertError>;
}

/// [`Converter`] implementation that shells out to LibreOffice.
#[derive(Debug, Clone)]
pub struct LibreOffice {
    binary_path: String,
    timeout: Duration,
}

impl LibreOffice {
    /// A converter invoking `binary_path` with the default timeout.
    pub fn new(binary_path: impl Into<String>) -> Self {
        Self {
            binary_path: binary_path.into(),
            timeout: CONVERT_TIMEOUT,
        }
    }

    /// Override the conversion timeout. Intended for direct construction in
    /// tests and embedders.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Converter for LibreOffice {
    async fn convert(&self, input: &Path, out_dir: &Path) -> Result<PathBuf, ConvertError> {
        let mut command = Command::new(&self.binary_path);
        command
            .arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(out_dir)
            .arg(input)
            // A fresh HOME and user profile inside out_dir isolates this
            // invocation from every concurrent one; the caller removes
            // out_dir afterwards, which deletes the profile with it.
            .env("HOME", out_dir)
            .env(
                "UserInstallation",
                format!("file://{}/lo-profile", out_dir.display()),
            )
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Err(_) => return Err(ConvertError::Timeout),
            Ok(result) => result.map_err(|err| {
                ConvertError::Failed(format!("failed to run {}: {err}", self.binary_path))
            })?,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ConvertError::Failed(format!(
                "exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        // LibreOffice names the output after the input file with a .pdf
        // extension, directly in out_dir.
        let pdf_name = input
            .file_stem()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("input"))
            .with_extension("pdf");
        let pdf_path = out_dir.join(pdf_name);

        match tokio::fs::metadata(&pdf_path).await {
            Ok(meta) if meta.len() > 0 => Ok(pdf_path),
            _ => Err(ConvertError::NoOutput),
        }
    }
}
