//! DOCX → PDF conversion through a headless office suite

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, error, info};

/// How much converter stderr is kept for the user-facing message
const STDERR_EXCERPT_CHARS: usize = 100;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("converter '{0}' not found")]
    NotFound(String),

    #[error("conversion timed out after {0:?}")]
    Timeout(Duration),

    #[error("converter exited with code {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    #[error("converter reported success but {0} was not created")]
    MissingOutput(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct PdfConverter {
    program: String,
    timeout: Duration,
}

impl PdfConverter {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Convert `docx` into a PDF of the same stem inside `out_dir`
    pub async fn convert(&self, docx: &Path, out_dir: &Path) -> Result<PathBuf, ConvertError> {
        info!(
            program = %self.program,
            input = %docx.display(),
            "Converting to PDF"
        );

        let child = Command::new(&self.program)
            .arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(out_dir)
            .arg(docx)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, child).await {
            Err(_) => {
                error!(timeout_ms = self.timeout.as_millis() as u64, "PDF conversion timed out");
                return Err(ConvertError::Timeout(self.timeout));
            }
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                error!(program = %self.program, "Converter not found");
                return Err(ConvertError::NotFound(self.program.clone()));
            }
            Ok(result) => result?,
        };

        debug!(stdout = %String::from_utf8_lossy(&output.stdout), "Converter output");

        if !output.status.success() {
            let stderr: String = String::from_utf8_lossy(&output.stderr)
                .chars()
                .take(STDERR_EXCERPT_CHARS)
                .collect();
            error!(code = ?output.status.code(), %stderr, "Converter failed");
            return Err(ConvertError::Failed {
                code: output.status.code(),
                stderr,
            });
        }

        let stem = docx.file_stem().unwrap_or_default().to_string_lossy();
        let pdf = out_dir.join(format!("{}.pdf", stem));
        if !tokio::fs::try_exists(&pdf).await? {
            error!(expected = %pdf.display(), "Converter exited cleanly without output");
            return Err(ConvertError::MissingOutput(pdf));
        }

        info!(output = %pdf.display(), "PDF created");
        Ok(pdf)
    }
}
