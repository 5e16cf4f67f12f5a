use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the provisioning pipeline.
/// Every module returns `Result<T, RunError>`.
#[derive(Debug, Error)]
pub enum RunError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    // ── Integrity ───────────────────────────────────────
    #[error("SHA-256 mismatch for {path:?}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Downloader finished, but server bundle was not created at {path:?}")]
    DownloadIntegrity { path: PathBuf },

    #[error("Expected server file not found: {path:?}")]
    MissingArtifact { path: PathBuf },

    // ── Processes ───────────────────────────────────────
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("{program} exited with {}", exit_description(.code))]
    Process { program: String, code: Option<i32> },

    #[error("Could not parse server version from hytale-downloader output:\n{output}")]
    VersionParse { output: String },

    // ── Archive ─────────────────────────────────────────
    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Entry '{entry}' not found in zip: {archive:?}")]
    EntryNotFound { archive: PathBuf, entry: String },

    #[error("Zip entry '{entry}' in {archive:?} escapes the extraction directory")]
    UnsafeEntry { archive: PathBuf, entry: String },

    // ── Configuration ───────────────────────────────────
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type RunResult<T> = Result<T, RunError>;

impl RunError {
    /// Wraps an IO error with the path it happened at.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RunError::Io {
            path: path.into(),
            source,
        }
    }
}

impl RunError {
    /// This error's message followed by each distinct message in its
    /// `source()` chain, outermost first.
    pub fn chain(&self) -> Vec<String> {
        let mut messages = vec![self.to_string()];
        let mut current = std::error::Error::source(self);
        while let Some(cause) = current {
            let message = cause.to_string();
            if !messages.iter().any(|seen| seen.contains(&message)) {
                messages.push(message);
            }
            current = std::error::Error::source(cause);
        }
        messages
    }
}

impl From<std::io::Error> for RunError {
    fn from(source: std::io::Error) -> Self {
        RunError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}
