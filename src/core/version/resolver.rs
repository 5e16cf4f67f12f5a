// ─── Server version resolution ───
// Asks hytale-downloader which server build is current and parses the answer.

use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tokio::process::Command;
use tracing::info;

use crate::core::error::{RunError, RunResult};
use crate::core::process::run_captured;

const VERSION_PATTERN: &str = r"\d{4}\.\d{2}\.\d{2}-[0-9a-fA-F]{7,}";

fn exact_version_regex() -> &'static Regex {
    static EXACT: OnceLock<Regex> = OnceLock::new();
    EXACT.get_or_init(|| {
        Regex::new(&format!("^{VERSION_PATTERN}$")).expect("valid version pattern")
    })
}

fn embedded_version_regex() -> &'static Regex {
    static EMBEDDED: OnceLock<Regex> = OnceLock::new();
    EMBEDDED.get_or_init(|| {
        Regex::new(&format!(r"\b{VERSION_PATTERN}\b")).expect("valid version pattern")
    })
}

/// A server build identifier such as `2026.01.13-dcad8778f`.
///
/// Used verbatim in cache file names and the runtime directory name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerVersion(String);

impl ServerVersion {
    /// Parse downloader output.
    ///
    /// The first non-blank line wins if it is exactly a version; otherwise the
    /// first version-shaped substring anywhere in the text is used.
    pub fn parse_output(output: &str) -> Option<Self> {
        let first_line = output.lines().map(str::trim).find(|line| !line.is_empty())?;
        if exact_version_regex().is_match(first_line) {
            return Some(Self(first_line.to_string()));
        }

        embedded_version_regex()
            .find(output)
            .map(|found| Self(found.as_str().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Run `<binary> -print-version -skip-update-check` in `working_dir`.
///
/// The downloader's output is shown live and captured for parsing.
pub async fn resolve_server_version(binary: &Path, working_dir: &Path) -> RunResult<ServerVersion> {
    let mut cmd = Command::new(binary);
    cmd.args(["-print-version", "-skip-update-check"])
        .current_dir(working_dir);

    let output = run_captured(cmd).await?;
    let version = ServerVersion::parse_output(&output).ok_or_else(|| RunError::VersionParse {
        output: output.trim().to_string(),
    })?;

    info!("Resolved server version {}", version);
    Ok(version)
}
