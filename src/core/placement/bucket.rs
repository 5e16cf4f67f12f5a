use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::core::error::{RunError, RunResult};

/// Destination category inside the server's `Server/` directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Bucket {
    Mods,
    EarlyPlugins,
    Plugins,
}

impl Bucket {
    pub const ALL: [Bucket; 3] = [Bucket::Mods, Bucket::EarlyPlugins, Bucket::Plugins];

    /// Subdirectory name under `Server/`.
    pub fn dir_name(self) -> &'static str {
        match self {
            Bucket::Mods => "mods",
            Bucket::EarlyPlugins => "earlyplugins",
            Bucket::Plugins => "plugins",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl FromStr for Bucket {
    type Err = RunError;

    /// Accepts `mods`, `earlyplugins` and `plugins`, ignoring surrounding
    /// whitespace and slashes (`" /mods/ "` is `mods`).
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let name = raw.trim().trim_matches('/').trim();
        if name.is_empty() {
            return Err(RunError::Configuration(
                "directory must not be blank".to_string(),
            ));
        }
        if name.starts_with('.') {
            return Err(RunError::Configuration(format!(
                "directory '{name}' must be relative to Server/ (no '.' prefix)"
            )));
        }

        Bucket::ALL
            .into_iter()
            .find(|bucket| bucket.dir_name() == name)
            .ok_or_else(|| {
                RunError::Configuration(format!(
                    "Unsupported directory '{name}'. Supported: mods, earlyplugins, plugins."
                ))
            })
    }
}

/// One build artifact and the bucket it should be installed into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementRequest {
    pub source: PathBuf,
    pub bucket: Bucket,
}

impl PlacementRequest {
    pub fn new(source: impl Into<PathBuf>, bucket: Bucket) -> Self {
        Self {
            source: source.into(),
            bucket,
        }
    }

    /// Validate a raw bucket name at ingestion time.
    pub fn parse(source: impl Into<PathBuf>, bucket: &str) -> RunResult<Self> {
        Ok(Self::new(source, bucket.parse()?))
    }

    pub fn file_name(&self) -> Option<String> {
        file_name_of(&self.source)
    }
}

pub(crate) fn file_name_of(path: &Path) -> Option<String> {
    path.file_name().map(|name| name.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supported_names_with_slashes_and_whitespace() {
        assert_eq!("mods".parse::<Bucket>().unwrap(), Bucket::Mods);
        assert_eq!(" /earlyplugins/ ".parse::<Bucket>().unwrap(), Bucket::EarlyPlugins);
        assert_eq!("plugins/".parse::<Bucket>().unwrap(), Bucket::Plugins);
    }

    #[test]
    fn rejects_unknown_blank_and_dotted_names() {
        for raw in ["config", "", "  / ", "./mods", "Mods"] {
            let err = raw.parse::<Bucket>().unwrap_err();
            assert!(matches!(err, RunError::Configuration(_)), "{raw:?}");
        }
    }

    #[test]
    fn request_parse_reports_unsupported_directory() {
        let err = PlacementRequest::parse("/build/libs/a.jar", "worlds").unwrap_err();
        assert!(err.to_string().contains("Unsupported directory 'worlds'"));
    }
}
