// ─── Run configuration ───
// Everything the pipeline needs, resolved once before any work starts.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::error::{RunError, RunResult};
use crate::core::placement::{Bucket, PlacementRequest};

pub const DEFAULT_CONFIG_FILE: &str = "hytale-run.json";
pub const DEFAULT_DOWNLOADER_URL: &str = "https://downloader.hytale.com/hytale-downloader.zip";

/// A jar from another project that should be installed alongside the mod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludeEntry {
    pub path: PathBuf,
    #[serde(default = "default_include_directory")]
    pub directory: String,
}

fn default_include_directory() -> String {
    Bucket::Mods.dir_name().to_string()
}

/// Persisted as `hytale-run.json` (camelCase keys, every key optional).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunConfiguration {
    /// Root for `cache/`, `bin/` and `runtime/`.
    pub server_root_dir: PathBuf,
    pub downloader_zip_url: String,
    /// Expected SHA-256 of `hytale-downloader.zip`, checked on download.
    pub downloader_sha256: Option<String>,
    /// Release channel passed to the downloader; empty means its default.
    pub patchline: String,
    /// Informational; artifact selection happens before this crate runs.
    pub prefer_shadow_jar: bool,
    pub skip_downloader_update_check: bool,
    pub server_args: Vec<String>,
    pub jvm_args: Vec<String>,
    pub enable_early_plugin_loading: bool,
    /// Install the mod into `earlyplugins/` instead of `mods/`.
    pub as_early_plugin: bool,
    pub java_path: Option<PathBuf>,
    pub mod_jar: Option<PathBuf>,
    pub includes: Vec<IncludeEntry>,
}

impl Default for RunConfiguration {
    fn default() -> Self {
        Self {
            server_root_dir: PathBuf::from("run"),
            downloader_zip_url: DEFAULT_DOWNLOADER_URL.to_string(),
            downloader_sha256: None,
            patchline: String::new(),
            prefer_shadow_jar: true,
            skip_downloader_update_check: true,
            server_args: Vec::new(),
            jvm_args: Vec::new(),
            enable_early_plugin_loading: false,
            as_early_plugin: false,
            java_path: None,
            mod_jar: None,
            includes: Vec::new(),
        }
    }
}

/// The primary build artifact plus every validated extra artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementPlan {
    pub primary: PlacementRequest,
    pub includes: Vec<PlacementRequest>,
}

impl RunConfiguration {
    /// Read a config file. Relative paths inside it are resolved against the
    /// file's own directory.
    pub fn load(path: &Path) -> RunResult<Self> {
        let bytes = std::fs::read(path).map_err(|source| RunError::io(path, source))?;
        let config: RunConfiguration = serde_json::from_slice(&bytes)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        debug!("Loaded configuration from {:?}", path);
        Ok(config.resolve_paths(base))
    }

    /// Make every configured path absolute relative to `base`.
    pub fn resolve_paths(mut self, base: &Path) -> Self {
        self.server_root_dir = absolutize(base, &self.server_root_dir);
        self.mod_jar = self.mod_jar.map(|p| absolutize(base, &p));
        self.java_path = self.java_path.map(|p| absolutize(base, &p));
        for include in &mut self.includes {
            include.path = absolutize(base, &include.path);
        }
        self
    }

    pub fn primary_bucket(&self) -> Bucket {
        if self.as_early_plugin {
            Bucket::EarlyPlugins
        } else {
            Bucket::Mods
        }
    }

    /// Validate the artifact configuration before anything touches disk.
    ///
    /// Fails on a missing or non-existent `modJar` and on any include naming
    /// an unsupported directory. Repeated includes are collapsed.
    pub fn placement_plan(&self) -> RunResult<PlacementPlan> {
        let mod_jar = self.mod_jar.as_ref().ok_or_else(|| {
            RunError::Configuration("No build artifact configured (set modJar or --mod-jar)".into())
        })?;
        if !mod_jar.is_file() {
            return Err(RunError::Configuration(format!(
                "Build artifact not found: {}",
                mod_jar.display()
            )));
        }
        let primary = PlacementRequest::new(mod_jar, self.primary_bucket());

        let mut seen = HashSet::new();
        let mut includes = Vec::with_capacity(self.includes.len());
        for entry in &self.includes {
            let request = PlacementRequest::parse(&entry.path, &entry.directory)?;
            if request == primary {
                continue;
            }
            if seen.insert((request.source.clone(), request.bucket)) {
                includes.push(request);
            }
        }

        Ok(PlacementPlan { primary, includes })
    }
}

fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
