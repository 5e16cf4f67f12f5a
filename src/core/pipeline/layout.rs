use std::path::{Path, PathBuf};

use crate::core::placement::Bucket;
use crate::core::version::ServerVersion;

pub const DOWNLOADER_ARCHIVE: &str = "hytale-downloader.zip";
pub const SERVER_JAR: &str = "HytaleServer.jar";
pub const ASSETS_ARCHIVE: &str = "Assets.zip";

/// On-disk layout under the server root.
///
/// ```text
/// <root>/cache/hytale-downloader.zip
/// <root>/cache/game-<version>.zip
/// <root>/bin/<downloader binary>
/// <root>/runtime/<version>/Assets.zip
/// <root>/runtime/<version>/Server/HytaleServer.jar
/// <root>/runtime/<version>/Server/{mods,earlyplugins,plugins}/
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLayout {
    root: PathBuf,
}

impl CacheLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    pub fn downloader_archive(&self) -> PathBuf {
        self.cache_dir().join(DOWNLOADER_ARCHIVE)
    }

    pub fn downloader_binary(&self, file_name: &str) -> PathBuf {
        self.bin_dir().join(file_name)
    }

    pub fn game_archive(&self, version: &ServerVersion) -> PathBuf {
        self.cache_dir().join(format!("game-{version}.zip"))
    }

    pub fn runtime_dir(&self, version: &ServerVersion) -> PathBuf {
        self.root.join("runtime").join(version.as_str())
    }

    pub fn server_dir(&self, version: &ServerVersion) -> PathBuf {
        self.runtime_dir(version).join("Server")
    }

    pub fn server_jar(&self, version: &ServerVersion) -> PathBuf {
        self.server_dir(version).join(SERVER_JAR)
    }

    pub fn assets_archive(&self, version: &ServerVersion) -> PathBuf {
        self.runtime_dir(version).join(ASSETS_ARCHIVE)
    }

    pub fn bucket_dir(&self, version: &ServerVersion, bucket: Bucket) -> PathBuf {
        self.server_dir(version).join(bucket.dir_name())
    }
}
