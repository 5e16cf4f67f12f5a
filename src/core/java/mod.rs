use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::debug;

fn java_exe() -> &'static str {
    if cfg!(windows) {
        "java.exe"
    } else {
        "java"
    }
}

/// Java binary used to start the server.
///
/// Order: the configured path, `$JAVA_HOME/bin/java`, then plain `java`
/// from `PATH`.
pub fn resolve_java_binary(configured: Option<&Path>) -> PathBuf {
    resolve_with_java_home(configured, std::env::var_os("JAVA_HOME"))
}

fn resolve_with_java_home(configured: Option<&Path>, java_home: Option<OsString>) -> PathBuf {
    if let Some(path) = configured {
        return path.to_path_buf();
    }

    if let Some(home) = java_home.filter(|home| !home.is_empty()) {
        let candidate = PathBuf::from(home).join("bin").join(java_exe());
        if candidate.is_file() {
            debug!("Using Java from JAVA_HOME: {:?}", candidate);
            return candidate;
        }
    }

    PathBuf::from(java_exe())
}
