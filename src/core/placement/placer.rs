use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::bucket::{file_name_of, Bucket, PlacementRequest};
use crate::core::error::{RunError, RunResult};

/// File names written into one bucket during a single placement run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlacementResult {
    pub files: Vec<String>,
}

/// Pick a destination name for `original` that no earlier source of this run
/// has claimed.
///
/// `original` itself may replace a file left on disk by a previous run, so a
/// re-run with the same artifact reuses its name. Suffixed candidates
/// (`name-1.jar`, `name-2.jar`, ...) must be free on disk as well.
pub fn unique_file_name(
    original: &str,
    on_disk: &HashSet<String>,
    claimed: &HashSet<String>,
) -> String {
    if !claimed.contains(original) {
        return original.to_string();
    }

    let (base, ext) = match original.rfind('.') {
        Some(dot) if dot > 0 => original.split_at(dot),
        _ => (original, ""),
    };

    (1_u32..)
        .map(|i| format!("{base}-{i}{ext}"))
        .find(|candidate| !on_disk.contains(candidate) && !claimed.contains(candidate))
        .unwrap_or_else(|| original.to_string())
}

/// Copies build artifacts into `Server/{mods,earlyplugins,plugins}`.
#[derive(Debug, Clone)]
pub struct ArtifactPlacer {
    server_dir: PathBuf,
}

impl ArtifactPlacer {
    pub fn new(server_dir: impl Into<PathBuf>) -> Self {
        Self {
            server_dir: server_dir.into(),
        }
    }

    pub fn bucket_dir(&self, bucket: Bucket) -> PathBuf {
        self.server_dir.join(bucket.dir_name())
    }

    /// Install `primary` unconditionally into its bucket, then every `.jar`
    /// in `requests`, in order, bucket by bucket.
    ///
    /// All bucket directories are created even if nothing goes into them.
    /// Additional sources that are not jars or not regular files are skipped.
    pub fn place(
        &self,
        primary: &PlacementRequest,
        requests: &[PlacementRequest],
    ) -> RunResult<BTreeMap<Bucket, PlacementResult>> {
        let primary_name = primary
            .file_name()
            .filter(|_| primary.source.is_file())
            .ok_or_else(|| {
                RunError::Configuration(format!(
                    "Build artifact not found: {}",
                    primary.source.display()
                ))
            })?;

        let mut results = BTreeMap::new();
        for bucket in Bucket::ALL {
            let dest_dir = self.bucket_dir(bucket);
            std::fs::create_dir_all(&dest_dir).map_err(|source| RunError::io(&dest_dir, source))?;

            let mut on_disk = list_file_names(&dest_dir)?;
            let mut claimed = HashSet::new();
            let mut seen_sources = HashSet::new();
            let mut result = PlacementResult::default();

            if bucket == primary.bucket {
                info!("Copying build artifact -> {:?}", dest_dir);
                copy_file(&primary.source, &dest_dir.join(&primary_name))?;
                claimed.insert(primary_name.clone());
                seen_sources.insert(primary.source.clone());
                result.files.push(primary_name.clone());
            }

            for request in requests.iter().filter(|r| r.bucket == bucket) {
                if !seen_sources.insert(request.source.clone()) {
                    debug!("Skipping duplicate artifact {:?}", request.source);
                    continue;
                }

                let Some(name) = request.file_name().filter(|n| n.ends_with(".jar")) else {
                    debug!("Skipping non-jar artifact {:?}", request.source);
                    continue;
                };
                if !request.source.is_file() {
                    warn!("Included artifact {:?} does not exist, skipping", request.source);
                    continue;
                }

                let dest_name = unique_file_name(&name, &on_disk, &claimed);
                if dest_name != name {
                    info!("Renaming {} -> {} in {} to avoid a collision", name, dest_name, bucket);
                }
                copy_file(&request.source, &dest_dir.join(&dest_name))?;
                on_disk.insert(dest_name.clone());
                claimed.insert(dest_name.clone());
                result.files.push(dest_name);
            }

            results.insert(bucket, result);
        }

        Ok(results)
    }
}

fn list_file_names(dir: &Path) -> RunResult<HashSet<String>> {
    let entries = std::fs::read_dir(dir).map_err(|source| RunError::io(dir, source))?;
    let mut names = HashSet::new();
    for entry in entries {
        let entry = entry.map_err(|source| RunError::io(dir, source))?;
        if let Some(name) = file_name_of(&entry.path()) {
            names.insert(name);
        }
    }
    Ok(names)
}

fn copy_file(from: &Path, to: &Path) -> RunResult<()> {
    if let Some(parent) = to.parent() {
        std::fs::create_dir_all(parent).map_err(|source| RunError::io(parent, source))?;
    }
    std::fs::copy(from, to).map_err(|source| RunError::io(to, source))?;
    debug!("Copied {:?} -> {:?}", from, to);
    Ok(())
}
