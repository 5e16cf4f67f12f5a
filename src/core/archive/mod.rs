// ─── Archive Utilities ───
// Zip extraction for the downloader archive and the server bundle.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tracing::debug;
use zip::ZipArchive;

use crate::core::error::{RunError, RunResult};

fn open_archive(archive_path: &Path) -> RunResult<ZipArchive<BufReader<File>>> {
    let file = File::open(archive_path).map_err(|source| RunError::io(archive_path, source))?;
    Ok(ZipArchive::new(BufReader::new(file))?)
}

/// Extract every entry of `archive_path` into `dest_dir`, keeping relative paths.
///
/// Directory entries are created even when empty. Entries whose path would
/// resolve outside `dest_dir` (absolute paths, `..` components) are rejected
/// with [`RunError::UnsafeEntry`] before anything is written for them.
///
/// Returns the number of files written.
pub fn extract_all(archive_path: &Path, dest_dir: &Path) -> RunResult<usize> {
    let mut archive = open_archive(archive_path)?;

    std::fs::create_dir_all(dest_dir).map_err(|source| RunError::io(dest_dir, source))?;

    let mut written = 0;
    for index in 0..archive.len() {
        let mut zipped = archive.by_index(index)?;

        let Some(rel_path) = zipped.enclosed_name() else {
            return Err(RunError::UnsafeEntry {
                archive: archive_path.to_path_buf(),
                entry: zipped.name().to_string(),
            });
        };
        if rel_path.as_os_str().is_empty() {
            continue;
        }

        let out_path = dest_dir.join(rel_path);
        if zipped.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|source| RunError::io(&out_path, source))?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| RunError::io(parent, source))?;
        }

        let mut out = File::create(&out_path).map_err(|source| RunError::io(&out_path, source))?;
        std::io::copy(&mut zipped, &mut out).map_err(|source| RunError::io(&out_path, source))?;
        written += 1;
    }

    debug!("Extracted {} files from {:?} into {:?}", written, archive_path, dest_dir);
    Ok(written)
}

/// Copy the single entry named exactly `entry_name` to `dest_path`.
///
/// Entries are scanned in archive order; the first exact match wins.
pub fn extract_one(archive_path: &Path, entry_name: &str, dest_path: &Path) -> RunResult<()> {
    let mut archive = open_archive(archive_path)?;

    for index in 0..archive.len() {
        let mut zipped = archive.by_index(index)?;
        if zipped.name() != entry_name {
            continue;
        }

        if let Some(parent) = dest_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| RunError::io(parent, source))?;
        }

        let mut out = File::create(dest_path).map_err(|source| RunError::io(dest_path, source))?;
        std::io::copy(&mut zipped, &mut out).map_err(|source| RunError::io(dest_path, source))?;
        return Ok(());
    }

    Err(RunError::EntryNotFound {
        archive: archive_path.to_path_buf(),
        entry: entry_name.to_string(),
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::io::Write;
    use std::path::Path;

    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    /// Writes a zip with the given `(name, bytes)` entries. Names ending in `/`
    /// become directory entries.
    pub fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = std::fs::File::create(path).unwrap();
        let mut writer = ZipWriter::new(file);
        for (name, bytes) in entries {
            if name.ends_with('/') {
                writer.add_directory(*name, SimpleFileOptions::default()).unwrap();
            } else {
                writer.start_file(*name, SimpleFileOptions::default()).unwrap();
                writer.write_all(bytes).unwrap();
            }
        }
        writer.finish().unwrap();
    }
}
