use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use reqwest::Client;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::core::error::{RunError, RunResult};
use crate::core::http::build_http_client;

/// Streaming HTTP downloader with optional SHA-256 validation.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
}

impl Downloader {
    pub fn new() -> RunResult<Self> {
        Ok(Self::with_client(build_http_client()?))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Download `url` to `dest`, optionally validating SHA-256.
    ///
    /// The body is streamed into `<dest>.part` and renamed over `dest` only once
    /// it is complete (and matches `sha256_expected`, if given), so `dest`
    /// existing always means a finished download. Returns the byte count.
    pub async fn download_file(
        &self,
        url: &str,
        dest: &Path,
        sha256_expected: Option<&str>,
    ) -> RunResult<u64> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| RunError::io(parent, source))?;
        }

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RunError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let part_path = partial_path(dest);
        let result = stream_to_file(response, &part_path).await;
        let (written, actual) = match result {
            Ok(done) => done,
            Err(err) => {
                let _ = tokio::fs::remove_file(&part_path).await;
                return Err(err);
            }
        };

        if let Some(expected) = sha256_expected {
            if !actual.eq_ignore_ascii_case(expected.trim()) {
                let _ = tokio::fs::remove_file(&part_path).await;
                return Err(RunError::ChecksumMismatch {
                    path: dest.to_path_buf(),
                    expected: expected.to_string(),
                    actual,
                });
            }
        }

        tokio::fs::rename(&part_path, dest)
            .await
            .map_err(|source| RunError::io(dest, source))?;

        info!("Downloaded {} bytes: {} -> {:?}", written, url, dest);
        Ok(written)
    }
}

async fn stream_to_file(response: reqwest::Response, path: &Path) -> RunResult<(u64, String)> {
    let mut hasher = Sha256::new();
    let mut written = 0_u64;

    // Scoped so the handle is closed before the caller renames the file.
    {
        let mut file = tokio::fs::File::create(path)
            .await
            .map_err(|source| RunError::io(path, source))?;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            hasher.update(&chunk);
            file.write_all(&chunk)
                .await
                .map_err(|source| RunError::io(path, source))?;
            written += chunk.len() as u64;
        }

        file.flush()
            .await
            .map_err(|source| RunError::io(path, source))?;
    }

    let digest = hex::encode(hasher.finalize());
    debug!("Streamed {} bytes into {:?} (sha256 {})", written, path, digest);
    Ok((written, digest))
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}
