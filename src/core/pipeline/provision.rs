// ─── Provisioning pipeline ───
// downloader archive → downloader binary → version → server bundle →
// runtime extraction → artifact placement → launch.
//
// Every stage checks for its own output on disk first, so an interrupted run
// resumes at the first stage whose output is missing.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{info, warn};

use super::layout::CacheLayout;
use crate::core::archive;
use crate::core::config::RunConfiguration;
use crate::core::downloader::{current_platform, Downloader, DownloaderBinary};
use crate::core::error::{RunError, RunResult};
use crate::core::java::resolve_java_binary;
use crate::core::launch::{assemble_server_args, launch, LaunchCommand};
use crate::core::placement::{ArtifactPlacer, Bucket, PlacementResult};
use crate::core::process::run_with_passthrough;
use crate::core::version::{resolve_server_version, ServerVersion};

/// Result of stages 1–6: a provisioned runtime and the command that starts it.
#[derive(Debug, Clone)]
pub struct PreparedServer {
    pub version: ServerVersion,
    pub runtime_dir: PathBuf,
    pub placements: BTreeMap<Bucket, PlacementResult>,
    pub launch: LaunchCommand,
}

pub struct ProvisioningPipeline {
    config: RunConfiguration,
    layout: CacheLayout,
    downloader: Downloader,
    platform: DownloaderBinary,
}

impl ProvisioningPipeline {
    pub fn new(config: RunConfiguration) -> RunResult<Self> {
        Self::with_downloader(config, Downloader::new()?)
    }

    pub fn with_downloader(config: RunConfiguration, downloader: Downloader) -> RunResult<Self> {
        let root = if config.server_root_dir.is_absolute() {
            config.server_root_dir.clone()
        } else {
            std::env::current_dir()?.join(&config.server_root_dir)
        };

        Ok(Self {
            config,
            layout: CacheLayout::new(root),
            downloader,
            platform: current_platform(),
        })
    }

    pub fn layout(&self) -> &CacheLayout {
        &self.layout
    }

    /// Provision everything and start the server; returns its exit code.
    pub async fn run(&self) -> RunResult<i32> {
        let prepared = self.prepare().await?;
        info!(
            "Starting server (version {}): {}",
            prepared.version,
            prepared.launch.display()
        );
        launch(&prepared.launch).await
    }

    /// Run every stage up to, but not including, the server launch.
    pub async fn prepare(&self) -> RunResult<PreparedServer> {
        // Artifact configuration errors must surface before any side effect.
        let plan = self.config.placement_plan()?;

        for dir in [self.layout.cache_dir(), self.layout.bin_dir()] {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|source| RunError::io(&dir, source))?;
        }

        let archive_path = self.ensure_downloader_archive().await?;
        let binary = self.ensure_downloader_binary(&archive_path)?;
        let version = resolve_server_version(&binary, self.layout.root()).await?;
        let game_archive = self.ensure_server_bundle(&binary, &version).await?;
        self.ensure_runtime_extracted(&game_archive, &version)?;

        let placer = ArtifactPlacer::new(self.layout.server_dir(&version));
        let placements = placer.place(&plan.primary, &plan.includes)?;

        let server_args = assemble_server_args(
            &self.config.server_args,
            self.config.enable_early_plugin_loading,
            &self.layout.assets_archive(&version),
        );
        let launch = LaunchCommand {
            java_bin: resolve_java_binary(self.config.java_path.as_deref()),
            server_jar: self.layout.server_jar(&version),
            working_dir: self.layout.server_dir(&version),
            server_args,
            jvm_args: self.config.jvm_args.clone(),
        };

        Ok(PreparedServer {
            runtime_dir: self.layout.runtime_dir(&version),
            version,
            placements,
            launch,
        })
    }

    // ── Stage 1 ─────────────────────────────────────────

    async fn ensure_downloader_archive(&self) -> RunResult<PathBuf> {
        let archive_path = self.layout.downloader_archive();
        if archive_path.exists() {
            return Ok(archive_path);
        }

        info!(
            "Downloading hytale-downloader.zip -> {}",
            archive_path.display()
        );
        self.downloader
            .download_file(
                &self.config.downloader_zip_url,
                &archive_path,
                self.config.downloader_sha256.as_deref(),
            )
            .await?;
        Ok(archive_path)
    }

    // ── Stage 2 ─────────────────────────────────────────

    fn ensure_downloader_binary(&self, archive_path: &Path) -> RunResult<PathBuf> {
        let binary = self.layout.downloader_binary(self.platform.file_name);
        if binary.exists() {
            return Ok(binary);
        }

        info!(
            "Extracting {} -> {}",
            self.platform.entry_name,
            binary.display()
        );
        archive::extract_one(archive_path, self.platform.entry_name, &binary)?;

        if self.platform.needs_executable_bit {
            tolerate_chmod_failure(&binary, make_executable(&binary));
        }
        Ok(binary)
    }

    // ── Stage 4 ─────────────────────────────────────────

    async fn ensure_server_bundle(
        &self,
        binary: &Path,
        version: &ServerVersion,
    ) -> RunResult<PathBuf> {
        let game_archive = self.layout.game_archive(version);
        if game_archive.exists() {
            info!("Using cached server zip: {}", game_archive.display());
            return Ok(game_archive);
        }

        info!(
            "Downloading Hytale server zip for version '{}' -> {}",
            version,
            game_archive.display()
        );
        let mut cmd = Command::new(binary);
        cmd.args(self.download_args(&game_archive))
            .current_dir(self.layout.root());
        run_with_passthrough(cmd).await?;

        let len = tokio::fs::metadata(&game_archive)
            .await
            .map(|m| m.len())
            .unwrap_or(0);
        if len == 0 {
            return Err(RunError::DownloadIntegrity { path: game_archive });
        }
        Ok(game_archive)
    }

    fn download_args(&self, game_archive: &Path) -> Vec<String> {
        let mut args = vec![
            "-download-path".to_string(),
            game_archive.to_string_lossy().to_string(),
        ];

        let patchline = self.config.patchline.trim();
        if !patchline.is_empty() {
            args.push("-patchline".to_string());
            args.push(patchline.to_string());
        }

        if self.config.skip_downloader_update_check {
            args.push("-skip-update-check".to_string());
        }
        args
    }

    // ── Stage 5 ─────────────────────────────────────────

    fn ensure_runtime_extracted(
        &self,
        game_archive: &Path,
        version: &ServerVersion,
    ) -> RunResult<()> {
        let runtime_dir = self.layout.runtime_dir(version);
        let server_jar = self.layout.server_jar(version);
        let assets = self.layout.assets_archive(version);

        if !server_jar.exists() || !assets.exists() {
            info!(
                "Extracting {} -> {}",
                game_archive.display(),
                runtime_dir.display()
            );
            if runtime_dir.exists() {
                std::fs::remove_dir_all(&runtime_dir)
                    .map_err(|source| RunError::io(&runtime_dir, source))?;
            }
            archive::extract_all(game_archive, &runtime_dir)?;
        }

        for marker in [server_jar, assets] {
            if !marker.exists() {
                return Err(RunError::MissingArtifact { path: marker });
            }
        }
        Ok(())
    }
}

/// A binary that could not be marked executable is still handed to the next
/// stage; spawning it reports the real problem.
fn tolerate_chmod_failure(binary: &Path, result: RunResult<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(err) => {
            warn!("Could not mark {:?} as executable: {}", binary, err);
            false
        }
    }
}

fn make_executable(path: &Path) -> RunResult<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(path)
            .map_err(|source| RunError::io(path, source))?
            .permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(path, perms).map_err(|source| RunError::io(path, source))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::core::archive::test_support::write_zip;
    use crate::core::config::IncludeEntry;
    use crate::core::downloader::client::test_support::{local_client, serve_once};

    const VERSION: &str = "2026.01.13-dcad8778f";

    struct Fixture {
        _temp: tempfile::TempDir,
        base: PathBuf,
        config: RunConfiguration,
    }

    impl Fixture {
        /// A project dir with a built mod jar, a mock java that records its
        /// arguments, a server bundle zip and a downloader archive whose
        /// binary copies that bundle when asked to download.
        fn new(download_action: &str) -> Self {
            let temp = tempfile::tempdir().unwrap();
            let base = temp.path().to_path_buf();

            let game_zip = base.join("fixtures/game.zip");
            std::fs::create_dir_all(game_zip.parent().unwrap()).unwrap();
            write_zip(
                &game_zip,
                &[
                    ("Assets.zip", b"assets"),
                    ("Server/", b""),
                    ("Server/HytaleServer.jar", b"server"),
                    ("Server/mods/", b""),
                ],
            );

            let action = download_action.replace("{game_zip}", &game_zip.to_string_lossy());
            let script = format!(
                "#!/bin/sh\n\
                 case \"$1\" in\n\
                 -print-version) echo 'hytale-downloader v1'; echo 'latest: {VERSION}' ;;\n\
                 -download-path) echo \"$@\" >> '{log}'; {action} ;;\n\
                 *) exit 2 ;;\n\
                 esac\n",
                log = base.join("downloads.log").display(),
            );
            write_zip(
                &base.join("fixtures/hytale-downloader.zip"),
                &[
                    ("QUICKSTART.md", b"readme"),
                    ("hytale-downloader-linux-amd64", script.as_bytes()),
                    ("hytale-downloader-windows-amd64.exe", b"MZ"),
                ],
            );

            let mod_jar = base.join("build/libs/mod.jar");
            std::fs::create_dir_all(mod_jar.parent().unwrap()).unwrap();
            std::fs::write(&mod_jar, b"mod").unwrap();

            let java = base.join("fake-java");
            std::fs::write(
                &java,
                format!(
                    "#!/bin/sh\nprintf '%s\\n' \"$@\" > '{}'\npwd > '{}'\n",
                    base.join("java-args.txt").display(),
                    base.join("java-cwd.txt").display()
                ),
            )
            .unwrap();
            make_executable(&java).unwrap();

            let config = RunConfiguration {
                server_root_dir: base.join("run"),
                java_path: Some(java),
                mod_jar: Some(mod_jar),
                ..RunConfiguration::default()
            };

            Self {
                _temp: temp,
                base,
                config,
            }
        }

        fn seed_downloader_archive(&self) {
            let cache = self.base.join("run/cache");
            std::fs::create_dir_all(&cache).unwrap();
            std::fs::copy(
                self.base.join("fixtures/hytale-downloader.zip"),
                cache.join("hytale-downloader.zip"),
            )
            .unwrap();
        }

        fn pipeline(&self) -> ProvisioningPipeline {
            ProvisioningPipeline::with_downloader(
                self.config.clone(),
                Downloader::with_client(local_client()),
            )
            .unwrap()
        }

        fn download_log(&self) -> Vec<String> {
            std::fs::read_to_string(self.base.join("downloads.log"))
                .unwrap_or_default()
                .lines()
                .map(str::to_string)
                .collect()
        }

        fn version(&self) -> ServerVersion {
            ServerVersion::parse_output(VERSION).unwrap()
        }
    }

    const COPY_BUNDLE: &str = "cp '{game_zip}' \"$2\"";

    #[tokio::test]
    async fn fresh_root_is_provisioned_and_server_launched() {
        let mut fixture = Fixture::new(COPY_BUNDLE);
        fixture.config.patchline = "pre-release".into();
        fixture.config.downloader_zip_url = serve_once(
            "200 OK",
            std::fs::read(fixture.base.join("fixtures/hytale-downloader.zip")).unwrap(),
        )
        .await;

        let pipeline = fixture.pipeline();
        let code = pipeline.run().await.unwrap();
        assert_eq!(code, 0);

        let layout = pipeline.layout();
        let version = fixture.version();
        assert!(layout.downloader_archive().is_file());
        assert!(layout.downloader_binary("hytale-downloader").is_file());
        assert!(layout.game_archive(&version).is_file());
        assert!(layout.server_jar(&version).is_file());
        assert!(layout.assets_archive(&version).is_file());
        for bucket in Bucket::ALL {
            assert!(layout.bucket_dir(&version, bucket).is_dir());
        }
        assert_eq!(
            std::fs::read(layout.bucket_dir(&version, Bucket::Mods).join("mod.jar")).unwrap(),
            b"mod"
        );

        let game_zip = layout.game_archive(&version);
        assert_eq!(
            fixture.download_log(),
            vec![format!(
                "-download-path {} -patchline pre-release -skip-update-check",
                game_zip.display()
            )]
        );

        let args = std::fs::read_to_string(fixture.base.join("java-args.txt")).unwrap();
        let args: Vec<&str> = args.lines().collect();
        let assets = layout.assets_archive(&version);
        assert_eq!(
            args,
            vec![
                "-jar",
                &*layout.server_jar(&version).to_string_lossy(),
                "--assets",
                &*assets.to_string_lossy(),
            ]
        );
        let cwd = std::fs::read_to_string(fixture.base.join("java-cwd.txt")).unwrap();
        assert_eq!(
            std::fs::canonicalize(cwd.trim()).unwrap(),
            std::fs::canonicalize(layout.server_dir(&version)).unwrap()
        );
    }

    #[tokio::test]
    async fn second_run_reuses_every_cached_stage() {
        let fixture = Fixture::new(COPY_BUNDLE);
        fixture.seed_downloader_archive();
        // Nothing listens here; any download attempt would fail the run.
        let mut config = fixture.config.clone();
        config.downloader_zip_url = "http://127.0.0.1:9/unreachable.zip".into();
        let pipeline = ProvisioningPipeline::with_downloader(
            config,
            Downloader::with_client(local_client()),
        )
        .unwrap();

        let first = pipeline.prepare().await.unwrap();
        let second = pipeline.prepare().await.unwrap();

        assert_eq!(first.version, second.version);
        assert_eq!(fixture.download_log().len(), 1);
        assert_eq!(second.placements[&Bucket::Mods].files, vec!["mod.jar"]);
    }

    #[tokio::test]
    async fn missing_assets_forces_full_reextraction() {
        let fixture = Fixture::new(COPY_BUNDLE);
        fixture.seed_downloader_archive();
        let pipeline = fixture.pipeline();
        let version = fixture.version();

        pipeline.prepare().await.unwrap();
        let runtime_dir = pipeline.layout().runtime_dir(&version);
        std::fs::remove_file(pipeline.layout().assets_archive(&version)).unwrap();
        std::fs::write(runtime_dir.join("stale.txt"), b"left over").unwrap();

        pipeline.prepare().await.unwrap();

        assert!(pipeline.layout().assets_archive(&version).is_file());
        assert!(pipeline.layout().server_jar(&version).is_file());
        assert!(!runtime_dir.join("stale.txt").exists());
    }

    #[tokio::test]
    async fn bundle_missing_after_download_is_an_integrity_error() {
        let fixture = Fixture::new(":");
        fixture.seed_downloader_archive();

        let err = fixture.pipeline().prepare().await.unwrap_err();

        assert!(matches!(err, RunError::DownloadIntegrity { .. }));
    }

    #[tokio::test]
    async fn bundle_without_server_jar_is_a_missing_artifact_error() {
        let fixture = Fixture::new(COPY_BUNDLE);
        write_zip(
            &fixture.base.join("fixtures/game.zip"),
            &[("Assets.zip", b"assets")],
        );
        fixture.seed_downloader_archive();

        let err = fixture.pipeline().prepare().await.unwrap_err();

        match err {
            RunError::MissingArtifact { path } => assert!(path.ends_with("Server/HytaleServer.jar")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn unknown_bucket_fails_before_any_side_effect() {
        let mut fixture = Fixture::new(COPY_BUNDLE);
        let lib = fixture.base.join("lib.jar");
        std::fs::write(&lib, b"lib").unwrap();
        fixture.config.includes = vec![
            IncludeEntry { path: lib.clone(), directory: "plugins".into() },
            IncludeEntry { path: lib, directory: "worlds".into() },
        ];

        let err = fixture.pipeline().prepare().await.unwrap_err();

        assert!(matches!(err, RunError::Configuration(_)));
        assert!(!fixture.base.join("run").exists());
    }

    #[tokio::test]
    async fn early_plugin_mode_routes_primary_and_flags_server() {
        let mut fixture = Fixture::new(COPY_BUNDLE);
        fixture.seed_downloader_archive();
        fixture.config.as_early_plugin = true;
        fixture.config.enable_early_plugin_loading = true;
        fixture.config.server_args = vec!["--assets".into(), "/custom/path".into()];
        fixture.config.jvm_args = vec!["-Xmx2G".into()];

        let prepared = fixture.pipeline().prepare().await.unwrap();

        assert_eq!(prepared.placements[&Bucket::EarlyPlugins].files, vec!["mod.jar"]);
        assert!(prepared.placements[&Bucket::Mods].files.is_empty());
        assert_eq!(
            prepared.launch.server_args,
            vec!["--assets", "/custom/path", "--accept-early-plugins"]
        );
        assert_eq!(prepared.launch.jvm_args, vec!["-Xmx2G"]);
    }

    #[test]
    fn chmod_failure_is_logged_not_propagated() {
        let temp = tempfile::tempdir().unwrap();
        let missing = temp.path().join("bin").join("hytale-downloader");

        let result = make_executable(&missing);
        assert!(matches!(result, Err(RunError::Io { .. })));
        assert!(!tolerate_chmod_failure(&missing, result));

        std::fs::create_dir_all(missing.parent().unwrap()).unwrap();
        std::fs::write(&missing, b"#!/bin/sh\n").unwrap();
        assert!(tolerate_chmod_failure(&missing, make_executable(&missing)));
    }

    #[test]
    fn download_args_omit_blank_patchline_and_optional_skip() {
        let mut config = RunConfiguration {
            server_root_dir: "/srv/run".into(),
            patchline: "   ".into(),
            skip_downloader_update_check: false,
            ..RunConfiguration::default()
        };
        let pipeline =
            ProvisioningPipeline::with_downloader(config.clone(), Downloader::with_client(local_client()))
                .unwrap();
        assert_eq!(
            pipeline.download_args(Path::new("/srv/run/cache/game-x.zip")),
            vec!["-download-path", "/srv/run/cache/game-x.zip"]
        );

        config.patchline = " release ".into();
        config.skip_downloader_update_check = true;
        let pipeline =
            ProvisioningPipeline::with_downloader(config, Downloader::with_client(local_client()))
                .unwrap();
        assert_eq!(
            pipeline.download_args(Path::new("/g.zip")),
            vec!["-download-path", "/g.zip", "-patchline", "release", "-skip-update-check"]
        );
    }
}
