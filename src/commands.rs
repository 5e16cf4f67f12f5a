// ─── Command surface ───
// Resolves flags + hytale-run.json into one RunConfiguration and hands it to
// the provisioning pipeline.

use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::{debug, info};

use crate::core::config::{IncludeEntry, RunConfiguration, DEFAULT_CONFIG_FILE};
use crate::core::error::RunResult;
use crate::core::pipeline::ProvisioningPipeline;

#[derive(Debug, Parser)]
#[command(name = "hytale-run")]
#[command(
    about = "Downloads the current Hytale server, installs your mod jars and starts it",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to ./hytale-run.json when present)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Built mod jar to install
    #[arg(long, value_name = "PATH")]
    pub mod_jar: Option<PathBuf>,

    /// Root directory for cache/, bin/ and runtime/
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Release channel passed to hytale-downloader
    #[arg(long)]
    pub patchline: Option<String>,

    /// Java binary used to start the server
    #[arg(long, value_name = "PATH")]
    pub java: Option<PathBuf>,

    /// Extra jar to install, as BUCKET=PATH (bucket: mods, earlyplugins, plugins) or PATH
    #[arg(long = "include", value_name = "BUCKET=PATH")]
    pub includes: Vec<String>,

    /// Extra JVM argument (repeatable)
    #[arg(long = "jvm-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub jvm_args: Vec<String>,

    /// Install the mod into earlyplugins/ instead of mods/
    #[arg(long)]
    pub early_plugin: bool,

    /// Start the server with --accept-early-plugins
    #[arg(long)]
    pub accept_early_plugins: bool,

    /// Let hytale-downloader check for its own updates
    #[arg(long)]
    pub check_updates: bool,

    /// Provision everything and print the launch command instead of starting the server
    #[arg(long)]
    pub prepare_only: bool,

    /// Arguments passed through to the server
    #[arg(last = true, value_name = "SERVER_ARGS")]
    pub server_args: Vec<String>,
}

impl Cli {
    /// Config file (if any) first, then flags on top. Relative flag paths are
    /// resolved against `cwd`.
    pub fn resolve_configuration(&self, cwd: &Path) -> RunResult<RunConfiguration> {
        let mut config = match &self.config {
            Some(path) => RunConfiguration::load(&cwd.join(path))?,
            None => {
                let default_path = cwd.join(DEFAULT_CONFIG_FILE);
                if default_path.is_file() {
                    RunConfiguration::load(&default_path)?
                } else {
                    debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                    RunConfiguration::default().resolve_paths(cwd)
                }
            }
        };

        if let Some(mod_jar) = &self.mod_jar {
            config.mod_jar = Some(cwd.join(mod_jar));
        }
        if let Some(root) = &self.root {
            config.server_root_dir = cwd.join(root);
        }
        if let Some(patchline) = &self.patchline {
            config.patchline = patchline.clone();
        }
        if let Some(java) = &self.java {
            config.java_path = Some(cwd.join(java));
        }
        config
            .includes
            .extend(self.includes.iter().map(|raw| parse_include(raw, cwd)));
        config.jvm_args.extend(self.jvm_args.iter().cloned());
        config.server_args.extend(self.server_args.iter().cloned());
        config.as_early_plugin |= self.early_plugin;
        config.enable_early_plugin_loading |= self.accept_early_plugins;
        if self.check_updates {
            config.skip_downloader_update_check = false;
        }

        Ok(config)
    }
}

/// `BUCKET=PATH`, or a bare `PATH` meaning `mods`. The bucket name itself is
/// validated later, together with the rest of the configuration.
fn parse_include(raw: &str, cwd: &Path) -> IncludeEntry {
    match raw.split_once('=') {
        Some((directory, path)) => IncludeEntry {
            path: cwd.join(path),
            directory: directory.to_string(),
        },
        None => IncludeEntry {
            path: cwd.join(raw),
            directory: "mods".to_string(),
        },
    }
}

/// Run the CLI; returns the process exit code.
pub async fn execute(cli: Cli) -> RunResult<i32> {
    let cwd = std::env::current_dir()?;
    let config = cli.resolve_configuration(&cwd)?;
    info!("Server root: {}", config.server_root_dir.display());
    if config.prefer_shadow_jar {
        debug!("preferShadowJar is set; artifact selection happens upstream");
    }

    let pipeline = ProvisioningPipeline::new(config)?;
    if cli.prepare_only {
        let prepared = pipeline.prepare().await?;
        info!(
            "Server {} ready in {}",
            prepared.version,
            prepared.runtime_dir.display()
        );
        println!("{}", prepared.launch.display());
        return Ok(0);
    }

    pipeline.run().await
}
