// ─── Launch Task ───
// Starts the dedicated server in the foreground and waits for it to exit.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use crate::core::error::{RunError, RunResult};
use crate::core::process::{format_command_for_logs, program_name};

pub const ASSETS_FLAG: &str = "--assets";
pub const EARLY_PLUGINS_FLAG: &str = "--accept-early-plugins";

/// Server arguments in launch order: the caller's own, then the early plugin
/// flag if enabled, then `--assets <Assets.zip>` unless the caller already
/// passed `--assets`.
pub fn assemble_server_args(
    extra_args: &[String],
    enable_early_plugins: bool,
    assets_zip: &Path,
) -> Vec<String> {
    let mut args = extra_args.to_vec();

    if enable_early_plugins {
        args.push(EARLY_PLUGINS_FLAG.to_string());
    }

    if !contains_flag(&args, ASSETS_FLAG) {
        args.push(ASSETS_FLAG.to_string());
        args.push(assets_zip.to_string_lossy().to_string());
    }

    args
}

fn contains_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|arg| arg == flag)
}

/// Fully assembled `java [jvm args] -jar <server jar> [server args]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    pub java_bin: PathBuf,
    pub server_jar: PathBuf,
    /// The versioned `Server/` directory.
    pub working_dir: PathBuf,
    pub server_args: Vec<String>,
    pub jvm_args: Vec<String>,
}

impl LaunchCommand {
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.java_bin);
        cmd.args(&self.jvm_args)
            .arg("-jar")
            .arg(&self.server_jar)
            .args(&self.server_args)
            .current_dir(&self.working_dir);
        cmd
    }

    /// Copy/paste-able rendering of the command line.
    pub fn display(&self) -> String {
        format_command_for_logs(self.to_command().as_std())
    }
}

/// Run the server with inherited stdin/stdout/stderr and block until it exits.
///
/// Returns the server's exit code; a server killed by a signal reports 1.
pub async fn launch(command: &LaunchCommand) -> RunResult<i32> {
    let mut cmd = command.to_command();
    cmd.stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true);

    info!("Launching server with Java: {:?}", command.java_bin);
    debug!("Command (copy/paste): {}", command.display());

    let status = cmd.status().await.map_err(|source| RunError::Spawn {
        program: program_name(&command.java_bin),
        source,
    })?;

    let code = status.code().unwrap_or(1);
    info!("Server exited with code {}", code);
    Ok(code)
}
