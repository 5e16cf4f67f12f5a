// ─── Subprocess helpers ───
// Runs the downloader either with plain stdio passthrough or with its output
// tee'd into a capture buffer.

use std::io::{self, Write};
use std::path::Path;
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::debug;

use super::tee::{SharedBuffer, TeeWriter};
use crate::core::error::{RunError, RunResult};

/// Short display name for a program path, used in logs and errors.
pub fn program_name(program: &Path) -> String {
    program
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| program.display().to_string())
}

/// Run `cmd` with stdout/stderr inherited and stdin closed.
pub async fn run_with_passthrough(mut cmd: Command) -> RunResult<()> {
    let program = program_name(Path::new(cmd.as_std().get_program()));
    cmd.stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    debug!("Running: {}", format_command_for_logs(cmd.as_std()));
    let status = cmd.status().await.map_err(|source| RunError::Spawn {
        program: program.clone(),
        source,
    })?;
    check_status(&program, status)
}

/// Run `cmd`, forwarding its stdout/stderr live to ours while also capturing
/// both into one buffer in arrival order. Returns the captured text.
///
/// Both pipes are drained concurrently so the child can never stall on a
/// full pipe that nobody reads.
pub async fn run_captured(mut cmd: Command) -> RunResult<String> {
    let program = program_name(Path::new(cmd.as_std().get_program()));
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!("Running: {}", format_command_for_logs(cmd.as_std()));
    let mut child = cmd.spawn().map_err(|source| RunError::Spawn {
        program: program.clone(),
        source,
    })?;

    let capture = SharedBuffer::default();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let (out_result, err_result) = tokio::join!(
        pump(stdout, TeeWriter::new(io::stdout(), capture.clone())),
        pump(stderr, TeeWriter::new(io::stderr(), capture.clone())),
    );
    let status = child.wait().await.map_err(|source| RunError::Spawn {
        program: program.clone(),
        source,
    })?;
    out_result.map_err(|source| RunError::io(Path::new(&program), source))?;
    err_result.map_err(|source| RunError::io(Path::new(&program), source))?;

    check_status(&program, status)?;
    Ok(capture.to_string_lossy())
}

async fn pump<R, W>(reader: Option<R>, mut sink: W) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: Write,
{
    let Some(mut reader) = reader else {
        return Ok(());
    };

    let mut buf = [0_u8; 8192];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        sink.write_all(&buf[..n])?;
        sink.flush()?;
    }
    Ok(())
}

fn check_status(program: &str, status: ExitStatus) -> RunResult<()> {
    if status.success() {
        Ok(())
    } else {
        Err(RunError::Process {
            program: program.to_string(),
            code: status.code(),
        })
    }
}

pub fn format_command_for_logs(cmd: &std::process::Command) -> String {
    let program = shell_escape(&cmd.get_program().to_string_lossy());
    let args = cmd
        .get_args()
        .map(|arg| shell_escape(&arg.to_string_lossy()))
        .collect::<Vec<_>>()
        .join(" ");

    if args.is_empty() {
        program
    } else {
        format!("{} {}", program, args)
    }
}

fn shell_escape(raw: &str) -> String {
    if raw.is_empty() {
        return "\"\"".to_string();
    }

    if raw.chars().all(|ch| {
        ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '/' | ':' | '\\' | '=')
    }) {
        return raw.to_string();
    }

    format!("\"{}\"", raw.replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_quotes_only_when_needed() {
        let mut cmd = std::process::Command::new("/opt/java/bin/java");
        cmd.args(["-jar", "Hytale Server.jar", "--assets", ""]);
        assert_eq!(
            format_command_for_logs(&cmd),
            "/opt/java/bin/java -jar \"Hytale Server.jar\" --assets \"\""
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn captured_output_merges_stdout_and_stderr() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo out; echo err 1>&2"]);
        let text = run_captured(cmd).await.unwrap();
        assert!(text.contains("out\n"));
        assert!(text.contains("err\n"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn captured_run_drains_large_output_without_stalling() {
        let mut cmd = Command::new("sh");
        cmd.args([
            "-c",
            "i=0; while [ $i -lt 2000 ]; do echo 'filler line for the stderr pipe buffer' 1>&2; i=$((i+1)); done; echo done",
        ]);
        let text = run_captured(cmd).await.unwrap();

        // stdout and stderr are separate pipes; only per-stream order is kept.
        let filler = text.lines().filter(|l| l.starts_with("filler")).count();
        assert_eq!(filler, 2000);
        assert!(text.contains("done\n"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_a_process_error() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "exit 7"]);
        let err = run_with_passthrough(cmd).await.unwrap_err();
        assert!(matches!(err, RunError::Process { code: Some(7), .. }));
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let cmd = Command::new("/definitely/not/a/real/hytale-downloader");
        let err = run_captured(cmd).await.unwrap_err();
        assert!(matches!(err, RunError::Spawn { .. }));
    }
}
