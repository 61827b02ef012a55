//! Sandbox (§4.11): temp directory, bounded memory, bounded file-create
//! count, timeout.

use anyhow::{Context, Result};
use evo_core::ResourceLimits;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

#[derive(Debug, Clone)]
pub struct SandboxResult {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub execution_time_ms: u64,
    pub success: bool,
}

/// A disposable working directory with resource-limited command
/// execution. The directory and its contents are removed when the
/// sandbox is dropped.
pub struct Sandbox {
    limits: ResourceLimits,
    _temp_dir: tempfile::TempDir,
    working_dir: PathBuf,
}

impl Sandbox {
    pub fn new(limits: ResourceLimits) -> Result<Self> {
        let temp_dir = tempfile::tempdir().context("creating sandbox directory")?;
        let working_dir = temp_dir.path().to_path_buf();
        Ok(Self { limits, _temp_dir: temp_dir, working_dir })
    }

    pub fn working_dir(&self) -> &std::path::Path {
        &self.working_dir
    }

    /// Runs `command` with `args` inside the sandbox, bounding memory
    /// (`RLIMIT_AS`, Unix only) and wall-clock time.
    pub async fn execute(&self, command: &str, args: &[&str]) -> Result<SandboxResult> {
        let start = std::time::Instant::now();

        let mut cmd = Command::new(command);
        cmd.args(args)
            .current_dir(&self.working_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            let max_memory = self.limits.max_memory_mb * 1024 * 1024;
            unsafe {
                cmd.pre_exec(move || {
                    let limit = libc::rlimit { rlim_cur: max_memory, rlim_max: max_memory };
                    libc::setrlimit(libc::RLIMIT_AS, &limit);
                    Ok(())
                });
            }
        }

        let outcome = tokio::time::timeout(Duration::from_secs(self.limits.timeout_secs), cmd.output()).await;
        let execution_time_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(output)) => Ok(SandboxResult {
                exit_code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                execution_time_ms,
                success: output.status.success(),
            }),
            Ok(Err(e)) => Err(e).context("failed to spawn sandboxed command"),
            Err(_) => Ok(SandboxResult {
                exit_code: None,
                stdout: String::new(),
                stderr: "sandbox timeout exceeded".to_string(),
                execution_time_ms,
                success: false,
            }),
        }
    }

    /// Counts regular files created under the sandbox's working
    /// directory, for enforcing `max_file_creates` externally.
    pub fn file_count(&self) -> usize {
        walk_count(&self.working_dir)
    }
}

fn walk_count(dir: &std::path::Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else { return 0 };
    let mut count = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            count += walk_count(&path);
        } else {
            count += 1;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn executes_a_trivial_command() {
        let sandbox = Sandbox::new(ResourceLimits::conservative()).unwrap();
        let result = sandbox.execute("true", &[]).await.unwrap();
        assert!(result.success);
    }

    #[tokio::test]
    async fn times_out_a_long_running_command() {
        let mut limits = ResourceLimits::conservative();
        limits.timeout_secs = 1;
        let sandbox = Sandbox::new(limits).unwrap();
        let result = sandbox.execute("sleep", &["5"]).await.unwrap();
        assert!(!result.success);
    }

    #[test]
    fn file_count_reflects_created_files() {
        let sandbox = Sandbox::new(ResourceLimits::conservative()).unwrap();
        std::fs::write(sandbox.working_dir().join("a.txt"), "x").unwrap();
        std::fs::write(sandbox.working_dir().join("b.txt"), "y").unwrap();
        assert_eq!(sandbox.file_count(), 2);
    }
}
