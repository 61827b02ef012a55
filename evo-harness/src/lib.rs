//! Test Harness (§4.5): syntax → type → test gating in isolation, with
//! guaranteed restoration of the target file on every exit path.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::process::Command;

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub require_type_check: bool,
    pub require_tests: bool,
    pub timeout_secs: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self { require_type_check: true, require_tests: true, timeout_secs: 120 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    FailedSyntax(String),
    FailedType(String),
    FailedTests(String),
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Passed)
    }
}

#[derive(Debug, Clone)]
pub struct HarnessResult {
    pub verdict: Verdict,
    pub duration_ms: u64,
}

/// Restores `path`'s original bytes on drop, regardless of how the
/// scope was exited. The guard itself never fails; callers check
/// command results independently.
struct RestoreGuard {
    path: PathBuf,
    original: Vec<u8>,
}

impl Drop for RestoreGuard {
    fn drop(&mut self) {
        if let Err(e) = std::fs::write(&self.path, &self.original) {
            tracing::error!("failed to restore {}: {}", self.path.display(), e);
        }
    }
}

/// Runs the harness against `module_path`, a source file inside a
/// Cargo crate rooted at `manifest_dir`, temporarily replacing its
/// contents with `new_source`.
pub async fn run_harness(
    manifest_dir: &Path,
    module_path: &Path,
    new_source: &str,
    config: &HarnessConfig,
) -> Result<HarnessResult> {
    let start = Instant::now();

    let report = evo_analyzer::validate(new_source);
    if !report.valid {
        let detail = report
            .issues
            .iter()
            .map(|i| i.message.clone())
            .collect::<Vec<_>>()
            .join("; ");
        return Ok(HarnessResult {
            verdict: Verdict::FailedSyntax(detail),
            duration_ms: start.elapsed().as_millis() as u64,
        });
    }

    let original = std::fs::read(module_path)
        .with_context(|| format!("reading original contents of {}", module_path.display()))?;
    std::fs::write(module_path, new_source.as_bytes())
        .with_context(|| format!("writing candidate source to {}", module_path.display()))?;
    let _guard = RestoreGuard { path: module_path.to_path_buf(), original };

    if config.require_type_check {
        let output = run_cargo(manifest_dir, &["check"], config.timeout_secs).await?;
        if !output.status.success() {
            return Ok(HarnessResult {
                verdict: Verdict::FailedType(String::from_utf8_lossy(&output.stderr).to_string()),
                duration_ms: start.elapsed().as_millis() as u64,
            });
        }
    }

    if config.require_tests {
        let output = run_cargo(manifest_dir, &["test"], config.timeout_secs).await?;
        if !output.status.success() {
            return Ok(HarnessResult {
                verdict: Verdict::FailedTests(String::from_utf8_lossy(&output.stdout).to_string()),
                duration_ms: start.elapsed().as_millis() as u64,
            });
        }
    }

    Ok(HarnessResult { verdict: Verdict::Passed, duration_ms: start.elapsed().as_millis() as u64 })
}

async fn run_cargo(manifest_dir: &Path, args: &[&str], timeout_secs: u64) -> Result<std::process::Output> {
    let manifest_path = manifest_dir.join("Cargo.toml");
    let fut = Command::new("cargo")
        .args(args)
        .arg("--manifest-path")
        .arg(&manifest_path)
        .output();
    tokio::time::timeout(std::time::Duration::from_secs(timeout_secs), fut)
        .await
        .context("cargo invocation timed out")?
        .context("failed to spawn cargo")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn syntax_failure_short_circuits_before_touching_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let module_path = dir.path().join("lib.rs");
        std::fs::write(&module_path, "pub fn ok() {}").unwrap();

        let config = HarnessConfig { require_type_check: false, require_tests: false, ..HarnessConfig::default() };
        let result = run_harness(dir.path(), &module_path, "fn broken( {", &config).await.unwrap();

        assert!(matches!(result.verdict, Verdict::FailedSyntax(_)));
        let contents = std::fs::read_to_string(&module_path).unwrap();
        assert_eq!(contents, "pub fn ok() {}");
    }

    #[tokio::test]
    async fn restore_guard_restores_original_even_when_later_steps_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let module_path = dir.path().join("lib.rs");
        let mut f = std::fs::File::create(&module_path).unwrap();
        write!(f, "original content").unwrap();
        drop(f);

        {
            let original = std::fs::read(&module_path).unwrap();
            std::fs::write(&module_path, b"swapped content").unwrap();
            let _guard = RestoreGuard { path: module_path.clone(), original };
        }

        let contents = std::fs::read_to_string(&module_path).unwrap();
        assert_eq!(contents, "original content");
    }
}
