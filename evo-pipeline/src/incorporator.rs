//! Applies an accepted experiment to disk and commits it (§4.12 step 4).

use std::path::Path;
use std::process::Command;

#[derive(Debug, Clone)]
pub struct IncorporationReport {
    pub written: bool,
    pub committed: bool,
    pub commit_note: Option<String>,
}

/// Writes the accepted source to `module_path` and commits it. A failed
/// `git` invocation is reported, not propagated — the improvement is
/// already on disk and should not be rolled back just because the
/// repository has no commit identity configured, for example.
pub fn apply_experiment(
    repo_dir: &Path,
    module_path: &Path,
    accepted_code: &str,
    description: &str,
) -> anyhow::Result<IncorporationReport> {
    std::fs::write(module_path, accepted_code)?;

    let relative = module_path.strip_prefix(repo_dir).unwrap_or(module_path);
    let message = format!("evolve: {description}");

    let add = Command::new("git").arg("-C").arg(repo_dir).arg("add").arg(relative).output();
    let add_ok = matches!(&add, Ok(output) if output.status.success());
    if !add_ok {
        tracing::warn!(?add, "git add failed during incorporation");
        return Ok(IncorporationReport { written: true, committed: false, commit_note: Some("git add failed".to_string()) });
    }

    let commit = Command::new("git").arg("-C").arg(repo_dir).arg("commit").arg("-m").arg(&message).output();
    match commit {
        Ok(output) if output.status.success() => {
            tracing::info!(%message, "incorporated experiment");
            Ok(IncorporationReport { written: true, committed: true, commit_note: Some(message) })
        }
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            tracing::warn!(%stderr, "git commit failed during incorporation");
            Ok(IncorporationReport { written: true, committed: false, commit_note: Some(stderr) })
        }
        Err(e) => {
            tracing::warn!(error = %e, "git commit could not run");
            Ok(IncorporationReport { written: true, committed: false, commit_note: Some(e.to_string()) })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_file_even_when_not_a_git_repo() {
        let dir = tempfile::tempdir().unwrap();
        let module_path = dir.path().join("lib.rs");
        std::fs::write(&module_path, "fn old() {}").unwrap();

        let report = apply_experiment(dir.path(), &module_path, "fn new() {}", "rename old to new").unwrap();

        assert!(report.written);
        assert!(!report.committed);
        assert_eq!(std::fs::read_to_string(&module_path).unwrap(), "fn new() {}");
    }
}
