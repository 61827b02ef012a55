//! Atomic rollback (§4.11): checkpoint a file's bytes before a mutation
//! is applied, guarantee restoration on any failure path.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Checkpoint {
    path: PathBuf,
    snapshot: Vec<u8>,
}

impl Checkpoint {
    pub fn capture(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let snapshot = std::fs::read(&path).with_context(|| format!("checkpointing {}", path.display()))?;
        Ok(Self { path, snapshot })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the checkpointed bytes back. Byte-exact: callers rely on
    /// this to undo a failed mutation without drift.
    pub fn restore(&self) -> Result<()> {
        std::fs::write(&self.path, &self.snapshot).with_context(|| format!("restoring {}", self.path.display()))
    }
}

/// Restores its checkpoint on drop unless `commit()` was called. This
/// is the guard a caller holds across a mutation attempt; dropping it
/// without committing is the rollback path, including on panic unwind.
pub struct RollbackGuard {
    checkpoint: Checkpoint,
    committed: bool,
}

impl RollbackGuard {
    pub fn new(checkpoint: Checkpoint) -> Self {
        Self { checkpoint, committed: false }
    }

    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for RollbackGuard {
    fn drop(&mut self) {
        if !self.committed {
            if let Err(e) = self.checkpoint.restore() {
                tracing::error!("rollback failed for {}: {}", self.checkpoint.path().display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_restores_on_drop_without_commit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("target.rs");
        std::fs::write(&path, "original").unwrap();

        {
            let checkpoint = Checkpoint::capture(&path).unwrap();
            std::fs::write(&path, "mutated").unwrap();
            let _guard = RollbackGuard::new(checkpoint);
        }

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "original");
    }

    #[test]
    fn committed_guard_leaves_mutation_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("target.rs");
        std::fs::write(&path, "original").unwrap();

        let checkpoint = Checkpoint::capture(&path).unwrap();
        std::fs::write(&path, "mutated").unwrap();
        let guard = RollbackGuard::new(checkpoint);
        guard.commit();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "mutated");
    }
}
