//! Phage + Infector (§4.10): atomic mutation application with
//! guaranteed rollback, and lineage tracking across derived phages.

use evo_core::EntityId;
use evo_safety::{Checkpoint, RollbackGuard};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionMode {
    Dry,
    TestOnly,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhageStatus {
    Pending,
    Infected,
    RolledBack,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phage {
    pub id: EntityId,
    pub description: String,
    pub target_files: Vec<PathBuf>,
    pub stake: f64,
    pub lineage: Vec<EntityId>,
    pub status: PhageStatus,
}

impl Phage {
    pub fn new(description: impl Into<String>, target_files: Vec<PathBuf>, stake: f64) -> Self {
        Self {
            id: EntityId::generate(),
            description: description.into(),
            target_files,
            stake,
            lineage: Vec::new(),
            status: PhageStatus::Pending,
        }
    }

    /// Derives a child phage whose lineage includes this one.
    pub fn spawn_child(&self, description: impl Into<String>, target_files: Vec<PathBuf>, stake: f64) -> Phage {
        let mut lineage = self.lineage.clone();
        lineage.push(self.id);
        Phage {
            id: EntityId::generate(),
            description: description.into(),
            target_files,
            stake,
            lineage,
            status: PhageStatus::Pending,
        }
    }
}

/// Supplies the mutated contents for each target file and judges
/// whether the mutation succeeds in `mode`. The Infector is deliberately
/// decoupled from the Test Harness's process-spawning machinery — a
/// caller wires in its own closures, keeping this crate free of an
/// async runtime dependency.
pub trait Infector {
    fn mutated_contents(&self, path: &std::path::Path) -> anyhow::Result<String>;
    fn run_tests(&self, mode: ExecutionMode) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfectionOutcome {
    Infected,
    RolledBack,
}

/// Takes checkpoints for every target file, applies the mutation,
/// runs tests, and either commits or restores all files atomically.
pub fn infect(phage: &mut Phage, infector: &dyn Infector, mode: ExecutionMode) -> anyhow::Result<InfectionOutcome> {
    let mut checkpoints = Vec::with_capacity(phage.target_files.len());
    for path in &phage.target_files {
        checkpoints.push(Checkpoint::capture(path)?);
    }

    let mut guards: Vec<RollbackGuard> = checkpoints.into_iter().map(RollbackGuard::new).collect();

    let apply_result: anyhow::Result<()> = (|| {
        for path in &phage.target_files {
            let contents = infector.mutated_contents(path)?;
            std::fs::write(path, contents)?;
        }
        Ok(())
    })();

    let tests_passed = apply_result.is_ok() && infector.run_tests(mode);

    if tests_passed {
        for guard in guards.drain(..) {
            guard.commit();
        }
        phage.status = PhageStatus::Infected;
        Ok(InfectionOutcome::Infected)
    } else {
        // Dropping the guards restores every checkpointed file.
        guards.clear();
        phage.status = PhageStatus::RolledBack;
        Ok(InfectionOutcome::RolledBack)
    }
}

/// Reconstructs the parent chain for `phage`, given a lookup from id to
/// phage (e.g. a completed-phage archive).
pub fn analyze_lineage<'a>(phage: &'a Phage, archive: &'a HashMap<EntityId, Phage>) -> Vec<&'a Phage> {
    let mut chain: Vec<&Phage> = phage.lineage.iter().filter_map(|id| archive.get(id)).collect();
    chain.push(phage);
    chain
}

/// Aggregates fitness across a lineage chain using `fitness_of`, a
/// caller-supplied lookup (fitness values live in the Viral Library or
/// Judge, both upstream crates this one does not depend on).
pub fn calculate_lineage_fitness(chain: &[&Phage], fitness_of: impl Fn(&Phage) -> f64) -> f64 {
    if chain.is_empty() {
        return 0.0;
    }
    chain.iter().map(|p| fitness_of(p)).sum::<f64>() / chain.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct AlwaysWrite {
        contents: String,
        pass: AtomicBool,
    }

    impl Infector for AlwaysWrite {
        fn mutated_contents(&self, _path: &std::path::Path) -> anyhow::Result<String> {
            Ok(self.contents.clone())
        }
        fn run_tests(&self, _mode: ExecutionMode) -> bool {
            self.pass.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn successful_infection_commits_the_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("target.rs");
        std::fs::write(&path, "original").unwrap();

        let mut phage = Phage::new("rewrite", vec![path.clone()], 1.0);
        let infector = AlwaysWrite { contents: "mutated".to_string(), pass: AtomicBool::new(true) };
        let outcome = infect(&mut phage, &infector, ExecutionMode::TestOnly).unwrap();

        assert_eq!(outcome, InfectionOutcome::Infected);
        assert_eq!(phage.status, PhageStatus::Infected);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "mutated");
    }

    #[test]
    fn failed_tests_roll_back_every_checkpointed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("target.rs");
        std::fs::write(&path, "original").unwrap();

        let mut phage = Phage::new("rewrite", vec![path.clone()], 1.0);
        let infector = AlwaysWrite { contents: "mutated".to_string(), pass: AtomicBool::new(false) };
        let outcome = infect(&mut phage, &infector, ExecutionMode::TestOnly).unwrap();

        assert_eq!(outcome, InfectionOutcome::RolledBack);
        assert_eq!(phage.status, PhageStatus::RolledBack);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "original");
    }

    #[test]
    fn spawn_child_extends_lineage() {
        let root = Phage::new("root", vec![], 0.0);
        let child = root.spawn_child("child", vec![], 0.0);
        assert_eq!(child.lineage, vec![root.id]);
    }

    #[test]
    fn lineage_fitness_averages_across_the_chain() {
        let root = Phage::new("root", vec![], 0.0);
        let child = root.spawn_child("child", vec![], 0.0);
        let mut archive = HashMap::new();
        archive.insert(root.id, root.clone());
        let chain = analyze_lineage(&child, &archive);
        let fitness = calculate_lineage_fitness(&chain, |p| if p.id == root.id { 1.0 } else { 0.5 });
        assert!((fitness - 0.75).abs() < 1e-9);
    }
}
