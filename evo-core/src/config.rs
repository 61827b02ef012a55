//! Layered configuration: hardcoded defaults, overridden by a TOML file,
//! overridden by CLI flags (the CLI layer lives in `evoforge`).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub max_improvements_per_module: usize,
    pub max_retries_per_experiment: u32,
    pub module_parallelism: usize,
    pub dry_run: bool,
    pub auto_apply: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_improvements_per_module: 3,
            max_retries_per_experiment: 2,
            module_parallelism: 4,
            dry_run: true,
            auto_apply: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    pub convergence_threshold: f64,
    pub self_evolution_iteration_budget: u32,
    pub rate_limit_per_minute: u32,
    pub rate_limit_per_hour: u32,
    pub rate_limit_per_day: u32,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            convergence_threshold: 0.95,
            self_evolution_iteration_budget: 10,
            rate_limit_per_minute: 5,
            rate_limit_per_hour: 60,
            rate_limit_per_day: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    pub max_memory_mb: u64,
    pub max_cpu_time_secs: u64,
    pub max_file_creates: u32,
    pub timeout_secs: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            max_memory_mb: 512,
            max_cpu_time_secs: 30,
            max_file_creates: 256,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub sensory_ttl_secs: u64,
    pub working_capacity: usize,
    pub consolidation_interval_secs: u64,
    pub hot_temperature_threshold: f64,
    pub cold_temperature_threshold: f64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            sensory_ttl_secs: 10,
            working_capacity: 7,
            consolidation_interval_secs: 300,
            hot_temperature_threshold: 0.7,
            cold_temperature_threshold: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub rrf_k: f64,
    pub top_k: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self { rrf_k: 60.0, top_k: 10 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MutatorConfig {
    pub mutation_rate: f64,
    pub temperature: f64,
    pub max_hot_spots: usize,
}

impl Default for MutatorConfig {
    fn default() -> Self {
        Self {
            mutation_rate: 0.1,
            temperature: 1.0,
            max_hot_spots: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EvoConfig {
    pub pipeline: PipelineConfig,
    pub safety: SafetyConfig,
    pub sandbox: SandboxConfig,
    pub memory: MemoryConfig,
    pub catalog: CatalogConfig,
    pub mutator: MutatorConfig,
}

impl EvoConfig {
    /// Load from a TOML file, falling back to defaults for anything the
    /// file omits. Missing file is not an error — it just means defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file absent, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text)?;
        Ok(config)
    }

    /// Default config file path under the platform's project config dir.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "evoforge", "evoforge")
            .map(|dirs| dirs.config_dir().join("evoforge.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_conservative() {
        let config = EvoConfig::default();
        assert!(config.pipeline.dry_run);
        assert!(!config.pipeline.auto_apply);
        assert_eq!(config.safety.convergence_threshold, 0.95);
    }

    #[test]
    fn load_falls_back_on_missing_file() {
        let config = EvoConfig::load(Path::new("/nonexistent/evoforge.toml")).unwrap();
        assert_eq!(config.mutator.max_hot_spots, 5);
    }

    #[test]
    fn load_overrides_partial_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("evoforge.toml");
        std::fs::write(&path, "[safety]\nconvergence_threshold = 0.8\n").unwrap();
        let config = EvoConfig::load(&path).unwrap();
        assert_eq!(config.safety.convergence_threshold, 0.8);
        assert_eq!(config.safety.rate_limit_per_minute, 5);
    }
}
