//! Fixed-point self-evolution (§4.11): for meta-targets, iterate
//! improvements until old and new text converge or the budget runs out.

use evo_analyzer::{structural_signature, structural_similarity};

#[derive(Debug, Clone)]
pub struct ConvergenceConfig {
    pub max_iterations: u32,
    pub convergence_threshold: f64,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self { max_iterations: 10, convergence_threshold: 0.95 }
    }
}

#[derive(Debug, Clone)]
pub struct ConvergenceStep {
    pub iteration: u32,
    pub similarity: f64,
    pub converged: bool,
}

/// Longest-common-subsequence ratio over non-empty, whitespace-stripped
/// lines: `2·LCS_len / (len(a) + len(b))`.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    let lines_a: Vec<&str> = a.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    let lines_b: Vec<&str> = b.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    if lines_a.is_empty() && lines_b.is_empty() {
        return 1.0;
    }
    let lcs_len = lcs_length(&lines_a, &lines_b);
    (2 * lcs_len) as f64 / (lines_a.len() + lines_b.len()) as f64
}

fn lcs_length(a: &[&str], b: &[&str]) -> usize {
    let mut dp = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for i in 1..=a.len() {
        for j in 1..=b.len() {
            dp[i][j] = if a[i - 1] == b[j - 1] {
                dp[i - 1][j - 1] + 1
            } else {
                dp[i - 1][j].max(dp[i][j - 1])
            };
        }
    }
    dp[a.len()][b.len()]
}

/// `max(text_similarity, structural_similarity)` between `old` and
/// `new`, falling back to pure text similarity when either side fails
/// to parse as Rust (a meta-target mid-iteration may be transiently
/// malformed).
pub fn combined_similarity(old: &str, new: &str) -> f64 {
    let text = text_similarity(old, new);
    let structural = match (structural_signature(old), structural_signature(new)) {
        (Ok(a), Ok(b)) => structural_similarity(&a, &b),
        _ => 0.0,
    };
    text.max(structural)
}

/// Records one iteration of the self-evolution loop. The loop itself —
/// generating the next improvement and sandbox-testing it — lives in
/// the Evolution Pipeline; this module only judges when to stop.
pub fn record_step(iteration: u32, old: &str, new: &str, config: &ConvergenceConfig) -> ConvergenceStep {
    let similarity = combined_similarity(old, new);
    ConvergenceStep {
        iteration,
        similarity,
        converged: similarity >= config.convergence_threshold || iteration >= config.max_iterations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_text_is_fully_similar() {
        let source = "fn a() {}\nfn b() {}\n";
        assert_eq!(text_similarity(source, source), 1.0);
    }

    #[test]
    fn converges_once_similarity_crosses_threshold() {
        let config = ConvergenceConfig::default();
        let old = "fn a() {}\nfn b() {}\nfn c() {}\n";
        let new = "fn a() {}\nfn b() {}\nfn c() {}\n";
        let step = record_step(1, old, new, &config);
        assert!(step.converged);
    }

    #[test]
    fn budget_exhaustion_forces_convergence_even_when_dissimilar() {
        let config = ConvergenceConfig { max_iterations: 2, convergence_threshold: 0.99 };
        let step = record_step(2, "fn a() {}\n", "struct Totally { different: bool }\n", &config);
        assert!(step.converged);
    }
}
