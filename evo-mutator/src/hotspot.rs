//! Hot-spot scoring (§4.7): ranks candidate mutation targets by
//! `cyclomatic_complexity × entropy(branching tokens) × size`.

use evo_analyzer::{analyze_complexity, ComplexityMetrics};
use regex::Regex;
use std::sync::OnceLock;

fn branch_token_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(if|else|match|while|for|loop)\b").unwrap())
}

/// Shannon entropy (base 2) over the frequency distribution of
/// branching tokens found in `source`. A module using only `if` scores
/// low; one mixing `if`/`match`/`while` evenly scores higher.
fn branching_entropy(source: &str) -> f64 {
    let mut counts: std::collections::HashMap<&str, u32> = std::collections::HashMap::new();
    for m in branch_token_pattern().find_iter(source) {
        *counts.entry(m.as_str()).or_insert(0) += 1;
    }
    let total: u32 = counts.values().sum();
    if total == 0 {
        return 0.0;
    }
    counts
        .values()
        .map(|&c| {
            let p = c as f64 / total as f64;
            -p * p.log2()
        })
        .sum()
}

#[derive(Debug, Clone)]
pub struct HotSpotScore {
    pub complexity: ComplexityMetrics,
    pub entropy: f64,
    pub size: usize,
    pub score: f64,
}

/// Scores `source` as a mutation target. Returns an error if it does
/// not parse as Rust.
pub fn score_hot_spot(source: &str) -> syn::Result<HotSpotScore> {
    let complexity = analyze_complexity(source)?;
    let entropy = branching_entropy(source);
    let size = source.lines().count();
    let score = complexity.cyclomatic_complexity as f64 * entropy.max(0.01) * size as f64;
    Ok(HotSpotScore { complexity, entropy, size, score })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_branching_scores_higher_entropy_than_single_kind() {
        let uniform = "fn f(x: i32) -> i32 { if x > 0 { 1 } else { match x { 0 => 0, _ => while x > 0 { break; } } } }";
        let single = "fn g(x: i32) -> i32 { if x > 0 { if x > 1 { if x > 2 { 3 } else { 2 } } else { 1 } } else { 0 } }";
        let uniform_score = score_hot_spot(uniform).unwrap();
        let single_score = score_hot_spot(single).unwrap();
        assert!(uniform_score.entropy >= single_score.entropy);
    }

    #[test]
    fn score_is_zero_free_for_branchless_code() {
        let source = "fn add(a: i32, b: i32) -> i32 { a + b }";
        let result = score_hot_spot(source).unwrap();
        assert!(result.score >= 0.0);
    }
}
