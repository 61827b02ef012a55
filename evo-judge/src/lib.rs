//! Code Judge (§4.6): scores an improvement against a fixed principle
//! set, or a language-agnostic generic variant, both converging on the
//! same ACCEPT/REVISE/REJECT thresholding.

use evo_analyzer::analyze;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Accept,
    Revise,
    Reject,
}

fn threshold_verdict(average: f64, ethical_or_safety: f64) -> Verdict {
    if average >= 0.75 && ethical_or_safety >= 0.8 {
        Verdict::Accept
    } else if average < 0.5 || ethical_or_safety < 0.5 {
        Verdict::Reject
    } else {
        Verdict::Revise
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeResult {
    pub verdict: Verdict,
    pub principle_scores: Vec<(String, f64)>,
    pub average_score: f64,
    pub reasons: Vec<String>,
}

fn tasteful_score(original_lines: usize, new_lines: usize) -> f64 {
    if new_lines <= original_lines {
        return 1.0;
    }
    let delta_ratio = (new_lines - original_lines) as f64 / original_lines.max(1) as f64;
    if delta_ratio > 0.3 {
        0.5
    } else {
        1.0 - delta_ratio / 0.3 * 0.5
    }
}

const CONCERNING_TOKENS: &[&str] = &["unsafe", "Command::new", "transmute", "eval("];

fn ethical_score(original: &str, new_text: &str) -> f64 {
    let introduced = CONCERNING_TOKENS
        .iter()
        .any(|token| new_text.contains(token) && !original.contains(token));
    if introduced {
        0.3
    } else {
        1.0
    }
}

fn joyful_score(new_text: &str) -> f64 {
    let has_docs = new_text.lines().any(|l| l.trim_start().starts_with("///") || l.trim_start().starts_with("//!"));
    if has_docs {
        0.8
    } else {
        0.6
    }
}

fn composition_occurrences(text: &str) -> usize {
    text.matches(".and_then(").count() + text.matches(".compose(").count() + text.matches(".pipe(").count()
}

fn composable_score(original: &str, new_text: &str) -> f64 {
    if composition_occurrences(new_text) >= composition_occurrences(original) {
        1.0
    } else {
        0.6
    }
}

fn heterarchical_score(original_classes: usize, new_classes: usize) -> f64 {
    if new_classes > original_classes + 2 {
        0.7
    } else {
        1.0
    }
}

fn generative_score(new_text: &str, reference_tokens: &[String]) -> f64 {
    if reference_tokens.iter().any(|token| new_text.contains(token.as_str())) {
        1.0
    } else {
        0.7
    }
}

/// The 7-signal Principle judge. `reference_tokens` are module/symbol
/// names the improvement is expected to engage with (used by the
/// Generative signal to penalize ungrounded rewrites).
pub fn principle_judge(original: &str, new_text: &str, confidence: f64, reference_tokens: &[String]) -> JudgeResult {
    let original_structure = analyze(original).ok();
    let new_structure = analyze(new_text).ok();
    let original_classes = original_structure.as_ref().map(|s| s.classes.len()).unwrap_or(0);
    let new_classes = new_structure.as_ref().map(|s| s.classes.len()).unwrap_or(0);

    let tasteful = tasteful_score(original.lines().count(), new_text.lines().count());
    let curated = confidence.clamp(0.0, 1.0);
    let ethical = ethical_score(original, new_text);
    let joyful = joyful_score(new_text);
    let composable = composable_score(original, new_text);
    let heterarchical = heterarchical_score(original_classes, new_classes);
    let generative = generative_score(new_text, reference_tokens);

    let scores = vec![
        ("tasteful".to_string(), tasteful),
        ("curated".to_string(), curated),
        ("ethical".to_string(), ethical),
        ("joyful".to_string(), joyful),
        ("composable".to_string(), composable),
        ("heterarchical".to_string(), heterarchical),
        ("generative".to_string(), generative),
    ];
    let average = scores.iter().map(|(_, s)| s).sum::<f64>() / scores.len() as f64;

    let mut reasons = Vec::new();
    if ethical < 0.8 {
        reasons.push("introduces a concerning pattern absent from the original".to_string());
    }
    if tasteful < 0.8 {
        reasons.push("grows the module size substantially".to_string());
    }
    if heterarchical < 1.0 {
        reasons.push("adds more than two new classes".to_string());
    }

    JudgeResult {
        verdict: threshold_verdict(average, ethical),
        principle_scores: scores,
        average_score: average,
        reasons,
    }
}

/// Generic, language-agnostic variant: size-delta, documentation,
/// annotations, safety, confidence, with the same thresholding.
pub fn generic_judge(original: &str, new_text: &str, confidence: f64) -> JudgeResult {
    let size_delta = tasteful_score(original.lines().count(), new_text.lines().count());
    let documentation = joyful_score(new_text);
    let annotations = if new_text.contains("->") || new_text.contains(':') { 1.0 } else { 0.6 };
    let safety = ethical_score(original, new_text);
    let curated = confidence.clamp(0.0, 1.0);

    let scores = vec![
        ("size_delta".to_string(), size_delta),
        ("documentation".to_string(), documentation),
        ("annotations".to_string(), annotations),
        ("safety".to_string(), safety),
        ("confidence".to_string(), curated),
    ];
    let average = scores.iter().map(|(_, s)| s).sum::<f64>() / scores.len() as f64;

    JudgeResult {
        verdict: threshold_verdict(average, safety),
        principle_scores: scores,
        average_score: average,
        reasons: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shrinking_change_is_accepted() {
        let original = "fn long() {\n let a = 1;\n let b = 2;\n a + b;\n}\n";
        let new_text = "/// adds two numbers\nfn long() { 3 }\n";
        let result = principle_judge(original, new_text, 0.9, &["long".to_string()]);
        assert_eq!(result.verdict, Verdict::Accept);
    }

    #[test]
    fn introducing_unsafe_is_rejected() {
        let original = "fn safe() {}";
        let new_text = "fn safe() { unsafe { std::ptr::null::<u8>(); } }";
        let result = principle_judge(original, new_text, 0.9, &[]);
        assert_eq!(result.verdict, Verdict::Reject);
    }

    #[test]
    fn generic_judge_tracks_documentation() {
        let original = "fn f() {}";
        let documented = "/// does a thing\nfn f() {}";
        let result = generic_judge(original, documented, 0.8);
        assert!(result.average_score > 0.5);
    }
}
