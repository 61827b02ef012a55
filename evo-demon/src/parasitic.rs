//! Parasitic-pattern detector (§4.8): enumerated rejections that are
//! final regardless of layer outcome — a mutation that passes every
//! layer but hardcodes its way past validation is still rejected.

use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParasiticPattern {
    HardcodedOutput,
    DeletedFunctionalBody,
    BareNoOp,
    NarrowInputSpecialCase,
}

impl ParasiticPattern {
    pub fn description(self) -> &'static str {
        match self {
            ParasiticPattern::HardcodedOutput => "replaces a computed expression with a hardcoded literal",
            ParasiticPattern::DeletedFunctionalBody => "deletes a functional body",
            ParasiticPattern::BareNoOp => "replaces computation with a bare no-op",
            ParasiticPattern::NarrowInputSpecialCase => "special-cases a narrow, enumerated input set",
        }
    }
}

fn narrow_case_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"if\s+\w+\s*==\s*\d+\s*\{\s*return\s+\d+\s*;?\s*\}").unwrap())
}

fn computed_return_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"return\s+[\w.]+\s*[+\-*/]\s*[\w.]+").unwrap())
}

fn bare_literal_return_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"return\s+-?\d+(\.\d+)?\s*;").unwrap())
}

/// Inspects `candidate` against `original` for enumerated parasitic
/// shapes. Returns every pattern found — callers treat any non-empty
/// result as a final rejection.
pub fn detect(original: &str, candidate: &str) -> Vec<ParasiticPattern> {
    let mut found = Vec::new();

    if computed_return_pattern().is_match(original) && bare_literal_return_pattern().is_match(candidate) && !bare_literal_return_pattern().is_match(original) {
        found.push(ParasiticPattern::HardcodedOutput);
    }

    let original_nonempty_fns = non_empty_fn_count(original);
    let candidate_nonempty_fns = non_empty_fn_count(candidate);
    if original_nonempty_fns > 0 && candidate_nonempty_fns < original_nonempty_fns {
        found.push(ParasiticPattern::DeletedFunctionalBody);
    }

    if candidate.contains("fn ") && (candidate.contains("() {}") || candidate.contains("unimplemented!()")) && !original.contains("() {}") && !original.contains("unimplemented!()") {
        found.push(ParasiticPattern::BareNoOp);
    }

    if narrow_case_pattern().find_iter(candidate).count() >= 2 && narrow_case_pattern().find_iter(original).count() < 2 {
        found.push(ParasiticPattern::NarrowInputSpecialCase);
    }

    found
}

fn non_empty_fn_count(source: &str) -> usize {
    syn::parse_file(source)
        .map(|file| {
            file.items
                .iter()
                .filter(|item| matches!(item, syn::Item::Fn(f) if !f.block.stmts.is_empty()))
                .count()
        })
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_hardcoded_output() {
        let original = "fn f(a: i32, b: i32) -> i32 { return a + b; }";
        let candidate = "fn f(a: i32, b: i32) -> i32 { return 7; }";
        let found = detect(original, candidate);
        assert!(found.contains(&ParasiticPattern::HardcodedOutput));
    }

    #[test]
    fn detects_deleted_functional_body() {
        let original = "fn f() -> i32 { let x = 1; x + 1 }";
        let candidate = "fn f() -> i32 {}";
        let found = detect(original, candidate);
        assert!(found.contains(&ParasiticPattern::DeletedFunctionalBody));
    }

    #[test]
    fn clean_rewrite_triggers_nothing() {
        let original = "fn f(a: i32, b: i32) -> i32 { a + b }";
        let candidate = "fn f(a: i32, b: i32) -> i32 { a.checked_add(b).unwrap_or(0) }";
        assert!(detect(original, candidate).is_empty());
    }
}
