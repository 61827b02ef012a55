//! Repairer (§4.4): fixed-budget auto-fix passes over a failed
//! validation report.

use crate::validator::{validate, IssueCategory, ValidationReport};

const CANONICAL_IMPORTS: &[(&str, &str)] = &[
    ("HashMap", "use std::collections::HashMap;"),
    ("HashSet", "use std::collections::HashSet;"),
    ("BTreeMap", "use std::collections::BTreeMap;"),
    ("VecDeque", "use std::collections::VecDeque;"),
];

#[derive(Debug, Clone)]
pub struct RepairOutcome {
    pub source: String,
    pub report: ValidationReport,
    pub passes_used: u32,
}

fn add_missing_import(source: &str, report: &ValidationReport) -> Option<String> {
    for (name, import_line) in CANONICAL_IMPORTS {
        let used = source.contains(name);
        let imported = source.contains(import_line);
        if used && !imported {
            let _ = report;
            return Some(format!("{import_line}\n{source}"));
        }
    }
    None
}

fn replace_bare_noop(source: &str) -> Option<String> {
    // Targets the simplest bare-no-op shape: `fn name(..) {}` with an
    // empty block, replacing it with an explicit unimplemented! call.
    let marker = "() {}";
    source.find(marker).map(|idx| {
        let mut fixed = source.to_string();
        fixed.replace_range(idx..idx + marker.len(), "() { unimplemented!() }");
        fixed
    })
}

fn fix_generic_arity(source: &str, symbol: &str) -> Option<String> {
    // Drops the trailing extra type argument for a known generic whose
    // arity check failed, e.g. `Result<i32, String, bool>` -> `Result<i32, String>`.
    let needle = format!("{symbol}<");
    let start = source.find(&needle)?;
    let rest = &source[start + needle.len()..];
    let end = rest.find('>')?;
    let args: Vec<&str> = rest[..end].split(',').map(str::trim).collect();
    if args.len() <= 2 {
        return None;
    }
    let trimmed_args = &args[..2];
    let mut fixed = String::new();
    fixed.push_str(&source[..start + needle.len()]);
    fixed.push_str(&trimmed_args.join(", "));
    fixed.push_str(&source[start + needle.len() + end..]);
    Some(fixed)
}

/// Applies repair passes up to `budget` iterations, re-validating after
/// each. Stops early on success.
pub fn repair(source: &str, budget: u32) -> RepairOutcome {
    let mut current = source.to_string();
    let mut report = validate(&current);
    let mut passes_used = 0;

    while !report.valid && passes_used < budget {
        let attempted = if report.issues.iter().any(|i| i.category == IssueCategory::Import) {
            add_missing_import(&current, &report)
        } else if let Some(issue) = report.issues.iter().find(|i| i.category == IssueCategory::GenericType) {
            issue.symbol.as_deref().and_then(|sym| fix_generic_arity(&current, sym))
        } else if report.issues.iter().any(|i| i.category == IssueCategory::Completeness) {
            replace_bare_noop(&current)
        } else {
            None
        };

        match attempted {
            Some(next) => {
                current = next;
                report = validate(&current);
                passes_used += 1;
            }
            None => break,
        }
    }

    RepairOutcome { source: current, report, passes_used }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repairs_missing_import() {
        let source = "fn build() -> HashMap<String, i32> { HashMap::new() }";
        let outcome = repair(source, 3);
        assert!(outcome.source.contains("use std::collections::HashMap;"));
    }

    #[test]
    fn repairs_excess_generic_arity() {
        let source = "fn bad() -> Result<i32, String, bool> { Ok(1) }";
        let outcome = repair(source, 3);
        assert!(outcome.report.valid, "{:?}", outcome.report.issues);
    }

    #[test]
    fn budget_exhaustion_stops_without_infinite_loop() {
        let source = "fn broken( {";
        let outcome = repair(source, 3);
        assert!(!outcome.report.valid);
        assert_eq!(outcome.passes_used, 0);
    }
}
