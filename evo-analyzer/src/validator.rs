//! Validator (§4.4): AST-level schema checks run before an improvement
//! reaches the Test Harness.

use serde::{Deserialize, Serialize};
use syn::{Fields, ImplItem, Item, Stmt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Blocker,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueCategory {
    Syntax,
    Constructor,
    TypeAnnotation,
    GenericType,
    Completeness,
    Import,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub severity: Severity,
    pub category: IssueCategory,
    pub line: Option<usize>,
    pub symbol: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub issues: Vec<Issue>,
    pub valid: bool,
}

const KNOWN_GENERIC_ARITY: &[(&str, usize)] = &[("Option", 1), ("Box", 1), ("Vec", 1), ("Result", 2), ("HashMap", 2), ("BTreeMap", 2)];

fn generic_arity_issues(ty: &syn::Type, issues: &mut Vec<Issue>) {
    if let syn::Type::Path(tp) = ty {
        if let Some(seg) = tp.path.segments.last() {
            let name = seg.ident.to_string();
            if let Some((_, expected)) = KNOWN_GENERIC_ARITY.iter().find(|(n, _)| *n == name) {
                if let syn::PathArguments::AngleBracketed(args) = &seg.arguments {
                    let actual = args.args.len();
                    // Result<T> with a single arg is the common anyhow-style
                    // shorthand; only flag arities outside [1, expected].
                    if actual == 0 || actual > *expected {
                        issues.push(Issue {
                            severity: Severity::Blocker,
                            category: IssueCategory::GenericType,
                            line: None,
                            symbol: Some(name.clone()),
                            message: format!("{name}<..> has {actual} type arguments, expected up to {expected}"),
                        });
                    }
                }
            }
        }
    }
}

fn is_noop_body(block: &syn::Block) -> bool {
    block.stmts.is_empty()
        || block.stmts.iter().all(|stmt| match stmt {
            Stmt::Expr(syn::Expr::Path(p), _) => p.path.is_ident("todo") || p.path.segments.is_empty(),
            Stmt::Macro(m) => m.mac.path.is_ident("todo") || m.mac.path.is_ident("unimplemented"),
            _ => false,
        })
}

fn has_todo_marker(source: &str) -> bool {
    source.contains("TODO") || source.contains("FIXME")
}

/// Runs all checks against `source`. A `SYNTAX` failure short-circuits
/// the remaining checks, since a malformed file has no usable AST.
pub fn validate(source: &str) -> ValidationReport {
    let file = match syn::parse_file(source) {
        Ok(f) => f,
        Err(e) => {
            return ValidationReport {
                issues: vec![Issue {
                    severity: Severity::Blocker,
                    category: IssueCategory::Syntax,
                    line: Some(e.span().start().line),
                    symbol: None,
                    message: e.to_string(),
                }],
                valid: false,
            };
        }
    };

    let mut issues = Vec::new();

    for item in &file.items {
        match item {
            Item::Struct(s) => {
                let has_default_like_derive = s.attrs.iter().any(|a| {
                    a.path().is_ident("derive")
                        && quote::quote!(#a).to_string().contains("Default")
                });
                if !matches!(s.fields, Fields::Unit) && !has_default_like_derive {
                    // Structural check only: absence of a derive marker is a
                    // warning, not a blocker, since an explicit `fn new` may
                    // satisfy the same role (checked against impls below).
                    issues.push(Issue {
                        severity: Severity::Warning,
                        category: IssueCategory::Constructor,
                        line: None,
                        symbol: Some(s.ident.to_string()),
                        message: format!("{} has no Default derive; verify an explicit constructor exists", s.ident),
                    });
                }
                for field in &s.fields {
                    generic_arity_issues(&field.ty, &mut issues);
                }
            }
            Item::Fn(f) => {
                for arg in &f.sig.inputs {
                    if let syn::FnArg::Typed(pat) = arg {
                        generic_arity_issues(&pat.ty, &mut issues);
                    }
                }
                if let syn::ReturnType::Type(_, ty) = &f.sig.output {
                    generic_arity_issues(ty, &mut issues);
                }
                if is_noop_body(&f.block) {
                    issues.push(Issue {
                        severity: Severity::Warning,
                        category: IssueCategory::Completeness,
                        line: None,
                        symbol: Some(f.sig.ident.to_string()),
                        message: format!("{} has a no-op body", f.sig.ident),
                    });
                }
            }
            Item::Impl(imp) => {
                for item in &imp.items {
                    if let ImplItem::Fn(f) = item {
                        if is_noop_body(&f.block) {
                            issues.push(Issue {
                                severity: Severity::Warning,
                                category: IssueCategory::Completeness,
                                line: None,
                                symbol: Some(f.sig.ident.to_string()),
                                message: format!("{} has a no-op body", f.sig.ident),
                            });
                        }
                    }
                }
            }
            Item::Use(u) => {
                let rendered = quote::quote!(#u).to_string();
                let super_count = rendered.matches("super :: ").count();
                if super_count > 3 {
                    issues.push(Issue {
                        severity: Severity::Warning,
                        category: IssueCategory::Import,
                        line: None,
                        symbol: None,
                        message: format!("excessively deep relative import ({super_count} levels)"),
                    });
                }
            }
            _ => {}
        }
    }

    if has_todo_marker(source) {
        issues.push(Issue {
            severity: Severity::Warning,
            category: IssueCategory::Completeness,
            line: None,
            symbol: None,
            message: "source contains a TODO/FIXME marker".to_string(),
        });
    }

    // TYPE_ANNOTATION has no direct analogue once a file parses, since
    // the grammar mandates annotations; reserved for future use against
    // partially-typed intermediate representations.
    let valid = !issues.iter().any(|i| i.severity == Severity::Blocker);
    ValidationReport { issues, valid }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_error_is_blocking() {
        let report = validate("fn broken( {");
        assert!(!report.valid);
        assert_eq!(report.issues[0].category, IssueCategory::Syntax);
    }

    #[test]
    fn noop_body_flagged_as_completeness() {
        let report = validate("fn stub() {}");
        assert!(report.issues.iter().any(|i| i.category == IssueCategory::Completeness));
    }

    #[test]
    fn excess_generic_arity_is_blocking() {
        let report = validate("fn bad() -> Result<i32, String, bool> { unimplemented!() }");
        assert!(!report.valid);
        assert!(report.issues.iter().any(|i| i.category == IssueCategory::GenericType));
    }

    #[test]
    fn well_formed_function_is_valid() {
        let report = validate("pub fn add(a: i32, b: i32) -> i32 { a + b }");
        assert!(report.valid);
    }
}
