//! Cyclomatic complexity and size metrics, extracted via a `syn::Visit`
//! walk. Reused by the Mutator for hot-spot scoring (§4.7) and by the
//! Safety Kernel for self-evolution structural similarity (§4.11).

use serde::{Deserialize, Serialize};
use syn::visit::{self, Visit};
use syn::{Expr, ItemFn};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ComplexityMetrics {
    pub cyclomatic_complexity: u32,
    pub lines_of_code: usize,
    pub number_of_functions: u32,
    pub max_nesting_depth: u32,
}

struct ComplexityVisitor {
    complexity: u32,
    function_count: u32,
    max_depth: u32,
    current_depth: u32,
}

impl ComplexityVisitor {
    fn new() -> Self {
        Self {
            complexity: 1,
            function_count: 0,
            max_depth: 0,
            current_depth: 0,
        }
    }

    fn enter_branch(&mut self) {
        self.current_depth += 1;
        self.max_depth = self.max_depth.max(self.current_depth);
    }

    fn exit_branch(&mut self) {
        self.current_depth = self.current_depth.saturating_sub(1);
    }
}

impl<'ast> Visit<'ast> for ComplexityVisitor {
    fn visit_item_fn(&mut self, node: &'ast ItemFn) {
        self.function_count += 1;
        visit::visit_item_fn(self, node);
    }

    fn visit_expr(&mut self, node: &'ast Expr) {
        match node {
            Expr::If(_) | Expr::While(_) | Expr::ForLoop(_) => {
                self.complexity += 1;
                self.enter_branch();
                visit::visit_expr(self, node);
                self.exit_branch();
                return;
            }
            Expr::Match(m) => {
                self.complexity += m.arms.len() as u32;
                self.enter_branch();
                visit::visit_expr(self, node);
                self.exit_branch();
                return;
            }
            _ => {}
        }
        visit::visit_expr(self, node);
    }
}

/// Parses `source` as a Rust source file and computes complexity
/// metrics. Returns an error if the source does not parse (the caller
/// should treat this as a SYNTAX validation failure, not a panic).
pub fn analyze_complexity(source: &str) -> syn::Result<ComplexityMetrics> {
    let file = syn::parse_file(source)?;
    let mut visitor = ComplexityVisitor::new();
    visitor.visit_file(&file);
    Ok(ComplexityMetrics {
        cyclomatic_complexity: visitor.complexity,
        lines_of_code: source.lines().count(),
        number_of_functions: visitor.function_count,
        max_nesting_depth: visitor.max_depth,
    })
}

/// Multiset of class/function/import signatures extracted from the AST,
/// used as the structural-similarity basis in §4.11.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuralSignature {
    pub signatures: Vec<String>,
}

struct SignatureVisitor {
    signatures: Vec<String>,
}

impl<'ast> Visit<'ast> for SignatureVisitor {
    fn visit_item_fn(&mut self, node: &'ast ItemFn) {
        self.signatures.push(format!("fn:{}:{}", node.sig.ident, node.sig.inputs.len()));
        visit::visit_item_fn(self, node);
    }

    fn visit_item_struct(&mut self, node: &'ast syn::ItemStruct) {
        self.signatures.push(format!("struct:{}", node.ident));
        visit::visit_item_struct(self, node);
    }

    fn visit_item_enum(&mut self, node: &'ast syn::ItemEnum) {
        self.signatures.push(format!("enum:{}:{}", node.ident, node.variants.len()));
        visit::visit_item_enum(self, node);
    }

    fn visit_item_use(&mut self, node: &'ast syn::ItemUse) {
        self.signatures.push(format!("use:{}", quote::quote!(#node)));
        visit::visit_item_use(self, node);
    }
}

pub fn structural_signature(source: &str) -> syn::Result<StructuralSignature> {
    let file = syn::parse_file(source)?;
    let mut visitor = SignatureVisitor { signatures: Vec::new() };
    visitor.visit_file(&file);
    visitor.signatures.sort();
    Ok(StructuralSignature { signatures: visitor.signatures })
}

/// Multiset agreement: proportion of signatures the smaller set shares
/// with the larger.
pub fn structural_similarity(a: &StructuralSignature, b: &StructuralSignature) -> f64 {
    if a.signatures.is_empty() && b.signatures.is_empty() {
        return 1.0;
    }
    let a_set: std::collections::HashSet<&String> = a.signatures.iter().collect();
    let b_set: std::collections::HashSet<&String> = b.signatures.iter().collect();
    let intersection = a_set.intersection(&b_set).count();
    let union = a_set.union(&b_set).count();
    if union == 0 {
        1.0
    } else {
        intersection as f64 / union as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complexity_counts_branches() {
        let source = r#"
            fn example(x: i32) -> i32 {
                if x > 0 {
                    while x < 10 {
                        x += 1;
                    }
                }
                match x {
                    0 => 0,
                    _ => 1,
                }
            }
        "#;
        let metrics = analyze_complexity(source).unwrap();
        assert!(metrics.cyclomatic_complexity >= 4);
        assert_eq!(metrics.number_of_functions, 1);
    }

    #[test]
    fn structural_similarity_is_one_for_identical_signatures() {
        let source = "fn foo(x: i32) {}";
        let sig = structural_signature(source).unwrap();
        assert_eq!(structural_similarity(&sig, &sig), 1.0);
    }
}
