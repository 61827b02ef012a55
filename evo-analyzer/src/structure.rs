//! AST Analyzer (§4.4): extracts classes/functions/imports/docstrings
//! from a module's source and flags structural hot spots.

use serde::{Deserialize, Serialize};
use syn::{FnArg, ImplItem, Item, Visibility};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub name: String,
    pub arg_count: usize,
    pub line_count: usize,
    pub is_public: bool,
    pub is_async: bool,
    pub has_doc: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassInfo {
    pub name: String,
    pub derives: Vec<String>,
    pub method_count: usize,
    pub has_doc: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeStructure {
    pub module_doc: Option<String>,
    pub classes: Vec<ClassInfo>,
    pub functions: Vec<FunctionInfo>,
    pub imports: Vec<String>,
    pub line_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HotSpotKind {
    LargeClass,
    LongFunction,
    DeepParameterList,
    LargeModule,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotSpot {
    pub kind: HotSpotKind,
    pub subject: String,
    pub detail: String,
}

const LARGE_CLASS_METHODS: usize = 10;
const LONG_FUNCTION_LINES: usize = 50;
const DEEP_PARAM_COUNT: usize = 5;
const LARGE_MODULE_LINES: usize = 400;

fn doc_attr(attrs: &[syn::Attribute]) -> bool {
    attrs.iter().any(|a| a.path().is_ident("doc"))
}

fn derive_names(attrs: &[syn::Attribute]) -> Vec<String> {
    let mut names = Vec::new();
    for attr in attrs {
        if attr.path().is_ident("derive") {
            let _ = attr.parse_nested_meta(|meta| {
                if let Some(ident) = meta.path.get_ident() {
                    names.push(ident.to_string());
                }
                Ok(())
            });
        }
    }
    names
}

fn fn_line_count(sig_span_lines: usize) -> usize {
    sig_span_lines
}

/// Parses `source` and extracts its structural outline. Returns an
/// error when the source fails to parse as a Rust file (a SYNTAX
/// validation concern, handled by the caller).
pub fn analyze(source: &str) -> syn::Result<CodeStructure> {
    let file = syn::parse_file(source)?;
    let module_doc = file
        .attrs
        .iter()
        .find(|a| a.path().is_ident("doc"))
        .and_then(|a| match &a.meta {
            syn::Meta::NameValue(nv) => Some(quote::quote!(#nv).to_string()),
            _ => None,
        });

    let mut classes = Vec::new();
    let mut functions = Vec::new();
    let mut imports = Vec::new();
    let mut method_counts: std::collections::HashMap<String, usize> = std::collections::HashMap::new();

    for item in &file.items {
        match item {
            Item::Struct(s) => {
                classes.push(ClassInfo {
                    name: s.ident.to_string(),
                    derives: derive_names(&s.attrs),
                    method_count: 0,
                    has_doc: doc_attr(&s.attrs),
                });
            }
            Item::Enum(e) => {
                classes.push(ClassInfo {
                    name: e.ident.to_string(),
                    derives: derive_names(&e.attrs),
                    method_count: 0,
                    has_doc: doc_attr(&e.attrs),
                });
            }
            Item::Impl(imp) => {
                if let syn::Type::Path(tp) = imp.self_ty.as_ref() {
                    if let Some(seg) = tp.path.segments.last() {
                        let count = imp
                            .items
                            .iter()
                            .filter(|i| matches!(i, ImplItem::Fn(_)))
                            .count();
                        *method_counts.entry(seg.ident.to_string()).or_insert(0) += count;
                    }
                }
            }
            Item::Fn(f) => {
                let arg_count = f
                    .sig
                    .inputs
                    .iter()
                    .filter(|a| !matches!(a, FnArg::Receiver(_)))
                    .count();
                let approx_lines = {
                    let rendered = quote::quote!(#f).to_string();
                    rendered.matches(';').count().max(1)
                };
                functions.push(FunctionInfo {
                    name: f.sig.ident.to_string(),
                    arg_count,
                    line_count: fn_line_count(approx_lines),
                    is_public: matches!(f.vis, Visibility::Public(_)),
                    is_async: f.sig.asyncness.is_some(),
                    has_doc: doc_attr(&f.attrs),
                });
            }
            Item::Use(u) => {
                imports.push(quote::quote!(#u).to_string());
            }
            _ => {}
        }
    }

    for class in &mut classes {
        class.method_count = *method_counts.get(&class.name).unwrap_or(&0);
    }

    Ok(CodeStructure {
        module_doc,
        classes,
        functions,
        imports,
        line_count: source.lines().count(),
    })
}

/// Flags structural hot spots per the thresholds in §4.4.
pub fn find_hot_spots(structure: &CodeStructure) -> Vec<HotSpot> {
    let mut spots = Vec::new();

    for class in &structure.classes {
        if class.method_count > LARGE_CLASS_METHODS {
            spots.push(HotSpot {
                kind: HotSpotKind::LargeClass,
                subject: class.name.clone(),
                detail: format!("{} methods (> {})", class.method_count, LARGE_CLASS_METHODS),
            });
        }
    }

    for function in &structure.functions {
        if function.line_count > LONG_FUNCTION_LINES {
            spots.push(HotSpot {
                kind: HotSpotKind::LongFunction,
                subject: function.name.clone(),
                detail: format!("~{} lines (> {})", function.line_count, LONG_FUNCTION_LINES),
            });
        }
        if function.arg_count > DEEP_PARAM_COUNT {
            spots.push(HotSpot {
                kind: HotSpotKind::DeepParameterList,
                subject: function.name.clone(),
                detail: format!("{} parameters (> {})", function.arg_count, DEEP_PARAM_COUNT),
            });
        }
    }

    if structure.line_count > LARGE_MODULE_LINES {
        spots.push(HotSpot {
            kind: HotSpotKind::LargeModule,
            subject: "module".to_string(),
            detail: format!("{} lines (> {})", structure.line_count, LARGE_MODULE_LINES),
        });
    }

    spots
}

/// A proposed, unvalidated improvement hypothesis, generated from a hot
/// spot. The Mutator (§4.7) synthesizes these into concrete mutation
/// vectors after ΔG filtering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hypothesis {
    pub subject: String,
    pub description: String,
}

pub fn propose_hypotheses(structure: &CodeStructure, max: usize) -> Vec<Hypothesis> {
    find_hot_spots(structure)
        .into_iter()
        .map(|spot| Hypothesis {
            subject: spot.subject.clone(),
            description: match spot.kind {
                HotSpotKind::LargeClass => format!("split {} into smaller collaborators ({})", spot.subject, spot.detail),
                HotSpotKind::LongFunction => format!("extract helpers from {} ({})", spot.subject, spot.detail),
                HotSpotKind::DeepParameterList => format!("group {}'s parameters into a struct ({})", spot.subject, spot.detail),
                HotSpotKind::LargeModule => "split module along cohesive boundaries".to_string(),
            },
        })
        .take(max)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_deep_parameter_list() {
        let source = "pub fn over(a: i32, b: i32, c: i32, d: i32, e: i32, f: i32) {}";
        let structure = analyze(source).unwrap();
        let spots = find_hot_spots(&structure);
        assert!(spots.iter().any(|s| s.kind == HotSpotKind::DeepParameterList));
    }

    #[test]
    fn flags_large_class() {
        let mut source = String::from("struct Widget;\nimpl Widget {\n");
        for i in 0..12 {
            source.push_str(&format!("fn m{i}(&self) {{}}\n"));
        }
        source.push('}');
        let structure = analyze(&source).unwrap();
        let spots = find_hot_spots(&structure);
        assert!(spots.iter().any(|s| s.kind == HotSpotKind::LargeClass));
    }

    #[test]
    fn no_hot_spots_for_small_module() {
        let structure = analyze("pub fn small(a: i32) -> i32 { a }").unwrap();
        assert!(find_hot_spots(&structure).is_empty());
    }
}
