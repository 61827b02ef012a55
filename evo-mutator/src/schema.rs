//! Enumerated schema library (§4.7): small, mechanical transforms
//! applied to a hot spot to synthesize a candidate rewrite.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Schema {
    LoopToIterator,
    ExtractConstant,
    FlattenNesting,
    InlineSingleUse,
}

impl Schema {
    pub fn all() -> [Schema; 4] {
        [Schema::LoopToIterator, Schema::ExtractConstant, Schema::FlattenNesting, Schema::InlineSingleUse]
    }

    pub fn description(self) -> &'static str {
        match self {
            Schema::LoopToIterator => "replace an explicit index loop with an iterator chain",
            Schema::ExtractConstant => "extract a repeated literal into a named constant",
            Schema::FlattenNesting => "collapse a single-armed else-if into an early return",
            Schema::InlineSingleUse => "inline a binding referenced exactly once",
        }
    }
}

fn for_loop_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"for\s+(\w+)\s+in\s+0\.\.(\w+)\.len\(\)\s*\{").unwrap())
}

fn repeated_literal_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{2,})\b").unwrap())
}

fn if_else_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"if\s+([^{]+?)\s*\{\s*([^{}]*?)\s*\}\s*else\s*\{\s*([^{}]*?)\s*\}").unwrap())
}

fn let_binding_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"let\s+(\w+)\s*=\s*([^;]+);\s*").unwrap())
}

/// Attempts `schema` against `source`, returning the rewritten text
/// when the schema's precondition is found. Returns `None` when the
/// schema does not apply — callers move on to the next schema rather
/// than treating this as an error.
pub fn apply_schema(schema: Schema, source: &str) -> Option<String> {
    match schema {
        Schema::LoopToIterator => {
            let caps = for_loop_pattern().captures(source)?;
            let idx = &caps[1];
            let collection = &caps[2];
            let replacement = format!("for ({idx}, _item) in {collection}.iter().enumerate() {{");
            Some(for_loop_pattern().replace(source, replacement.as_str()).to_string())
        }
        Schema::ExtractConstant => {
            let mut counts: std::collections::HashMap<&str, u32> = std::collections::HashMap::new();
            for m in repeated_literal_pattern().find_iter(source) {
                *counts.entry(m.as_str()).or_insert(0) += 1;
            }
            let (literal, count) = counts.into_iter().max_by_key(|(_, c)| *c)?;
            if count < 2 {
                return None;
            }
            let const_name = format!("EXTRACTED_{literal}");
            let body = source.replacen(literal, &const_name, usize::MAX);
            Some(format!("const {const_name}: i64 = {literal};\n{body}"))
        }
        Schema::FlattenNesting => {
            // Only matches single-armed, single-statement if/else blocks
            // (no nested braces in either arm) — anything deeper is left
            // alone rather than risk a text-level rewrite losing a brace.
            let caps = if_else_pattern().captures(source)?;
            let cond = caps[1].trim();
            let then_body = caps[2].trim();
            let else_body = caps[3].trim();
            let replacement = format!("if !({cond}) {{ {else_body} return; }}\n{then_body}");
            Some(if_else_pattern().replace(source, replacement.as_str()).to_string())
        }
        Schema::InlineSingleUse => {
            // Walks each `let name = expr;` binding and inlines it only
            // when `name` appears exactly once in the remaining text —
            // anything else (zero or multiple uses) is left as-is.
            for caps in let_binding_pattern().captures_iter(source) {
                let full_match = caps.get(0).unwrap();
                let name = &caps[1];
                let expr = caps[2].trim();
                let remainder = &source[full_match.end()..];
                let usage = Regex::new(&format!(r"\b{}\b", regex::escape(name))).ok()?;
                if usage.find_iter(remainder).count() != 1 {
                    continue;
                }
                let inlined_remainder = usage.replace(remainder, format!("({expr})").as_str()).to_string();
                let mut rewritten = String::with_capacity(source.len());
                rewritten.push_str(&source[..full_match.start()]);
                rewritten.push_str(&inlined_remainder);
                return Some(rewritten);
            }
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loop_to_iterator_rewrites_index_loop() {
        let source = "fn sum(items: &[i32]) -> i32 { let mut total = 0; for i in 0..items.len() { total += items[i]; } total }";
        let rewritten = apply_schema(Schema::LoopToIterator, source).unwrap();
        assert!(rewritten.contains(".iter().enumerate()"));
    }

    #[test]
    fn extract_constant_requires_repetition() {
        let source = "fn f() -> i32 { 42 }";
        assert!(apply_schema(Schema::ExtractConstant, source).is_none());
        let repeated = "fn f() -> i32 { 42 + 42 }";
        let rewritten = apply_schema(Schema::ExtractConstant, repeated).unwrap();
        assert!(rewritten.contains("const EXTRACTED_42"));
    }

    #[test]
    fn flatten_nesting_inverts_a_single_armed_else() {
        let source = "if ok { good() } else { bad() }";
        let rewritten = apply_schema(Schema::FlattenNesting, source).unwrap();
        assert!(rewritten.contains("if !(ok)"));
        assert!(rewritten.contains("bad()"));
        assert!(rewritten.contains("good()"));
    }

    #[test]
    fn flatten_nesting_skips_nested_blocks() {
        let source = "if ok { if inner { a() } } else { bad() }";
        assert!(apply_schema(Schema::FlattenNesting, source).is_none());
    }

    #[test]
    fn inline_single_use_substitutes_the_only_reference() {
        let source = "let total = a + b; println!(\"{}\", total);";
        let rewritten = apply_schema(Schema::InlineSingleUse, source).unwrap();
        assert!(!rewritten.contains("let total"));
        assert!(rewritten.contains("(a + b)"));
    }

    #[test]
    fn inline_single_use_skips_bindings_used_more_than_once() {
        let source = "let total = a + b; println!(\"{}\", total); println!(\"{}\", total);";
        assert!(apply_schema(Schema::InlineSingleUse, source).is_none());
    }
}
