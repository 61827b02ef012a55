//! Prompt Builder (§4.4): three metered size tiers, escalating only on
//! failure (Principle 11 — start minimal).

use crate::structure::{CodeStructure, Hypothesis};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PromptLevel {
    Level0,
    Level1,
    Level2,
}

impl PromptLevel {
    /// Relative token cost multiplier, used by the pipeline's budget
    /// accounting when deciding whether to escalate.
    pub fn cost_multiplier(self) -> u32 {
        match self {
            PromptLevel::Level0 => 1,
            PromptLevel::Level1 => 3,
            PromptLevel::Level2 => 10,
        }
    }

    pub fn escalate(self) -> Option<PromptLevel> {
        match self {
            PromptLevel::Level0 => Some(PromptLevel::Level1),
            PromptLevel::Level1 => Some(PromptLevel::Level2),
            PromptLevel::Level2 => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PromptPayload {
    pub level: PromptLevel,
    pub text: String,
}

const OUTPUT_CONTRACT: &str = "Respond with a metadata JSON block describing the change, followed by a single fenced code block containing the complete replacement source.";

/// Builds a prompt at the requested level for `hypothesis` targeting
/// `module_name`, informed by `structure`.
pub fn build_prompt(module_name: &str, hypothesis: &Hypothesis, structure: &CodeStructure, level: PromptLevel) -> PromptPayload {
    let mut text = String::new();
    text.push_str(&format!("Module: {module_name}\n"));
    text.push_str(&format!("Hypothesis: {}\n", hypothesis.description));
    text.push_str(&format!("Target symbol: {}\n", hypothesis.subject));
    text.push_str(OUTPUT_CONTRACT);
    text.push('\n');

    if level >= PromptLevel::Level1 {
        text.push_str("\nContext:\n");
        if let Some(func) = structure.functions.iter().find(|f| f.name == hypothesis.subject) {
            text.push_str(&format!(
                "  fn {}({} args) -> line_count={} async={}\n",
                func.name, func.arg_count, func.line_count, func.is_async
            ));
        }
        if let Some(class) = structure.classes.iter().find(|c| c.name == hypothesis.subject) {
            text.push_str(&format!(
                "  struct/enum {} derives=[{}] methods={}\n",
                class.name,
                class.derives.join(", "),
                class.method_count
            ));
        }
    }

    if level == PromptLevel::Level2 {
        text.push_str("\nKnown types in scope:\n");
        for class in &structure.classes {
            text.push_str(&format!("  - {} (derives: {})\n", class.name, class.derives.join(", ")));
        }
        text.push_str("\nImported signatures:\n");
        for import in &structure.imports {
            text.push_str(&format!("  - {import}\n"));
        }
        text.push_str("\nFull rules: preserve public API unless the hypothesis targets it; keep error handling idiomatic; do not introduce new external dependencies.\n");
    }

    PromptPayload { level, text }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::analyze;

    #[test]
    fn level_escalation_increases_cost() {
        assert!(PromptLevel::Level1.cost_multiplier() > PromptLevel::Level0.cost_multiplier());
        assert!(PromptLevel::Level2.cost_multiplier() > PromptLevel::Level1.cost_multiplier());
    }

    #[test]
    fn level_0_omits_context_level_2_includes_it() {
        let structure = analyze("pub fn over(a: i32, b: i32, c: i32, d: i32, e: i32, f: i32) {}").unwrap();
        let hypothesis = Hypothesis { subject: "over".into(), description: "group parameters".into() };
        let l0 = build_prompt("demo", &hypothesis, &structure, PromptLevel::Level0);
        let l2 = build_prompt("demo", &hypothesis, &structure, PromptLevel::Level2);
        assert!(!l0.text.contains("Known types in scope"));
        assert!(l2.text.contains("Known types in scope"));
    }
}
