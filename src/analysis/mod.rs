pub mod javascript;
pub mod python;
pub mod rust;

use serde::{Deserialize, Serialize};

use crate::workflow::types::Language;

/// Rough size classification of a piece of source code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    #[default]
    Simple,
    Moderate,
    Complex,
}

/// A function or class an analyzer considers a test target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestableUnit {
    pub name: String,
    pub kind: UnitKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Function,
    Class,
}

/// Regex-backed heuristics over one language's source text.
///
/// These are text heuristics, not parsers; each language gets its own
/// implementation so the scorers and the pipeline stay decoupled from any
/// language-specific matching.
pub trait SourceAnalyzer: Send + Sync {
    /// Functions and classes that tests could target.
    fn testable_units(&self, code: &str) -> Vec<TestableUnit>;

    /// Names of external modules/packages the code imports.
    fn dependencies(&self, code: &str) -> Vec<String>;

    /// Size estimate from line count and unit count.
    fn complexity(&self, code: &str) -> Complexity {
        let lines = code.lines().filter(|l| !l.trim().is_empty()).count();
        let units = self.testable_units(code).len();
        if lines > 120 || units > 8 {
            Complexity::Complex
        } else if lines > 40 || units > 3 {
            Complexity::Moderate
        } else {
            Complexity::Simple
        }
    }
}

/// Select the analyzer for a language tag.
pub fn analyzer_for(language: Language) -> Box<dyn SourceAnalyzer> {
    match language {
        Language::Python => Box::new(python::PythonAnalyzer::new()),
        Language::JavaScript | Language::TypeScript => {
            Box::new(javascript::JavaScriptAnalyzer::new())
        }
        Language::Rust => Box::new(rust::RustAnalyzer::new()),
    }
}

pub(crate) fn dedup_preserving_order(names: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    names
        .into_iter()
        .filter(|n| seen.insert(n.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complexity_scales_with_line_count() {
        let analyzer = analyzer_for(Language::Python);

        assert_eq!(analyzer.complexity("def f():\n    return 1\n"), Complexity::Simple);

        let moderate: String = (0..50).map(|i| format!("x{i} = {i}\n")).collect();
        assert_eq!(analyzer.complexity(&moderate), Complexity::Moderate);

        let complex: String = (0..150).map(|i| format!("x{i} = {i}\n")).collect();
        assert_eq!(analyzer.complexity(&complex), Complexity::Complex);
    }

    #[test]
    fn typescript_shares_the_javascript_analyzer() {
        let code = "export function greet(name: string) { return `hi ${name}`; }";
        let units = analyzer_for(Language::TypeScript).testable_units(code);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].name, "greet");
    }
}
