use regex::Regex;

use super::{dedup_preserving_order, SourceAnalyzer, TestableUnit, UnitKind};

pub struct RustAnalyzer {
    function_re: Regex,
    type_re: Regex,
    use_re: Regex,
}

impl RustAnalyzer {
    pub fn new() -> Self {
        Self {
            function_re: Regex::new(
                r"(?m)^\s*(?:pub(?:\([a-z]+\))?\s+)?(?:async\s+)?fn\s+([A-Za-z_][A-Za-z0-9_]*)",
            )
            .expect("valid regex"),
            type_re: Regex::new(
                r"(?m)^\s*(?:pub(?:\([a-z]+\))?\s+)?(?:struct|enum)\s+([A-Za-z_][A-Za-z0-9_]*)",
            )
            .expect("valid regex"),
            use_re: Regex::new(r"(?m)^\s*use\s+([A-Za-z_][A-Za-z0-9_]*)").expect("valid regex"),
        }
    }
}

impl Default for RustAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceAnalyzer for RustAnalyzer {
    fn testable_units(&self, code: &str) -> Vec<TestableUnit> {
        let mut units = Vec::new();
        for cap in self.type_re.captures_iter(code) {
            units.push(TestableUnit {
                name: cap[1].to_string(),
                kind: UnitKind::Class,
            });
        }
        for cap in self.function_re.captures_iter(code) {
            units.push(TestableUnit {
                name: cap[1].to_string(),
                kind: UnitKind::Function,
            });
        }
        units
    }

    fn dependencies(&self, code: &str) -> Vec<String> {
        let deps = self
            .use_re
            .captures_iter(code)
            .map(|cap| cap[1].to_string())
            .filter(|root| !matches!(root.as_str(), "crate" | "super" | "self" | "std" | "core"))
            .collect();
        dedup_preserving_order(deps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_functions_and_types() {
        let code = r#"
use serde::Serialize;
use std::fmt;

pub struct Config {
    name: String,
}

pub(crate) enum Mode { A, B }

pub async fn load() -> Config {
    Config { name: String::new() }
}

fn helper() {}
"#;
        let analyzer = RustAnalyzer::new();
        let units = analyzer.testable_units(code);
        let names: Vec<&str> = units.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["Config", "Mode", "load", "helper"]);
    }

    #[test]
    fn dependencies_exclude_std_and_path_keywords() {
        let code = "use serde::Serialize;\nuse std::fmt;\nuse crate::config;\nuse tokio::time;\n";
        let deps = RustAnalyzer::new().dependencies(code);
        assert_eq!(deps, vec!["serde", "tokio"]);
    }
}
