use regex::Regex;

use super::{dedup_preserving_order, SourceAnalyzer, TestableUnit, UnitKind};

pub struct PythonAnalyzer {
    function_re: Regex,
    class_re: Regex,
    import_re: Regex,
    from_import_re: Regex,
}

impl PythonAnalyzer {
    pub fn new() -> Self {
        Self {
            function_re: Regex::new(r"(?m)^\s*def\s+([A-Za-z_][A-Za-z0-9_]*)\s*\(")
                .expect("valid regex"),
            class_re: Regex::new(r"(?m)^\s*class\s+([A-Za-z_][A-Za-z0-9_]*)\s*[(:]")
                .expect("valid regex"),
            import_re: Regex::new(r"(?m)^\s*import\s+([A-Za-z_][A-Za-z0-9_.]*)")
                .expect("valid regex"),
            from_import_re: Regex::new(r"(?m)^\s*from\s+([A-Za-z_][A-Za-z0-9_.]*)\s+import")
                .expect("valid regex"),
        }
    }
}

impl Default for PythonAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceAnalyzer for PythonAnalyzer {
    fn testable_units(&self, code: &str) -> Vec<TestableUnit> {
        let mut units = Vec::new();
        for cap in self.class_re.captures_iter(code) {
            units.push(TestableUnit {
                name: cap[1].to_string(),
                kind: UnitKind::Class,
            });
        }
        for cap in self.function_re.captures_iter(code) {
            let name = cap[1].to_string();
            // Dunder methods are implementation detail, not test targets.
            if name.starts_with("__") && name.ends_with("__") {
                continue;
            }
            units.push(TestableUnit {
                name,
                kind: UnitKind::Function,
            });
        }
        units
    }

    fn dependencies(&self, code: &str) -> Vec<String> {
        let mut deps = Vec::new();
        for cap in self.import_re.captures_iter(code) {
            deps.push(cap[1].split('.').next().unwrap_or(&cap[1]).to_string());
        }
        for cap in self.from_import_re.captures_iter(code) {
            deps.push(cap[1].split('.').next().unwrap_or(&cap[1]).to_string());
        }
        dedup_preserving_order(deps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_functions_and_classes() {
        let code = r#"
import os
from collections import OrderedDict

class Store:
    def __init__(self):
        self.items = OrderedDict()

    def add(self, key, value):
        self.items[key] = value

def main():
    pass
"#;
        let analyzer = PythonAnalyzer::new();
        let units = analyzer.testable_units(code);

        let names: Vec<&str> = units.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["Store", "add", "main"]);
        assert_eq!(units[0].kind, UnitKind::Class);
    }

    #[test]
    fn extracts_top_level_module_names() {
        let code = "import os.path\nfrom collections import deque\nimport os\n";
        let deps = PythonAnalyzer::new().dependencies(code);
        assert_eq!(deps, vec!["os", "collections"]);
    }

    #[test]
    fn empty_source_has_no_units() {
        let analyzer = PythonAnalyzer::new();
        assert!(analyzer.testable_units("").is_empty());
        assert!(analyzer.dependencies("").is_empty());
    }
}
