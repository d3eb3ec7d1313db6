use regex::Regex;

use super::{dedup_preserving_order, SourceAnalyzer, TestableUnit, UnitKind};

/// Covers JavaScript and TypeScript; the declaration shapes the heuristics
/// look for are the same in both.
pub struct JavaScriptAnalyzer {
    function_re: Regex,
    arrow_re: Regex,
    class_re: Regex,
    import_re: Regex,
    require_re: Regex,
}

impl JavaScriptAnalyzer {
    pub fn new() -> Self {
        Self {
            function_re: Regex::new(
                r"(?m)^\s*(?:export\s+)?(?:async\s+)?function\s+([A-Za-z_$][A-Za-z0-9_$]*)",
            )
            .expect("valid regex"),
            arrow_re: Regex::new(
                r"(?m)^\s*(?:export\s+)?(?:const|let)\s+([A-Za-z_$][A-Za-z0-9_$]*)\s*=\s*(?:async\s+)?\(",
            )
            .expect("valid regex"),
            class_re: Regex::new(r"(?m)^\s*(?:export\s+)?class\s+([A-Za-z_$][A-Za-z0-9_$]*)")
                .expect("valid regex"),
            import_re: Regex::new(r#"(?m)^\s*import\s+.*?from\s+['"]([^'"]+)['"]"#)
                .expect("valid regex"),
            require_re: Regex::new(r#"require\s*\(\s*['"]([^'"]+)['"]\s*\)"#)
                .expect("valid regex"),
        }
    }

    fn package_name(specifier: &str) -> Option<String> {
        // Relative paths are project files, not dependencies.
        if specifier.starts_with('.') || specifier.starts_with('/') {
            return None;
        }
        let mut parts = specifier.split('/');
        let first = parts.next()?;
        if first.starts_with('@') {
            let second = parts.next()?;
            Some(format!("{first}/{second}"))
        } else {
            Some(first.to_string())
        }
    }
}

impl Default for JavaScriptAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceAnalyzer for JavaScriptAnalyzer {
    fn testable_units(&self, code: &str) -> Vec<TestableUnit> {
        let mut units = Vec::new();
        for cap in self.class_re.captures_iter(code) {
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
        for cap in self.arrow_re.captures_iter(code) {
            units.push(TestableUnit {
                name: cap[1].to_string(),
                kind: UnitKind::Function,
            });
        }
        units
    }

    fn dependencies(&self, code: &str) -> Vec<String> {
        let mut deps = Vec::new();
        for cap in self.import_re.captures_iter(code) {
            if let Some(name) = Self::package_name(&cap[1]) {
                deps.push(name);
            }
        }
        for cap in self.require_re.captures_iter(code) {
            if let Some(name) = Self::package_name(&cap[1]) {
                deps.push(name);
            }
        }
        dedup_preserving_order(deps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_declarations_and_arrows() {
        let code = r#"
import express from 'express';
const { z } = require('zod');

export class Router {}

export async function handle(req) {}

const parse = (raw) => JSON.parse(raw);
"#;
        let analyzer = JavaScriptAnalyzer::new();
        let units = analyzer.testable_units(code);
        let names: Vec<&str> = units.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["Router", "handle", "parse"]);
    }

    #[test]
    fn extracts_package_names_and_skips_relative_imports() {
        let code = r#"
import express from 'express';
import helper from './helper';
import { join } from 'node:path';
const scoped = require('@scope/pkg/deep');
"#;
        let deps = JavaScriptAnalyzer::new().dependencies(code);
        assert_eq!(deps, vec!["express", "node:path", "@scope/pkg"]);
    }
}
