pub mod claude;
pub mod generation;
pub mod review;
pub mod testgen;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::analysis::Complexity;
use crate::error::Result;
use crate::workflow::types::{Language, ReviewResult};

/// Output of one generation call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratedCode {
    pub code: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub complexity: Complexity,
}

/// A single test case description from the test provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub expected: String,
}

/// Output of one test-generation call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratedTests {
    pub test_code: String,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
    #[serde(default)]
    pub coverage: String,
    #[serde(default)]
    pub framework: String,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// Focus of a review pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewType {
    Comprehensive,
    Security,
    Performance,
}

impl ReviewType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewType::Comprehensive => "comprehensive",
            ReviewType::Security => "security",
            ReviewType::Performance => "performance",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestType {
    Unit,
    Integration,
}

impl TestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestType::Unit => "unit",
            TestType::Integration => "integration",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageTarget {
    Basic,
    Comprehensive,
}

impl CoverageTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoverageTarget::Basic => "basic",
            CoverageTarget::Comprehensive => "comprehensive",
        }
    }
}

#[async_trait]
pub trait GenerationProvider: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        language: Language,
        context: Option<&str>,
    ) -> Result<GeneratedCode>;
}

#[async_trait]
pub trait ReviewProvider: Send + Sync {
    async fn review(
        &self,
        code: &str,
        language: Language,
        review_type: ReviewType,
    ) -> Result<ReviewResult>;
}

#[async_trait]
pub trait TestGenerationProvider: Send + Sync {
    async fn generate_tests(
        &self,
        code: &str,
        language: Language,
        test_type: TestType,
        coverage: CoverageTarget,
    ) -> Result<GeneratedTests>;
}

/// Pull the JSON payload out of a model response that may wrap it in a
/// fenced code block or surround it with prose.
pub(crate) fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();

    if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        // Skip an optional language hint on the fence line.
        let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after_fence[body_start..];
        if let Some(end) = body.find("```") {
            return body[..end].trim();
        }
    }

    // Fall back to the outermost object literal.
    if let (Some(open), Some(close)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if open < close {
            return trimmed[open..=close].trim();
        }
    }

    trimmed
}

/// Strip a fenced code block down to its body, for responses that return
/// plain source instead of JSON.
pub(crate) fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let Some(start) = trimmed.find("```") else {
        return trimmed.to_string();
    };

    let after_fence = &trimmed[start + 3..];
    let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_fence[body_start..];
    match body.find("```") {
        Some(end) => body[..end].trim_end().to_string(),
        None => body.trim_end().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_json_from_fenced_block() {
        let text = "Here you go:\n```json\n{\"code\": \"x\"}\n```\nanything else";
        assert_eq!(extract_json(text), "{\"code\": \"x\"}");
    }

    #[test]
    fn extract_json_from_bare_object() {
        let text = "result: {\"a\": 1} trailing";
        assert_eq!(extract_json(text), "{\"a\": 1}");
    }

    #[test]
    fn extract_json_passes_through_plain_text() {
        assert_eq!(extract_json("no json here"), "no json here");
    }

    #[test]
    fn strip_fences_keeps_body() {
        let text = "```python\ndef f():\n    return 1\n```";
        assert_eq!(strip_code_fences(text), "def f():\n    return 1");
    }

    #[test]
    fn strip_fences_without_fence_returns_input() {
        assert_eq!(strip_code_fences("  plain  "), "plain");
    }
}
