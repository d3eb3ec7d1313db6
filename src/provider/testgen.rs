use async_trait::async_trait;
use serde::Deserialize;

use crate::error::Result;
use crate::provider::claude::ClaudeClient;
use crate::provider::{
    extract_json, strip_code_fences, CoverageTarget, GeneratedTests, TestCase,
    TestGenerationProvider, TestType,
};
use crate::workflow::types::Language;

/// Claude-backed test generation.
pub struct ClaudeTestWriter {
    client: ClaudeClient,
}

#[derive(Debug, Deserialize)]
struct TestsWire {
    test_code: String,
    #[serde(default)]
    test_cases: Vec<TestCase>,
    #[serde(default)]
    coverage: String,
    #[serde(default)]
    framework: String,
    #[serde(default)]
    recommendations: Vec<String>,
}

/// Conventional test framework per language, used when the provider does not
/// name one.
pub fn default_framework(language: Language) -> &'static str {
    match language {
        Language::Python => "pytest",
        Language::JavaScript | Language::TypeScript => "jest",
        Language::Rust => "cargo test",
    }
}

impl ClaudeTestWriter {
    pub fn new(client: ClaudeClient) -> Self {
        Self { client }
    }

    fn system_prompt(language: Language, test_type: TestType, coverage: CoverageTarget) -> String {
        format!(
            "You are an expert {language} engineer writing {} tests with {} coverage. \
             Use the conventional test framework for {language} ({}).\n\n\
             Respond with a JSON object only:\n\
             {{\"test_code\": \"<full test source>\", \
             \"test_cases\": [{{\"name\": \"...\", \"description\": \"...\", \"expected\": \"...\"}}], \
             \"coverage\": \"<estimated percentage>\", \"framework\": \"<framework name>\", \
             \"recommendations\": [\"<testing advice>\"]}}",
            test_type.as_str(),
            coverage.as_str(),
            default_framework(language),
        )
    }

    fn parse_response(text: &str, language: Language) -> GeneratedTests {
        let wire = match serde_json::from_str::<TestsWire>(extract_json(text)) {
            Ok(wire) => wire,
            Err(_) => {
                // Treat the whole response as test source.
                return GeneratedTests {
                    test_code: strip_code_fences(text),
                    test_cases: Vec::new(),
                    coverage: String::new(),
                    framework: default_framework(language).to_string(),
                    recommendations: Vec::new(),
                };
            }
        };

        let framework = if wire.framework.trim().is_empty() {
            default_framework(language).to_string()
        } else {
            wire.framework
        };

        GeneratedTests {
            test_code: wire.test_code,
            test_cases: wire.test_cases,
            coverage: wire.coverage,
            framework,
            recommendations: wire.recommendations,
        }
    }
}

#[async_trait]
impl TestGenerationProvider for ClaudeTestWriter {
    async fn generate_tests(
        &self,
        code: &str,
        language: Language,
        test_type: TestType,
        coverage: CoverageTarget,
    ) -> Result<GeneratedTests> {
        let system = Self::system_prompt(language, test_type, coverage);
        let message = format!(
            "Write tests for this {language} code:\n\n```{language}\n{code}\n```"
        );
        let text = self.client.complete(&system, &message).await?;
        Ok(Self::parse_response(&text, language))
    }
}
