use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::analysis::{analyzer_for, Complexity};
use crate::cache::ResponseCache;
use crate::error::Result;
use crate::provider::claude::ClaudeClient;
use crate::provider::{extract_json, strip_code_fences, GeneratedCode, GenerationProvider};
use crate::workflow::types::Language;

/// Claude-backed code generation with a TTL response cache.
///
/// The cache is keyed by (language, prompt, context), so a refinement round
/// with a fresh feedback directive never hits a stale entry.
pub struct ClaudeGenerator {
    client: ClaudeClient,
    cache: Arc<ResponseCache<GeneratedCode>>,
}

#[derive(Debug, Deserialize)]
struct GenerationWire {
    code: String,
    #[serde(default)]
    explanation: String,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default)]
    complexity: Option<Complexity>,
}

impl ClaudeGenerator {
    pub fn new(client: ClaudeClient, ttl: Duration, max_cache_entries: usize) -> Self {
        Self {
            client,
            cache: Arc::new(ResponseCache::new(ttl, max_cache_entries)),
        }
    }

    pub fn cache(&self) -> Arc<ResponseCache<GeneratedCode>> {
        Arc::clone(&self.cache)
    }

    fn system_prompt(language: Language) -> String {
        format!(
            "You are an expert {language} engineer. Produce complete, working {language} code \
             for the user's request.\n\n\
             Respond with a JSON object only:\n\
             {{\"code\": \"<the full source>\", \"explanation\": \"<one paragraph>\", \
             \"dependencies\": [\"<package>\"], \"complexity\": \"simple|moderate|complex\"}}"
        )
    }

    fn user_message(prompt: &str, context: Option<&str>) -> String {
        match context {
            Some(context) if !context.is_empty() => {
                format!("{prompt}\n\n## Reference material\n{context}")
            }
            _ => prompt.to_string(),
        }
    }

    /// Turn a raw model response into a GeneratedCode, tolerating responses
    /// that ignore the JSON instruction and return bare source.
    fn parse_response(text: &str, language: Language) -> GeneratedCode {
        if let Ok(wire) = serde_json::from_str::<GenerationWire>(extract_json(text)) {
            let analyzer = analyzer_for(language);
            let complexity = wire
                .complexity
                .unwrap_or_else(|| analyzer.complexity(&wire.code));
            let dependencies = if wire.dependencies.is_empty() {
                analyzer.dependencies(&wire.code)
            } else {
                wire.dependencies
            };
            return GeneratedCode {
                code: wire.code,
                explanation: wire.explanation,
                dependencies,
                complexity,
            };
        }

        let code = strip_code_fences(text);
        let analyzer = analyzer_for(language);
        GeneratedCode {
            complexity: analyzer.complexity(&code),
            dependencies: analyzer.dependencies(&code),
            explanation: String::new(),
            code,
        }
    }
}

#[async_trait]
impl GenerationProvider for ClaudeGenerator {
    async fn generate(
        &self,
        prompt: &str,
        language: Language,
        context: Option<&str>,
    ) -> Result<GeneratedCode> {
        let cache_key = format!("{language}\u{1f}{prompt}\u{1f}{}", context.unwrap_or(""));

        if let Some(cached) = self.cache.get(&cache_key) {
            tracing::debug!(%language, "Generation cache hit");
            return Ok(cached);
        }

        let system = Self::system_prompt(language);
        let message = Self::user_message(prompt, context);
        let text = self.client.complete(&system, &message).await?;

        let generated = Self::parse_response(&text, language);
        self.cache.insert(cache_key, generated.clone());
        Ok(generated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_json() {
        let text = r#"{"code": "def f():\n    pass", "explanation": "a no-op", "dependencies": [], "complexity": "simple"}"#;
        let generated = ClaudeGenerator::parse_response(text, Language::Python);
        assert!(generated.code.starts_with("def f()"));
        assert_eq!(generated.explanation, "a no-op");
        assert_eq!(generated.complexity, Complexity::Simple);
    }

    #[test]
    fn falls_back_to_bare_source_with_inferred_metadata() {
        let text = "```python\nimport requests\n\ndef fetch(url):\n    return requests.get(url)\n```";
        let generated = ClaudeGenerator::parse_response(text, Language::Python);
        assert!(generated.code.contains("def fetch"));
        assert_eq!(generated.dependencies, vec!["requests"]);
    }

    #[test]
    fn missing_complexity_is_estimated() {
        let text = r#"{"code": "def f():\n    pass"}"#;
        let generated = ClaudeGenerator::parse_response(text, Language::Python);
        assert_eq!(generated.complexity, Complexity::Simple);
    }

    #[test]
    fn context_is_appended_to_the_message() {
        let message = ClaudeGenerator::user_message("do a thing", Some("pattern body"));
        assert!(message.starts_with("do a thing"));
        assert!(message.contains("pattern body"));

        let bare = ClaudeGenerator::user_message("do a thing", None);
        assert_eq!(bare, "do a thing");
    }
}
