use async_trait::async_trait;
use serde::Deserialize;

use crate::error::Result;
use crate::provider::claude::ClaudeClient;
use crate::provider::{extract_json, ReviewProvider, ReviewType};
use crate::workflow::score::score_issues;
use crate::workflow::types::{Issue, Language, ReviewResult};

/// Claude-backed code review.
///
/// The wire format carries issues and prose; the overall score is always
/// recomputed locally from the issue list so every review in a workflow is
/// scored by the same function.
pub struct ClaudeReviewer {
    client: ClaudeClient,
}

#[derive(Debug, Deserialize)]
struct ReviewWire {
    #[serde(default)]
    issues: Vec<Issue>,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    refactored_code: Option<String>,
}

impl ClaudeReviewer {
    pub fn new(client: ClaudeClient) -> Self {
        Self { client }
    }

    fn system_prompt(language: Language, review_type: ReviewType) -> String {
        format!(
            "You are a meticulous {language} code reviewer performing a {} review. \
             Identify concrete problems in the submitted code.\n\n\
             Respond with a JSON object only:\n\
             {{\"issues\": [{{\"type\": \"security|performance|style|bug|best-practice\", \
             \"severity\": \"critical|high|medium|low\", \"line\": <number or null>, \
             \"description\": \"...\", \"suggestion\": \"...\"}}], \
             \"summary\": \"<one paragraph>\", \"refactored_code\": \"<optional improved source>\"}}",
            review_type.as_str()
        )
    }

    fn parse_response(text: &str) -> ReviewResult {
        let wire = serde_json::from_str::<ReviewWire>(extract_json(text)).unwrap_or(ReviewWire {
            issues: Vec::new(),
            summary: String::new(),
            refactored_code: None,
        });

        let overall_score = score_issues(&wire.issues);
        let summary = if wire.summary.trim().is_empty() {
            format!(
                "Review completed with {} issue(s), score {overall_score}/100.",
                wire.issues.len()
            )
        } else {
            wire.summary
        };

        ReviewResult {
            issues: wire.issues,
            overall_score,
            summary,
            refactored_code: wire.refactored_code,
        }
    }
}

#[async_trait]
impl ReviewProvider for ClaudeReviewer {
    async fn review(
        &self,
        code: &str,
        language: Language,
        review_type: ReviewType,
    ) -> Result<ReviewResult> {
        let system = Self::system_prompt(language, review_type);
        let message = format!("Review this {language} code:\n\n```{language}\n{code}\n```");
        let text = self.client.complete(&system, &message).await?;
        Ok(Self::parse_response(&text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::types::Severity;

    #[test]
    fn score_is_recomputed_from_issues() {
        // The wire claims a perfect score; the local scorer disagrees.
        let text = r#"{
            "issues": [
                {"type": "bug", "severity": "critical", "description": "d", "suggestion": "s"}
            ],
            "overall_score": 100,
            "summary": "fine"
        }"#;
        let result = ClaudeReviewer::parse_response(text);
        assert_eq!(result.overall_score, 75);
        assert_eq!(result.issues[0].severity, Severity::Critical);
    }

    #[test]
    fn summary_is_never_empty() {
        let result = ClaudeReviewer::parse_response(r#"{"issues": []}"#);
        assert!(!result.summary.is_empty());
        assert_eq!(result.overall_score, 100);
    }

    #[test]
    fn unparseable_response_becomes_a_clean_review() {
        let result = ClaudeReviewer::parse_response("the model rambled instead");
        assert!(result.issues.is_empty());
        assert_eq!(result.overall_score, 100);
        assert!(!result.summary.is_empty());
    }
}
