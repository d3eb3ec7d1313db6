use crate::provider::{GenerationProvider, ReviewProvider, ReviewType};
use crate::workflow::types::{Issue, IterationRecord, Language, RefinementOutput};

/// Score at or above which code is accepted without further rounds.
pub const QUALITY_THRESHOLD: u8 = 85;

/// Regeneration rounds allowed after the initial result.
pub const MAX_REFINEMENT_ROUNDS: u32 = 3;

/// Issues embedded into the feedback directive, taken in reviewer order.
const MAX_FEEDBACK_ISSUES: usize = 5;

/// Bounded regenerate-and-rescore loop.
///
/// Starting from the initial generated code and its review, the controller
/// regenerates with a feedback directive until the score clears the threshold
/// or the round cap is reached. The final code and score are those of the
/// last executed round, not the best-scoring one.
pub struct RefinementController<'a> {
    generator: &'a dyn GenerationProvider,
    reviewer: &'a dyn ReviewProvider,
}

impl<'a> RefinementController<'a> {
    pub fn new(generator: &'a dyn GenerationProvider, reviewer: &'a dyn ReviewProvider) -> Self {
        Self {
            generator,
            reviewer,
        }
    }

    /// Run the loop. Returns the refinement output plus any errors swallowed
    /// along the way; a provider error ends the loop with the last known good
    /// code and score, keeping the history accumulated so far.
    pub async fn refine(
        &self,
        language: Language,
        initial_code: &str,
        initial_score: u8,
        initial_issues: &[Issue],
    ) -> (RefinementOutput, Vec<String>) {
        let mut history = vec![IterationRecord {
            iteration: 0,
            code: initial_code.to_string(),
            score: initial_score,
            issues: initial_issues.to_vec(),
        }];

        let mut current_code = initial_code.to_string();
        let mut current_score = initial_score;
        let mut current_issues = initial_issues.to_vec();
        let mut errors = Vec::new();

        if initial_score >= QUALITY_THRESHOLD {
            tracing::debug!(score = initial_score, "Initial score clears threshold");
            return (
                RefinementOutput {
                    final_code: current_code,
                    final_score: current_score,
                    history,
                },
                errors,
            );
        }

        for round in 1..=MAX_REFINEMENT_ROUNDS {
            let directive = feedback_directive(current_score, &current_issues);

            let regenerated = match self
                .generator
                .generate(&directive, language, Some(&current_code))
                .await
            {
                Ok(generated) => generated,
                Err(e) => {
                    tracing::warn!(round, error = %e, "Regeneration failed");
                    errors.push(format!("refine-code: regeneration round {round} failed: {e}"));
                    break;
                }
            };

            let review = match self
                .reviewer
                .review(&regenerated.code, language, ReviewType::Comprehensive)
                .await
            {
                Ok(review) => review,
                Err(e) => {
                    tracing::warn!(round, error = %e, "Re-review failed");
                    errors.push(format!("refine-code: review round {round} failed: {e}"));
                    break;
                }
            };

            current_code = regenerated.code;
            current_score = review.overall_score;
            current_issues = review.issues.clone();

            tracing::info!(round, score = current_score, "Refinement round complete");

            history.push(IterationRecord {
                iteration: round,
                code: current_code.clone(),
                score: current_score,
                issues: review.issues,
            });

            if current_score >= QUALITY_THRESHOLD {
                break;
            }
        }

        (
            RefinementOutput {
                final_code: current_code,
                final_score: current_score,
                history,
            },
            errors,
        )
    }
}

/// Build the regeneration prompt from the current score and the top issues,
/// in the order the reviewer returned them.
pub(crate) fn feedback_directive(score: u8, issues: &[Issue]) -> String {
    let mut directive = format!(
        "The previous implementation scored {score}/100 in code review. \
         Revise it to address these issues:\n"
    );

    for (index, issue) in issues.iter().take(MAX_FEEDBACK_ISSUES).enumerate() {
        directive.push_str(&format!(
            "{}. [{} {}] {} (suggestion: {})\n",
            index + 1,
            issue.severity.as_str(),
            issue.kind.as_str(),
            issue.description,
            issue.suggestion,
        ));
    }

    directive.push_str("\nReturn the complete revised implementation.");
    directive
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::testing::{issue_with_description, issues, ScriptedGenerator, ScriptedReviewer};
    use crate::workflow::types::Severity;

    fn sample_issues(score_target: &str) -> Vec<Issue> {
        match score_target {
            // 100 - 25 - 15 = 60
            "60" => issues(&[Severity::Critical, Severity::High]),
            // 100 - 25 = 75
            "75" => issues(&[Severity::Critical]),
            _ => Vec::new(),
        }
    }

    #[tokio::test]
    async fn high_initial_score_skips_refinement() {
        let generator = ScriptedGenerator::new(vec![]);
        let reviewer = ScriptedReviewer::new(vec![]);
        let controller = RefinementController::new(&generator, &reviewer);

        let (output, errors) = controller
            .refine(Language::Python, "original", 92, &[])
            .await;

        assert!(errors.is_empty());
        assert_eq!(output.history.len(), 1);
        assert_eq!(output.final_code, "original");
        assert_eq!(output.final_score, 92);
    }

    #[tokio::test]
    async fn threshold_score_counts_as_passing() {
        let generator = ScriptedGenerator::new(vec![]);
        let reviewer = ScriptedReviewer::new(vec![]);
        let controller = RefinementController::new(&generator, &reviewer);

        let (output, _) = controller
            .refine(Language::Python, "original", QUALITY_THRESHOLD, &[])
            .await;

        assert_eq!(output.history.len(), 1);
    }

    #[tokio::test]
    async fn persistent_low_scores_run_all_rounds_and_keep_the_last() {
        let generator =
            ScriptedGenerator::new(vec![Ok("v1".into()), Ok("v2".into()), Ok("v3".into())]);
        let reviewer = ScriptedReviewer::new(vec![
            Ok(sample_issues("75")),
            Ok(sample_issues("75")),
            Ok(sample_issues("60")),
        ]);
        let controller = RefinementController::new(&generator, &reviewer);

        let (output, errors) = controller
            .refine(Language::Python, "v0", 60, &sample_issues("60"))
            .await;

        assert!(errors.is_empty());
        assert_eq!(output.history.len(), (MAX_REFINEMENT_ROUNDS + 1) as usize);
        // Last round wins even though round 1 scored higher.
        assert_eq!(output.final_code, "v3");
        assert_eq!(output.final_score, 60);
        let scores: Vec<u8> = output.history.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![60, 75, 75, 60]);
    }

    #[tokio::test]
    async fn loop_stops_once_a_round_clears_the_threshold() {
        let generator = ScriptedGenerator::new(vec![Ok("v1".into()), Ok("v2".into())]);
        let reviewer = ScriptedReviewer::new(vec![Ok(sample_issues("75")), Ok(Vec::new())]);
        let controller = RefinementController::new(&generator, &reviewer);

        let (output, errors) = controller
            .refine(Language::Python, "v0", 60, &sample_issues("60"))
            .await;

        assert!(errors.is_empty());
        assert_eq!(output.history.len(), 3);
        assert_eq!(output.final_code, "v2");
        assert_eq!(output.final_score, 100);
    }

    #[tokio::test]
    async fn generation_error_keeps_last_good_code_and_history() {
        let generator = ScriptedGenerator::new(vec![
            Ok("v1".into()),
            Err("provider unreachable".into()),
        ]);
        let reviewer = ScriptedReviewer::new(vec![Ok(sample_issues("75"))]);
        let controller = RefinementController::new(&generator, &reviewer);

        let (output, errors) = controller
            .refine(Language::Python, "v0", 60, &sample_issues("60"))
            .await;

        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("round 2"));
        assert_eq!(output.history.len(), 2);
        assert_eq!(output.final_code, "v1");
        assert_eq!(output.final_score, 75);
    }

    #[tokio::test]
    async fn first_round_error_falls_back_to_the_initial_code() {
        let generator = ScriptedGenerator::new(vec![Err("provider unreachable".into())]);
        let reviewer = ScriptedReviewer::new(vec![]);
        let controller = RefinementController::new(&generator, &reviewer);

        let (output, errors) = controller
            .refine(Language::Python, "v0", 60, &sample_issues("60"))
            .await;

        assert_eq!(errors.len(), 1);
        assert_eq!(output.history.len(), 1);
        assert_eq!(output.final_code, "v0");
        assert_eq!(output.final_score, 60);
    }

    #[tokio::test]
    async fn history_length_is_always_between_1_and_4() {
        for initial_score in [0u8, 60, 84, 85, 100] {
            let generator = ScriptedGenerator::new(vec![
                Ok("a".into()),
                Ok("b".into()),
                Ok("c".into()),
            ]);
            let reviewer = ScriptedReviewer::new(vec![
                Ok(sample_issues("60")),
                Ok(sample_issues("60")),
                Ok(sample_issues("60")),
            ]);
            let controller = RefinementController::new(&generator, &reviewer);

            let (output, _) = controller
                .refine(Language::Python, "v0", initial_score, &[])
                .await;

            assert!(!output.history.is_empty());
            assert!(output.history.len() <= (MAX_REFINEMENT_ROUNDS + 1) as usize);
            assert_eq!(
                output.history.len() == 1,
                initial_score >= QUALITY_THRESHOLD
            );
        }
    }

    #[test]
    fn directive_embeds_score_and_first_five_issues_in_order() {
        let issues: Vec<Issue> = (0..7)
            .map(|i| issue_with_description(Severity::Medium, &format!("issue number {i}")))
            .collect();

        let directive = feedback_directive(42, &issues);

        assert!(directive.contains("42/100"));
        for i in 0..5 {
            assert!(directive.contains(&format!("issue number {i}")));
        }
        assert!(!directive.contains("issue number 5"));
        assert!(!directive.contains("issue number 6"));

        // Reviewer order is preserved, not severity-sorted.
        let first = directive.find("issue number 0").unwrap();
        let fifth = directive.find("issue number 4").unwrap();
        assert!(first < fifth);
    }
}
