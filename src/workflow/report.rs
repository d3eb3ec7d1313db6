use crate::workflow::types::{WorkflowResult, WorkflowState};

/// Fold every stage record into the final WorkflowResult.
///
/// `success` requires an empty error list across all stages AND a non-empty
/// final code string; a low review score alone never fails a workflow.
/// Errors keep stage-execution order and are never deduplicated.
pub fn compile(state: &WorkflowState) -> WorkflowResult {
    let errors = state.errors_in_order();
    let final_code = state.current_code().to_string();

    let review_score = state
        .refinement()
        .map(|r| r.final_score)
        .or_else(|| state.review().map(|r| r.overall_score))
        .unwrap_or(0);

    let iteration_history = state
        .refinement()
        .map(|r| r.history.clone())
        .unwrap_or_default();

    let tests = state
        .tests()
        .map(|t| t.test_code.clone())
        .unwrap_or_default();

    let mut recommendations = state
        .knowledge()
        .map(|k| k.recommendations.clone())
        .unwrap_or_default();
    if let Some(generated_tests) = state.tests() {
        recommendations.extend(generated_tests.recommendations.iter().cloned());
    }

    let github_pr = state
        .repository()
        .and_then(|r| r.pull_request.as_ref())
        .map(|pr| pr.url.clone());

    WorkflowResult {
        success: errors.is_empty() && !final_code.is_empty(),
        final_code,
        review_score,
        tests,
        test_results: state.execution().cloned(),
        github_pr,
        iteration_history,
        recommendations,
        errors,
        steps_completed: state.steps_completed(),
        steps_succeeded: state.steps_succeeded(),
    }
}
