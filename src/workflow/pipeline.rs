use std::sync::Arc;

use crate::analysis::analyzer_for;
use crate::knowledge::KnowledgeBase;
use crate::platform::types::{CreatePullRequest, FileChange};
use crate::platform::RepositoryHost;
use crate::provider::testgen::default_framework;
use crate::provider::{
    CoverageTarget, GeneratedCode, GeneratedTests, GenerationProvider, ReviewProvider, ReviewType,
    TestGenerationProvider, TestType,
};
use crate::sandbox::{ExecutionReport, ExecutionSandbox};
use crate::workflow::refine::RefinementController;
use crate::workflow::report;
use crate::workflow::score::score_issues;
use crate::workflow::types::{
    KnowledgeOutput, RepositoryOutput, ReviewResult, Stage, StageOutput, StageRecord,
    WorkflowRequest, WorkflowResult, WorkflowState,
};

/// The seven-stage workflow orchestrator.
///
/// Stages run strictly in order; each one wraps its work in a local failure
/// boundary and records defaults plus an error entry instead of raising, so
/// the pipeline always reaches the compile-results step with well-typed
/// (possibly empty) data.
pub struct Pipeline {
    knowledge: KnowledgeBase,
    generator: Arc<dyn GenerationProvider>,
    reviewer: Arc<dyn ReviewProvider>,
    test_writer: Arc<dyn TestGenerationProvider>,
    sandbox: Arc<dyn ExecutionSandbox>,
    repository: Option<Arc<dyn RepositoryHost>>,
    sandbox_timeout_ms: u64,
}

impl Pipeline {
    pub fn new(
        knowledge: KnowledgeBase,
        generator: Arc<dyn GenerationProvider>,
        reviewer: Arc<dyn ReviewProvider>,
        test_writer: Arc<dyn TestGenerationProvider>,
        sandbox: Arc<dyn ExecutionSandbox>,
        repository: Option<Arc<dyn RepositoryHost>>,
        sandbox_timeout_ms: u64,
    ) -> Self {
        Self {
            knowledge,
            generator,
            reviewer,
            test_writer,
            sandbox,
            repository,
            sandbox_timeout_ms,
        }
    }

    /// Run one workflow invocation to completion.
    pub async fn run(&self, request: WorkflowRequest) -> WorkflowResult {
        tracing::info!(
            language = %request.language,
            repository = request.repository.as_deref().unwrap_or("-"),
            "Starting workflow"
        );

        let mut state = WorkflowState::new(request);

        let record = self.retrieve_knowledge(&state);
        state.record(Stage::RetrieveKnowledge, record);

        let record = self.generate_code(&state).await;
        state.record(Stage::GenerateCode, record);

        let record = self.review_code(&state).await;
        state.record(Stage::ReviewCode, record);

        let record = self.refine_code(&state).await;
        state.record(Stage::RefineCode, record);

        let record = self.generate_tests(&state).await;
        state.record(Stage::GenerateTests, record);

        if state.request.execute_tests.unwrap_or(false)
            && state.request.language.supports_execution()
        {
            let record = self.execute_tests(&state).await;
            state.record(Stage::ExecuteTests, record);
        }

        if state.request.repository.is_some() {
            let record = self.github_integration(&state).await;
            state.record(Stage::GithubIntegration, record);
        }

        let result = report::compile(&state);

        tracing::info!(
            success = result.success,
            score = result.review_score,
            errors = result.errors.len(),
            "Workflow finished"
        );

        result
    }

    fn retrieve_knowledge(&self, state: &WorkflowState) -> StageRecord {
        let query = state.request.prompt.trim();
        if query.is_empty() {
            // Missing query: safe empty default rather than an error.
            return StageRecord::ok(StageOutput::Knowledge(KnowledgeOutput::default()));
        }

        let patterns = self.knowledge.retrieve(query, state.request.language);
        let recommendations = self.knowledge.recommendations(&patterns);

        tracing::debug!(matches = patterns.len(), "Knowledge retrieval complete");

        StageRecord::ok(StageOutput::Knowledge(KnowledgeOutput {
            patterns,
            recommendations,
        }))
    }

    async fn generate_code(&self, state: &WorkflowState) -> StageRecord {
        let context = state.knowledge().map(|k| {
            k.patterns
                .iter()
                .map(|r| {
                    format!(
                        "### {} ({})\n{}",
                        r.pattern.name, r.pattern.description, r.pattern.code
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        });
        let context = context.filter(|c| !c.is_empty());

        match self
            .generator
            .generate(
                &state.request.prompt,
                state.request.language,
                context.as_deref(),
            )
            .await
        {
            Ok(generated) => StageRecord::ok(StageOutput::Generation(generated)),
            Err(e) => StageRecord::degraded(
                StageOutput::Generation(GeneratedCode::default()),
                format!("generate-code: {e}"),
            ),
        }
    }

    async fn review_code(&self, state: &WorkflowState) -> StageRecord {
        let code = state
            .generation()
            .map(|g| g.code.as_str())
            .unwrap_or_default();

        if code.is_empty() {
            // Keep the score-from-issues invariant intact for the default.
            let review = ReviewResult {
                issues: Vec::new(),
                overall_score: score_issues(&[]),
                summary: "No code was available to review.".to_string(),
                refactored_code: None,
            };
            return StageRecord::degraded(
                StageOutput::Review(review),
                "review-code: no code available to review".to_string(),
            );
        }

        match self
            .reviewer
            .review(code, state.request.language, ReviewType::Comprehensive)
            .await
        {
            Ok(review) => StageRecord::ok(StageOutput::Review(review)),
            Err(e) => {
                let review = ReviewResult {
                    issues: Vec::new(),
                    overall_score: score_issues(&[]),
                    summary: "Code review did not complete.".to_string(),
                    refactored_code: None,
                };
                StageRecord::degraded(StageOutput::Review(review), format!("review-code: {e}"))
            }
        }
    }

    async fn refine_code(&self, state: &WorkflowState) -> StageRecord {
        let code = state.current_code().to_string();
        let (score, issues) = state
            .review()
            .map(|r| (r.overall_score, r.issues.clone()))
            .unwrap_or((score_issues(&[]), Vec::new()));

        let controller = RefinementController::new(&*self.generator, &*self.reviewer);
        let (output, errors) = controller
            .refine(state.request.language, &code, score, &issues)
            .await;

        StageRecord {
            output: StageOutput::Refinement(output),
            errors,
        }
    }

    async fn generate_tests(&self, state: &WorkflowState) -> StageRecord {
        let language = state.request.language;
        let code = state.current_code().to_string();

        if code.is_empty() {
            let tests = GeneratedTests {
                framework: default_framework(language).to_string(),
                recommendations: vec!["No code was available to generate tests for.".to_string()],
                ..GeneratedTests::default()
            };
            return StageRecord::ok(StageOutput::TestGeneration(tests));
        }

        match self
            .test_writer
            .generate_tests(&code, language, TestType::Unit, CoverageTarget::Comprehensive)
            .await
        {
            Ok(mut tests) => {
                if analyzer_for(language).testable_units(&code).is_empty() {
                    tests.recommendations.push(
                        "No named functions or classes were detected; structure the code \
                         into named units for easier testing."
                            .to_string(),
                    );
                }
                StageRecord::ok(StageOutput::TestGeneration(tests))
            }
            Err(e) => {
                let tests = GeneratedTests {
                    framework: default_framework(language).to_string(),
                    ..GeneratedTests::default()
                };
                StageRecord::degraded(
                    StageOutput::TestGeneration(tests),
                    format!("generate-tests: {e}"),
                )
            }
        }
    }

    async fn execute_tests(&self, state: &WorkflowState) -> StageRecord {
        let code = state.current_code();
        let test_code = state
            .tests()
            .map(|t| t.test_code.as_str())
            .unwrap_or_default();

        let program = if test_code.is_empty() {
            code.to_string()
        } else {
            format!("{code}\n\n{test_code}")
        };

        match self
            .sandbox
            .execute(&program, state.request.language, self.sandbox_timeout_ms)
            .await
        {
            // A failing run is data for the report, not a stage error.
            Ok(report) => StageRecord::ok(StageOutput::Execution(report)),
            Err(e) => StageRecord::degraded(
                StageOutput::Execution(ExecutionReport::default()),
                format!("execute-tests: {e}"),
            ),
        }
    }

    async fn github_integration(&self, state: &WorkflowState) -> StageRecord {
        let repository = state
            .request
            .repository
            .as_deref()
            .unwrap_or_default()
            .to_string();

        let Some(host) = &self.repository else {
            return StageRecord::degraded(
                StageOutput::Repository(RepositoryOutput::default()),
                "github-integration: repository host is not configured".to_string(),
            );
        };

        let code = state.current_code();
        if code.is_empty() {
            return StageRecord::degraded(
                StageOutput::Repository(RepositoryOutput::default()),
                "github-integration: no code available to push".to_string(),
            );
        }

        let request = build_pull_request(state);

        match host.create_pull_request(&repository, &request).await {
            Ok(pr) => {
                tracing::info!(pr = pr.number, "Pull request created");
                StageRecord::ok(StageOutput::Repository(RepositoryOutput {
                    pull_request: Some(pr),
                }))
            }
            Err(e) => StageRecord::degraded(
                StageOutput::Repository(RepositoryOutput::default()),
                format!("github-integration: {e}"),
            ),
        }
    }
}

fn build_pull_request(state: &WorkflowState) -> CreatePullRequest {
    let language = state.request.language;
    let extension = language.extension();
    let code = state.current_code();

    let mut files = vec![FileChange {
        path: format!("generated/solution.{extension}"),
        content: code.to_string(),
    }];

    if let Some(tests) = state.tests() {
        if !tests.test_code.is_empty() {
            files.push(FileChange {
                path: format!("generated/test_solution.{extension}"),
                content: tests.test_code.clone(),
            });
        }
    }

    let title = format!("Generated: {}", truncate(&state.request.prompt, 60));

    let mut body = String::new();
    if let Some(generated) = state.generation() {
        if !generated.explanation.is_empty() {
            body.push_str(&generated.explanation);
            body.push_str("\n\n");
        }
        if !generated.dependencies.is_empty() {
            body.push_str(&format!(
                "**Dependencies:** {}\n\n",
                generated.dependencies.join(", ")
            ));
        }
    }
    if let Some(refined) = state.refinement() {
        body.push_str(&format!(
            "**Review score:** {}/100 over {} iteration(s)\n\n",
            refined.final_score,
            refined.history.len()
        ));
    }
    if let Some(tests) = state.tests() {
        if !tests.framework.is_empty() {
            body.push_str(&format!("**Test framework:** {}\n\n", tests.framework));
        }
    }
    body.push_str("---\n*Automated by Crucible*");

    CreatePullRequest {
        title,
        body,
        branch_name: branch_name(&state.request.prompt),
        files,
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_chars {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(max_chars).collect();
        format!("{}…", cut.trim_end())
    }
}

fn branch_name(prompt: &str) -> String {
    let slug: String = prompt
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .take(5)
        .collect::<Vec<_>>()
        .join("-");

    let stamp = chrono::Utc::now().timestamp();
    if slug.is_empty() {
        format!("crucible/generated-{stamp}")
    } else {
        format!("crucible/{slug}-{stamp}")
    }
}
