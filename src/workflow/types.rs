use serde::{Deserialize, Serialize};

use crate::knowledge::RankedPattern;
use crate::platform::types::PullRequestRef;
use crate::provider::{GeneratedCode, GeneratedTests};
use crate::sandbox::ExecutionReport;

/// Target language for a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Rust,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Rust => "rust",
        }
    }

    /// File extension for generated sources.
    pub fn extension(&self) -> &'static str {
        match self {
            Language::Python => "py",
            Language::JavaScript => "js",
            Language::TypeScript => "ts",
            Language::Rust => "rs",
        }
    }

    /// Languages the process sandbox can run directly.
    pub fn supports_execution(&self) -> bool {
        matches!(self, Language::Python | Language::JavaScript)
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "python" | "py" => Ok(Language::Python),
            "javascript" | "js" => Ok(Language::JavaScript),
            "typescript" | "ts" => Ok(Language::TypeScript),
            "rust" | "rs" => Ok(Language::Rust),
            other => Err(format!("Unsupported language: {other}")),
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The trigger input for one pipeline invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRequest {
    pub prompt: String,
    pub language: Language,
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default)]
    pub execute_tests: Option<bool>,
}

/// Category of a review finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueKind {
    Security,
    Performance,
    Style,
    Bug,
    BestPractice,
    #[serde(other)]
    Other,
}

/// Severity of a review finding. Unrecognized wire values map to `Unknown`
/// so reviewer output never fails to parse on a novel severity string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    #[serde(other)]
    Unknown,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::Security => "security",
            IssueKind::Performance => "performance",
            IssueKind::Style => "style",
            IssueKind::Bug => "bug",
            IssueKind::BestPractice => "best-practice",
            IssueKind::Other => "other",
        }
    }
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Unknown => "unknown",
        }
    }
}

/// A single finding from the review provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    #[serde(rename = "type")]
    pub kind: IssueKind,
    pub severity: Severity,
    #[serde(default)]
    pub line: Option<u32>,
    pub description: String,
    pub suggestion: String,
}

/// Output of one review pass. `overall_score` is always recomputed from
/// `issues` via the quality scorer, never taken from the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewResult {
    pub issues: Vec<Issue>,
    pub overall_score: u8,
    pub summary: String,
    #[serde(default)]
    pub refactored_code: Option<String>,
}

/// One round of the refinement loop. Iteration 0 is the pre-refinement result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: u32,
    pub code: String,
    pub score: u8,
    pub issues: Vec<Issue>,
}

/// The seven pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    RetrieveKnowledge,
    GenerateCode,
    ReviewCode,
    RefineCode,
    GenerateTests,
    ExecuteTests,
    GithubIntegration,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::RetrieveKnowledge,
        Stage::GenerateCode,
        Stage::ReviewCode,
        Stage::RefineCode,
        Stage::GenerateTests,
        Stage::ExecuteTests,
        Stage::GithubIntegration,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::RetrieveKnowledge => "retrieve-knowledge",
            Stage::GenerateCode => "generate-code",
            Stage::ReviewCode => "review-code",
            Stage::RefineCode => "refine-code",
            Stage::GenerateTests => "generate-tests",
            Stage::ExecuteTests => "execute-tests",
            Stage::GithubIntegration => "github-integration",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Output recorded by the knowledge stage.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeOutput {
    pub patterns: Vec<RankedPattern>,
    pub recommendations: Vec<String>,
}

/// Output recorded by the refinement stage.
#[derive(Debug, Clone, Default)]
pub struct RefinementOutput {
    pub final_code: String,
    pub final_score: u8,
    pub history: Vec<IterationRecord>,
}

/// Output recorded by the repository stage.
#[derive(Debug, Clone, Default)]
pub struct RepositoryOutput {
    pub pull_request: Option<PullRequestRef>,
}

/// The typed output of a single stage.
#[derive(Debug, Clone)]
pub enum StageOutput {
    Knowledge(KnowledgeOutput),
    Generation(GeneratedCode),
    Review(ReviewResult),
    Refinement(RefinementOutput),
    TestGeneration(GeneratedTests),
    Execution(ExecutionReport),
    Repository(RepositoryOutput),
}

/// What one stage left behind: its output plus any errors it swallowed.
/// A stage with a non-empty error list still counts as having run.
#[derive(Debug, Clone)]
pub struct StageRecord {
    pub output: StageOutput,
    pub errors: Vec<String>,
}

impl StageRecord {
    pub fn ok(output: StageOutput) -> Self {
        Self {
            output,
            errors: Vec::new(),
        }
    }

    pub fn degraded(output: StageOutput, error: String) -> Self {
        Self {
            output,
            errors: vec![error],
        }
    }
}

/// Accumulating state for one pipeline invocation.
///
/// Records are append-only: each stage writes its output exactly once and
/// never touches another stage's entry. The record order is the execution
/// order, which the aggregator relies on when concatenating errors.
#[derive(Debug)]
pub struct WorkflowState {
    pub request: WorkflowRequest,
    records: Vec<(Stage, StageRecord)>,
}

impl WorkflowState {
    pub fn new(request: WorkflowRequest) -> Self {
        Self {
            request,
            records: Vec::new(),
        }
    }

    /// Record a stage's output. Each stage may only be recorded once.
    pub fn record(&mut self, stage: Stage, record: StageRecord) {
        debug_assert!(
            self.get(stage).is_none(),
            "stage {stage} recorded twice"
        );
        self.records.push((stage, record));
    }

    pub fn get(&self, stage: Stage) -> Option<&StageRecord> {
        self.records
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, r)| r)
    }

    pub fn knowledge(&self) -> Option<&KnowledgeOutput> {
        match self.get(Stage::RetrieveKnowledge)?.output {
            StageOutput::Knowledge(ref k) => Some(k),
            _ => None,
        }
    }

    pub fn generation(&self) -> Option<&GeneratedCode> {
        match self.get(Stage::GenerateCode)?.output {
            StageOutput::Generation(ref g) => Some(g),
            _ => None,
        }
    }

    pub fn review(&self) -> Option<&ReviewResult> {
        match self.get(Stage::ReviewCode)?.output {
            StageOutput::Review(ref r) => Some(r),
            _ => None,
        }
    }

    pub fn refinement(&self) -> Option<&RefinementOutput> {
        match self.get(Stage::RefineCode)?.output {
            StageOutput::Refinement(ref r) => Some(r),
            _ => None,
        }
    }

    pub fn tests(&self) -> Option<&GeneratedTests> {
        match self.get(Stage::GenerateTests)?.output {
            StageOutput::TestGeneration(ref t) => Some(t),
            _ => None,
        }
    }

    pub fn execution(&self) -> Option<&ExecutionReport> {
        match self.get(Stage::ExecuteTests)?.output {
            StageOutput::Execution(ref e) => Some(e),
            _ => None,
        }
    }

    pub fn repository(&self) -> Option<&RepositoryOutput> {
        match self.get(Stage::GithubIntegration)?.output {
            StageOutput::Repository(ref r) => Some(r),
            _ => None,
        }
    }

    /// The code the pipeline currently considers final: refinement output if
    /// recorded, otherwise the raw generation output, otherwise empty.
    pub fn current_code(&self) -> &str {
        if let Some(refined) = self.refinement() {
            return &refined.final_code;
        }
        self.generation().map(|g| g.code.as_str()).unwrap_or("")
    }

    /// Stages that ran, in execution order.
    pub fn steps_completed(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|(s, _)| s.name().to_string())
            .collect()
    }

    /// Stages that ran without recording any error.
    pub fn steps_succeeded(&self) -> Vec<String> {
        self.records
            .iter()
            .filter(|(_, r)| r.errors.is_empty())
            .map(|(s, _)| s.name().to_string())
            .collect()
    }

    /// All stage errors, concatenated in stage-execution order.
    pub fn errors_in_order(&self) -> Vec<String> {
        self.records
            .iter()
            .flat_map(|(_, r)| r.errors.iter().cloned())
            .collect()
    }
}

/// The final report for one pipeline invocation.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowResult {
    pub success: bool,
    pub final_code: String,
    pub review_score: u8,
    pub tests: String,
    pub test_results: Option<ExecutionReport>,
    pub github_pr: Option<String>,
    pub iteration_history: Vec<IterationRecord>,
    pub recommendations: Vec<String>,
    pub errors: Vec<String>,
    pub steps_completed: Vec<String>,
    pub steps_succeeded: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names_are_fixed() {
        let names: Vec<&str> = Stage::ALL.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec![
                "retrieve-knowledge",
                "generate-code",
                "review-code",
                "refine-code",
                "generate-tests",
                "execute-tests",
                "github-integration",
            ]
        );
    }

    #[test]
    fn severity_falls_back_to_unknown() {
        let issue: Issue = serde_json::from_str(
            r#"{"type":"bug","severity":"catastrophic","description":"d","suggestion":"s"}"#,
        )
        .unwrap();
        assert_eq!(issue.severity, Severity::Unknown);
        assert_eq!(issue.kind, IssueKind::Bug);
    }

    #[test]
    fn issue_kind_falls_back_to_other() {
        let issue: Issue = serde_json::from_str(
            r#"{"type":"typo","severity":"low","description":"d","suggestion":"s"}"#,
        )
        .unwrap();
        assert_eq!(issue.kind, IssueKind::Other);
    }

    #[test]
    fn state_records_in_execution_order() {
        let request = WorkflowRequest {
            prompt: "p".into(),
            language: Language::Python,
            repository: None,
            execute_tests: None,
        };
        let mut state = WorkflowState::new(request);
        state.record(
            Stage::RetrieveKnowledge,
            StageRecord::ok(StageOutput::Knowledge(KnowledgeOutput::default())),
        );
        state.record(
            Stage::GenerateCode,
            StageRecord::degraded(
                StageOutput::Generation(Default::default()),
                "generate-code: provider unreachable".into(),
            ),
        );

        assert_eq!(
            state.steps_completed(),
            vec!["retrieve-knowledge", "generate-code"]
        );
        assert_eq!(state.steps_succeeded(), vec!["retrieve-knowledge"]);
        assert_eq!(
            state.errors_in_order(),
            vec!["generate-code: provider unreachable"]
        );
    }
}
