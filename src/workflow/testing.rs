//! Scripted collaborator doubles shared by the workflow tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::platform::types::*;
use crate::platform::RepositoryHost;
use crate::provider::{
    CoverageTarget, GeneratedCode, GeneratedTests, GenerationProvider, ReviewProvider, ReviewType,
    TestGenerationProvider, TestType,
};
use crate::sandbox::{ExecutionReport, ExecutionSandbox};
use crate::workflow::score::score_issues;
use crate::workflow::types::{Issue, IssueKind, Language, ReviewResult, Severity};

pub fn issue_with_description(severity: Severity, description: &str) -> Issue {
    Issue {
        kind: IssueKind::Bug,
        severity,
        line: None,
        description: description.to_string(),
        suggestion: "fix it".to_string(),
    }
}

pub fn issues(severities: &[Severity]) -> Vec<Issue> {
    severities
        .iter()
        .map(|s| issue_with_description(*s, "scripted issue"))
        .collect()
}

/// Generator that replays a queue of code strings or error messages, and
/// records every prompt it was handed.
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<std::result::Result<String, String>>>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(script: Vec<std::result::Result<String, String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl GenerationProvider for ScriptedGenerator {
    async fn generate(
        &self,
        prompt: &str,
        _language: Language,
        _context: Option<&str>,
    ) -> Result<GeneratedCode> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AppError::Internal("generator script exhausted".to_string()))?;

        match next {
            Ok(code) => Ok(GeneratedCode {
                code,
                explanation: "scripted generation".to_string(),
                dependencies: Vec::new(),
                complexity: Default::default(),
            }),
            Err(message) => Err(AppError::ClaudeApi(message)),
        }
    }
}

/// Reviewer that replays a queue of issue lists or error messages. The score
/// is always derived through the real quality scorer.
pub struct ScriptedReviewer {
    script: Mutex<VecDeque<std::result::Result<Vec<Issue>, String>>>,
}

impl ScriptedReviewer {
    pub fn new(script: Vec<std::result::Result<Vec<Issue>, String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
        }
    }
}

#[async_trait]
impl ReviewProvider for ScriptedReviewer {
    async fn review(
        &self,
        _code: &str,
        _language: Language,
        _review_type: ReviewType,
    ) -> Result<ReviewResult> {
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AppError::Internal("reviewer script exhausted".to_string()))?;

        match next {
            Ok(issues) => Ok(ReviewResult {
                overall_score: score_issues(&issues),
                issues,
                summary: "scripted review".to_string(),
                refactored_code: None,
            }),
            Err(message) => Err(AppError::ClaudeApi(message)),
        }
    }
}

pub struct ScriptedTestWriter {
    script: Mutex<VecDeque<std::result::Result<String, String>>>,
}

impl ScriptedTestWriter {
    pub fn new(script: Vec<std::result::Result<String, String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
        }
    }
}

#[async_trait]
impl TestGenerationProvider for ScriptedTestWriter {
    async fn generate_tests(
        &self,
        _code: &str,
        language: Language,
        _test_type: TestType,
        _coverage: CoverageTarget,
    ) -> Result<GeneratedTests> {
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AppError::Internal("test writer script exhausted".to_string()))?;

        match next {
            Ok(test_code) => Ok(GeneratedTests {
                test_code,
                test_cases: Vec::new(),
                coverage: "80%".to_string(),
                framework: crate::provider::testgen::default_framework(language).to_string(),
                recommendations: vec!["scripted testing advice".to_string()],
            }),
            Err(message) => Err(AppError::ClaudeApi(message)),
        }
    }
}

pub struct ScriptedSandbox {
    outcome: std::result::Result<ExecutionReport, String>,
}

impl ScriptedSandbox {
    pub fn passing() -> Self {
        Self {
            outcome: Ok(ExecutionReport {
                success: true,
                output: "all tests passed".to_string(),
                errors: Vec::new(),
                execution_time_ms: 12,
            }),
        }
    }

    pub fn erroring(message: &str) -> Self {
        Self {
            outcome: Err(message.to_string()),
        }
    }
}

#[async_trait]
impl ExecutionSandbox for ScriptedSandbox {
    async fn execute(
        &self,
        _code: &str,
        _language: Language,
        _timeout_ms: u64,
    ) -> Result<ExecutionReport> {
        match &self.outcome {
            Ok(report) => Ok(report.clone()),
            Err(message) => Err(AppError::Sandbox(message.clone())),
        }
    }
}

pub struct ScriptedHost {
    fail: bool,
}

impl ScriptedHost {
    pub fn working() -> Self {
        Self { fail: false }
    }

    pub fn failing() -> Self {
        Self { fail: true }
    }

    fn check(&self) -> Result<()> {
        if self.fail {
            Err(AppError::GitHubApi("scripted host failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RepositoryHost for ScriptedHost {
    async fn analyze(&self, repository: &str) -> Result<RepoOverview> {
        self.check()?;
        Ok(RepoOverview {
            full_name: repository.to_string(),
            default_branch: "main".to_string(),
            language: Some("Python".to_string()),
            stars: 1,
            forks: 0,
            open_issues: 2,
        })
    }

    async fn create_pull_request(
        &self,
        repository: &str,
        _request: &CreatePullRequest,
    ) -> Result<PullRequestRef> {
        self.check()?;
        Ok(PullRequestRef {
            number: 7,
            url: format!("https://github.com/{repository}/pull/7"),
        })
    }

    async fn list_issues(
        &self,
        _repository: &str,
        _state: IssueStateFilter,
    ) -> Result<Vec<RepoIssue>> {
        self.check()?;
        Ok(Vec::new())
    }

    async fn search_code(
        &self,
        _query: &str,
        _repository: Option<&str>,
    ) -> Result<Vec<SearchHit>> {
        self.check()?;
        Ok(Vec::new())
    }

    async fn post_comment(&self, _repository: &str, _issue_number: u64, _body: &str) -> Result<()> {
        self.check()
    }
}
