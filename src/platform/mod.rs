pub mod github;
pub mod types;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use types::*;

/// Narrow interface to a repository host. The pipeline only needs
/// `create_pull_request`; the remaining actions back the repository
/// endpoint's dispatch surface.
#[async_trait]
pub trait RepositoryHost: Send + Sync {
    /// Fetch a summary of a repository.
    async fn analyze(&self, repository: &str) -> Result<RepoOverview>;

    /// Create a branch carrying the given files and open a pull request.
    async fn create_pull_request(
        &self,
        repository: &str,
        request: &CreatePullRequest,
    ) -> Result<PullRequestRef>;

    /// List issues, filtered by state.
    async fn list_issues(
        &self,
        repository: &str,
        state: IssueStateFilter,
    ) -> Result<Vec<RepoIssue>>;

    /// Search code, optionally scoped to one repository.
    async fn search_code(&self, query: &str, repository: Option<&str>) -> Result<Vec<SearchHit>>;

    /// Post a comment on an issue or PR.
    async fn post_comment(&self, repository: &str, issue_number: u64, body: &str) -> Result<()>;
}

/// A repository action with its statically-checked parameter shape.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum RepoAction {
    Analyze {
        repository: String,
    },
    CreatePr {
        repository: String,
        title: String,
        body: String,
        branch_name: String,
        files: Vec<FileChange>,
    },
    GetIssues {
        repository: String,
        #[serde(default)]
        state: IssueStateFilter,
    },
    Search {
        query: String,
        #[serde(default)]
        repository: Option<String>,
    },
    Comment {
        repository: String,
        issue_number: u64,
        body: String,
    },
}

/// Typed result of a dispatched repository action.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum RepoActionOutcome {
    Analyze { overview: RepoOverview },
    CreatePr { pull_request: PullRequestRef },
    GetIssues { issues: Vec<RepoIssue> },
    Search { hits: Vec<SearchHit> },
    Comment { posted: bool },
}

/// Execute one action against a host.
pub async fn dispatch(host: &dyn RepositoryHost, action: RepoAction) -> Result<RepoActionOutcome> {
    match action {
        RepoAction::Analyze { repository } => {
            let overview = host.analyze(&repository).await?;
            Ok(RepoActionOutcome::Analyze { overview })
        }
        RepoAction::CreatePr {
            repository,
            title,
            body,
            branch_name,
            files,
        } => {
            let request = CreatePullRequest {
                title,
                body,
                branch_name,
                files,
            };
            let pull_request = host.create_pull_request(&repository, &request).await?;
            Ok(RepoActionOutcome::CreatePr { pull_request })
        }
        RepoAction::GetIssues { repository, state } => {
            let issues = host.list_issues(&repository, state).await?;
            Ok(RepoActionOutcome::GetIssues { issues })
        }
        RepoAction::Search { query, repository } => {
            let hits = host.search_code(&query, repository.as_deref()).await?;
            Ok(RepoActionOutcome::Search { hits })
        }
        RepoAction::Comment {
            repository,
            issue_number,
            body,
        } => {
            host.post_comment(&repository, issue_number, &body).await?;
            Ok(RepoActionOutcome::Comment { posted: true })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_parse_from_tagged_json() {
        let action: RepoAction = serde_json::from_str(
            r#"{"action": "analyze", "repository": "octocat/hello"}"#,
        )
        .unwrap();
        assert!(matches!(action, RepoAction::Analyze { ref repository } if repository == "octocat/hello"));

        let action: RepoAction = serde_json::from_str(
            r#"{
                "action": "create-pr",
                "repository": "octocat/hello",
                "title": "t",
                "body": "b",
                "branch_name": "feature",
                "files": [{"path": "src/main.py", "content": "pass"}]
            }"#,
        )
        .unwrap();
        assert!(matches!(action, RepoAction::CreatePr { ref files, .. } if files.len() == 1));
    }

    #[test]
    fn issue_state_defaults_to_open() {
        let action: RepoAction = serde_json::from_str(
            r#"{"action": "get-issues", "repository": "octocat/hello"}"#,
        )
        .unwrap();
        assert!(
            matches!(action, RepoAction::GetIssues { state, .. } if state == IssueStateFilter::Open)
        );
    }

    #[test]
    fn unknown_action_is_rejected() {
        let parsed: std::result::Result<RepoAction, _> =
            serde_json::from_str(r#"{"action": "delete-everything", "repository": "a/b"}"#);
        assert!(parsed.is_err());
    }
}
