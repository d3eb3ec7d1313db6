use serde::{Deserialize, Serialize};

/// One file to include in a pull request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    pub content: String,
}

/// Everything needed to open a pull request carrying new files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePullRequest {
    pub title: String,
    pub body: String,
    pub branch_name: String,
    pub files: Vec<FileChange>,
}

/// Reference to a created pull request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestRef {
    pub number: u64,
    pub url: String,
}

/// Summary of a repository, for the analyze action.
#[derive(Debug, Clone, Serialize)]
pub struct RepoOverview {
    pub full_name: String,
    pub default_branch: String,
    pub language: Option<String>,
    pub stars: u32,
    pub forks: u32,
    pub open_issues: u32,
}

/// Summary of an issue, for the get-issues action.
#[derive(Debug, Clone, Serialize)]
pub struct RepoIssue {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub url: String,
}

/// One code-search hit.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub repository: String,
    pub path: String,
    pub url: String,
}

/// Filter for the get-issues action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueStateFilter {
    #[default]
    Open,
    Closed,
    All,
}

impl IssueStateFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStateFilter::Open => "open",
            IssueStateFilter::Closed => "closed",
            IssueStateFilter::All => "all",
        }
    }
}
