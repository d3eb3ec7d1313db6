use async_trait::async_trait;
use base64::Engine as _;
use octocrab::Octocrab;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::GitHubConfig;
use crate::error::{AppError, Result};
use crate::platform::types::*;
use crate::platform::RepositoryHost;

use super::auth::generate_app_jwt;

pub struct GitHubHost {
    config: GitHubConfig,
    /// Cache of installation tokens: repo full name -> (token, expiry)
    token_cache: Arc<RwLock<std::collections::HashMap<String, (String, chrono::DateTime<chrono::Utc>)>>>,
}

impl GitHubHost {
    pub fn new(config: &GitHubConfig) -> Result<Self> {
        // Validate the private key exists
        if !config.private_key_path.exists() {
            return Err(AppError::Config(format!(
                "GitHub App private key not found at: {}",
                config.private_key_path.display()
            )));
        }

        Ok(Self {
            config: config.clone(),
            token_cache: Arc::new(RwLock::new(std::collections::HashMap::new())),
        })
    }

    fn parse_repo(repo_full_name: &str) -> Result<(&str, &str)> {
        let parts: Vec<&str> = repo_full_name.splitn(2, '/').collect();
        if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
            return Err(AppError::GitHubApi(format!(
                "Invalid repo name: {repo_full_name}"
            )));
        }
        Ok((parts[0], parts[1]))
    }

    /// Get an installation-scoped access token for a repository.
    async fn access_token(&self, repo_full_name: &str) -> Result<String> {
        // Check cache
        {
            let cache = self.token_cache.read().await;
            if let Some((token, expiry)) = cache.get(repo_full_name) {
                if *expiry > chrono::Utc::now() + chrono::Duration::minutes(5) {
                    return Ok(token.clone());
                }
            }
        }

        let jwt = generate_app_jwt(self.config.app_id, &self.config.private_key_path)?;

        let app_client = Octocrab::builder()
            .personal_token(jwt)
            .build()
            .map_err(|e| AppError::GitHubApi(format!("Failed to build JWT client: {e}")))?;

        // Resolve which installation covers this repository
        let (owner, repo) = Self::parse_repo(repo_full_name)?;
        let installation: serde_json::Value = app_client
            .get(&format!("/repos/{owner}/{repo}/installation"), None::<&()>)
            .await
            .map_err(|e| {
                AppError::GitHubApi(format!("App is not installed on {repo_full_name}: {e}"))
            })?;
        let installation_id = installation["id"]
            .as_u64()
            .ok_or_else(|| AppError::GitHubApi("No installation id in response".to_string()))?;

        let url = format!("/app/installations/{installation_id}/access_tokens");
        let response: serde_json::Value = app_client
            .post(&url, None::<&()>)
            .await
            .map_err(|e| AppError::GitHubApi(format!("Failed to create installation token: {e}")))?;

        let token = response["token"]
            .as_str()
            .ok_or_else(|| AppError::GitHubApi("No token in response".to_string()))?
            .to_string();

        let expires_at = response["expires_at"]
            .as_str()
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .unwrap_or_else(|| chrono::Utc::now() + chrono::Duration::hours(1));

        let mut cache = self.token_cache.write().await;
        cache.insert(repo_full_name.to_string(), (token.clone(), expires_at));

        Ok(token)
    }

    /// Get an octocrab instance authenticated for a repository.
    async fn repo_client(&self, repo_full_name: &str) -> Result<Octocrab> {
        let token = self.access_token(repo_full_name).await?;
        Octocrab::builder()
            .personal_token(token)
            .build()
            .map_err(|e| AppError::GitHubApi(format!("Failed to build octocrab client: {e}")))
    }

    /// Push a set of files as one commit on a new branch off the default
    /// branch, using the git data API so no local clone is needed.
    async fn push_branch_with_files(
        &self,
        client: &Octocrab,
        owner: &str,
        repo: &str,
        branch_name: &str,
        message: &str,
        files: &[FileChange],
    ) -> Result<String> {
        let repository: serde_json::Value = client
            .get(&format!("/repos/{owner}/{repo}"), None::<&()>)
            .await
            .map_err(|e| AppError::GitHubApi(format!("Failed to fetch repository: {e}")))?;
        let default_branch = repository["default_branch"]
            .as_str()
            .ok_or_else(|| AppError::GitHubApi("No default branch in response".to_string()))?
            .to_string();

        let base_ref: serde_json::Value = client
            .get(
                &format!("/repos/{owner}/{repo}/git/ref/heads/{default_branch}"),
                None::<&()>,
            )
            .await
            .map_err(|e| AppError::GitHubApi(format!("Failed to resolve base ref: {e}")))?;
        let base_sha = base_ref["object"]["sha"]
            .as_str()
            .ok_or_else(|| AppError::GitHubApi("No base sha in response".to_string()))?
            .to_string();

        let mut tree_entries = Vec::with_capacity(files.len());
        for file in files {
            let encoded = base64::engine::general_purpose::STANDARD.encode(&file.content);
            let blob: serde_json::Value = client
                .post(
                    &format!("/repos/{owner}/{repo}/git/blobs"),
                    Some(&serde_json::json!({
                        "content": encoded,
                        "encoding": "base64",
                    })),
                )
                .await
                .map_err(|e| AppError::GitHubApi(format!("Failed to create blob: {e}")))?;
            let blob_sha = blob["sha"]
                .as_str()
                .ok_or_else(|| AppError::GitHubApi("No blob sha in response".to_string()))?;

            tree_entries.push(serde_json::json!({
                "path": file.path,
                "mode": "100644",
                "type": "blob",
                "sha": blob_sha,
            }));
        }

        let tree: serde_json::Value = client
            .post(
                &format!("/repos/{owner}/{repo}/git/trees"),
                Some(&serde_json::json!({
                    "base_tree": base_sha,
                    "tree": tree_entries,
                })),
            )
            .await
            .map_err(|e| AppError::GitHubApi(format!("Failed to create tree: {e}")))?;
        let tree_sha = tree["sha"]
            .as_str()
            .ok_or_else(|| AppError::GitHubApi("No tree sha in response".to_string()))?;

        let commit: serde_json::Value = client
            .post(
                &format!("/repos/{owner}/{repo}/git/commits"),
                Some(&serde_json::json!({
                    "message": message,
                    "tree": tree_sha,
                    "parents": [base_sha],
                })),
            )
            .await
            .map_err(|e| AppError::GitHubApi(format!("Failed to create commit: {e}")))?;
        let commit_sha = commit["sha"]
            .as_str()
            .ok_or_else(|| AppError::GitHubApi("No commit sha in response".to_string()))?;

        let _: serde_json::Value = client
            .post(
                &format!("/repos/{owner}/{repo}/git/refs"),
                Some(&serde_json::json!({
                    "ref": format!("refs/heads/{branch_name}"),
                    "sha": commit_sha,
                })),
            )
            .await
            .map_err(|e| AppError::GitHubApi(format!("Failed to create branch: {e}")))?;

        Ok(default_branch)
    }
}

#[async_trait]
impl RepositoryHost for GitHubHost {
    async fn analyze(&self, repository: &str) -> Result<RepoOverview> {
        let client = self.repo_client(repository).await?;
        let (owner, repo) = Self::parse_repo(repository)?;

        let data: serde_json::Value = client
            .get(&format!("/repos/{owner}/{repo}"), None::<&()>)
            .await
            .map_err(|e| AppError::GitHubApi(format!("Failed to fetch repository: {e}")))?;

        Ok(RepoOverview {
            full_name: data["full_name"].as_str().unwrap_or(repository).to_string(),
            default_branch: data["default_branch"].as_str().unwrap_or("main").to_string(),
            language: data["language"].as_str().map(|s| s.to_string()),
            stars: data["stargazers_count"].as_u64().unwrap_or(0) as u32,
            forks: data["forks_count"].as_u64().unwrap_or(0) as u32,
            open_issues: data["open_issues_count"].as_u64().unwrap_or(0) as u32,
        })
    }

    async fn create_pull_request(
        &self,
        repository: &str,
        request: &CreatePullRequest,
    ) -> Result<PullRequestRef> {
        let client = self.repo_client(repository).await?;
        let (owner, repo) = Self::parse_repo(repository)?;

        let base_branch = self
            .push_branch_with_files(
                &client,
                owner,
                repo,
                &request.branch_name,
                &request.title,
                &request.files,
            )
            .await?;

        let created = client
            .pulls(owner, repo)
            .create(&request.title, &request.branch_name, &base_branch)
            .body(&request.body)
            .send()
            .await?;

        let url = created
            .html_url
            .map(|u| u.to_string())
            .unwrap_or_else(|| {
                format!("https://github.com/{repository}/pull/{}", created.number)
            });

        Ok(PullRequestRef {
            number: created.number,
            url,
        })
    }

    async fn list_issues(
        &self,
        repository: &str,
        state: IssueStateFilter,
    ) -> Result<Vec<RepoIssue>> {
        let client = self.repo_client(repository).await?;
        let (owner, repo) = Self::parse_repo(repository)?;

        let filter = match state {
            IssueStateFilter::Open => octocrab::params::State::Open,
            IssueStateFilter::Closed => octocrab::params::State::Closed,
            IssueStateFilter::All => octocrab::params::State::All,
        };

        let page = client
            .issues(owner, repo)
            .list()
            .state(filter)
            .per_page(50)
            .send()
            .await?;

        Ok(page
            .items
            .into_iter()
            // The issues endpoint also returns PRs; keep plain issues only.
            .filter(|issue| issue.pull_request.is_none())
            .map(|issue| RepoIssue {
                number: issue.number,
                title: issue.title,
                state: format!("{:?}", issue.state).to_lowercase(),
                url: issue.html_url.to_string(),
            })
            .collect())
    }

    async fn search_code(&self, query: &str, repository: Option<&str>) -> Result<Vec<SearchHit>> {
        if query.trim().is_empty() {
            return Err(AppError::InvalidInput("Search query is empty".to_string()));
        }

        let scoped = match repository {
            Some(repo) => format!("{query} repo:{repo}"),
            None => query.to_string(),
        };

        // Code search needs an installation token; scope to the given repo or
        // fall back to app-level JWT-less search being unavailable.
        let repo_for_auth = repository.ok_or_else(|| {
            AppError::InvalidInput("Code search requires a repository scope".to_string())
        })?;
        let client = self.repo_client(repo_for_auth).await?;

        let url = format!("/search/code?q={}", urlencoding::encode(&scoped));
        let results: serde_json::Value = client
            .get(&url, None::<&()>)
            .await
            .map_err(|e| AppError::GitHubApi(format!("Code search failed: {e}")))?;

        let hits = results["items"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .map(|item| SearchHit {
                        repository: item["repository"]["full_name"]
                            .as_str()
                            .unwrap_or("")
                            .to_string(),
                        path: item["path"].as_str().unwrap_or("").to_string(),
                        url: item["html_url"].as_str().unwrap_or("").to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(hits)
    }

    async fn post_comment(&self, repository: &str, issue_number: u64, body: &str) -> Result<()> {
        let client = self.repo_client(repository).await?;
        let (owner, repo) = Self::parse_repo(repository)?;

        client
            .issues(owner, repo)
            .create_comment(issue_number, body)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_repo_splits_owner_and_name() {
        let (owner, repo) = GitHubHost::parse_repo("octocat/hello-world").unwrap();
        assert_eq!(owner, "octocat");
        assert_eq!(repo, "hello-world");
    }

    #[test]
    fn parse_repo_rejects_malformed_names() {
        assert!(GitHubHost::parse_repo("no-slash").is_err());
        assert!(GitHubHost::parse_repo("/leading").is_err());
        assert!(GitHubHost::parse_repo("trailing/").is_err());
    }
}
