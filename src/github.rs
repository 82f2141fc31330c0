//! github
//!
//! Downstream REST operations consuming broker-issued tokens.
//!
//! # Design
//!
//! Every operation here is a single stateless request authenticated with
//! `Authorization: token {value}`. Tokens come from the
//! [`CredentialBroker`]; this layer adds no caching of its own.
//!
//! # Auth retry policy
//!
//! On an authentication-rejected response (401) the client forces one token
//! refresh through the broker and retries the request exactly once. A second
//! rejection surfaces as [`AuthError::GitHubApi`]. Nothing else is retried;
//! backoff for transient failures belongs to the caller's transport policy.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Method, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthError, CredentialBroker, DEFAULT_API_BASE};

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = "ghcred";

/// A file fetched from a repository, content already decoded.
#[derive(Debug, Clone)]
pub struct RepoFile {
    /// Path within the repository
    pub path: String,
    /// Blob SHA (needed to update the file later)
    pub sha: String,
    /// Decoded file content
    pub content: Vec<u8>,
}

/// Wire shape of `GET /repos/{owner}/{repo}/contents/{path}` for a file.
#[derive(Debug, Deserialize)]
struct ContentResponse {
    path: String,
    sha: String,
    content: String,
    encoding: String,
}

/// Result of a create-or-update file call.
#[derive(Debug, Clone, Deserialize)]
pub struct FileCommit {
    /// The new blob, absent on deletions
    pub content: Option<BlobRef>,
    /// The commit that recorded the change
    pub commit: CommitRef,
}

/// Reference to a blob by SHA.
#[derive(Debug, Clone, Deserialize)]
pub struct BlobRef {
    /// Blob SHA
    pub sha: String,
}

/// Reference to a commit by SHA.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitRef {
    /// Commit SHA
    pub sha: String,
}

/// A check run as returned by GitHub.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckRun {
    /// Check run id
    pub id: u64,
    /// Current status (queued, in_progress, completed)
    pub status: String,
}

/// Fields to change on an existing check run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckRunPatch {
    /// New status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Conclusion, required when status becomes completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<String>,
}

/// A deployment as returned by GitHub.
#[derive(Debug, Clone, Deserialize)]
pub struct Deployment {
    /// Deployment id
    pub id: u64,
}

/// A deployment status as returned by GitHub.
#[derive(Debug, Clone, Deserialize)]
pub struct DeploymentStatus {
    /// Status id
    pub id: u64,
    /// Reported state (pending, success, failure, ...)
    pub state: String,
}

/// REST client for repository operations.
pub struct RepoClient {
    client: Client,
    broker: Arc<CredentialBroker>,
    api_base: String,
}

impl RepoClient {
    /// Create a client against the public GitHub API.
    pub fn new(broker: Arc<CredentialBroker>) -> Self {
        Self::with_api_base(broker, DEFAULT_API_BASE)
    }

    /// Create a client with a custom API base URL.
    pub fn with_api_base(broker: Arc<CredentialBroker>, api_base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            broker,
            api_base: api_base.into(),
        }
    }

    /// Fetch a file's content, decoding the base64 payload.
    pub async fn get_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<RepoFile, AuthError> {
        let url = self.repo_url(owner, repo, &format!("contents/{}", path));
        let response = self.execute(owner, repo, Method::GET, &url, None).await?;

        let data: ContentResponse = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        if data.encoding != "base64" {
            return Err(AuthError::InvalidResponse(format!(
                "unexpected content encoding '{}'",
                data.encoding
            )));
        }

        // GitHub wraps base64 bodies with newlines
        let compact: String = data.content.split_whitespace().collect();
        let content = BASE64
            .decode(compact)
            .map_err(|e| AuthError::InvalidResponse(format!("bad base64 content: {}", e)))?;

        Ok(RepoFile {
            path: data.path,
            sha: data.sha,
            content,
        })
    }

    /// Create a file, or update it when the prior blob SHA is supplied.
    pub async fn create_or_update_file(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        content: &[u8],
        message: &str,
        sha: Option<&str>,
    ) -> Result<FileCommit, AuthError> {
        let url = self.repo_url(owner, repo, &format!("contents/{}", path));

        let mut body = serde_json::json!({
            "message": message,
            "content": BASE64.encode(content),
        });
        if let Some(sha) = sha {
            body["sha"] = serde_json::Value::String(sha.to_string());
        }

        let response = self
            .execute(owner, repo, Method::PUT, &url, Some(&body))
            .await?;
        decode(response).await
    }

    /// Create a check run for a commit.
    pub async fn create_check_run(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
        head_sha: &str,
        status: &str,
    ) -> Result<CheckRun, AuthError> {
        let url = self.repo_url(owner, repo, "check-runs");
        let body = serde_json::json!({
            "name": name,
            "head_sha": head_sha,
            "status": status,
        });

        let response = self
            .execute(owner, repo, Method::POST, &url, Some(&body))
            .await?;
        decode(response).await
    }

    /// Update an existing check run.
    pub async fn update_check_run(
        &self,
        owner: &str,
        repo: &str,
        check_run_id: u64,
        patch: &CheckRunPatch,
    ) -> Result<CheckRun, AuthError> {
        let url = self.repo_url(owner, repo, &format!("check-runs/{}", check_run_id));
        let body = serde_json::to_value(patch)
            .map_err(|e| AuthError::Internal(format!("patch serialization: {}", e)))?;

        let response = self
            .execute(owner, repo, Method::PATCH, &url, Some(&body))
            .await?;
        decode(response).await
    }

    /// Create a deployment for a ref.
    pub async fn create_deployment(
        &self,
        owner: &str,
        repo: &str,
        git_ref: &str,
        environment: &str,
    ) -> Result<Deployment, AuthError> {
        let url = self.repo_url(owner, repo, "deployments");
        let body = serde_json::json!({
            "ref": git_ref,
            "environment": environment,
            "auto_merge": false,
        });

        let response = self
            .execute(owner, repo, Method::POST, &url, Some(&body))
            .await?;
        decode(response).await
    }

    /// Post a status for an existing deployment.
    pub async fn create_deployment_status(
        &self,
        owner: &str,
        repo: &str,
        deployment_id: u64,
        state: &str,
    ) -> Result<DeploymentStatus, AuthError> {
        let url = self.repo_url(
            owner,
            repo,
            &format!("deployments/{}/statuses", deployment_id),
        );
        let body = serde_json::json!({ "state": state });

        let response = self
            .execute(owner, repo, Method::POST, &url, Some(&body))
            .await?;
        decode(response).await
    }

    /// Build URL for a repository endpoint.
    fn repo_url(&self, owner: &str, repo: &str, path: &str) -> String {
        format!("{}/repos/{}/{}/{}", self.api_base, owner, repo, path)
    }

    /// Fetch a token for the repository, failing when no installation covers it.
    async fn token_for(
        &self,
        owner: &str,
        repo: &str,
        force_refresh: bool,
    ) -> Result<String, AuthError> {
        let token = if force_refresh {
            self.broker.refresh_credential_for(owner, repo).await?
        } else {
            self.broker.credential_for(owner, repo).await?
        };
        token.ok_or_else(|| AuthError::NoInstallation {
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    /// Execute a request, retrying exactly once with a refreshed token on 401.
    async fn execute(
        &self,
        owner: &str,
        repo: &str,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Response, AuthError> {
        // First attempt
        let token = self.token_for(owner, repo, false).await?;
        let response = self.send(method.clone(), url, &token, body).await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return ok_or_api_error(response).await;
        }

        // Token may have expired mid-flight; refresh once and retry once
        let token = self.token_for(owner, repo, true).await?;
        let response = self.send(method, url, &token, body).await?;
        ok_or_api_error(response).await
    }

    /// Send one authenticated request.
    async fn send(
        &self,
        method: Method,
        url: &str,
        token: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Response, AuthError> {
        let mut request = self
            .client
            .request(method, url)
            .header(AUTHORIZATION, format!("token {}", token))
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, USER_AGENT_VALUE)
            .header("X-GitHub-Api-Version", "2022-11-28");

        if let Some(body) = body {
            request = request.json(body);
        }

        Ok(request.send().await?)
    }
}

impl std::fmt::Debug for RepoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepoClient")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

/// Map a non-success status to an API error, passing success through.
async fn ok_or_api_error(response: Response) -> Result<Response, AuthError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(AuthError::from_response(response).await)
    }
}

/// Decode a success body, rejecting payloads missing required fields.
async fn decode<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T, AuthError> {
    response
        .json()
        .await
        .map_err(|e| AuthError::InvalidResponse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_response_decodes_wrapped_base64() {
        let data: ContentResponse = serde_json::from_str(
            r#"{
                "path": "docs/readme.md",
                "sha": "abc123",
                "content": "aGVsbG8g\nd29ybGQ=\n",
                "encoding": "base64"
            }"#,
        )
        .expect("decode");

        let compact: String = data.content.split_whitespace().collect();
        let decoded = BASE64.decode(compact).expect("base64");
        assert_eq!(decoded, b"hello world");
    }

    #[test]
    fn content_response_requires_content_field() {
        let result: Result<ContentResponse, _> = serde_json::from_str(
            r#"{"path": "f", "sha": "s", "encoding": "base64"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn check_run_patch_skips_unset_fields() {
        let patch = CheckRunPatch {
            status: Some("completed".to_string()),
            conclusion: None,
        };
        let json = serde_json::to_value(&patch).expect("serialize");

        assert_eq!(json["status"], "completed");
        assert!(json.get("conclusion").is_none());
    }

    #[test]
    fn file_commit_decodes_with_and_without_content() {
        let with: FileCommit = serde_json::from_str(
            r#"{"content": {"sha": "blob1"}, "commit": {"sha": "c1"}}"#,
        )
        .expect("decode");
        assert_eq!(with.content.expect("blob").sha, "blob1");
        assert_eq!(with.commit.sha, "c1");

        let without: FileCommit =
            serde_json::from_str(r#"{"content": null, "commit": {"sha": "c2"}}"#).expect("decode");
        assert!(without.content.is_none());
    }

    #[test]
    fn deployment_and_status_decode() {
        let deployment: Deployment = serde_json::from_str(r#"{"id": 10}"#).expect("decode");
        assert_eq!(deployment.id, 10);

        let status: DeploymentStatus =
            serde_json::from_str(r#"{"id": 11, "state": "success"}"#).expect("decode");
        assert_eq!(status.state, "success");
    }
}
