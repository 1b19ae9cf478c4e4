#[cfg(test)]
pub mod fake;
pub mod types;

pub use types::{
    Branch, BranchEndpoint, CommitRef, FileCommit, NewPullRequest, PullRequest, RepoRef,
    Repository, Reviewer, User, Workspace,
};

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::auth::AuthCredential;
use types::{Membership, Page};

const USER_AGENT: &str = "bump-deps";
const PAGE_LEN: &str = "100";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bitbucket API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Bitbucket API returned {status} for {url}: {body}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },

    #[error("Invalid Bitbucket API URL: {0}")]
    InvalidUrl(String),
}

/// Remote operations the update workflow needs from the hosting platform.
#[async_trait]
pub trait BitbucketApi: Send + Sync {
    /// Workspaces the authenticated user is a member of.
    async fn list_workspaces(&self) -> Result<Vec<Workspace>, ApiError>;

    async fn list_repositories(&self, workspace: &str) -> Result<Vec<Repository>, ApiError>;

    async fn list_members(&self, workspace: &str) -> Result<Vec<User>, ApiError>;

    async fn get_branch(&self, repo: &RepoRef, name: &str) -> Result<Branch, ApiError>;

    /// Create `name` pointing at commit `target_hash`.
    async fn create_branch(
        &self,
        repo: &RepoRef,
        name: &str,
        target_hash: &str,
    ) -> Result<Branch, ApiError>;

    async fn delete_branch(&self, repo: &RepoRef, name: &str) -> Result<(), ApiError>;

    async fn read_file(&self, repo: &RepoRef, commit: &str, path: &str) -> Result<String, ApiError>;

    async fn commit_file(&self, repo: &RepoRef, commit: &FileCommit) -> Result<(), ApiError>;

    async fn create_pull_request(
        &self,
        repo: &RepoRef,
        pull_request: &NewPullRequest,
    ) -> Result<PullRequest, ApiError>;
}

/// Bitbucket Cloud REST API (2.0) client.
pub struct HttpBitbucket {
    client: reqwest::Client,
    base_url: Url,
    auth: AuthCredential,
}

impl HttpBitbucket {
    pub fn new(base_url: &str, auth: AuthCredential) -> Result<Self, ApiError> {
        let base_url =
            Url::parse(base_url).map_err(|_| ApiError::InvalidUrl(base_url.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            auth,
        })
    }

    /// Append path segments to the API base URL. Segments containing `/`
    /// (file paths, branch names) are split so each part gets escaped.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(segments.iter().flat_map(|segment| segment.split('/')));
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header("User-Agent", USER_AGENT);
        match &self.auth {
            AuthCredential::Bearer(token) => builder.bearer_auth(token),
            AuthCredential::Basic { username, password } => {
                builder.basic_auth(username, Some(password))
            }
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            status: status.as_u16(),
            url,
            body,
        })
    }

    /// Collect every page of a collection by following `next` links.
    async fn get_all<T: DeserializeOwned>(&self, mut url: Url) -> Result<Vec<T>, ApiError> {
        url.query_pairs_mut().append_pair("pagelen", PAGE_LEN);
        let mut items = Vec::new();
        loop {
            let page: Page<T> = self
                .send(self.request(Method::GET, url.clone()))
                .await?
                .json()
                .await?;
            debug!(url = %url, count = page.values.len(), "fetched page");
            items.extend(page.values);

            match page.next {
                Some(next) => url = Url::parse(&next).map_err(|_| ApiError::InvalidUrl(next))?,
                None => break,
            }
        }
        Ok(items)
    }
}

#[async_trait]
impl BitbucketApi for HttpBitbucket {
    #[instrument(skip(self))]
    async fn list_workspaces(&self) -> Result<Vec<Workspace>, ApiError> {
        let mut url = self.endpoint(&["workspaces"]);
        url.query_pairs_mut().append_pair("role", "member");
        self.get_all(url).await
    }

    #[instrument(skip(self))]
    async fn list_repositories(&self, workspace: &str) -> Result<Vec<Repository>, ApiError> {
        self.get_all(self.endpoint(&["repositories", workspace])).await
    }

    #[instrument(skip(self))]
    async fn list_members(&self, workspace: &str) -> Result<Vec<User>, ApiError> {
        let members: Vec<Membership> = self
            .get_all(self.endpoint(&["workspaces", workspace, "members"]))
            .await?;
        Ok(members.into_iter().map(|m| m.user).collect())
    }

    #[instrument(skip(self, repo), fields(workspace = %repo.workspace, repo = %repo.slug))]
    async fn get_branch(&self, repo: &RepoRef, name: &str) -> Result<Branch, ApiError> {
        let url = self.endpoint(&[
            "repositories",
            &repo.workspace,
            &repo.slug,
            "refs",
            "branches",
            name,
        ]);
        Ok(self.send(self.request(Method::GET, url)).await?.json().await?)
    }

    #[instrument(skip(self, repo), fields(workspace = %repo.workspace, repo = %repo.slug))]
    async fn create_branch(
        &self,
        repo: &RepoRef,
        name: &str,
        target_hash: &str,
    ) -> Result<Branch, ApiError> {
        let url = self.endpoint(&["repositories", &repo.workspace, &repo.slug, "refs", "branches"]);
        let body = Branch {
            name: name.to_string(),
            target: CommitRef {
                hash: target_hash.to_string(),
            },
        };
        let response = self
            .send(self.request(Method::POST, url).json(&body))
            .await?;
        Ok(response.json().await?)
    }

    #[instrument(skip(self, repo), fields(workspace = %repo.workspace, repo = %repo.slug))]
    async fn delete_branch(&self, repo: &RepoRef, name: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&[
            "repositories",
            &repo.workspace,
            &repo.slug,
            "refs",
            "branches",
            name,
        ]);
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    #[instrument(skip(self, repo), fields(workspace = %repo.workspace, repo = %repo.slug))]
    async fn read_file(&self, repo: &RepoRef, commit: &str, path: &str) -> Result<String, ApiError> {
        let url = self.endpoint(&["repositories", &repo.workspace, &repo.slug, "src", commit, path]);
        let text = self.send(self.request(Method::GET, url)).await?.text().await?;
        debug!(bytes = text.len(), "read file");
        Ok(text)
    }

    #[instrument(skip(self, repo, commit), fields(workspace = %repo.workspace, repo = %repo.slug, branch = %commit.branch, path = %commit.path))]
    async fn commit_file(&self, repo: &RepoRef, commit: &FileCommit) -> Result<(), ApiError> {
        let url = self.endpoint(&["repositories", &repo.workspace, &repo.slug, "src"]);
        // the file travels as a form field named after its path
        let form = vec![
            ("branch", commit.branch.as_str()),
            ("message", commit.message.as_str()),
            ("author", commit.author.as_str()),
            (commit.path.as_str(), commit.content.as_str()),
        ];
        self.send(self.request(Method::POST, url).form(&form)).await?;
        Ok(())
    }

    #[instrument(skip(self, repo, pull_request), fields(workspace = %repo.workspace, repo = %repo.slug))]
    async fn create_pull_request(
        &self,
        repo: &RepoRef,
        pull_request: &NewPullRequest,
    ) -> Result<PullRequest, ApiError> {
        let url = self.endpoint(&["repositories", &repo.workspace, &repo.slug, "pullrequests"]);
        let response = self
            .send(self.request(Method::POST, url).json(pull_request))
            .await?;
        Ok(response.json().await?)
    }
}
