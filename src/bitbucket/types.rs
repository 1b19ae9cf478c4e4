use serde::{Deserialize, Serialize};

/// One page of a paginated Bitbucket collection.
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub values: Vec<T>,
    /// Absolute URL of the next page, absent on the last one
    pub next: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Workspace {
    pub slug: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Repository {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Entry of `GET /workspaces/{workspace}/members`.
#[derive(Debug, Clone, Deserialize)]
pub struct Membership {
    pub user: User,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct User {
    pub display_name: String,
    pub uuid: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    pub target: CommitRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitRef {
    pub hash: String,
}

/// Workspace and repository slugs addressing one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub workspace: String,
    pub slug: String,
}

/// A single-file commit on an existing branch.
#[derive(Debug, Clone, PartialEq)]
pub struct FileCommit {
    pub branch: String,
    pub message: String,
    /// `Name <email>`
    pub author: String,
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reviewer {
    pub uuid: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPullRequest {
    pub title: String,
    pub source: BranchEndpoint,
    pub destination: BranchEndpoint,
    pub reviewers: Vec<Reviewer>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BranchEndpoint {
    pub branch: BranchName,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BranchName {
    pub name: String,
}

impl BranchEndpoint {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            branch: BranchName { name: name.into() },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub links: PullRequestLinks,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullRequestLinks {
    pub html: Option<Link>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Link {
    pub href: String,
}

impl PullRequest {
    pub fn web_url(&self) -> Option<&str> {
        self.links.html.as_ref().map(|link| link.href.as_str())
    }
}
