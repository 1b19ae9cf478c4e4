//! In-memory Bitbucket for tests. Records every call in order.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{
    ApiError, BitbucketApi, Branch, CommitRef, FileCommit, NewPullRequest, PullRequest, RepoRef,
    Repository, User, Workspace,
};
use super::types::{Link, PullRequestLinks};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListWorkspaces,
    ListRepositories(String),
    ListMembers(String),
    GetBranch(String),
    CreateBranch { name: String, target: String },
    DeleteBranch(String),
    ReadFile { commit: String, path: String },
    CommitFile(FileCommit),
    CreatePullRequest(NewPullRequest),
}

impl Call {
    pub fn kind(&self) -> &'static str {
        match self {
            Call::ListWorkspaces => "list_workspaces",
            Call::ListRepositories(_) => "list_repositories",
            Call::ListMembers(_) => "list_members",
            Call::GetBranch(_) => "get_branch",
            Call::CreateBranch { .. } => "create_branch",
            Call::DeleteBranch(_) => "delete_branch",
            Call::ReadFile { .. } => "read_file",
            Call::CommitFile(_) => "commit_file",
            Call::CreatePullRequest(_) => "create_pull_request",
        }
    }
}

#[derive(Debug, Default)]
struct State {
    /// branch name -> head commit
    heads: HashMap<String, String>,
    /// (commit, path) -> content
    files: HashMap<(String, String), String>,
    commits: usize,
}

#[derive(Debug, Default)]
pub struct FakeBitbucket {
    pub workspaces: Vec<Workspace>,
    pub repositories: Vec<Repository>,
    pub members: Vec<User>,
    /// Operation kinds (see [`Call::kind`]) that should fail
    pub fail_on: HashSet<&'static str>,
    calls: Mutex<Vec<Call>>,
    state: Mutex<State>,
}

impl FakeBitbucket {
    /// One workspace, one repository, two members and a `master` branch
    /// holding `path` with `content`.
    pub fn single_repo(path: &str, content: &str) -> Self {
        let fake = FakeBitbucket {
            workspaces: vec![Workspace {
                slug: "acme".to_string(),
                name: "Acme".to_string(),
            }],
            repositories: vec![Repository {
                slug: "web".to_string(),
                name: "Web".to_string(),
                full_name: Some("acme/web".to_string()),
            }],
            members: vec![
                User {
                    display_name: "Al".to_string(),
                    uuid: "{u1}".to_string(),
                },
                User {
                    display_name: "Bo".to_string(),
                    uuid: "{u2}".to_string(),
                },
            ],
            ..Default::default()
        };
        fake.seed_branch("master", "base0", path, content);
        fake
    }

    pub fn seed_branch(&self, branch: &str, commit: &str, path: &str, content: &str) {
        let mut state = self.state.lock().unwrap();
        state.heads.insert(branch.to_string(), commit.to_string());
        state
            .files
            .insert((commit.to_string(), path.to_string()), content.to_string());
    }

    /// Make `kind` fail with a 500. Chain to fail several operations.
    pub fn failing(mut self, kind: &'static str) -> Self {
        self.fail_on.insert(kind);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_kinds(&self) -> Vec<&'static str> {
        self.calls().iter().map(Call::kind).collect()
    }

    pub fn has_branch(&self, name: &str) -> bool {
        self.state.lock().unwrap().heads.contains_key(name)
    }

    fn record(&self, call: Call) -> Result<(), ApiError> {
        let kind = call.kind();
        self.calls.lock().unwrap().push(call);
        if self.fail_on.contains(kind) {
            return Err(ApiError::Status {
                status: 500,
                url: format!("fake://{kind}"),
                body: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn not_found(what: &str) -> ApiError {
        ApiError::Status {
            status: 404,
            url: format!("fake://{what}"),
            body: "not found".to_string(),
        }
    }
}

#[async_trait]
impl BitbucketApi for FakeBitbucket {
    async fn list_workspaces(&self) -> Result<Vec<Workspace>, ApiError> {
        self.record(Call::ListWorkspaces)?;
        Ok(self.workspaces.clone())
    }

    async fn list_repositories(&self, workspace: &str) -> Result<Vec<Repository>, ApiError> {
        self.record(Call::ListRepositories(workspace.to_string()))?;
        Ok(self.repositories.clone())
    }

    async fn list_members(&self, workspace: &str) -> Result<Vec<User>, ApiError> {
        self.record(Call::ListMembers(workspace.to_string()))?;
        Ok(self.members.clone())
    }

    async fn get_branch(&self, _repo: &RepoRef, name: &str) -> Result<Branch, ApiError> {
        self.record(Call::GetBranch(name.to_string()))?;
        let state = self.state.lock().unwrap();
        let hash = state.heads.get(name).ok_or_else(|| Self::not_found(name))?;
        Ok(Branch {
            name: name.to_string(),
            target: CommitRef { hash: hash.clone() },
        })
    }

    async fn create_branch(
        &self,
        _repo: &RepoRef,
        name: &str,
        target_hash: &str,
    ) -> Result<Branch, ApiError> {
        self.record(Call::CreateBranch {
            name: name.to_string(),
            target: target_hash.to_string(),
        })?;
        let mut state = self.state.lock().unwrap();
        if !state.heads.values().any(|hash| hash == target_hash) {
            return Err(Self::not_found(target_hash));
        }
        state.heads.insert(name.to_string(), target_hash.to_string());
        Ok(Branch {
            name: name.to_string(),
            target: CommitRef {
                hash: target_hash.to_string(),
            },
        })
    }

    async fn delete_branch(&self, _repo: &RepoRef, name: &str) -> Result<(), ApiError> {
        self.record(Call::DeleteBranch(name.to_string()))?;
        self.state.lock().unwrap().heads.remove(name);
        Ok(())
    }

    async fn read_file(&self, _repo: &RepoRef, commit: &str, path: &str) -> Result<String, ApiError> {
        self.record(Call::ReadFile {
            commit: commit.to_string(),
            path: path.to_string(),
        })?;
        let state = self.state.lock().unwrap();
        state
            .files
            .get(&(commit.to_string(), path.to_string()))
            .cloned()
            .ok_or_else(|| Self::not_found(path))
    }

    async fn commit_file(&self, _repo: &RepoRef, commit: &FileCommit) -> Result<(), ApiError> {
        self.record(Call::CommitFile(commit.clone()))?;
        let mut state = self.state.lock().unwrap();
        if !state.heads.contains_key(&commit.branch) {
            return Err(Self::not_found(&commit.branch));
        }
        state.commits += 1;
        let hash = format!("commit{}", state.commits);
        state
            .files
            .insert((hash.clone(), commit.path.clone()), commit.content.clone());
        state.heads.insert(commit.branch.clone(), hash);
        Ok(())
    }

    async fn create_pull_request(
        &self,
        _repo: &RepoRef,
        pull_request: &NewPullRequest,
    ) -> Result<PullRequest, ApiError> {
        self.record(Call::CreatePullRequest(pull_request.clone()))?;
        Ok(PullRequest {
            id: 1,
            title: pull_request.title.clone(),
            links: PullRequestLinks {
                html: Some(Link {
                    href: "https://bitbucket.org/acme/web/pull-requests/1".to_string(),
                }),
            },
        })
    }
}
