pub mod choices;

use std::fmt;

use colored::Colorize;
use rand::Rng;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::bitbucket::{
    ApiError, BitbucketApi, BranchEndpoint, FileCommit, NewPullRequest, PullRequest, RepoRef,
    Reviewer, User,
};
use crate::config::UpdateConfig;
use crate::package::{self, PackageError, PackageSpec};
use crate::prompt::{PromptError, Prompter};
use choices::{build_choices, build_multi_choices, ChoiceFields};

/// Upper bound (exclusive) of the random working branch suffix.
const BRANCH_SUFFIX_RANGE: u32 = 1000;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Package(#[from] PackageError),

    #[error("No {0} available to choose from")]
    NothingToChoose(&'static str),

    #[error("Cannot {operation} while {actual}, expected {expected}")]
    OutOfOrder {
        operation: &'static str,
        expected: SessionState,
        actual: SessionState,
    },
}

/// Progress of one update run. Only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionState {
    Init,
    WorkspaceChosen,
    RepositoryChosen,
    BranchCreated,
    FileFetched,
    FilePatched,
    Committed,
    ReviewersChosen,
    PullRequestCreated,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionState::Init => "init",
            SessionState::WorkspaceChosen => "workspace chosen",
            SessionState::RepositoryChosen => "repository chosen",
            SessionState::BranchCreated => "branch created",
            SessionState::FileFetched => "file fetched",
            SessionState::FilePatched => "file patched",
            SessionState::Committed => "committed",
            SessionState::ReviewersChosen => "reviewers chosen",
            SessionState::PullRequestCreated => "pull request created",
        };
        f.write_str(label)
    }
}

/// Drives one dependency update: pick a repository, branch off, patch the
/// manifest, commit it and open a pull request.
pub struct UpdateSession<'a, A, P> {
    api: &'a A,
    prompter: &'a P,
    settings: UpdateConfig,
    packages: Vec<PackageSpec>,
    state: SessionState,
    workspace: Option<String>,
    repo: Option<RepoRef>,
    base_branch: Option<String>,
    branch: Option<String>,
    original: Option<String>,
    patched: Option<String>,
    reviewers: Vec<Reviewer>,
}

impl<'a, A: BitbucketApi, P: Prompter> UpdateSession<'a, A, P> {
    pub fn new(api: &'a A, prompter: &'a P, settings: UpdateConfig, packages: Vec<PackageSpec>) -> Self {
        Self {
            api,
            prompter,
            settings,
            packages,
            state: SessionState::Init,
            workspace: None,
            repo: None,
            base_branch: None,
            branch: None,
            original: None,
            patched: None,
            reviewers: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Choose the workspace and repository to update.
    pub async fn init(&mut self) -> Result<(), SessionError> {
        self.select_workspace().await?;
        self.select_repository().await
    }

    /// Run the remaining workflow against the manifest at `path`.
    ///
    /// If anything fails after the working branch exists, the branch is
    /// deleted again before the error is returned.
    pub async fn update_and_pull(&mut self, path: &str) -> Result<PullRequest, SessionError> {
        self.create_branch().await?;

        match self.finish(path).await {
            Ok(pull_request) => Ok(pull_request),
            Err(err) => {
                self.rollback().await;
                Err(err)
            }
        }
    }

    async fn finish(&mut self, path: &str) -> Result<PullRequest, SessionError> {
        self.fetch_file(path).await?;
        self.patch_file()?;
        self.commit(path).await?;
        self.select_reviewers().await?;
        self.create_pull_request().await
    }

    #[instrument(skip(self))]
    pub async fn select_workspace(&mut self) -> Result<(), SessionError> {
        self.expect_state("select a workspace", SessionState::Init)?;

        info!("fetching workspaces");
        let workspaces = self.api.list_workspaces().await?;
        if workspaces.is_empty() {
            return Err(SessionError::NothingToChoose("workspaces"));
        }

        let labels = build_choices(&workspaces, |w| w.name.as_str());
        let index = self.prompter.select_one("Pick your workspace", &labels)?;
        let workspace = &workspaces[index];
        debug!(slug = %workspace.slug, name = %workspace.name, "workspace selected");

        self.workspace = Some(workspace.slug.clone());
        self.state = SessionState::WorkspaceChosen;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn select_repository(&mut self) -> Result<(), SessionError> {
        self.expect_state("select a repository", SessionState::WorkspaceChosen)?;
        let workspace = self.workspace.clone().unwrap_or_default();

        info!(%workspace, "fetching repositories");
        let repositories = self.api.list_repositories(&workspace).await?;
        if repositories.is_empty() {
            return Err(SessionError::NothingToChoose("repositories"));
        }

        let labels = build_choices(&repositories, |r| r.name.as_str());
        let index = self.prompter.select_one("Pick repo to update", &labels)?;
        let repository = &repositories[index];
        debug!(
            slug = %repository.slug,
            full_name = repository.full_name.as_deref().unwrap_or_default(),
            "repository selected"
        );

        self.repo = Some(RepoRef {
            workspace,
            slug: repository.slug.clone(),
        });
        self.state = SessionState::RepositoryChosen;
        Ok(())
    }

    /// Ask which existing branch to fork from and to target with the PR.
    pub fn prompt_base_branch(&mut self) -> Result<&str, SessionError> {
        self.expect_state("choose a base branch", SessionState::RepositoryChosen)?;

        let default = self.settings.base_branch.as_str();
        let answer = self
            .prompter
            .input_text("Enter main branch name", Some(default))?;
        let answer = answer.trim();
        let base = if answer.is_empty() { default } else { answer }.to_string();

        Ok(self.base_branch.insert(base).as_str())
    }

    /// Create the working branch at the base branch's head commit.
    #[instrument(skip(self))]
    pub async fn create_branch(&mut self) -> Result<(), SessionError> {
        self.expect_state("create a branch", SessionState::RepositoryChosen)?;
        let base = match self.base_branch.clone() {
            Some(base) => base,
            None => self.prompt_base_branch()?.to_string(),
        };
        let repo = self.repo_ref();

        let base_head = self.api.get_branch(&repo, &base).await?.target.hash;
        let suffix = rand::rng().random_range(0..BRANCH_SUFFIX_RANGE);
        let name = format!("{}{}", self.settings.branch_prefix, suffix);

        info!(branch = %name, base = %base, target = %base_head, "creating branch");
        let created = self.api.create_branch(&repo, &name, &base_head).await?;
        println!("{} Branch {} successfully created", "✔".green(), created.name.bold());

        self.branch = Some(created.name);
        self.state = SessionState::BranchCreated;
        Ok(())
    }

    /// Read `path` at the working branch's latest commit.
    #[instrument(skip(self))]
    pub async fn fetch_file(&mut self, path: &str) -> Result<(), SessionError> {
        self.expect_state("fetch a file", SessionState::BranchCreated)?;
        let repo = self.repo_ref();
        let branch = self.working_branch();

        let head = self.api.get_branch(&repo, &branch).await?.target.hash;
        let content = self.api.read_file(&repo, &head, path).await?;
        debug!(commit = %head, bytes = content.len(), "fetched file");

        self.original = Some(content);
        self.state = SessionState::FileFetched;
        Ok(())
    }

    pub fn patch_file(&mut self) -> Result<(), SessionError> {
        self.expect_state("patch the file", SessionState::FileFetched)?;
        let original = self.original.as_deref().unwrap_or_default();

        let patched = package::update_packages(&self.packages, original)?;
        if patched == original {
            warn!("none of the requested packages were found, committing unchanged file");
        }

        self.patched = Some(patched);
        self.state = SessionState::FilePatched;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn commit(&mut self, path: &str) -> Result<(), SessionError> {
        self.expect_state("commit", SessionState::FilePatched)?;
        let repo = self.repo_ref();

        let commit = FileCommit {
            branch: self.working_branch(),
            message: self.settings.commit_message.clone(),
            author: self.settings.author.clone(),
            path: path.to_string(),
            content: self.patched.clone().unwrap_or_default(),
        };
        info!(branch = %commit.branch, "committing file");
        self.api.commit_file(&repo, &commit).await?;
        println!("{} Commit successfully created", "✔".green());

        self.state = SessionState::Committed;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn select_reviewers(&mut self) -> Result<Vec<Reviewer>, SessionError> {
        self.expect_state("select reviewers", SessionState::Committed)?;
        let workspace = self.repo_ref().workspace;

        let members = self.api.list_members(&workspace).await?;
        let choices = build_multi_choices(
            &members,
            ChoiceFields {
                name: |m: &User| m.display_name.clone(),
                value: |m: &User| m.uuid.clone(),
            },
        );
        let labels: Vec<String> = choices.iter().map(|c| c.name.clone()).collect();
        let picks = self
            .prompter
            .select_many("Select default reviewers", &labels)?;

        self.reviewers = picks
            .into_iter()
            .filter_map(|i| choices.get(i))
            .map(|choice| Reviewer {
                uuid: choice.value.clone(),
            })
            .collect();
        debug!(reviewers = self.reviewers.len(), "reviewers selected");

        self.state = SessionState::ReviewersChosen;
        Ok(self.reviewers.clone())
    }

    #[instrument(skip(self))]
    pub async fn create_pull_request(&mut self) -> Result<PullRequest, SessionError> {
        self.expect_state("create a pull request", SessionState::ReviewersChosen)?;
        let repo = self.repo_ref();

        let request = NewPullRequest {
            title: self.settings.pr_title.clone(),
            source: BranchEndpoint::named(self.working_branch()),
            destination: BranchEndpoint::named(self.base_branch.clone().unwrap_or_default()),
            reviewers: self.reviewers.clone(),
        };
        info!(title = %request.title, "creating pull request");
        let pull_request = self.api.create_pull_request(&repo, &request).await?;

        match pull_request.web_url() {
            Some(url) => println!(
                "{} Pull request successfully created. Watch more: {}",
                "✔".green(),
                url.underline()
            ),
            None => println!(
                "{} Pull request #{} successfully created",
                "✔".green(),
                pull_request.id
            ),
        }

        self.state = SessionState::PullRequestCreated;
        Ok(pull_request)
    }

    /// Delete the working branch after a failed step. Failures are logged only.
    async fn rollback(&self) {
        let (Some(repo), Some(branch)) = (self.repo.clone(), self.branch.clone()) else {
            return;
        };
        warn!(%branch, state = %self.state, "update failed, deleting working branch");
        match self.api.delete_branch(&repo, &branch).await {
            Ok(()) => println!("{} Branch {} deleted", "✘".red(), branch),
            Err(err) => error!(%branch, error = %err, "failed to delete working branch"),
        }
    }

    fn expect_state(&self, operation: &'static str, expected: SessionState) -> Result<(), SessionError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SessionError::OutOfOrder {
                operation,
                expected,
                actual: self.state,
            })
        }
    }

    // Set from RepositoryChosen onwards, guarded by expect_state.
    fn repo_ref(&self) -> RepoRef {
        self.repo.clone().unwrap_or_else(|| RepoRef {
            workspace: String::new(),
            slug: String::new(),
        })
    }

    fn working_branch(&self) -> String {
        self.branch.clone().unwrap_or_default()
    }
}
