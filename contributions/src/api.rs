use async_trait::async_trait;
use chrono::{DateTime, Utc};
use derive_more::Constructor;
use std::fmt::Display;
use strum_macros::{Display as StrumDisplay, EnumString};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The resource definitively does not exist. Never retried.
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("API rate limit exceeded, resets at {reset}")]
    RateLimited { reset: i64 },
    #[error("Unexpected response status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("Request error: {0}")]
    RequestError(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Cancelled")]
    Cancelled,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Permanent failures are not worth retrying; everything else is treated as transient.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Constructor)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum IssueState {
    Open,
    Closed,
}

/// Value of the `state` query parameter of issue and pull request listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum StateFilter {
    Open,
    Closed,
    All,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Repository {
    pub name: String,
    pub owner: String,
    pub private: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Commit {
    pub sha: String,
    pub author_login: Option<String>,
    pub author_name: Option<String>,
    pub authored_at: DateTime<Utc>,
    pub message: String,
}

impl Commit {
    /// Login when the commit is linked to an account, free-text author name otherwise.
    pub fn identity(&self) -> Option<&str> {
        self.author_login.as_deref().or(self.author_name.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub id: u64,
    pub number: u64,
    pub state: IssueState,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub author_login: Option<String>,
    /// GitHub lists pull requests among issues; they carry a `pull_request` field.
    pub is_pull_request: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PullRequest {
    pub id: u64,
    pub number: u64,
    pub state: IssueState,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    pub author_login: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Constructor)]
pub struct Contributor {
    pub name: String,
    pub contributions: u32,
}

#[async_trait]
pub trait Client: Send + Sync {
    async fn repository(&self, repo: &RepoRef) -> Result<Repository>;

    async fn org_repos(&self, org: &str, page: u32, per_page: u32) -> Result<Vec<Repository>>;

    async fn commits(&self, repo: &RepoRef, page: u32, per_page: u32) -> Result<Vec<Commit>>;

    async fn issues(&self, repo: &RepoRef, state: StateFilter, page: u32, per_page: u32) -> Result<Vec<Issue>>;

    async fn pull_requests(
        &self,
        repo: &RepoRef,
        state: StateFilter,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<PullRequest>>;

    async fn contributors(&self, repo: &RepoRef, page: u32, per_page: u32) -> Result<Vec<Contributor>>;
}
