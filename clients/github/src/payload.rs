use chrono::{DateTime, Utc};
use contributions::api::IssueState;
use log::warn;
use serde::de::IgnoredAny;
use serde::Deserialize;
use std::str::FromStr;

#[derive(Deserialize, Debug)]
pub struct Repo {
    pub name: String,
    pub owner: RepoOwner,
    #[serde(default)]
    pub private: bool,
}

#[derive(Deserialize, Debug)]
pub struct RepoOwner {
    pub login: String,
}

impl From<Repo> for contributions::api::Repository {
    fn from(repo: Repo) -> Self {
        contributions::api::Repository {
            name: repo.name,
            owner: repo.owner.login,
            private: repo.private,
        }
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct User {
    #[serde(default)]
    pub login: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct Commit {
    pub sha: String,
    #[serde(default)]
    pub commit: GitCommit,
    /// GitHub account linked to the commit author, `null` for unknown emails.
    #[serde(default)]
    pub author: Option<User>,
}

#[derive(Deserialize, Debug, Default)]
pub struct GitCommit {
    #[serde(default)]
    pub author: Option<GitActor>,
    #[serde(default)]
    pub committer: Option<GitActor>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct GitActor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

impl Commit {
    /// Falls back to the committer date; a commit without any date is dropped.
    pub fn into_commit(self) -> Option<contributions::api::Commit> {
        let Commit { sha, commit, author } = self;
        let git_author = commit.author.unwrap_or_default();
        let authored_at = git_author.date.or_else(|| commit.committer.and_then(|committer| committer.date));
        let authored_at = match authored_at {
            Some(authored_at) => authored_at,
            None => {
                warn!("Skipping commit {} without author date", sha);
                return None;
            }
        };
        Some(contributions::api::Commit {
            sha,
            author_login: author.and_then(|user| user.login),
            author_name: git_author.name,
            authored_at,
            message: commit.message.unwrap_or_default(),
        })
    }
}

#[derive(Deserialize, Debug)]
pub struct Issue {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub number: u64,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub pull_request: Option<IgnoredAny>,
}

impl Issue {
    pub fn into_issue(self) -> Option<contributions::api::Issue> {
        let created_at = created_at(self.created_at, "issue", self.number)?;
        Some(contributions::api::Issue {
            id: self.id,
            number: self.number,
            state: state(self.state.as_deref(), self.closed_at),
            created_at,
            closed_at: self.closed_at,
            author_login: self.user.and_then(|user| user.login),
            is_pull_request: self.pull_request.is_some(),
        })
    }
}

#[derive(Deserialize, Debug)]
pub struct PullRequest {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub number: u64,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user: Option<User>,
}

impl PullRequest {
    pub fn into_pull_request(self) -> Option<contributions::api::PullRequest> {
        let created_at = created_at(self.created_at, "pull request", self.number)?;
        Some(contributions::api::PullRequest {
            id: self.id,
            number: self.number,
            state: state(self.state.as_deref(), self.closed_at.or(self.merged_at)),
            created_at,
            closed_at: self.closed_at,
            merged_at: self.merged_at,
            author_login: self.user.and_then(|user| user.login),
        })
    }
}

#[derive(Deserialize, Debug)]
pub struct Contributor {
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub contributions: u32,
}

impl Contributor {
    pub fn into_contributor(self) -> Option<contributions::api::Contributor> {
        let name = self.login?;
        Some(contributions::api::Contributor::new(name, self.contributions))
    }
}

#[derive(Deserialize, Debug)]
pub struct RateLimitBody {
    pub resources: RateLimitResources,
}

#[derive(Deserialize, Debug)]
pub struct RateLimitResources {
    pub core: RateLimitResource,
}

#[derive(Deserialize, Debug)]
pub struct RateLimitResource {
    pub limit: u32,
    pub remaining: u32,
    pub reset: i64,
}

fn created_at(created_at: Option<DateTime<Utc>>, kind: &str, number: u64) -> Option<DateTime<Utc>> {
    if created_at.is_none() {
        warn!("Skipping {} #{} without creation date", kind, number);
    }
    created_at
}

/// Unknown or missing states are derived from the closing date.
fn state(state: Option<&str>, closed_at: Option<DateTime<Utc>>) -> IssueState {
    state
        .and_then(|state| IssueState::from_str(state).ok())
        .unwrap_or(if closed_at.is_some() {
            IssueState::Closed
        } else {
            IssueState::Open
        })
}
