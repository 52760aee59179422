use crate::api::{Client, Commit, Contributor, Error, Issue, PullRequest, RepoRef, Repository, Result, StateFilter};
use crate::paginator::{collect_pages, PageLimits};
use crate::retry::{retry, RetryPolicy};
use derive_more::Constructor;
use log::error;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// A listing which failed before yielding a single item.
#[derive(Error, Debug)]
#[error("{resource} of {target} unreachable: {source}")]
pub struct Unreachable {
    pub resource: &'static str,
    pub target: String,
    #[source]
    pub source: Error,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Constructor)]
pub struct RetrieverConfig {
    pub retry: RetryPolicy,
    pub pages: PageLimits,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepoActivity {
    pub commits: Vec<Commit>,
    pub issues: Vec<Issue>,
    pub pull_requests: Vec<PullRequest>,
    pub contributors: Vec<Contributor>,
}

pub struct Retriever<CLIENT>
where
    CLIENT: Client,
{
    client: Arc<CLIENT>,
    config: RetrieverConfig,
    cancel: CancellationToken,
}

impl<CLIENT> Retriever<CLIENT>
where
    CLIENT: Client,
{
    pub fn new(client: CLIENT, config: RetrieverConfig) -> Self {
        Retriever {
            client: Arc::new(client),
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Ties every request made by this retriever to `cancel`.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Distinguishes a missing repository from one without activity, which listings do not.
    pub async fn repository_exists(&self, owner: &str, repo: &str) -> Result<bool> {
        let repo = &RepoRef::new(owner.to_string(), repo.to_string());
        let client = self.client.as_ref();
        match retry(&self.config.retry, &self.cancel, move || client.repository(repo)).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Fetches commits, issues, pull requests and contributors concurrently.
    pub async fn activity(&self, owner: &str, repo: &str) -> RepoActivity {
        let (commits, issues, pull_requests, contributors) = futures::join!(
            self.list_commits(owner, repo),
            self.list_issues(owner, repo),
            self.list_pull_requests(owner, repo),
            self.list_contributors(owner, repo),
        );
        RepoActivity {
            commits,
            issues,
            pull_requests,
            contributors,
        }
    }

    pub async fn list_repositories(&self, org: &str) -> Vec<Repository> {
        fail_open(self.try_list_repositories(org).await)
    }

    pub async fn list_commits(&self, owner: &str, repo: &str) -> Vec<Commit> {
        fail_open(self.try_list_commits(owner, repo).await)
    }

    /// Issues in every state. Pull requests are included too, see [`issues_only`].
    pub async fn list_issues(&self, owner: &str, repo: &str) -> Vec<Issue> {
        fail_open(self.try_list_issues(owner, repo).await)
    }

    pub async fn list_pull_requests(&self, owner: &str, repo: &str) -> Vec<PullRequest> {
        fail_open(self.try_list_pull_requests(owner, repo).await)
    }

    pub async fn list_contributors(&self, owner: &str, repo: &str) -> Vec<Contributor> {
        fail_open(self.try_list_contributors(owner, repo).await)
    }

    pub async fn try_list_repositories(&self, org: &str) -> std::result::Result<Vec<Repository>, Unreachable> {
        let client = self.client.as_ref();
        self.collect("repositories", org.to_string(), move |page, per_page| {
            client.org_repos(org, page, per_page)
        })
        .await
    }

    pub async fn try_list_commits(&self, owner: &str, repo: &str) -> std::result::Result<Vec<Commit>, Unreachable> {
        let repo = &RepoRef::new(owner.to_string(), repo.to_string());
        let client = self.client.as_ref();
        self.collect("commits", repo.to_string(), move |page, per_page| {
            client.commits(repo, page, per_page)
        })
        .await
    }

    pub async fn try_list_issues(&self, owner: &str, repo: &str) -> std::result::Result<Vec<Issue>, Unreachable> {
        let repo = &RepoRef::new(owner.to_string(), repo.to_string());
        let client = self.client.as_ref();
        self.collect("issues", repo.to_string(), move |page, per_page| {
            client.issues(repo, StateFilter::All, page, per_page)
        })
        .await
    }

    pub async fn try_list_pull_requests(
        &self,
        owner: &str,
        repo: &str,
    ) -> std::result::Result<Vec<PullRequest>, Unreachable> {
        let repo = &RepoRef::new(owner.to_string(), repo.to_string());
        let client = self.client.as_ref();
        self.collect("pull requests", repo.to_string(), move |page, per_page| {
            client.pull_requests(repo, StateFilter::All, page, per_page)
        })
        .await
    }

    pub async fn try_list_contributors(
        &self,
        owner: &str,
        repo: &str,
    ) -> std::result::Result<Vec<Contributor>, Unreachable> {
        let repo = &RepoRef::new(owner.to_string(), repo.to_string());
        let client = self.client.as_ref();
        self.collect("contributors", repo.to_string(), move |page, per_page| {
            client.contributors(repo, page, per_page)
        })
        .await
    }

    async fn collect<T, F, FUT>(
        &self,
        resource: &'static str,
        target: String,
        fetch_page: F,
    ) -> std::result::Result<Vec<T>, Unreachable>
    where
        F: FnMut(u32, u32) -> FUT,
        FUT: Future<Output = Result<Vec<T>>>,
    {
        let collected = collect_pages(&self.config.retry, &self.config.pages, &self.cancel, fetch_page).await;
        match collected.interrupted {
            Some(source) if collected.items.is_empty() => Err(Unreachable {
                resource,
                target,
                source,
            }),
            _ => Ok(collected.items),
        }
    }
}

/// Pull requests show up in issue listings; this keeps the plain issues.
pub fn issues_only(issues: &[Issue]) -> Vec<Issue> {
    issues.iter().filter(|issue| !issue.is_pull_request).cloned().collect()
}

fn fail_open<T>(listing: std::result::Result<Vec<T>, Unreachable>) -> Vec<T> {
    listing.unwrap_or_else(|err| {
        error!("Failed to list {}: {}", err.resource, err);
        Vec::new()
    })
}
