//! GitHub REST v3 implementation of [`contributions::api::Client`].

mod builder;
mod limiter;
mod payload;

pub use builder::{GithubClientBuilder, GITHUB_URL};

use async_trait::async_trait;
use contributions::api::{
    Commit, Contributor, Error, Issue, PullRequest, RepoRef, Repository, Result, StateFilter,
};
use limiter::{read_header, RateLimiter};
use log::debug;
use reqwest::header::HeaderMap;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

pub struct GithubClient {
    client: reqwest::Client,
    github_url: String,
    limiter: RateLimiter,
}

impl GithubClient {
    async fn get<B: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<B> {
        let request_url = format!("{}{}", self.github_url, path);
        self.limiter.wait().await;
        let response = self
            .client
            .get(&request_url)
            .query(query)
            .send()
            .await
            .map_err(request_error)?;
        if let Err(err) = self.limiter.reset_limiter(response.headers()).await {
            debug!("Rate limits not updated from {}: {}", path, err);
        }
        let response = check_status(response, path)?;
        read_response::<B>(response).await
    }

    async fn get_page<B: DeserializeOwned>(
        &self,
        path: &str,
        mut query: Vec<(&str, String)>,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<B>> {
        query.push(("page", page.to_string()));
        query.push(("per_page", per_page.to_string()));
        let items = self.get::<Vec<B>>(path, &query).await?;
        debug!("GET {} page {}: {} items", path, page, items.len());
        Ok(items)
    }
}

#[async_trait]
impl contributions::api::Client for GithubClient {
    async fn repository(&self, repo: &RepoRef) -> Result<Repository> {
        let path = format!("/repos/{}/{}", repo.owner, repo.name);
        let repo = self.get::<payload::Repo>(&path, &[]).await?;
        Ok(repo.into())
    }

    async fn org_repos(&self, org: &str, page: u32, per_page: u32) -> Result<Vec<Repository>> {
        let path = format!("/orgs/{}/repos", org);
        let repos = self.get_page::<payload::Repo>(&path, vec![], page, per_page).await?;
        Ok(repos.into_iter().map(Repository::from).collect())
    }

    async fn commits(&self, repo: &RepoRef, page: u32, per_page: u32) -> Result<Vec<Commit>> {
        let path = format!("/repos/{}/{}/commits", repo.owner, repo.name);
        match self.get_page::<payload::Commit>(&path, vec![], page, per_page).await {
            // GitHub answers 409 Conflict for a repository without commits
            Err(Error::Status { status: 409, .. }) => {
                debug!("Repository {} is empty", repo);
                Ok(Vec::new())
            }
            commits => Ok(commits?.into_iter().filter_map(payload::Commit::into_commit).collect()),
        }
    }

    async fn issues(&self, repo: &RepoRef, state: StateFilter, page: u32, per_page: u32) -> Result<Vec<Issue>> {
        let path = format!("/repos/{}/{}/issues", repo.owner, repo.name);
        let query = vec![("state", state.to_string())];
        let issues = self.get_page::<payload::Issue>(&path, query, page, per_page).await?;
        Ok(issues.into_iter().filter_map(payload::Issue::into_issue).collect())
    }

    async fn pull_requests(
        &self,
        repo: &RepoRef,
        state: StateFilter,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<PullRequest>> {
        let path = format!("/repos/{}/{}/pulls", repo.owner, repo.name);
        let query = vec![("state", state.to_string())];
        let pull_requests = self.get_page::<payload::PullRequest>(&path, query, page, per_page).await?;
        Ok(pull_requests
            .into_iter()
            .filter_map(payload::PullRequest::into_pull_request)
            .collect())
    }

    async fn contributors(&self, repo: &RepoRef, page: u32, per_page: u32) -> Result<Vec<Contributor>> {
        let path = format!("/repos/{}/{}/contributors", repo.owner, repo.name);
        let contributors = self.get_page::<payload::Contributor>(&path, vec![], page, per_page).await?;
        Ok(contributors
            .into_iter()
            .filter_map(payload::Contributor::into_contributor)
            .collect())
    }
}

pub(crate) fn request_error(err: reqwest::Error) -> Error {
    Error::RequestError(Box::new(err))
}

/// Maps unsuccessful responses onto the error taxonomy; only 404 is permanent.
pub(crate) fn check_status(response: Response, path: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    match status {
        StatusCode::NOT_FOUND => Err(Error::NotFound(path.to_string())),
        StatusCode::TOO_MANY_REQUESTS => Err(rate_limited(response.headers())),
        StatusCode::FORBIDDEN if limit_exhausted(response.headers()) => Err(rate_limited(response.headers())),
        _ => Err(Error::Status {
            status: status.as_u16(),
            url: path.to_string(),
        }),
    }
}

pub(crate) async fn read_response<B: DeserializeOwned>(response: Response) -> Result<B> {
    let url = response.url().path().to_string();
    response.json::<B>().await.map_err(|err| {
        if err.is_decode() {
            Error::InvalidResponse(format!("{}: {}", url, err))
        } else {
            request_error(err)
        }
    })
}

fn limit_exhausted(headers: &HeaderMap) -> bool {
    matches!(read_header::<u32>(headers, "x-ratelimit-remaining"), Ok(0))
}

fn rate_limited(headers: &HeaderMap) -> Error {
    Error::RateLimited {
        reset: read_header::<i64>(headers, "x-ratelimit-reset").unwrap_or_default(),
    }
}
