//! Contribution analytics for student teams
//!
//! # Overview
//!
//! Instructors follow how the members of a team work on their GitHub repository.
//! Given a repository (`owner`, `repo`), the library fetches its commits, issues, pull requests and
//! contributors, surviving the API's pagination, rate limits and transient failures, and derives per
//! contributor signals from them:
//! * commit frequency,
//! * issue and pull request resolution,
//! * deadline fighters, contributors who commit disproportionately within 48 hours before a deadline,
//! * free riders, contributors with the least recorded activity.
//!
//! Every listing is paginated (at most 5 pages of 100 items) and every page request is retried with
//! exponential backoff, except when the resource does not exist. A listing which cannot be fetched
//! at all yields no items rather than an error, so a dashboard shows an empty repository instead of failing.
//!
//! The `api` feature exposes only the data model and the [`api::Client`] seam implemented by API clients.
//! The `engine` feature adds retrieval and aggregation.

pub mod api;

#[cfg(feature = "engine")]
pub mod aggregation;
#[cfg(feature = "engine")]
pub mod paginator;
#[cfg(feature = "engine")]
pub mod report;
#[cfg(feature = "engine")]
pub mod retriever;
#[cfg(feature = "engine")]
pub mod retry;

#[cfg(feature = "engine")]
pub use report::ContributionReport;
#[cfg(feature = "engine")]
pub use retriever::{RepoActivity, Retriever, RetrieverConfig, Unreachable};
