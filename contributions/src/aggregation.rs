use crate::api::{Commit, Issue, IssueState, PullRequest};
use chrono::{DateTime, Duration, Utc};
use derive_more::Constructor;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;

/// Commits within this many hours before a deadline count as fighting it.
pub const DEADLINE_WINDOW_HOURS: i64 = 48;

pub fn deadline_window() -> Duration {
    Duration::hours(DEADLINE_WINDOW_HOURS)
}

pub type ContributorFrequency = BTreeMap<String, u32>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Constructor)]
pub struct IssueResolution {
    pub opened: u32,
    pub closed: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Constructor)]
pub struct PullRequestResolution {
    pub opened: u32,
    pub merged: u32,
}

#[derive(Debug, Clone, PartialEq, Constructor)]
pub struct DeadlineFighter {
    pub username: String,
    pub total_commits: u32,
    pub close_to_deadline_commits: u32,
    /// Share of `total_commits` made inside the window, from 0 to 100.
    pub percentage: f64,
}

impl Display for DeadlineFighter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!(
            "user: {}\tcommits: {}\tnear deadline: {}\tpercentage: {:.1}",
            self.username, self.total_commits, self.close_to_deadline_commits, self.percentage
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Constructor)]
pub struct FreeRider {
    pub username: String,
    pub commit_count: u32,
    pub issue_count: u32,
    pub pr_count: u32,
    pub total_contributions: u32,
}

impl Display for FreeRider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!(
            "user: {}\tcommits: {}\tissues: {}\tpull requests: {}\ttotal: {}",
            self.username, self.commit_count, self.issue_count, self.pr_count, self.total_contributions
        ))
    }
}

/// Counts commits per author. Commits without login nor author name are left out.
pub fn commit_frequency(commits: &[Commit]) -> ContributorFrequency {
    let mut frequency = ContributorFrequency::new();
    for identity in commits.iter().filter_map(Commit::identity) {
        *frequency.entry(identity.to_string()).or_default() += 1;
    }
    frequency
}

pub fn issue_resolution(issues: &[Issue]) -> BTreeMap<String, IssueResolution> {
    let mut resolution = BTreeMap::<String, IssueResolution>::new();
    for issue in issues {
        if let Some(login) = &issue.author_login {
            let entry = resolution.entry(login.clone()).or_default();
            entry.opened += 1;
            if issue.state == IssueState::Closed {
                entry.closed += 1;
            }
        }
    }
    resolution
}

pub fn pull_request_resolution(pull_requests: &[PullRequest]) -> BTreeMap<String, PullRequestResolution> {
    let mut resolution = BTreeMap::<String, PullRequestResolution>::new();
    for pull_request in pull_requests {
        if let Some(login) = &pull_request.author_login {
            let entry = resolution.entry(login.clone()).or_default();
            entry.opened += 1;
            if pull_request.merged_at.is_some() {
                entry.merged += 1;
            }
        }
    }
    resolution
}

/// Ranks authors by the share of their commits made in the `window` before `deadline`.
///
/// Commits after the deadline are late rather than close to it and do not count.
/// Sorted by descending percentage; equal percentages keep first-appearance order.
pub fn deadline_fighters(commits: &[Commit], deadline: DateTime<Utc>, window: Duration) -> Vec<DeadlineFighter> {
    let mut fighters: Vec<DeadlineFighter> = group_by_identity(commits)
        .into_iter()
        .filter(|(_, commits)| !commits.is_empty())
        .map(|(username, commits)| {
            let total_commits = commits.len() as u32;
            let close_to_deadline_commits = commits
                .iter()
                .filter(|commit| is_close_to_deadline(commit.authored_at, deadline, window))
                .count() as u32;
            DeadlineFighter::new(
                username.to_string(),
                total_commits,
                close_to_deadline_commits,
                calculate_percentage(close_to_deadline_commits, total_commits),
            )
        })
        .collect();
    fighters.sort_by(|a, b| b.percentage.total_cmp(&a.percentage));
    fighters
}

/// Lists every known author with commit, issue and pull request counts, least active first.
///
/// Commit authors are identified by login or author name, issue and pull request authors by
/// login only, so issues and pull requests without a login are ignored.
// Commits fall back to the author name while issues and pull requests do not. Kept as is,
// although an author without login can never be matched to their issues this way.
pub fn free_riders(commits: &[Commit], issues: &[Issue], pull_requests: &[PullRequest]) -> Vec<FreeRider> {
    let mut usernames: Vec<&str> = Vec::new();
    let commit_counts = count_by(commits.iter().filter_map(Commit::identity), &mut usernames);
    let issue_counts = count_by(issues.iter().filter_map(|i| i.author_login.as_deref()), &mut usernames);
    let pr_counts = count_by(
        pull_requests.iter().filter_map(|pr| pr.author_login.as_deref()),
        &mut usernames,
    );

    let mut riders: Vec<FreeRider> = usernames
        .into_iter()
        .map(|username| {
            let commit_count = commit_counts.get(username).copied().unwrap_or(0);
            let issue_count = issue_counts.get(username).copied().unwrap_or(0);
            let pr_count = pr_counts.get(username).copied().unwrap_or(0);
            FreeRider::new(
                username.to_string(),
                commit_count,
                issue_count,
                pr_count,
                commit_count + issue_count + pr_count,
            )
        })
        .collect();
    riders.sort_by_key(|rider| rider.total_contributions);
    riders
}

fn is_close_to_deadline(authored_at: DateTime<Utc>, deadline: DateTime<Utc>, window: Duration) -> bool {
    let time_difference = deadline - authored_at;
    time_difference >= Duration::zero() && time_difference <= window
}

fn calculate_percentage(part: u32, total: u32) -> f64 {
    part as f64 / total as f64 * 100.0
}

/// Groups commits by author in order of first appearance.
fn group_by_identity(commits: &[Commit]) -> Vec<(&str, Vec<&Commit>)> {
    let mut groups: Vec<(&str, Vec<&Commit>)> = Vec::new();
    let mut index = HashMap::new();
    for commit in commits {
        if let Some(identity) = commit.identity() {
            let position = *index.entry(identity).or_insert_with(|| {
                groups.push((identity, Vec::new()));
                groups.len() - 1
            });
            groups[position].1.push(commit);
        }
    }
    groups
}

/// Counts occurrences per username, registering unseen usernames in `usernames`.
fn count_by<'a>(identities: impl Iterator<Item = &'a str>, usernames: &mut Vec<&'a str>) -> HashMap<&'a str, u32> {
    let mut counts = HashMap::new();
    for identity in identities {
        if !counts.contains_key(identity) && !usernames.contains(&identity) {
            usernames.push(identity);
        }
        *counts.entry(identity).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap().with_timezone(&Utc)
    }

    fn commit(login: Option<&str>, name: Option<&str>, authored_at: &str) -> Commit {
        Commit {
            sha: format!("{:?}{:?}{}", login, name, authored_at),
            author_login: login.map(String::from),
            author_name: name.map(String::from),
            authored_at: at(authored_at),
            message: "commit".to_string(),
        }
    }

    fn by(login: &str) -> Commit {
        commit(Some(login), None, "2024-01-01T00:00:00Z")
    }

    fn issue(login: Option<&str>, state: IssueState) -> Issue {
        Issue {
            id: 1,
            number: 1,
            state,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            closed_at: (state == IssueState::Closed).then(|| Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()),
            author_login: login.map(String::from),
            is_pull_request: false,
        }
    }

    fn pull_request(login: Option<&str>, merged: bool) -> PullRequest {
        let closed_at = merged.then(|| Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap());
        PullRequest {
            id: 2,
            number: 2,
            state: if merged { IssueState::Closed } else { IssueState::Open },
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            closed_at,
            merged_at: closed_at,
            author_login: login.map(String::from),
        }
    }

    #[test]
    fn frequency_falls_back_to_author_name() {
        let commits = vec![
            by("a"),
            by("a"),
            by("b"),
            commit(None, Some("c"), "2024-01-01T00:00:00Z"),
            commit(None, None, "2024-01-01T00:00:00Z"),
        ];

        let frequency = commit_frequency(&commits);

        let expected: ContributorFrequency = [("a".to_string(), 2), ("b".to_string(), 1), ("c".to_string(), 1)]
            .into_iter()
            .collect();
        assert_eq!(frequency, expected);
    }

    #[test]
    fn issue_resolution_counts_closed() {
        let issues = vec![
            issue(Some("a"), IssueState::Closed),
            issue(Some("a"), IssueState::Open),
            issue(Some("b"), IssueState::Open),
            issue(None, IssueState::Closed),
        ];

        let resolution = issue_resolution(&issues);

        assert_eq!(resolution.len(), 2);
        assert_eq!(resolution["a"], IssueResolution::new(2, 1));
        assert_eq!(resolution["b"], IssueResolution::new(1, 0));
    }

    #[test]
    fn pull_request_resolution_counts_merged() {
        let mut rejected = pull_request(Some("a"), false);
        rejected.state = IssueState::Closed;
        let pull_requests = vec![pull_request(Some("a"), true), rejected, pull_request(None, true)];

        let resolution = pull_request_resolution(&pull_requests);

        assert_eq!(resolution.len(), 1);
        assert_eq!(resolution["a"], PullRequestResolution::new(2, 1));
    }

    #[test]
    fn deadline_fighter_percentage() {
        let commits = vec![
            commit(Some("x"), None, "2024-01-09T12:00:00Z"),
            commit(Some("x"), None, "2024-01-05T00:00:00Z"),
        ];

        let fighters = deadline_fighters(&commits, at("2024-01-10T00:00:00Z"), deadline_window());

        assert_eq!(fighters, vec![DeadlineFighter::new("x".to_string(), 2, 1, 50.0)]);
    }

    #[test]
    fn late_commits_do_not_fight_the_deadline() {
        let commits = vec![
            commit(Some("x"), None, "2024-01-10T00:00:01Z"),
            commit(Some("x"), None, "2024-01-10T00:00:00Z"),
            commit(Some("x"), None, "2024-01-08T00:00:00Z"),
            commit(Some("x"), None, "2024-01-07T23:59:59Z"),
        ];

        let fighters = deadline_fighters(&commits, at("2024-01-10T00:00:00Z"), deadline_window());

        assert_eq!(fighters[0].total_commits, 4);
        assert_eq!(fighters[0].close_to_deadline_commits, 2);
        assert_eq!(fighters[0].percentage, 50.0);
    }

    #[test]
    fn anonymous_commits_do_not_fight_the_deadline() {
        let commits = vec![
            commit(None, None, "2024-01-09T12:00:00Z"),
            commit(None, None, "2024-01-09T13:00:00Z"),
            commit(Some("x"), None, "2024-01-09T14:00:00Z"),
            commit(None, Some("X Person"), "2024-01-01T00:00:00Z"),
        ];

        let fighters = deadline_fighters(&commits, at("2024-01-10T00:00:00Z"), deadline_window());

        assert_eq!(
            fighters,
            vec![
                DeadlineFighter::new("x".to_string(), 1, 1, 100.0),
                DeadlineFighter::new("X Person".to_string(), 1, 0, 0.0),
            ]
        );
    }

    #[test]
    fn deadline_fighters_sorted_descending_with_stable_ties() {
        let deadline = "2024-01-10T00:00:00Z";
        let commits = vec![
            commit(Some("calm"), None, "2024-01-01T00:00:00Z"),
            commit(Some("tie-1"), None, "2024-01-09T00:00:00Z"),
            commit(None, Some("tie-2"), "2024-01-09T00:00:00Z"),
            commit(Some("half"), None, "2024-01-09T00:00:00Z"),
            commit(Some("half"), None, "2024-01-01T00:00:00Z"),
        ];

        let fighters = deadline_fighters(&commits, at(deadline), deadline_window());

        let order: Vec<_> = fighters.iter().map(|f| f.username.as_str()).collect();
        assert_eq!(order, vec!["tie-1", "tie-2", "half", "calm"]);
        assert_eq!(fighters[3].percentage, 0.0);
    }

    #[test]
    fn free_riders_least_active_first() {
        let mut commits = Vec::new();
        commits.extend(std::iter::repeat_with(|| by("busy")).take(30));
        commits.extend(std::iter::repeat_with(|| by("rider")).take(5));
        commits.extend(std::iter::repeat_with(|| by("average")).take(15));

        let riders = free_riders(&commits, &[], &[]);

        let totals: Vec<_> = riders.iter().map(|r| (r.username.as_str(), r.total_contributions)).collect();
        assert_eq!(totals, vec![("rider", 5), ("average", 15), ("busy", 30)]);
    }

    #[test]
    fn free_riders_union_of_all_activity() {
        let commits = vec![by("a"), commit(None, Some("Named Only"), "2024-01-01T00:00:00Z")];
        let issues = vec![
            issue(Some("a"), IssueState::Open),
            issue(Some("b"), IssueState::Closed),
            issue(None, IssueState::Open),
        ];
        let pull_requests = vec![pull_request(Some("c"), true), pull_request(Some("a"), false)];

        let riders = free_riders(&commits, &issues, &pull_requests);

        assert_eq!(
            riders,
            vec![
                FreeRider::new("Named Only".to_string(), 1, 0, 0, 1),
                FreeRider::new("b".to_string(), 0, 1, 0, 1),
                FreeRider::new("c".to_string(), 0, 0, 1, 1),
                FreeRider::new("a".to_string(), 1, 1, 1, 3),
            ]
        );
    }

    #[test]
    fn aggregations_are_repeatable() {
        let commits = vec![
            by("a"),
            commit(Some("b"), None, "2024-01-09T00:00:00Z"),
            commit(None, Some("c"), "2024-01-09T06:00:00Z"),
        ];
        let issues = vec![issue(Some("a"), IssueState::Closed)];
        let deadline = at("2024-01-10T00:00:00Z");

        assert_eq!(commit_frequency(&commits), commit_frequency(&commits));
        assert_eq!(issue_resolution(&issues), issue_resolution(&issues));
        assert_eq!(
            deadline_fighters(&commits, deadline, deadline_window()),
            deadline_fighters(&commits, deadline, deadline_window())
        );
        assert_eq!(free_riders(&commits, &issues, &[]), free_riders(&commits, &issues, &[]));
        assert_eq!(
            format!("{:?}", commit_frequency(&commits)),
            format!("{:?}", commit_frequency(&commits))
        );
    }

    #[test]
    fn empty_input_yields_empty_views() {
        assert!(commit_frequency(&[]).is_empty());
        assert!(deadline_fighters(&[], Utc::now(), deadline_window()).is_empty());
        assert!(free_riders(&[], &[], &[]).is_empty());
    }
}
