use crate::aggregation::{
    commit_frequency, deadline_fighters, free_riders, issue_resolution, pull_request_resolution, ContributorFrequency,
    DeadlineFighter, FreeRider, IssueResolution, PullRequestResolution,
};
use crate::retriever::{issues_only, RepoActivity};
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::fmt::Display;

/// Every derived view of one repository's activity.
#[derive(Debug, Clone, PartialEq)]
pub struct ContributionReport {
    pub frequency: ContributorFrequency,
    pub issues: BTreeMap<String, IssueResolution>,
    pub pull_requests: BTreeMap<String, PullRequestResolution>,
    /// Present only when a deadline was given.
    pub deadline_fighters: Option<Vec<DeadlineFighter>>,
    pub free_riders: Vec<FreeRider>,
}

impl ContributionReport {
    pub fn build(activity: &RepoActivity, deadline: Option<DateTime<Utc>>, window: Duration) -> Self {
        let issues = issues_only(&activity.issues);
        ContributionReport {
            frequency: commit_frequency(&activity.commits),
            issues: issue_resolution(&issues),
            pull_requests: pull_request_resolution(&activity.pull_requests),
            deadline_fighters: deadline.map(|deadline| deadline_fighters(&activity.commits, deadline, window)),
            free_riders: free_riders(&activity.commits, &issues, &activity.pull_requests),
        }
    }
}

impl Display for ContributionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Commits")?;
        for (user, commits) in &self.frequency {
            writeln!(f, "user: {}\tcommits: {}", user, commits)?;
        }
        writeln!(f, "\nIssues")?;
        for (user, resolution) in &self.issues {
            writeln!(
                f,
                "user: {}\topened: {}\tclosed: {}",
                user, resolution.opened, resolution.closed
            )?;
        }
        writeln!(f, "\nPull requests")?;
        for (user, resolution) in &self.pull_requests {
            writeln!(
                f,
                "user: {}\topened: {}\tmerged: {}",
                user, resolution.opened, resolution.merged
            )?;
        }
        if let Some(fighters) = &self.deadline_fighters {
            writeln!(f, "\nDeadline fighters")?;
            for fighter in fighters {
                writeln!(f, "{}", fighter)?;
            }
        }
        writeln!(f, "\nFree riders")?;
        for rider in &self.free_riders {
            writeln!(f, "{}", rider)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::deadline_window;
    use crate::api::{Commit, Issue, IssueState};
    use chrono::TimeZone;

    fn activity() -> RepoActivity {
        let commit = Commit {
            sha: "1".to_string(),
            author_login: Some("a".to_string()),
            author_name: Some("Ann".to_string()),
            authored_at: Utc.with_ymd_and_hms(2024, 1, 9, 0, 0, 0).unwrap(),
            message: "fix".to_string(),
        };
        let pr_shaped = Issue {
            id: 7,
            number: 7,
            state: IssueState::Open,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            closed_at: None,
            author_login: Some("b".to_string()),
            is_pull_request: true,
        };
        RepoActivity {
            commits: vec![commit],
            issues: vec![pr_shaped],
            ..Default::default()
        }
    }

    #[test]
    fn excludes_pull_request_shaped_issues() {
        let report = ContributionReport::build(&activity(), None, deadline_window());

        assert!(report.issues.is_empty());
        assert_eq!(report.free_riders.len(), 1);
        assert_eq!(report.free_riders[0].username, "a");
        assert!(report.deadline_fighters.is_none());
    }

    #[test]
    fn renders_deadline_section_when_deadline_given() {
        let deadline = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        let report = ContributionReport::build(&activity(), Some(deadline), deadline_window());

        let text = report.to_string();
        assert!(text.contains("Deadline fighters"));
        assert!(text.contains("user: a\tcommits: 1\tnear deadline: 1\tpercentage: 100.0"));
    }
}
