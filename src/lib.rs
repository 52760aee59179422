pub mod args;

pub use args::Args;

use contributions::api::{Error, Result};
use contributions::{ContributionReport, Retriever};
use github_client::GithubClientBuilder;
use log::{info, warn};
use tokio_util::sync::CancellationToken;

/// Fetches the activity of `args.repo` and derives every contribution view from it.
///
/// A repository which does not exist is reported as [`Error::NotFound`] and a cancelled run as
/// [`Error::Cancelled`]. Any other failure only empties the affected listing.
pub async fn contribution_report(args: Args, cancel: CancellationToken) -> Result<ContributionReport> {
    let mut client = GithubClientBuilder::default()
        .with_github_url(&args.api_url)
        .with_timeout(args.timeout());
    if let Some(token) = args.api_token.clone() {
        client = client.try_with_token(token)?;
    }
    let client = client.build().await?;

    let retriever = Retriever::new(client, args.retriever_config()).with_cancellation(cancel.clone());
    match retriever.repository_exists(&args.owner, &args.repo).await {
        Ok(true) => {}
        Ok(false) => return Err(Error::NotFound(format!("{}/{}", args.owner, args.repo))),
        Err(Error::Cancelled) => return Err(Error::Cancelled),
        Err(err) => warn!("Could not confirm {}/{} exists: {}", args.owner, args.repo, err),
    }

    let activity = retriever.activity(&args.owner, &args.repo).await;
    // listings swallow cancellation as empty results
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    info!(
        "Fetched {} commits, {} issues, {} pull requests, {} contributors of {}/{}",
        activity.commits.len(),
        activity.issues.len(),
        activity.pull_requests.len(),
        activity.contributors.len(),
        args.owner,
        args.repo
    );
    Ok(ContributionReport::build(&activity, args.deadline, args.window()))
}
