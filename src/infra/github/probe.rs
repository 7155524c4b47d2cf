use async_trait::async_trait;
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    application::upstream::{MetadataProbe, UpstreamError, UpstreamMetadata},
    domain::locator::ContentLocator,
};

use super::GitHubClient;

#[derive(Debug, Deserialize)]
struct CommitEntry {
    commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    committer: Option<Signature>,
    author: Option<Signature>,
}

#[derive(Debug, Deserialize)]
struct Signature {
    #[serde(with = "time::serde::rfc3339")]
    date: OffsetDateTime,
}

#[async_trait]
impl MetadataProbe for GitHubClient {
    /// Latest commit touching the document, one result only. The default
    /// branch README is checked against the repository's latest commit since
    /// its path is not known before fetching.
    async fn last_modified(
        &self,
        locator: &ContentLocator,
    ) -> Result<UpstreamMetadata, UpstreamError> {
        let endpoint = format!("/repos/{}/{}/commits", locator.owner(), locator.repo());
        let mut query = vec![("per_page", "1"), ("page", "1")];
        if let Some(path) = locator.path() {
            query.push(("path", path));
        }
        if let Some(revision) = locator.revision().name() {
            query.push(("sha", revision));
        }

        let subject = locator.path().unwrap_or("README");
        let commits: Vec<CommitEntry> = self.get_json(&endpoint, &query, subject).await?;

        let Some(latest) = commits.into_iter().next() else {
            return Err(UpstreamError::NoHistory {
                path: subject.to_string(),
            });
        };

        let signature = latest
            .commit
            .committer
            .or(latest.commit.author)
            .ok_or_else(|| UpstreamError::decode("commit carries no committer date"))?;

        Ok(UpstreamMetadata {
            last_modified: signature.date,
        })
    }
}
