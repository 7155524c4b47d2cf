//! GitHub REST adapters for the revision probe and the content fetcher.
//!
//! One [`GitHubClient`] implements both traits. Requests carry the bearer
//! token, the v3 JSON media type and a user agent; each call has its own
//! timeout and is never retried here.

mod fetcher;
mod probe;

use std::time::Duration;

use reqwest::{
    Client, Response, StatusCode,
    header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT},
};
use serde::de::DeserializeOwned;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use url::Url;

use crate::{application::upstream::UpstreamError, infra::error::InfraError};

const GITHUB_API_VERSION: &str = "2022-11-28";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubClientConfig {
    pub api_base_url: String,
    pub token: Option<String>,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl From<&crate::config::GitHubSettings> for GitHubClientConfig {
    fn from(settings: &crate::config::GitHubSettings) -> Self {
        Self {
            api_base_url: settings.api_base_url.clone(),
            token: settings.token.clone(),
            request_timeout: settings.request_timeout,
            user_agent: settings.user_agent.clone(),
        }
    }
}

#[derive(Clone)]
pub struct GitHubClient {
    http: Client,
    api_base: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(config: &GitHubClientConfig) -> Result<Self, InfraError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static(GITHUB_API_VERSION),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|err| InfraError::configuration(format!("invalid user agent: {err}")))?,
        );

        let http = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| InfraError::upstream(err.to_string()))?;

        Ok(Self {
            http,
            api_base: config.api_base_url.trim_end_matches('/').to_string(),
            token: config
                .token
                .as_deref()
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(str::to_string),
        })
    }

    /// GET `{api}{endpoint}` and decode the JSON body. `subject` names the
    /// document in `Missing` errors.
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
        subject: &str,
    ) -> Result<T, UpstreamError> {
        let Some(token) = self.token.as_deref() else {
            return Err(UpstreamError::unauthorized("no GitHub token configured"));
        };

        let mut url = Url::parse(&format!("{}{}", self.api_base, endpoint))
            .map_err(|err| UpstreamError::unavailable(format!("invalid request URL: {err}")))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport_error)?;

        let response = check_response(response, subject).await?;
        response.json::<T>().await.map_err(|err| {
            if err.is_timeout() {
                UpstreamError::Timeout
            } else {
                UpstreamError::decode(err.to_string())
            }
        })
    }
}

fn transport_error(err: reqwest::Error) -> UpstreamError {
    if err.is_timeout() {
        UpstreamError::Timeout
    } else {
        UpstreamError::unavailable(err.to_string())
    }
}

async fn check_response(response: Response, subject: &str) -> Result<Response, UpstreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::UNAUTHORIZED => Err(UpstreamError::unauthorized(
            "GitHub rejected the token (401)",
        )),
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
            if let Some(reset_at) = rate_limit_reset(&response) {
                Err(UpstreamError::unavailable(format!(
                    "rate limit exceeded, resets at {reset_at}"
                )))
            } else if status == StatusCode::FORBIDDEN {
                Err(UpstreamError::unauthorized(
                    "GitHub denied access to the resource (403)",
                ))
            } else {
                Err(UpstreamError::unavailable("too many requests (429)"))
            }
        }
        StatusCode::NOT_FOUND => Err(UpstreamError::Missing {
            path: subject.to_string(),
        }),
        status => {
            let body = response.text().await.unwrap_or_default();
            Err(UpstreamError::unavailable(format!(
                "HTTP {status}: {}",
                body.trim()
            )))
        }
    }
}

/// Reset instant when the response reports an exhausted rate limit.
fn rate_limit_reset(response: &Response) -> Option<String> {
    let header = |name: &str| {
        response
            .headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };

    if header("x-ratelimit-remaining")?.trim() != "0" {
        return None;
    }
    let reset = header("x-ratelimit-reset")
        .and_then(|value| value.trim().parse::<i64>().ok())
        .and_then(|seconds| OffsetDateTime::from_unix_timestamp(seconds).ok())
        .and_then(|instant| instant.format(&Rfc3339).ok());
    Some(reset.unwrap_or_else(|| "an unknown time".to_string()))
}
