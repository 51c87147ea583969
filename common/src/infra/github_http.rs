use reqwest::header::HeaderMap;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::time::Duration;

use crate::github::GithubError;

const DEFAULT_USER_AGENT: &str = "PromptSync/1.0";
const GITHUB_ACCEPT_HEADER: &str = "application/vnd.github.v3+json";
const MAX_RATE_LIMIT_ATTEMPTS: u32 = 5;
const DEFAULT_RATE_LIMIT_WAIT_SECS: u64 = 60;

pub fn build_github_client(token: Option<&str>) -> Result<Client, GithubError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        reqwest::header::USER_AGENT,
        DEFAULT_USER_AGENT
            .parse()
            .map_err(|_| GithubError::Config("invalid user agent".to_string()))?,
    );
    headers.insert(
        reqwest::header::ACCEPT,
        GITHUB_ACCEPT_HEADER
            .parse()
            .map_err(|_| GithubError::Config("invalid accept header".to_string()))?,
    );

    if let Some(raw_token) = token {
        let token = raw_token.trim();
        if !token.is_empty() {
            headers.insert(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", token)
                    .parse()
                    .map_err(|_| GithubError::Config("token is not a valid header".to_string()))?,
            );
        }
    }

    Ok(Client::builder().default_headers(headers).build()?)
}

/// Sends `req`, waiting out rate limits. Every other non-success status is
/// mapped to a typed error and returned without retrying.
pub async fn send_request_with_retry(
    req: RequestBuilder,
    context: &str,
) -> Result<Response, GithubError> {
    let mut attempts = 0;
    loop {
        attempts += 1;
        let response = req
            .try_clone()
            .ok_or_else(|| GithubError::Config(format!("request is not cloneable ({})", context)))?
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if is_rate_limited(status, response.headers()) {
            if attempts >= MAX_RATE_LIMIT_ATTEMPTS {
                return Err(GithubError::RateLimited {
                    attempts,
                    context: context.to_string(),
                });
            }

            let wait_time = response
                .headers()
                .get("Retry-After")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse::<u64>().ok())
                .unwrap_or(DEFAULT_RATE_LIMIT_WAIT_SECS);
            tracing::warn!(
                context,
                attempts,
                wait_time,
                "GitHub rate limit hit, waiting before retry"
            );
            tokio::time::sleep(Duration::from_secs(wait_time)).await;
            continue;
        }

        let body = response.text().await.unwrap_or_default();
        return Err(classify_status(status, context, body));
    }
}

pub(crate) fn is_rate_limited(status: StatusCode, headers: &HeaderMap) -> bool {
    match status {
        StatusCode::TOO_MANY_REQUESTS => true,
        StatusCode::FORBIDDEN => {
            headers.contains_key("Retry-After")
                || headers
                    .get("x-ratelimit-remaining")
                    .and_then(|value| value.to_str().ok())
                    == Some("0")
        }
        _ => false,
    }
}

pub(crate) fn classify_status(status: StatusCode, context: &str, body: String) -> GithubError {
    let context = context.to_string();
    match status {
        StatusCode::NOT_FOUND => GithubError::NotFound(context),
        StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => GithubError::Conflict(context),
        StatusCode::UNPROCESSABLE_ENTITY => GithubError::Unprocessable { context, body },
        status => GithubError::Status {
            status: status.as_u16(),
            context,
            body,
        },
    }
}
