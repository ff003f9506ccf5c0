//! Shared HTTP client with retry and cancellation.
//!
//! Every request races the caller's [`RunContext`]. Rate limiting (429),
//! server errors (5xx) and connect/timeout failures are retried up to
//! `http_client.max_retries` times, honouring `Retry-After` when present and
//! otherwise backing off exponentially.

use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use posterforge_common::config::HttpClientConfig;
use posterforge_common::{Error, Result, RunContext};

const STAGE: &str = "http-request";
const DEFAULT_BACKOFF: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(30);
const MAX_BODY_IN_ERROR: usize = 256;
const SECRET_PARAMS: &[&str] = &["api_key", "X-Plex-Token"];

pub struct HttpClient {
    client: reqwest::Client,
    max_retries: u32,
    backoff: Duration,
}

impl HttpClient {
    pub fn new(config: &HttpClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("posterforge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::service_init("http client", e))?;

        Ok(Self {
            client,
            max_retries: config.max_retries,
            backoff: DEFAULT_BACKOFF,
        })
    }

    /// Override the base delay between retries.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// GET `url`, returning the response once it has a success status.
    pub async fn get(
        &self,
        ctx: &RunContext,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<reqwest::Response> {
        let mut attempt = 0u32;
        loop {
            ctx.check(STAGE)?;

            let mut request = self.client.get(url);
            for (name, value) in headers {
                request = request.header(*name, *value);
            }

            let sent = tokio::select! {
                biased;
                cause = ctx.cancelled() => return Err(Error::cancelled(STAGE, cause)),
                sent = request.send() => sent,
            };

            let retry_after = match sent {
                Ok(resp) if is_retryable(resp.status()) && attempt < self.max_retries => {
                    retry_after(&resp)
                }
                Ok(resp) if resp.status().is_success() => return Ok(resp),
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    let body = resp.text().await.unwrap_or_default();
                    return Err(Error::HttpStatus {
                        url: redact(url),
                        status,
                        body: truncate(body),
                    });
                }
                Err(e) if (e.is_connect() || e.is_timeout()) && attempt < self.max_retries => None,
                Err(e) => return Err(Error::http(format!("GET {} failed", redact(url)), e)),
            };

            attempt += 1;
            let wait = retry_after
                .unwrap_or_else(|| self.backoff.saturating_mul(1 << (attempt - 1).min(16)))
                .min(MAX_BACKOFF);
            warn!(
                url = %redact(url),
                retry = attempt,
                wait_ms = wait.as_millis() as u64,
                "request failed, backing off"
            );

            tokio::select! {
                biased;
                cause = ctx.cancelled() => return Err(Error::cancelled(STAGE, cause)),
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }

    /// GET `url` and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        ctx: &RunContext,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<T> {
        let resp = self.get(ctx, url, headers).await?;
        let body = ctx
            .run(STAGE, async {
                resp.bytes()
                    .await
                    .map_err(|e| Error::http(format!("reading body of {}", redact(url)), e))
            })
            .await?;
        debug!(url = %redact(url), bytes = body.len(), "decoded response");
        serde_json::from_slice(&body)
            .map_err(|e| Error::http(format!("invalid JSON from {}", redact(url)), e))
    }

    /// GET `url` and return the raw body.
    pub async fn get_bytes(
        &self,
        ctx: &RunContext,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<Vec<u8>> {
        let resp = self.get(ctx, url, headers).await?;
        ctx.run(STAGE, async {
            resp.bytes()
                .await
                .map(|b| b.to_vec())
                .map_err(|e| Error::http(format!("reading body of {}", redact(url)), e))
        })
        .await
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn retry_after(resp: &reqwest::Response) -> Option<Duration> {
    resp.headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn truncate(mut body: String) -> String {
    if body.len() > MAX_BODY_IN_ERROR {
        let mut end = MAX_BODY_IN_ERROR;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
        body.push_str("...");
    }
    body
}

/// Mask credentials carried in query parameters.
pub fn redact(raw: &str) -> String {
    let Ok(mut url) = url::Url::parse(raw) else {
        return raw.to_string();
    };
    if url.query().is_none() {
        return url.to_string();
    }
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let value = if SECRET_PARAMS.contains(&k.as_ref()) {
                "***".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), value)
        })
        .collect();
    url.query_pairs_mut().clear().extend_pairs(pairs);
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_masks_api_key() {
        let out = redact("https://api.themoviedb.org/3/movie/1?api_key=secret&language=en-US");
        assert!(!out.contains("secret"));
        assert!(out.contains("language=en-US"));
    }

    #[test]
    fn redact_leaves_plain_urls() {
        assert_eq!(
            redact("http://plex.local:32400/library/sections"),
            "http://plex.local:32400/library/sections"
        );
        assert_eq!(redact("not a url"), "not a url");
    }

    #[test]
    fn truncate_long_bodies() {
        let body = "x".repeat(1000);
        let out = truncate(body);
        assert_eq!(out.len(), MAX_BODY_IN_ERROR + 3);
        assert_eq!(truncate("short".into()), "short");
    }

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable(StatusCode::NOT_FOUND));
        assert!(!is_retryable(StatusCode::UNAUTHORIZED));
    }
}
