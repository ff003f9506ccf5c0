//! TMDB (The Movie Database) rating platform.
//!
//! Resolves the TMDB movie id from the item's external ids (tmdb, then imdb
//! via `/find`), falling back to a title/year search, and returns the
//! community `vote_average` as a TMDB audience rating. Requests are rate
//! limited with a token bucket via [`governor`].

use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use serde::Deserialize;
use tracing::debug;

use posterforge_common::config::TmdbConfig;
use posterforge_common::{Error, Item, Rating, RatingName, RatingType, Result, RunContext};

use super::RatingPlatform;
use crate::http::HttpClient;

// ---------------------------------------------------------------------------
// TMDB API response types (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<MovieRef>,
}

#[derive(Debug, Deserialize)]
struct FindResponse {
    #[serde(default)]
    movie_results: Vec<MovieRef>,
}

#[derive(Debug, Deserialize)]
struct MovieRef {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct MovieDetail {
    #[serde(default)]
    vote_average: f64,
    #[serde(default)]
    vote_count: u64,
}

// ---------------------------------------------------------------------------
// Platform implementation
// ---------------------------------------------------------------------------

pub struct TmdbPlatform {
    http: Arc<HttpClient>,
    base_url: String,
    api_key: String,
    language: String,
    region: String,
    rate_limiter: governor::RateLimiter<
        governor::state::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl TmdbPlatform {
    pub fn new(config: &TmdbConfig, http: Arc<HttpClient>) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(Error::service_init("tmdb", "api key is empty"));
        }
        let rps = NonZeroU32::new(config.requests_per_second)
            .ok_or_else(|| Error::service_init("tmdb", "requests_per_second must be positive"))?;
        url::Url::parse(&config.base_url).map_err(|e| Error::service_init("tmdb", e))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            language: config.language.clone(),
            region: config.region.clone(),
            rate_limiter: RateLimiter::direct(Quota::per_second(rps)),
        })
    }

    /// Full API URL with the key, language and any extra parameters.
    fn url(&self, path: &str, extra: &[(&str, &str)]) -> Result<String> {
        let mut url = url::Url::parse(&format!("{}{path}", self.base_url))
            .map_err(|e| Error::internal(format!("bad tmdb url for {path}: {e}")))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("api_key", &self.api_key);
            if !self.language.is_empty() {
                query.append_pair("language", &self.language);
            }
            for (key, value) in extra {
                query.append_pair(key, value);
            }
        }
        Ok(url.to_string())
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, ctx: &RunContext, url: &str) -> Result<T> {
        ctx.run("tmdb-rate-limit", async {
            self.rate_limiter.until_ready().await;
            Ok(())
        })
        .await?;
        self.http.get_json(ctx, url, &[]).await
    }

    /// The TMDB movie id for `item`, if one can be found.
    async fn movie_id(&self, ctx: &RunContext, item: &Item) -> Result<Option<u64>> {
        if let Some(id) = item.external_id("tmdb").and_then(|id| id.parse().ok()) {
            return Ok(Some(id));
        }

        if let Some(imdb) = item.external_id("imdb") {
            let url = self.url(&format!("/find/{imdb}"), &[("external_source", "imdb_id")])?;
            let found: FindResponse = self.get(ctx, &url).await?;
            if let Some(movie) = found.movie_results.first() {
                return Ok(Some(movie.id));
            }
        }

        if item.title.is_empty() {
            return Ok(None);
        }
        let year = item.year.map(|y| y.to_string());
        let mut params = vec![("query", item.title.as_str())];
        if let Some(year) = year.as_deref() {
            params.push(("year", year));
        }
        if !self.region.is_empty() {
            params.push(("region", self.region.as_str()));
        }
        let url = self.url("/search/movie", &params)?;
        let search: SearchResponse = self.get(ctx, &url).await?;
        Ok(search.results.first().map(|m| m.id))
    }
}

#[async_trait]
impl RatingPlatform for TmdbPlatform {
    async fn get_rating(&self, ctx: &RunContext, item: &Item) -> Result<Vec<Rating>> {
        let Some(id) = self.movie_id(ctx, item).await? else {
            debug!(title = %item.title, "no TMDB match");
            return Ok(Vec::new());
        };

        let url = self.url(&format!("/movie/{id}"), &[])?;
        let detail: MovieDetail = self.get(ctx, &url).await?;
        if detail.vote_count == 0 || !detail.vote_average.is_finite() {
            debug!(title = %item.title, tmdb_id = id, "TMDB movie has no votes");
            return Ok(Vec::new());
        }

        Ok(vec![Rating::new(
            RatingName::Tmdb,
            RatingType::Audience,
            detail.vote_average,
        )])
    }
}
