use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};
use url::Url;

use posterforge_common::config::{LibraryConfig, PlexConfig};
use posterforge_common::filters;
use posterforge_common::{Error, Item, Library, Result, RunContext};

use super::types::{Envelope, MetadataContainer, SectionsContainer};
use crate::http::HttpClient;
use crate::media::poster_files;
use crate::media::{ItemService, LibraryService, PosterService};

const TOKEN_HEADER: &str = "X-Plex-Token";
const MOVIE_TYPE: &str = "1";

/// Client for one Plex server.
///
/// Implements all three media capabilities: listing and refreshing library
/// sections, fetching movies, and placing original posters on disk.
pub struct PlexClient {
    base_url: Url,
    token: String,
    http: Arc<HttpClient>,
}

impl PlexClient {
    pub fn new(config: &PlexConfig, http: Arc<HttpClient>) -> Result<Self> {
        let base_url = Url::parse(&config.url).map_err(|e| Error::service_init("plex", e))?;
        if config.token.is_empty() {
            return Err(Error::service_init("plex", "token is empty"));
        }
        Ok(Self {
            base_url,
            token: config.token.clone(),
            http,
        })
    }

    fn url(&self, path: &str, params: &[(String, String)]) -> Result<String> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let mut url = Url::parse(&format!("{base}{path}"))
            .map_err(|e| Error::internal(format!("bad plex url for {path}: {e}")))?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url.to_string())
    }

    fn headers(&self) -> [(&str, &str); 2] {
        [(TOKEN_HEADER, self.token.as_str()), ("Accept", "application/json")]
    }
}

#[async_trait]
impl LibraryService for PlexClient {
    async fn get_libraries(&self, ctx: &RunContext) -> Result<Vec<Library>> {
        let url = self.url("/library/sections", &[])?;
        let body: Envelope<SectionsContainer> =
            self.http.get_json(ctx, &url, &self.headers()).await?;
        let libraries: Vec<Library> = body
            .media_container
            .directories
            .into_iter()
            .map(Library::from)
            .collect();
        debug!(count = libraries.len(), "fetched plex libraries");
        Ok(libraries)
    }

    async fn refresh_library(&self, ctx: &RunContext, library_id: &str, force: bool) -> Result<()> {
        let params = if force {
            vec![("force".to_string(), "1".to_string())]
        } else {
            Vec::new()
        };
        let url = self.url(&format!("/library/sections/{library_id}/refresh"), &params)?;
        self.http.get(ctx, &url, &self.headers()).await?;
        info!(library_id, force, "requested plex library refresh");
        Ok(())
    }
}

#[async_trait]
impl ItemService for PlexClient {
    async fn get_items(
        &self,
        ctx: &RunContext,
        library: &Library,
        config: &LibraryConfig,
    ) -> Result<Vec<Item>> {
        let mut params = vec![
            ("type".to_string(), MOVIE_TYPE.to_string()),
            ("includeGuids".to_string(), "1".to_string()),
        ];
        params.extend(filters::query_pairs(&config.filters, Utc::now()));

        let url = self.url(&format!("/library/sections/{}/all", library.id), &params)?;
        let body: Envelope<MetadataContainer> =
            self.http.get_json(ctx, &url, &self.headers()).await?;

        let items: Vec<Item> = body
            .media_container
            .metadata
            .into_iter()
            .map(|m| m.into_item())
            .collect();
        debug!(library = %library.name, count = items.len(), "fetched plex items");
        Ok(items)
    }
}

#[async_trait]
impl PosterService for PlexClient {
    async fn ensure_poster_exists(
        &self,
        ctx: &RunContext,
        item: &Item,
        config: &LibraryConfig,
    ) -> Result<PathBuf> {
        let media = poster_files::primary_media_file(item)?;
        poster_files::ensure_under_library(media, &config.path)?;

        if let Some(existing) = poster_files::find_original(media) {
            return Ok(existing);
        }

        let thumb = item
            .poster_url
            .as_deref()
            .ok_or_else(|| Error::MissingMedia(item.title.clone()))?;
        let url = if thumb.starts_with("http://") || thumb.starts_with("https://") {
            thumb.to_string()
        } else {
            self.url(thumb, &[])?
        };
        let bytes = self.http.get_bytes(ctx, &url, &self.headers()).await?;
        let ext = poster_files::detect_extension(&bytes)?;

        let target = poster_files::original_path(media, ext);
        ctx.check("poster-save")?;
        tokio::fs::write(&target, &bytes).await?;
        debug!(title = %item.title, path = %target.display(), "downloaded original poster");
        Ok(target)
    }

    fn poster_disk_position(&self, item: &Item, config: &LibraryConfig) -> Result<PathBuf> {
        let media = poster_files::primary_media_file(item)?;
        poster_files::ensure_under_library(media, &config.path)?;
        poster_files::find_original(media).ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no original poster beside {}", media.display()),
            ))
        })
    }
}
