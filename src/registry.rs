//! Service registry.
//!
//! Assembles the media services and rating services a run works with. Rating
//! services are kept in registration order, which is also the order the
//! rating resolver queries them in.

use std::sync::Arc;

use tracing::info;

use posterforge_common::{Config, RatingName, Result};

use crate::http::HttpClient;
use crate::media::MediaService;
use crate::plex::PlexClient;
use crate::ratings::{ImdbLogo, RatingService, RottenTomatoesLogo, TmdbLogo, TmdbPlatform};

#[derive(Debug)]
pub struct ServiceRegistry {
    media_services: Vec<MediaService>,
    rating_services: Vec<RatingService>,
}

impl ServiceRegistry {
    pub fn new(media_services: Vec<MediaService>, rating_services: Vec<RatingService>) -> Self {
        Self {
            media_services,
            rating_services,
        }
    }

    /// Build every service the configuration enables. Fails on the first
    /// handle that cannot be constructed.
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = Arc::new(HttpClient::new(&config.http_client)?);

        let mut media_services = Vec::new();
        if config.plex.enabled {
            let plex = Arc::new(PlexClient::new(&config.plex, http.clone())?);
            media_services.push(MediaService::from_backend(
                "plex",
                plex,
                config.plex.libraries.clone(),
            ));
        }

        let logos = &config.assets.logos_dir;
        let mut rating_services = vec![
            RatingService::logo_only(RatingName::Imdb, Arc::new(ImdbLogo::new(logos))),
            RatingService::logo_only(
                RatingName::RottenTomatoes,
                Arc::new(RottenTomatoesLogo::new(logos)),
            ),
        ];

        let tmdb_logo = Arc::new(TmdbLogo::new(logos));
        if config.tmdb.enabled {
            let platform = TmdbPlatform::new(&config.tmdb, http)?;
            rating_services.push(RatingService {
                name: RatingName::Tmdb,
                platform: Some(Arc::new(platform)),
                logo: Some(tmdb_logo),
            });
        } else {
            rating_services.push(RatingService::logo_only(RatingName::Tmdb, tmdb_logo));
        }

        info!(
            media_services = media_services.len(),
            rating_platforms = rating_services.iter().filter(|s| s.platform.is_some()).count(),
            "service registry initialised"
        );

        Ok(Self::new(media_services, rating_services))
    }

    pub fn media_services(&self) -> &[MediaService] {
        &self.media_services
    }

    pub fn rating_services(&self) -> &[RatingService] {
        &self.rating_services
    }
}
