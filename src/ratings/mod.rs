//! Rating services.
//!
//! Like media services, a rating service is a capability pair: a
//! [`RatingPlatform`] that fetches scores for an item and a [`LogoProvider`]
//! that turns scores into badges. Providers whose scores already arrive with
//! the media server register only a logo.

mod logo;
mod tmdb;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use posterforge_common::{Item, Rating, RatingName, RatingSet, Result, RunContext};

pub use logo::{format_decimal, format_percent, is_low_score, ImdbLogo, RottenTomatoesLogo, TmdbLogo};
pub use tmdb::TmdbPlatform;

/// Fetches ratings for an item from an external provider.
#[async_trait]
pub trait RatingPlatform: Send + Sync {
    async fn get_rating(&self, ctx: &RunContext, item: &Item) -> Result<Vec<Rating>>;
}

/// Produces badge specs for the ratings of one provider.
pub trait LogoProvider: Send + Sync {
    fn logos(&self, ratings: &RatingSet) -> Vec<LogoSpec>;
}

/// One badge: a logo image and the score text drawn beside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoSpec {
    pub image_path: PathBuf,
    pub text: String,
}

#[derive(Clone)]
pub struct RatingService {
    pub name: RatingName,
    pub platform: Option<Arc<dyn RatingPlatform>>,
    pub logo: Option<Arc<dyn LogoProvider>>,
}

impl RatingService {
    pub fn logo_only(name: RatingName, logo: Arc<dyn LogoProvider>) -> Self {
        Self {
            name,
            platform: None,
            logo: Some(logo),
        }
    }
}

impl std::fmt::Debug for RatingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RatingService")
            .field("name", &self.name)
            .field("platform", &self.platform.is_some())
            .field("logo", &self.logo.is_some())
            .finish()
    }
}
