//! Domain types shared by the media-service clients, rating providers and
//! the processing pipeline.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

// ---------------------------------------------------------------------------
// Libraries
// ---------------------------------------------------------------------------

/// A library as reported by the media server.
///
/// Identity is the `(media service, id)` pair; the value only lives for one
/// run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Library {
    pub id: String,
    pub name: String,
    pub library_type: String,
    pub language: String,
}

// ---------------------------------------------------------------------------
// Ratings
// ---------------------------------------------------------------------------

/// Rating provider names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RatingName {
    #[serde(rename = "IMDB")]
    Imdb,
    #[serde(rename = "RottenTomatoes")]
    RottenTomatoes,
    #[serde(rename = "TMDB")]
    Tmdb,
}

impl fmt::Display for RatingName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RatingName::Imdb => f.write_str("IMDB"),
            RatingName::RottenTomatoes => f.write_str("RottenTomatoes"),
            RatingName::Tmdb => f.write_str("TMDB"),
        }
    }
}

impl std::str::FromStr for RatingName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "imdb" => Ok(Self::Imdb),
            "rottentomatoes" | "rotten_tomatoes" | "rt" => Ok(Self::RottenTomatoes),
            "tmdb" | "themoviedb" => Ok(Self::Tmdb),
            _ => Err(Error::internal(format!("unknown rating provider: {s}"))),
        }
    }
}

/// Who produced a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingType {
    Critic,
    Audience,
    User,
}

impl fmt::Display for RatingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RatingType::Critic => f.write_str("critic"),
            RatingType::Audience => f.write_str("audience"),
            RatingType::User => f.write_str("user"),
        }
    }
}

/// A single score on a 0-10 scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rating {
    pub name: RatingName,
    pub rating_type: RatingType,
    pub score: f64,
}

impl Rating {
    /// Build a rating, clamping the score into `[0, 10]`.
    pub fn new(name: RatingName, rating_type: RatingType, score: f64) -> Self {
        Self {
            name,
            rating_type,
            score: score.clamp(0.0, 10.0),
        }
    }
}

/// Ratings of one item, unique per `(provider, type)`.
///
/// Iteration order is stable (provider, then type) so composited posters are
/// reproducible.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatingSet {
    entries: BTreeMap<(RatingName, RatingType), f64>,
}

impl RatingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a rating unless one with the same `(provider, type)` exists or
    /// its score is not a number.
    ///
    /// Returns `true` when the rating was added.
    pub fn insert(&mut self, rating: Rating) -> bool {
        if !rating.score.is_finite() {
            return false;
        }
        let key = (rating.name, rating.rating_type);
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, rating.score);
        true
    }

    /// Whether any rating from `name` is present.
    pub fn has_provider(&self, name: RatingName) -> bool {
        self.entries.keys().any(|(n, _)| *n == name)
    }

    pub fn get(&self, name: RatingName, rating_type: RatingType) -> Option<Rating> {
        self.entries
            .get(&(name, rating_type))
            .map(|score| Rating {
                name,
                rating_type,
                score: *score,
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = Rating> + '_ {
        self.entries
            .iter()
            .map(|((name, rating_type), score)| Rating {
                name: *name,
                rating_type: *rating_type,
                score: *score,
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<Rating> for RatingSet {
    fn from_iter<I: IntoIterator<Item = Rating>>(iter: I) -> Self {
        let mut set = RatingSet::new();
        for rating in iter {
            set.insert(rating);
        }
        set
    }
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// Kind of media item reported by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemType {
    Movie,
    Show,
    Other(String),
}

impl From<&str> for ItemType {
    fn from(s: &str) -> Self {
        match s {
            "movie" => ItemType::Movie,
            "show" => ItemType::Show,
            other => ItemType::Other(other.to_string()),
        }
    }
}

/// One on-disk media file belonging to an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub path: PathBuf,
}

/// A single movie; the unit of work.
#[derive(Debug, Clone)]
pub struct Item {
    /// Server-side identifier, unique within its library.
    pub id: String,
    pub guid: String,
    pub title: String,
    pub item_type: ItemType,
    pub year: Option<u32>,
    pub ratings: RatingSet,
    pub added_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Server-relative URL of the current poster.
    pub poster_url: Option<String>,
    pub media_files: Vec<MediaFile>,
    /// External ids keyed by provider scheme (`imdb`, `tmdb`, `tvdb`).
    pub external_ids: BTreeMap<String, String>,
    /// Computed once when the item is retrieved.
    pub is_eligible: bool,
}

impl Item {
    /// A movie with no ratings, media files or ids; handy for building
    /// items field by field.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            guid: String::new(),
            title: title.into(),
            item_type: ItemType::Movie,
            year: None,
            ratings: RatingSet::new(),
            added_at: None,
            updated_at: None,
            poster_url: None,
            media_files: Vec::new(),
            external_ids: BTreeMap::new(),
            is_eligible: true,
            id,
        }
    }

    pub fn external_id(&self, scheme: &str) -> Option<&str> {
        self.external_ids.get(scheme).map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Outcome of one attempted item, success or failure.
///
/// Failed results keep whatever paths were computed before the failing stage.
#[derive(Debug)]
pub struct PosterResult {
    pub title: String,
    pub original_path: Option<PathBuf>,
    pub overlay_path: Option<PathBuf>,
    pub error: Option<Error>,
}

impl PosterResult {
    pub fn failed(title: impl Into<String>, error: Error) -> Self {
        Self {
            title: title.into(),
            original_path: None,
            overlay_path: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
