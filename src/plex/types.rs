//! Plex JSON response shapes and their mapping to domain types.

use std::path::PathBuf;

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

use posterforge_common::{Item, ItemType, Library, MediaFile, Rating, RatingName, RatingType};

#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    #[serde(rename = "MediaContainer")]
    pub media_container: T,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct SectionsContainer {
    #[serde(rename = "Directory")]
    pub directories: Vec<Section>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Section {
    pub key: String,
    pub title: String,
    #[serde(rename = "type")]
    pub section_type: String,
    pub language: String,
}

impl From<Section> for Library {
    fn from(s: Section) -> Self {
        Library {
            id: s.key,
            name: s.title,
            library_type: s.section_type,
            language: s.language,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct MetadataContainer {
    #[serde(rename = "Metadata")]
    pub metadata: Vec<Metadata>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct Metadata {
    pub rating_key: String,
    pub guid: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub year: Option<u32>,
    pub added_at: Option<i64>,
    pub updated_at: Option<i64>,
    pub thumb: Option<String>,
    #[serde(rename = "Media")]
    pub media: Vec<Media>,
    #[serde(rename = "Guid")]
    pub guids: Vec<GuidRef>,
    #[serde(rename = "Rating")]
    pub ratings: Vec<PlexRating>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Media {
    #[serde(rename = "Part")]
    pub parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Part {
    pub file: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct GuidRef {
    pub id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct PlexRating {
    pub image: String,
    pub value: f64,
}

/// Provider and type for a Plex rating image URI.
pub(crate) fn rating_kind(image: &str) -> Option<(RatingName, RatingType)> {
    match image {
        "imdb://image.rating" => Some((RatingName::Imdb, RatingType::Audience)),
        "rottentomatoes://image.rating.ripe" | "rottentomatoes://image.rating.rotten" => {
            Some((RatingName::RottenTomatoes, RatingType::Critic))
        }
        "rottentomatoes://image.rating.upright" | "rottentomatoes://image.rating.spilled" => {
            Some((RatingName::RottenTomatoes, RatingType::Audience))
        }
        "themoviedb://image.rating" => Some((RatingName::Tmdb, RatingType::Audience)),
        _ => None,
    }
}

fn timestamp(secs: Option<i64>) -> Option<DateTime<Utc>> {
    secs.and_then(|s| Utc.timestamp_opt(s, 0).single())
}

impl Metadata {
    pub(crate) fn into_item(self) -> Item {
        let mut item = Item::new(self.rating_key, self.title);
        item.guid = self.guid;
        item.item_type = ItemType::from(self.kind.as_str());
        item.year = self.year;
        item.added_at = timestamp(self.added_at);
        item.updated_at = timestamp(self.updated_at);
        item.poster_url = self.thumb.filter(|t| !t.is_empty());

        item.media_files = self
            .media
            .into_iter()
            .flat_map(|m| m.parts)
            .filter_map(|p| p.file)
            .filter(|f| !f.is_empty())
            .map(|f| MediaFile {
                path: PathBuf::from(f),
            })
            .collect();

        for guid in self.guids {
            if let Some((scheme, id)) = guid.id.split_once("://") {
                item.external_ids.insert(scheme.to_string(), id.to_string());
            }
        }

        for rating in self.ratings {
            match rating_kind(&rating.image) {
                Some(_) if !rating.value.is_finite() => {
                    tracing::debug!(image = %rating.image, "ignoring non-numeric rating")
                }
                Some((name, rating_type)) => {
                    item.ratings.insert(Rating::new(name, rating_type, rating.value));
                }
                None => tracing::trace!(image = %rating.image, "ignoring unknown rating source"),
            }
        }

        item.is_eligible = item.item_type == ItemType::Movie && !item.media_files.is_empty();
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const METADATA: &str = r#"{
        "MediaContainer": {
            "Metadata": [{
                "ratingKey": "42",
                "guid": "plex://movie/5d776",
                "title": "Heat",
                "type": "movie",
                "year": 1995,
                "addedAt": 1700000000,
                "thumb": "/library/metadata/42/thumb/1700000000",
                "Media": [{"Part": [{"file": "/media/movies/Heat (1995)/Heat (1995).mkv"}]}],
                "Guid": [{"id": "imdb://tt0113277"}, {"id": "tmdb://949"}],
                "Rating": [
                    {"image": "imdb://image.rating", "value": 8.3, "type": "audience"},
                    {"image": "rottentomatoes://image.rating.ripe", "value": 8.4, "type": "critic"},
                    {"image": "rottentomatoes://image.rating.upright", "value": 9.4, "type": "audience"},
                    {"image": "letterboxd://image.rating", "value": 4.1, "type": "audience"}
                ]
            }]
        }
    }"#;

    #[test]
    fn metadata_maps_to_item() {
        let env: Envelope<MetadataContainer> = serde_json::from_str(METADATA).unwrap();
        let item = env.media_container.metadata.into_iter().next().unwrap().into_item();

        assert_eq!(item.id, "42");
        assert_eq!(item.title, "Heat");
        assert_eq!(item.year, Some(1995));
        assert_eq!(item.item_type, ItemType::Movie);
        assert_eq!(item.added_at.unwrap().timestamp(), 1_700_000_000);
        assert!(item.updated_at.is_none());
        assert_eq!(
            item.media_files[0].path,
            PathBuf::from("/media/movies/Heat (1995)/Heat (1995).mkv")
        );
        assert_eq!(item.external_id("imdb"), Some("tt0113277"));
        assert_eq!(item.external_id("tmdb"), Some("949"));
        assert_eq!(item.ratings.len(), 3);
        assert!(item
            .ratings
            .get(RatingName::RottenTomatoes, RatingType::Critic)
            .is_some());
        assert!(item.is_eligible);
    }

    #[test]
    fn items_without_media_or_not_movies_are_ineligible() {
        let no_media = Metadata {
            rating_key: "1".into(),
            kind: "movie".into(),
            ..Metadata::default()
        };
        assert!(!no_media.into_item().is_eligible);

        let show = Metadata {
            rating_key: "2".into(),
            kind: "show".into(),
            media: vec![Media {
                parts: vec![Part {
                    file: Some("/tv/x.mkv".into()),
                }],
            }],
            ..Metadata::default()
        };
        assert!(!show.into_item().is_eligible);
    }

    #[test]
    fn rating_images_map_to_providers() {
        assert_eq!(
            rating_kind("rottentomatoes://image.rating.spilled"),
            Some((RatingName::RottenTomatoes, RatingType::Audience))
        );
        assert_eq!(
            rating_kind("themoviedb://image.rating"),
            Some((RatingName::Tmdb, RatingType::Audience))
        );
        assert_eq!(rating_kind("imdb://image.rating.other"), None);
    }

    #[test]
    fn sections_map_to_libraries() {
        let json = r#"{"MediaContainer": {"Directory": [
            {"key": "1", "title": "Movies", "type": "movie", "language": "en-US"}
        ]}}"#;
        let env: Envelope<SectionsContainer> = serde_json::from_str(json).unwrap();
        let libs: Vec<Library> = env.media_container.directories.into_iter().map(Library::from).collect();
        assert_eq!(libs[0].id, "1");
        assert_eq!(libs[0].name, "Movies");
    }
}
