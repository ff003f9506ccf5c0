//! Shared fakes for integration tests.
//!
//! [`FakeMedia`] serves libraries and items from memory and writes original
//! posters as real PNGs under a temp dir; [`FakePlatform`] counts rating
//! calls; [`TrackingCompositor`] records how many compositions overlap.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use posterforge::media::{poster_files, ItemService, LibraryService, MediaService, PosterService};
use posterforge::processor::{
    EligibilityFilter, ItemProcessor, LibraryProcessor, PosterCompositor, RatingBuilder,
    WorkerBudget,
};
use posterforge::ratings::{RatingPlatform, RatingService};
use posterforge_common::config::LibraryConfig;
use posterforge_common::{
    Error, Item, Library, MediaFile, Rating, RatingName, RatingType, Result, RunContext,
};

pub fn library(id: &str, name: &str) -> Library {
    Library {
        id: id.into(),
        name: name.into(),
        library_type: "movie".into(),
        language: "en".into(),
    }
}

pub fn library_config(name: &str, path: &Path) -> LibraryConfig {
    LibraryConfig {
        name: name.into(),
        path: path.to_path_buf(),
        ..LibraryConfig::default()
    }
}

/// A movie with one media file at `<root>/<title>/<title>.mkv`.
pub fn movie(id: &str, title: &str, root: &Path) -> Item {
    let mut item = Item::new(id, title);
    item.media_files.push(MediaFile {
        path: root.join(title).join(format!("{title}.mkv")),
    });
    item
}

pub fn with_rating(mut item: Item, name: RatingName, rating_type: RatingType, score: f64) -> Item {
    item.ratings.insert(Rating::new(name, rating_type, score));
    item
}

pub fn write_png(path: &Path, width: u32, height: u32, color: [u8; 4]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    image::RgbaImage::from_pixel(width, height, image::Rgba(color))
        .save(path)
        .unwrap();
}

// ---------------------------------------------------------------------------
// Media service
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeMedia {
    pub libraries: Vec<Library>,
    /// Items keyed by library id.
    pub items: HashMap<String, Vec<Item>>,
    pub items_delay: Option<Duration>,
    pub item_calls: AtomicUsize,
    pub refreshed: Mutex<Vec<String>>,
    pub ensured: Mutex<Vec<String>>,
}

impl FakeMedia {
    pub fn new(libraries: Vec<Library>) -> Self {
        Self {
            libraries,
            ..Self::default()
        }
    }

    pub fn with_items(mut self, library_id: &str, items: Vec<Item>) -> Self {
        self.items.insert(library_id.into(), items);
        self
    }

    pub fn with_items_delay(mut self, delay: Duration) -> Self {
        self.items_delay = Some(delay);
        self
    }

    pub fn service(self: &Arc<Self>, configs: Vec<LibraryConfig>) -> MediaService {
        MediaService::from_backend("fake", self.clone(), configs)
    }
}

#[async_trait]
impl LibraryService for FakeMedia {
    async fn get_libraries(&self, _ctx: &RunContext) -> Result<Vec<Library>> {
        Ok(self.libraries.clone())
    }

    async fn refresh_library(&self, _ctx: &RunContext, library_id: &str, _force: bool) -> Result<()> {
        self.refreshed.lock().push(library_id.to_string());
        Ok(())
    }
}

#[async_trait]
impl ItemService for FakeMedia {
    async fn get_items(
        &self,
        _ctx: &RunContext,
        library: &Library,
        _config: &LibraryConfig,
    ) -> Result<Vec<Item>> {
        self.item_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.items_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.items.get(&library.id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl PosterService for FakeMedia {
    async fn ensure_poster_exists(
        &self,
        _ctx: &RunContext,
        item: &Item,
        config: &LibraryConfig,
    ) -> Result<PathBuf> {
        let media = poster_files::primary_media_file(item)?;
        poster_files::ensure_under_library(media, &config.path)?;
        self.ensured.lock().push(item.title.clone());
        if let Some(existing) = poster_files::find_original(media) {
            return Ok(existing);
        }
        let target = poster_files::original_path(media, "png");
        write_png(&target, 200, 300, [200, 30, 30, 255]);
        Ok(target)
    }

    fn poster_disk_position(&self, item: &Item, config: &LibraryConfig) -> Result<PathBuf> {
        let media = poster_files::primary_media_file(item)?;
        poster_files::ensure_under_library(media, &config.path)?;
        poster_files::find_original(media).ok_or_else(|| Error::internal("original poster missing"))
    }
}

// ---------------------------------------------------------------------------
// Rating platform
// ---------------------------------------------------------------------------

pub struct FakePlatform {
    pub name: RatingName,
    pub score: f64,
    /// Titles that stall for the given time before answering.
    pub slow: Option<(String, Duration)>,
    /// Titles the provider answers with an error.
    pub failing: Vec<String>,
    pub calls: AtomicUsize,
    pub seen: Mutex<Vec<String>>,
}

impl FakePlatform {
    fn answering(name: RatingName, score: f64) -> Self {
        Self {
            name,
            score,
            slow: None,
            failing: Vec::new(),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn new(name: RatingName, score: f64) -> Arc<Self> {
        Arc::new(Self::answering(name, score))
    }

    pub fn slow_for(name: RatingName, score: f64, title: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            slow: Some((title.into(), delay)),
            ..Self::answering(name, score)
        })
    }

    pub fn failing_for(name: RatingName, score: f64, title: &str) -> Arc<Self> {
        Arc::new(Self {
            failing: vec![title.into()],
            ..Self::answering(name, score)
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn service(self: &Arc<Self>) -> RatingService {
        RatingService {
            name: self.name,
            platform: Some(self.clone()),
            logo: None,
        }
    }
}

#[async_trait]
impl RatingPlatform for FakePlatform {
    async fn get_rating(&self, _ctx: &RunContext, item: &Item) -> Result<Vec<Rating>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(item.title.clone());
        if let Some((title, delay)) = &self.slow {
            if *title == item.title {
                tokio::time::sleep(*delay).await;
            }
        }
        if self.failing.contains(&item.title) {
            return Err(Error::internal(format!("{} is unavailable", self.name)));
        }
        Ok(vec![Rating::new(self.name, RatingType::Audience, self.score)])
    }
}

// ---------------------------------------------------------------------------
// Compositor
// ---------------------------------------------------------------------------

/// Sleeps while "composing" and tracks peak overlap.
#[derive(Default)]
pub struct TrackingCompositor {
    pub work: Duration,
    pub in_flight: AtomicUsize,
    pub peak: AtomicUsize,
    pub composed: Mutex<Vec<String>>,
}

impl TrackingCompositor {
    pub fn new(work: Duration) -> Arc<Self> {
        Arc::new(Self {
            work,
            ..Self::default()
        })
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn composed(&self) -> Vec<String> {
        self.composed.lock().clone()
    }
}

#[async_trait]
impl PosterCompositor for TrackingCompositor {
    async fn compose(
        &self,
        _ctx: &RunContext,
        original: &Path,
        _library: &LibraryConfig,
        item: &Item,
    ) -> Result<PathBuf> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.work).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.composed.lock().push(item.title.clone());
        Ok(original.with_file_name(format!("{}-poster.png", item.title)))
    }
}

// ---------------------------------------------------------------------------
// Processor wiring
// ---------------------------------------------------------------------------

pub fn item_processor(
    max_threads: usize,
    services: Vec<RatingService>,
    compositor: Arc<dyn PosterCompositor>,
) -> ItemProcessor {
    item_processor_with_rating_timeout(max_threads, services, compositor, Duration::from_secs(30))
}

pub fn item_processor_with_rating_timeout(
    max_threads: usize,
    services: Vec<RatingService>,
    compositor: Arc<dyn PosterCompositor>,
    rating_timeout: Duration,
) -> ItemProcessor {
    let eligibility = EligibilityFilter::from_services(&services);
    ItemProcessor::new(
        WorkerBudget::new(max_threads),
        Arc::new(RatingBuilder::new(services, rating_timeout)),
        compositor,
        eligibility,
    )
}

pub fn library_processor(items: ItemProcessor, timeout: Duration) -> LibraryProcessor {
    LibraryProcessor::new(items, timeout)
}
