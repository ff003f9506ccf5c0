//! Media-service capabilities.
//!
//! A media service is a capability set rather than a type hierarchy: any
//! backend provides some of `libraries`, `items` and `posters`, and the
//! library processor refuses to run when one of them is missing.

pub mod poster_files;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use posterforge_common::config::LibraryConfig;
use posterforge_common::{Item, Library, Result, RunContext};

/// Lists libraries and asks the server to rescan them.
#[async_trait]
pub trait LibraryService: Send + Sync {
    async fn get_libraries(&self, ctx: &RunContext) -> Result<Vec<Library>>;

    async fn refresh_library(&self, ctx: &RunContext, library_id: &str, force: bool) -> Result<()>;
}

/// Fetches the items of one library, applying the configured filters.
#[async_trait]
pub trait ItemService: Send + Sync {
    async fn get_items(
        &self,
        ctx: &RunContext,
        library: &Library,
        config: &LibraryConfig,
    ) -> Result<Vec<Item>>;
}

/// Places original posters on disk beside the media.
#[async_trait]
pub trait PosterService: Send + Sync {
    /// Make sure the original poster exists on disk, downloading it if
    /// needed. Idempotent. Returns its path.
    async fn ensure_poster_exists(
        &self,
        ctx: &RunContext,
        item: &Item,
        config: &LibraryConfig,
    ) -> Result<PathBuf>;

    /// Absolute path of the original poster already on disk.
    fn poster_disk_position(&self, item: &Item, config: &LibraryConfig) -> Result<PathBuf>;
}

/// A registered media service and its library settings.
#[derive(Clone)]
pub struct MediaService {
    pub name: String,
    pub libraries: Option<Arc<dyn LibraryService>>,
    pub items: Option<Arc<dyn ItemService>>,
    pub posters: Option<Arc<dyn PosterService>>,
    /// Every configured library, disabled ones included.
    pub library_configs: Vec<LibraryConfig>,
}

impl MediaService {
    /// Register one backend that provides all three capabilities.
    pub fn from_backend<B>(name: impl Into<String>, backend: Arc<B>, library_configs: Vec<LibraryConfig>) -> Self
    where
        B: LibraryService + ItemService + PosterService + 'static,
    {
        Self {
            name: name.into(),
            libraries: Some(backend.clone()),
            items: Some(backend.clone()),
            posters: Some(backend),
            library_configs,
        }
    }
}

impl std::fmt::Debug for MediaService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaService")
            .field("name", &self.name)
            .field("libraries", &self.libraries.is_some())
            .field("items", &self.items.is_some())
            .field("posters", &self.posters.is_some())
            .field("library_configs", &self.library_configs.len())
            .finish()
    }
}
