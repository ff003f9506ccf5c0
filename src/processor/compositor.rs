//! Boundary to the poster compositor.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use posterforge_common::config::{AssetsConfig, LibraryConfig, OverlayConfig, OverlayKind};
use posterforge_common::{Error, Item, RatingSet, Result, RunContext};
use posterforge_overlay::{Badge, OverlayError, OverlayRenderer, OverlayStyle};

use super::stage;
use crate::ratings::{LogoProvider, RatingService};

/// Produces the overlaid poster for an item and returns its path.
#[async_trait]
pub trait PosterCompositor: Send + Sync {
    async fn compose(
        &self,
        ctx: &RunContext,
        original: &Path,
        library: &LibraryConfig,
        item: &Item,
    ) -> Result<PathBuf>;
}

/// Renders rating badges with [`OverlayRenderer`] on the blocking pool.
pub struct OverlayCompositor {
    renderer: Arc<OverlayRenderer>,
    logos: Vec<Arc<dyn LogoProvider>>,
}

impl std::fmt::Debug for OverlayCompositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayCompositor")
            .field("has_font", &self.renderer.has_font())
            .field("logos", &self.logos.len())
            .finish()
    }
}

impl OverlayCompositor {
    pub fn new(renderer: OverlayRenderer, services: &[RatingService]) -> Self {
        Self {
            renderer: Arc::new(renderer),
            logos: services.iter().filter_map(|s| s.logo.clone()).collect(),
        }
    }

    /// Load the configured font, if any.
    pub fn from_config(assets: &AssetsConfig, services: &[RatingService]) -> Result<Self> {
        let renderer = match &assets.font_path {
            Some(path) => OverlayRenderer::from_font_file(path)
                .map_err(|e| Error::service_init("compositor", format!("{}: {e}", path.display())))?,
            None => {
                tracing::warn!("no font configured, badges will be drawn without score text");
                OverlayRenderer::new()
            }
        };
        Ok(Self::new(renderer, services))
    }

    /// Badges for `ratings`, in rating-service order.
    pub fn badges(&self, ratings: &RatingSet) -> Vec<Badge> {
        self.logos
            .iter()
            .flat_map(|logo| logo.logos(ratings))
            .map(|spec| Badge {
                logo_path: spec.image_path,
                text: spec.text,
            })
            .collect()
    }
}

#[async_trait]
impl PosterCompositor for OverlayCompositor {
    async fn compose(
        &self,
        ctx: &RunContext,
        original: &Path,
        library: &LibraryConfig,
        item: &Item,
    ) -> Result<PathBuf> {
        let badges = self.badges(&item.ratings);
        let style = overlay_style(&library.overlay);
        let renderer = self.renderer.clone();
        let original = original.to_path_buf();

        let task = tokio::task::spawn_blocking(move || renderer.compose(&original, &style, &badges));
        let rendered = ctx
            .run(stage::COMPOSE, async {
                task.await
                    .map_err(|e| Error::internal(format!("compositor task failed: {e}")))
            })
            .await?;
        rendered.map_err(overlay_error)
    }
}

pub fn overlay_style(config: &OverlayConfig) -> OverlayStyle {
    OverlayStyle {
        kind: match config.kind {
            OverlayKind::Frame => posterforge_overlay::OverlayKind::Frame,
            OverlayKind::Bar => posterforge_overlay::OverlayKind::Bar,
        },
        height: config.height,
        transparency: config.transparency,
    }
}

fn overlay_error(err: OverlayError) -> Error {
    match err {
        OverlayError::Backup { path, source } => Error::Backup { path, source },
        OverlayError::Io(e) => Error::Io(e),
        other => Error::Image(other.to_string()),
    }
}
