//! Scoped driver for one library.

use std::time::Duration;

use tracing::info;

use posterforge_common::config::LibraryConfig;
use posterforge_common::{Error, Handle, Library, Result, RunContext};

use super::item::{ItemProcessor, ProcessingSummary};
use super::stage;
use crate::media::MediaService;

/// How a library run ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryOutcome {
    /// Disabled in config; nothing was fetched.
    Disabled,
    /// The server returned no items.
    Empty,
    Processed(ProcessingSummary),
}

pub struct LibraryProcessor {
    items: ItemProcessor,
    default_timeout: Duration,
}

impl LibraryProcessor {
    pub fn new(items: ItemProcessor, default_timeout: Duration) -> Self {
        Self {
            items,
            default_timeout,
        }
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Fetch and process the items of the library named by `config`.
    ///
    /// Runs under a child of `parent` whose deadline is the earlier of the
    /// parent's and `default_timeout` from now.
    pub async fn process_library(
        &self,
        parent: &RunContext,
        config: &LibraryConfig,
        available: &[Library],
        media: &MediaService,
    ) -> Result<LibraryOutcome> {
        let ctx = parent.child_with_timeout(self.default_timeout);

        let libraries = media
            .libraries
            .as_ref()
            .ok_or(Error::HandleMissing(Handle::Libraries))?;
        let items = media
            .items
            .as_ref()
            .ok_or(Error::HandleMissing(Handle::Items))?;
        let posters = media
            .posters
            .as_ref()
            .ok_or(Error::HandleMissing(Handle::Posters))?;

        if !config.enabled {
            info!(library = %config.name, "library disabled, skipping");
            return Ok(LibraryOutcome::Disabled);
        }

        let library = available
            .iter()
            .find(|l| l.name == config.name)
            .ok_or_else(|| Error::LibraryNotFound(config.name.clone()))?;

        let fetched = ctx
            .run(stage::ITEMS, items.get_items(&ctx, library, config))
            .await
            .map_err(|e| match e {
                Error::Cancelled { .. } => e,
                other => Error::ItemsRetrieval {
                    library: config.name.clone(),
                    source: Box::new(other),
                },
            })?;

        if fetched.is_empty() {
            info!(library = %config.name, "library has no items");
            return Ok(LibraryOutcome::Empty);
        }
        info!(library = %config.name, items = fetched.len(), "processing library");

        let mut processor = self.items.clone();
        processor.set_posters(posters.clone());
        let summary = processor.process_items(&ctx, fetched, config).await?;

        if config.refresh {
            ctx.run(stage::REFRESH, libraries.refresh_library(&ctx, &library.id, true))
                .await
                .map_err(|e| match e {
                    Error::Cancelled { .. } => e,
                    other => Error::Refresh {
                        library: config.name.clone(),
                        source: Box::new(other),
                    },
                })?;
        }

        Ok(LibraryOutcome::Processed(summary))
    }
}
