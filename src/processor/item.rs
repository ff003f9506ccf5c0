//! Bounded parallel processing of a library's items.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use posterforge_common::config::LibraryConfig;
use posterforge_common::{Error, Item, PosterResult, Result, RunContext};

use super::budget::WorkerBudget;
use super::compositor::PosterCompositor;
use super::eligibility::EligibilityFilter;
use super::rating_builder::RatingBuilder;
use super::stage;
use crate::media::PosterService;

/// Counts reported after a library's items have been processed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessingSummary {
    pub total: usize,
    /// Items a worker produced a result for.
    pub processed: usize,
    /// Items rejected by the eligibility filter.
    pub ineligible: usize,
    /// Processed items whose result carries an error.
    pub errors: usize,
}

/// Runs items through rating resolution and poster composition.
///
/// Cloning is cheap; the library processor clones a template per library and
/// binds that library's posters handle with [`ItemProcessor::set_posters`].
#[derive(Clone)]
pub struct ItemProcessor {
    budget: WorkerBudget,
    ratings: Arc<RatingBuilder>,
    compositor: Arc<dyn PosterCompositor>,
    eligibility: EligibilityFilter,
    posters: Option<Arc<dyn PosterService>>,
}

impl ItemProcessor {
    pub fn new(
        budget: WorkerBudget,
        ratings: Arc<RatingBuilder>,
        compositor: Arc<dyn PosterCompositor>,
        eligibility: EligibilityFilter,
    ) -> Self {
        Self {
            budget,
            ratings,
            compositor,
            eligibility,
            posters: None,
        }
    }

    pub fn set_posters(&mut self, posters: Arc<dyn PosterService>) {
        self.posters = Some(posters);
    }

    /// Process `items` concurrently within the worker budget.
    ///
    /// Per-item failures are recorded in their result and counted in the
    /// summary. The call itself fails only when a worker returns an error:
    /// a cancellation or a budget acquisition failure. The first such error
    /// cancels the remaining workers.
    pub async fn process_items(
        &self,
        ctx: &RunContext,
        items: Vec<Item>,
        library: &LibraryConfig,
    ) -> Result<ProcessingSummary> {
        let posters = self.posters.clone().ok_or(Error::PostersNotSet)?;

        let total = items.len();
        let (tx, rx) = mpsc::channel(total.max(1));
        let collector = tokio::spawn(collect_results(rx, total, library.name.clone()));

        let group = ctx.child();
        let library = Arc::new(library.clone());
        let mut workers = JoinSet::new();
        let mut ineligible = 0;
        let mut first_error = None;

        for (index, item) in items.into_iter().enumerate() {
            if let Err(err) = group.check(stage::SPAWN) {
                debug!(library = %library.name, "not spawning further workers");
                first_error = Some(err);
                break;
            }
            if !self.eligibility.is_eligible(&item) {
                ineligible += 1;
                debug!(library = %library.name, title = %item.title, "item not eligible");
                continue;
            }

            let worker = self.clone();
            let posters = posters.clone();
            let tx = tx.clone();
            let ctx = group.clone();
            let library = library.clone();
            workers.spawn(async move { worker.run_worker(ctx, item, index, posters, tx, library).await });
        }
        drop(tx);

        while let Some(joined) = workers.join_next().await {
            let outcome = joined
                .unwrap_or_else(|e| Err(Error::internal(format!("item worker panicked: {e}"))));
            if let Err(err) = outcome {
                if first_error.is_none() {
                    group.cancel();
                    first_error = Some(err);
                } else {
                    debug!(error = %err.chain(), "additional worker error");
                }
            }
        }

        // Workers are done, so every sender is gone and the collector drains.
        let (processed, errors) = collector
            .await
            .map_err(|e| Error::internal(format!("result collector failed: {e}")))?;

        if let Some(err) = first_error {
            return Err(Error::ParallelProcessing(Box::new(err)));
        }

        let summary = ProcessingSummary {
            total,
            processed,
            ineligible,
            errors,
        };
        info!(
            library = %library.name,
            total = summary.total,
            processed = summary.processed,
            ineligible = summary.ineligible,
            errors = summary.errors,
            "finished processing items"
        );
        Ok(summary)
    }

    async fn run_worker(
        self,
        ctx: RunContext,
        item: Item,
        index: usize,
        posters: Arc<dyn PosterService>,
        tx: mpsc::Sender<PosterResult>,
        library: Arc<LibraryConfig>,
    ) -> Result<()> {
        let _permit = self.budget.acquire(&ctx).await?;

        let mut result = self
            .process_item(&ctx, item, index, posters.as_ref(), &library)
            .await;
        match result.error.take() {
            // Only a stopped group aborts the run; anything else belongs to this item.
            Some(err) if err.is_cancellation() && ctx.is_cancelled() => return Err(err),
            other => result.error = other,
        }

        tokio::select! {
            biased;
            sent = tx.send(result) => {
                sent.map_err(|_| Error::internal("result channel closed"))
            }
            cause = ctx.cancelled() => Err(Error::cancelled(stage::SEND, cause)),
        }
    }

    /// Run one item through the stage pipeline.
    ///
    /// Never fails: errors are carried in the result together with whatever
    /// paths were known when the failing stage ran.
    pub async fn process_item(
        &self,
        ctx: &RunContext,
        mut item: Item,
        index: usize,
        posters: &dyn PosterService,
        library: &LibraryConfig,
    ) -> PosterResult {
        debug!(index, title = %item.title, "processing item");
        let mut result = PosterResult {
            title: item.title.clone(),
            original_path: None,
            overlay_path: None,
            error: None,
        };
        if let Err(err) = self
            .run_stages(ctx, &mut item, posters, library, &mut result)
            .await
        {
            result.error = Some(err);
        }
        result
    }

    async fn run_stages(
        &self,
        ctx: &RunContext,
        item: &mut Item,
        posters: &dyn PosterService,
        library: &LibraryConfig,
        result: &mut PosterResult,
    ) -> Result<()> {
        ctx.check(stage::RATINGS)?;
        self.ratings.resolve(ctx, item).await?;

        ctx.check(stage::ENSURE)?;
        posters
            .ensure_poster_exists(ctx, item, library)
            .await
            .map_err(|e| Error::PosterEnsure(Box::new(e)))?;
        let original = posters
            .poster_disk_position(item, library)
            .map_err(|e| Error::PosterLocate(Box::new(e)))?;
        result.original_path = Some(original.clone());

        ctx.check(stage::COMPOSE)?;
        let overlay = self
            .compositor
            .compose(ctx, &original, library, item)
            .await
            .map_err(|e| Error::PosterCompose(Box::new(e)))?;
        result.overlay_path = Some(overlay);

        ctx.check(stage::COMPLETE)?;
        Ok(())
    }
}

/// Drain worker results until every sender is gone.
///
/// Returns `(processed, errors)`. The progress rank is completion order, not
/// input order.
async fn collect_results(
    mut rx: mpsc::Receiver<PosterResult>,
    total: usize,
    library: String,
) -> (usize, usize) {
    let mut processed = 0;
    let mut errors = 0;
    while let Some(result) = rx.recv().await {
        processed += 1;
        let progress = format!("{processed}/{total}");
        match &result.error {
            None => info!(
                library = %library,
                progress = %progress,
                title = %result.title,
                original = ?result.original_path,
                overlay = ?result.overlay_path,
                "poster composed"
            ),
            Some(err) => {
                errors += 1;
                warn!(
                    library = %library,
                    progress = %progress,
                    title = %result.title,
                    original = ?result.original_path,
                    error = %err.chain(),
                    "poster failed"
                );
            }
        }
    }
    (processed, errors)
}
