//! Top-level run over media services and their libraries.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info, warn};

use posterforge_common::{Config, Library, Result, RunContext};

use crate::media::MediaService;
use crate::processor::{
    stage, EligibilityFilter, ItemProcessor, LibraryOutcome, LibraryProcessor, OverlayCompositor,
    PosterCompositor, RatingBuilder, WorkerBudget,
};
use crate::registry::ServiceRegistry;

/// How long [`Orchestrator::shutdown`] waits for a running pass to finish.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Finished,
}

/// Per-run library tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub libraries_processed: usize,
    pub libraries_skipped: usize,
    pub libraries_failed: usize,
    pub posters_composed: usize,
    pub poster_errors: usize,
    /// The run stopped early on cancellation or the run-wide deadline.
    pub cancelled: bool,
}

pub struct Orchestrator {
    media_services: Vec<MediaService>,
    libraries: LibraryProcessor,
    run_timeout: Duration,
    strict: bool,
    root: RunContext,
    state: watch::Sender<RunState>,
}

impl Orchestrator {
    pub fn new(
        media_services: Vec<MediaService>,
        libraries: LibraryProcessor,
        run_timeout: Duration,
    ) -> Self {
        let (state, _) = watch::channel(RunState::Idle);
        Self {
            media_services,
            libraries,
            run_timeout,
            strict: false,
            root: RunContext::new(),
            state,
        }
    }

    /// Wire the processing pipeline for `config` around the registry's
    /// services.
    pub fn from_config(config: &Config, registry: &ServiceRegistry) -> Result<Self> {
        let rating_services = registry.rating_services();
        let compositor: Arc<dyn PosterCompositor> =
            Arc::new(OverlayCompositor::from_config(&config.assets, rating_services)?);

        let budget = WorkerBudget::new(config.max_threads());
        info!(max_threads = budget.capacity(), "worker budget");

        let items = ItemProcessor::new(
            budget,
            Arc::new(RatingBuilder::new(
                rating_services.to_vec(),
                config.rating_timeout(),
            )),
            compositor,
            EligibilityFilter::from_services(rating_services),
        );
        let libraries = LibraryProcessor::new(items, config.library_timeout());

        Ok(Self::new(
            registry.media_services().to_vec(),
            libraries,
            config.library_processing_timeout(),
        ))
    }

    /// Abort the run on the first library failure instead of moving on.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// The root context; cancelling it stops the run.
    pub fn context(&self) -> &RunContext {
        &self.root
    }

    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    /// Process every configured library of every media service.
    ///
    /// Library failures are logged and the next library proceeds, unless
    /// strict mode is on. Returns `Ok` when the run is cancelled.
    pub async fn run(&self) -> Result<RunReport> {
        self.state.send_replace(RunState::Running);
        let outcome = self.run_services().await;
        self.state.send_replace(RunState::Finished);
        outcome
    }

    async fn run_services(&self) -> Result<RunReport> {
        let ctx = self.root.child_with_timeout(self.run_timeout);
        let mut report = RunReport::default();
        info!(
            media_services = self.media_services.len(),
            timeout_secs = self.run_timeout.as_secs(),
            "starting run"
        );

        'services: for media in &self.media_services {
            let available = match self.list_libraries(&ctx, media).await {
                Ok(available) => available,
                Err(err) if err.is_cancellation() => {
                    report.cancelled = true;
                    warn!(service = %media.name, error = %err.chain(), "run stopped");
                    break 'services;
                }
                Err(err) => {
                    error!(service = %media.name, error = %err.chain(), "failed to list libraries");
                    if self.strict {
                        return Err(err);
                    }
                    report.libraries_failed += media.library_configs.len();
                    continue;
                }
            };

            for config in &media.library_configs {
                if let Some(cause) = ctx.cause() {
                    report.cancelled = true;
                    warn!(service = %media.name, library = %config.name, reason = %cause, "not starting library");
                    break 'services;
                }

                match self
                    .libraries
                    .process_library(&ctx, config, &available, media)
                    .await
                {
                    Ok(LibraryOutcome::Disabled) => report.libraries_skipped += 1,
                    Ok(LibraryOutcome::Empty) => report.libraries_processed += 1,
                    Ok(LibraryOutcome::Processed(summary)) => {
                        report.libraries_processed += 1;
                        report.posters_composed += summary.processed - summary.errors;
                        report.poster_errors += summary.errors;
                    }
                    Err(err) => {
                        report.libraries_failed += 1;
                        if err.is_deadline_exceeded() {
                            error!(
                                service = %media.name,
                                library = %config.name,
                                error = %err.chain(),
                                hint = %self.timeout_hint(),
                                "library timed out"
                            );
                        } else {
                            error!(
                                service = %media.name,
                                library = %config.name,
                                error = %err.chain(),
                                "library failed"
                            );
                        }
                        if self.root.is_cancelled() {
                            report.cancelled = true;
                            break 'services;
                        }
                        if self.strict {
                            return Err(err);
                        }
                    }
                }
            }
        }

        if report.cancelled {
            warn!(?report, "run cancelled");
        } else {
            info!(?report, "run complete");
        }
        Ok(report)
    }

    async fn list_libraries(&self, ctx: &RunContext, media: &MediaService) -> Result<Vec<Library>> {
        match &media.libraries {
            Some(handle) => ctx.run(stage::LIBRARIES, handle.get_libraries(ctx)).await,
            // The library processor reports the missing handle per library.
            None => Ok(Vec::new()),
        }
    }

    fn timeout_hint(&self) -> String {
        format!(
            "processor.library_processor.default_timeout is {}s and performance.library_processing_timeout is {}s; raise them for large libraries",
            self.libraries.default_timeout().as_secs(),
            self.run_timeout.as_secs()
        )
    }

    /// Cancel the run and wait up to [`SHUTDOWN_GRACE`] for it to finish.
    /// Idempotent.
    pub async fn shutdown(&self) {
        self.root.cancel();

        let mut rx = self.state.subscribe();
        if *rx.borrow() != RunState::Running {
            return;
        }
        let finished = tokio::time::timeout(SHUTDOWN_GRACE, rx.wait_for(|s| *s == RunState::Finished))
            .await
            .is_ok();
        if finished {
            info!("run finished after shutdown request");
        } else {
            warn!(
                grace_secs = SHUTDOWN_GRACE.as_secs(),
                "shutdown grace period elapsed with work still in flight"
            );
        }
    }
}

/// Cancel `ctx` on SIGINT or SIGTERM. Returns once a signal arrived or `ctx`
/// was cancelled some other way.
pub async fn cancel_on_signal(ctx: RunContext) {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = ctx.cancelled() => return,
    }

    info!("Shutdown signal received, cancelling run");
    ctx.cancel();
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("media_services", &self.media_services)
            .field("run_timeout", &self.run_timeout)
            .field("strict", &self.strict)
            .field("state", &self.state())
            .finish()
    }
}

