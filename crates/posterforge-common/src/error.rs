//! Unified error type for posterforge.
//!
//! Every failure the pipeline can surface has its own variant so callers can
//! classify errors (per-item vs. per-library vs. fatal) without string
//! matching. Wrapping variants keep their cause as a `#[source]`; use
//! [`Error::chain`] to render the full chain in log records.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Why a [`RunContext`](crate::context::RunContext) stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    /// The token was cancelled explicitly (signal, shutdown, sibling failure).
    #[error("context cancelled")]
    Cancelled,
    /// The context deadline passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// The media-service handle a library processor requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle {
    Libraries,
    Items,
    Posters,
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handle::Libraries => f.write_str("libraries"),
            Handle::Items => f.write_str("items"),
            Handle::Posters => f.write_str("posters"),
        }
    }
}

/// Unified error type covering all failure modes in posterforge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration failed to load or validate.
    #[error("invalid config: {0}")]
    ConfigInvalid(String),

    /// A service handle could not be constructed.
    #[error("failed to initialise {service}: {message}")]
    ServiceInit {
        /// Name of the service (e.g. "plex", "tmdb").
        service: String,
        /// Human-readable description.
        message: String,
    },

    /// A cancellation checkpoint observed a stopped context.
    #[error("cancelled before {stage}")]
    Cancelled {
        /// The step that was about to start.
        stage: &'static str,
        /// Whether the context was cancelled or ran out of time.
        #[source]
        cause: ContextError,
    },

    /// No library with the configured name exists on the media server.
    #[error("library not found: {0}")]
    LibraryNotFound(String),

    /// A media service was registered without a required handle.
    #[error("{0} handle is missing")]
    HandleMissing(Handle),

    /// `ItemProcessor::process_items` was called before `set_posters`.
    #[error("posters handle not set on item processor")]
    PostersNotSet,

    /// Fetching the items of a library failed.
    #[error("failed to retrieve items for library {library}")]
    ItemsRetrieval {
        library: String,
        #[source]
        source: Box<Error>,
    },

    /// A rating platform returned an error.
    #[error("failed to fetch {provider} rating")]
    RatingFetch {
        provider: String,
        #[source]
        source: Box<Error>,
    },

    /// A call ran past its own deadline while the surrounding run went on.
    ///
    /// Not a cancellation: only the call failed.
    #[error("{stage} timed out after {}s", .timeout.as_secs())]
    Timeout {
        stage: &'static str,
        timeout: Duration,
    },

    /// The original poster could not be placed on disk.
    #[error("failed to ensure original poster exists")]
    PosterEnsure(#[source] Box<Error>),

    /// The original poster could not be located on disk.
    #[error("failed to locate original poster")]
    PosterLocate(#[source] Box<Error>),

    /// The overlay poster could not be produced.
    #[error("failed to compose poster")]
    PosterCompose(#[source] Box<Error>),

    /// A media file lives outside its library root.
    #[error("cannot locate file {path}: not under library path {library_path}")]
    CannotLocateFile {
        path: PathBuf,
        library_path: PathBuf,
    },

    /// The item has no media file or poster to work with.
    #[error("item {0} has no usable media")]
    MissingMedia(String),

    /// Renaming a previous poster artifact aside failed.
    #[error("failed to back up {path}")]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A worker could not acquire its share of the worker budget.
    #[error("failed to acquire worker budget")]
    SemaphoreAcquire(#[source] Box<Error>),

    /// A worker of the item task group failed.
    #[error("parallel processing failed")]
    ParallelProcessing(#[source] Box<Error>),

    /// Asking the media server to refresh a library failed.
    #[error("failed to refresh library {library}")]
    Refresh {
        library: String,
        #[source]
        source: Box<Error>,
    },

    /// Transport-level HTTP failure.
    #[error("{context}")]
    Http {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The server answered with a non-success status.
    #[error("{url} returned {status}: {body}")]
    HttpStatus {
        url: String,
        status: u16,
        body: String,
    },

    /// Image decoding, rendering or encoding failed.
    #[error("image error: {0}")]
    Image(String),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Catch-all for unexpected internal errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Convenience constructor for [`Error::Cancelled`].
    pub fn cancelled(stage: &'static str, cause: ContextError) -> Self {
        Error::Cancelled { stage, cause }
    }

    /// Convenience constructor for [`Error::ServiceInit`].
    pub fn service_init(service: impl Into<String>, message: impl fmt::Display) -> Self {
        Error::ServiceInit {
            service: service.into(),
            message: message.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Http`].
    pub fn http(
        context: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::Http {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Convenience constructor for [`Error::Internal`].
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal(message.into())
    }

    /// The cancellation cause if this error, or any error it wraps, is a
    /// cancellation.
    pub fn cancellation(&self) -> Option<ContextError> {
        match self {
            Error::Cancelled { cause, .. } => Some(*cause),
            Error::ItemsRetrieval { source, .. }
            | Error::RatingFetch { source, .. }
            | Error::Refresh { source, .. } => source.cancellation(),
            Error::PosterEnsure(source)
            | Error::PosterLocate(source)
            | Error::PosterCompose(source)
            | Error::SemaphoreAcquire(source)
            | Error::ParallelProcessing(source) => source.cancellation(),
            _ => None,
        }
    }

    /// Whether this error is (or wraps) a cancellation.
    pub fn is_cancellation(&self) -> bool {
        self.cancellation().is_some()
    }

    /// Whether this error is (or wraps) an exceeded deadline.
    pub fn is_deadline_exceeded(&self) -> bool {
        self.cancellation() == Some(ContextError::DeadlineExceeded)
    }

    /// Render the error followed by each of its sources, separated by `": "`.
    pub fn chain(&self) -> String {
        let mut out = self.to_string();
        let mut current = std::error::Error::source(self);
        while let Some(cause) = current {
            out.push_str(": ");
            out.push_str(&cause.to_string());
            current = cause.source();
        }
        out
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
