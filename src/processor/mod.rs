//! The library -> item processing pipeline.
//!
//! [`LibraryProcessor`] drives one library under its own deadline and hands
//! the fetched items to [`ItemProcessor`], which runs them concurrently
//! within the shared [`WorkerBudget`].

pub mod budget;
pub mod compositor;
pub mod eligibility;
pub mod item;
pub mod library;
pub mod rating_builder;

pub use budget::WorkerBudget;
pub use compositor::{OverlayCompositor, PosterCompositor};
pub use eligibility::EligibilityFilter;
pub use item::{ItemProcessor, ProcessingSummary};
pub use library::{LibraryOutcome, LibraryProcessor};
pub use rating_builder::RatingBuilder;

/// Names of the checkpoints reported in [`posterforge_common::Error::Cancelled`].
pub mod stage {
    pub const LIBRARIES: &str = "library-listing";
    pub const ITEMS: &str = "items-retrieval";
    pub const REFRESH: &str = "refresh";
    pub const SPAWN: &str = "worker-spawn";
    pub const ACQUIRE: &str = "semaphore-acquire";
    pub const RATINGS: &str = "rating-resolution";
    pub const RATING_FETCH: &str = "rating-fetch";
    pub const ENSURE: &str = "poster-ensure";
    pub const COMPOSE: &str = "poster-composition";
    pub const COMPLETE: &str = "completion";
    pub const SEND: &str = "result-send";
}
