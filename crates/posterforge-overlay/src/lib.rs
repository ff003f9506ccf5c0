//! posterforge-overlay: draws rating badges onto movie posters.
//!
//! Given an `<name>-original.<ext>` poster, a style and a list of
//! logo-and-score badges, [`OverlayRenderer::compose`] writes
//! `<name>-poster.png` beside it, backing up any earlier JPEG artifact.

pub mod error;
pub mod layout;
pub mod naming;
pub mod render;

pub use error::{OverlayError, Result};
pub use naming::{backup_path, backup_previous, poster_output_path};
pub use render::{Badge, LoadedBadge, OverlayKind, OverlayRenderer, OverlayStyle};
