//! Errors produced while compositing a poster.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum OverlayError {
    /// A previous composited poster could not be renamed aside.
    #[error("failed to back up {path}")]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The source file name does not carry the `-original` marker, so no
    /// distinct output name can be derived from it.
    #[error("{0} does not carry the -original marker")]
    MissingMarker(PathBuf),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("font error: {0}")]
    Font(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, OverlayError>;
