//! On-disk placement rules for original posters.
//!
//! An item's original poster lives beside its first media file as
//! `<media stem>-original.<png|jpeg|jpg>`. Media outside the library root
//! cannot be located.

use std::path::{Path, PathBuf};

use posterforge_common::{Error, Item, Result};

const ORIGINAL_EXTENSIONS: &[&str] = &["png", "jpeg", "jpg"];

/// The media file posters are placed beside.
pub fn primary_media_file(item: &Item) -> Result<&Path> {
    item.media_files
        .first()
        .map(|m| m.path.as_path())
        .ok_or_else(|| Error::MissingMedia(item.title.clone()))
}

/// Fail with [`Error::CannotLocateFile`] unless `media` lives under `library_root`.
pub fn ensure_under_library(media: &Path, library_root: &Path) -> Result<()> {
    let dir = media.parent().unwrap_or(Path::new(""));
    if library_root.as_os_str().is_empty() || !dir.starts_with(library_root) {
        return Err(Error::CannotLocateFile {
            path: media.to_path_buf(),
            library_path: library_root.to_path_buf(),
        });
    }
    Ok(())
}

/// `<dir>/<media stem>-original.<ext>`.
pub fn original_path(media: &Path, ext: &str) -> PathBuf {
    let stem = media
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    media.with_file_name(format!("{stem}-original.{ext}"))
}

/// The first existing original poster beside `media`, in extension order.
pub fn find_original(media: &Path) -> Option<PathBuf> {
    ORIGINAL_EXTENSIONS
        .iter()
        .map(|ext| original_path(media, ext))
        .find(|p| p.is_file())
}

/// File extension for downloaded poster bytes.
pub fn detect_extension(bytes: &[u8]) -> Result<&'static str> {
    match image::guess_format(bytes) {
        Ok(image::ImageFormat::Png) => Ok("png"),
        Ok(image::ImageFormat::Jpeg) => Ok("jpeg"),
        Ok(other) => Err(Error::Image(format!("unsupported poster format {other:?}"))),
        Err(e) => Err(Error::Image(format!("unrecognised poster data: {e}"))),
    }
}
