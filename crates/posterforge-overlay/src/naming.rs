//! Output naming and backup of previous artifacts.

use std::path::{Path, PathBuf};

use crate::error::{OverlayError, Result};

/// Stem suffix of a source poster.
pub const ORIGINAL_MARKER: &str = "-original";
/// Stem suffix of a composited poster.
pub const POSTER_MARKER: &str = "-poster";
/// Suffix appended to a renamed previous artifact.
pub const BACKUP_SUFFIX: &str = "-backup";

/// Extensions of earlier composited posters that get backed up.
const BACKUP_EXTENSIONS: &[&str] = &["jpeg", "jpg"];

/// `<dir>/<name>-original.<ext>` becomes `<dir>/<name>-poster.png`.
pub fn poster_output_path(original: &Path) -> Result<PathBuf> {
    let stem = original
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| OverlayError::MissingMarker(original.to_path_buf()))?;
    let base = stem
        .strip_suffix(ORIGINAL_MARKER)
        .ok_or_else(|| OverlayError::MissingMarker(original.to_path_buf()))?;
    Ok(original.with_file_name(format!("{base}{POSTER_MARKER}.png")))
}

/// Path a previous artifact is renamed to: its file name plus `-backup`.
pub fn backup_path(previous: &Path) -> PathBuf {
    let mut name = previous
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(BACKUP_SUFFIX);
    previous.with_file_name(name)
}

/// Rename any `-poster.jpeg` / `-poster.jpg` sitting beside `output` to its
/// backup name. Returns the backups that were written.
///
/// An existing backup is replaced, following the platform's rename rules.
pub fn backup_previous(output: &Path) -> Result<Vec<PathBuf>> {
    let mut backups = Vec::new();
    for ext in BACKUP_EXTENSIONS {
        let previous = output.with_extension(ext);
        if !previous.is_file() {
            continue;
        }
        let target = backup_path(&previous);
        std::fs::rename(&previous, &target).map_err(|source| OverlayError::Backup {
            path: previous.clone(),
            source,
        })?;
        tracing::debug!("Backed up {} to {}", previous.display(), target.display());
        backups.push(target);
    }
    Ok(backups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn output_replaces_marker_and_extension() {
        let out = poster_output_path(Path::new("/m/Alien (1979)/Alien (1979)-original.jpeg")).unwrap();
        assert_eq!(out, PathBuf::from("/m/Alien (1979)/Alien (1979)-poster.png"));

        let out = poster_output_path(Path::new("/m/Heat-original.png")).unwrap();
        assert_eq!(out, PathBuf::from("/m/Heat-poster.png"));
    }

    #[test]
    fn output_requires_marker() {
        assert_matches!(
            poster_output_path(Path::new("/m/Heat.jpg")),
            Err(OverlayError::MissingMarker(_))
        );
        // The marker must terminate the stem.
        assert_matches!(
            poster_output_path(Path::new("/m/Heat-original-cut.jpg")),
            Err(OverlayError::MissingMarker(_))
        );
    }

    #[test]
    fn backup_appends_suffix_to_full_name() {
        assert_eq!(
            backup_path(Path::new("/m/Heat-poster.jpeg")),
            PathBuf::from("/m/Heat-poster.jpeg-backup")
        );
    }

    #[test]
    fn backs_up_previous_jpeg_posters() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("Heat-poster.png");
        std::fs::write(dir.path().join("Heat-poster.jpeg"), b"old").unwrap();
        std::fs::write(&output, b"previous png").unwrap();

        let backups = backup_previous(&output).unwrap();
        assert_eq!(backups, vec![dir.path().join("Heat-poster.jpeg-backup")]);
        assert!(!dir.path().join("Heat-poster.jpeg").exists());
        assert_eq!(std::fs::read(&backups[0]).unwrap(), b"old");
        // A previous png is overwritten by the caller, not backed up.
        assert!(output.exists());
    }

    #[test]
    fn second_backup_replaces_first() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("Heat-poster.png");

        std::fs::write(dir.path().join("Heat-poster.jpg"), b"run 1").unwrap();
        backup_previous(&output).unwrap();
        std::fs::write(dir.path().join("Heat-poster.jpg"), b"run 2").unwrap();
        backup_previous(&output).unwrap();

        let backup = dir.path().join("Heat-poster.jpg-backup");
        assert_eq!(std::fs::read(backup).unwrap(), b"run 2");
    }

    #[test]
    fn nothing_to_back_up() {
        let dir = tempfile::tempdir().unwrap();
        let backups = backup_previous(&dir.path().join("Heat-poster.png")).unwrap();
        assert!(backups.is_empty());
    }
}
