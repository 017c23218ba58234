use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::{ConvertError, Result};

/// Maps input-relative paths onto the output tree.
#[derive(Debug, Clone)]
pub struct FileManager {
    output_root: PathBuf,
}

impl FileManager {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
        }
    }

    /// `relative` is kept verbatim; only its last extension is swapped for
    /// `extension` (given with or without the leading dot).
    pub fn output_path(&self, relative: impl AsRef<Path>, extension: &str) -> PathBuf {
        let extension = extension.trim_start_matches('.');
        self.output_root.join(relative.as_ref()).with_extension(extension)
    }

    /// Sibling the encoder writes to before the result is moved into place:
    /// `a.wav` becomes `a.part.wav`, keeping the extension ffmpeg picks the
    /// container from.
    pub fn partial_path(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        match path.extension() {
            Some(ext) => {
                let mut extension = OsString::from("part.");
                extension.push(ext);
                path.with_extension(extension)
            }
            None => path.with_extension("part"),
        }
    }

    /// Best-effort removal; a missing file is not an error.
    pub fn discard(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        match fs::remove_file(path) {
            Ok(()) => debug!("removed {}", path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("failed to remove {}: {}", path.display(), e),
        }
    }

    pub fn ensure_parent(&self, path: impl AsRef<Path>) -> Result<()> {
        match path.as_ref().parent() {
            Some(parent) if !parent.as_os_str().is_empty() => self.ensure_directory(parent),
            _ => Ok(()),
        }
    }

    pub fn ensure_directory(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::create_dir_all(path).map_err(|source| ConvertError::OutputDir {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn output_path_replaces_only_last_extension() {
        let files = FileManager::new("/out");
        assert_eq!(
            files.output_path("Artist/Album/01. Intro.live.flac", ".m4a"),
            PathBuf::from("/out/Artist/Album/01. Intro.live.m4a")
        );
        assert_eq!(
            files.output_path("song.MP3", "wav"),
            PathBuf::from("/out/song.wav")
        );
    }

    #[test]
    fn partial_path_keeps_the_container_extension() {
        let files = FileManager::new("/out");
        assert_eq!(
            files.partial_path("/out/Album/01. Intro.live.m4a"),
            PathBuf::from("/out/Album/01. Intro.live.part.m4a")
        );
        assert_eq!(files.partial_path("/out/raw"), PathBuf::from("/out/raw.part"));
    }

    #[test]
    fn discard_ignores_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let files = FileManager::new(dir.path());
        let target = dir.path().join("a.part.wav");
        fs::write(&target, b"half").unwrap();

        files.discard(&target);
        assert!(!target.exists());
        files.discard(&target);
    }

    #[test]
    fn ensure_parent_creates_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let files = FileManager::new(dir.path());
        let target = files.output_path("a/b/c.mp3", ".opus");

        files.ensure_parent(&target).unwrap();

        assert!(dir.path().join("a/b").is_dir());
        assert!(!target.exists());
    }

    #[test]
    fn ensure_directory_reports_the_failing_path() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"").unwrap();
        let files = FileManager::new(dir.path());

        let err = files.ensure_directory(blocker.join("sub")).unwrap_err();
        assert!(matches!(err, ConvertError::OutputDir { .. }));
        assert!(err.to_string().contains("failed to create output directory"));
    }
}
