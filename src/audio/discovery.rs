use std::path::{Path, PathBuf};

use log::debug;
use walkdir::WalkDir;

use crate::Result;

/// Extensions (lowercase, without the dot) that are picked up for conversion.
pub const AUDIO_EXTENSIONS: [&str; 7] = ["mp3", "wav", "flac", "aac", "opus", "m4a", "ogg"];

/// An audio file found under the input root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFile {
    pub path: PathBuf,
    /// `path` relative to the input root; mirrored under the output root.
    pub relative_path: PathBuf,
}

pub struct FileDiscoverer;

impl FileDiscoverer {
    pub fn is_audio_file(path: impl AsRef<Path>) -> bool {
        path.as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(|ext| {
                let ext = ext.to_lowercase();
                AUDIO_EXTENSIONS.contains(&ext.as_str())
            })
            .unwrap_or(false)
    }

    /// Recursively collect every audio file under `root`.
    ///
    /// Any traversal error (unreadable directory, broken symlink, link loop)
    /// aborts the whole scan; a partial listing is never returned.
    pub fn discover(root: impl AsRef<Path>) -> Result<Vec<AudioFile>> {
        let root_ref = root.as_ref();

        // Absolute input paths when the root resolves, as given otherwise.
        let root = if let Ok(canonical) = std::fs::canonicalize(root_ref) {
            canonical
        } else {
            root_ref.to_path_buf()
        };

        println!("Scanning directory structure: {}", root.display());

        let mut files = Vec::new();
        for entry in WalkDir::new(&root).follow_links(true) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            if !Self::is_audio_file(entry.path()) {
                debug!("Skipping non-audio file: {}", entry.path().display());
                continue;
            }

            let relative_path = entry
                .path()
                .strip_prefix(&root)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| PathBuf::from(entry.file_name()));
            files.push(AudioFile {
                path: entry.into_path(),
                relative_path,
            });
        }

        files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        Ok(files)
    }
}
