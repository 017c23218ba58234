//! Tag and stream extraction through the `ffprobe` binary that ships next to
//! the encoder.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::utils::parallel::CancellationToken;
use crate::utils::process::ToolCommand;
use crate::{ConvertError, Result};

/// One stream as reported by the probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    /// Coarse media type, e.g. `audio` or `video` (embedded cover art).
    pub codec_type: String,
}

/// Container tags and streams of a single file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    /// Keys are stored lowercased.
    tags: HashMap<String, String>,
    pub streams: Vec<StreamInfo>,
}

impl Metadata {
    pub fn new<K, V>(tags: impl IntoIterator<Item = (K, V)>, streams: Vec<StreamInfo>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut normalized = HashMap::new();
        for (key, value) in tags {
            normalized
                .entry(key.as_ref().to_lowercase())
                .or_insert_with(|| value.into());
        }
        Self {
            tags: normalized,
            streams,
        }
    }

    /// Parse `ffprobe -print_format json -show_format -show_streams` output.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let probe: ProbeOutput = serde_json::from_str(json)?;
        let streams = probe
            .streams
            .into_iter()
            .map(|s| StreamInfo {
                codec_type: s.codec_type.unwrap_or_default(),
            })
            .collect();
        Ok(Self::new(probe.format.tags, streams))
    }

    /// Case-insensitive tag lookup.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(&key.to_lowercase()).map(String::as_str)
    }

    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }

    pub fn has_video(&self) -> bool {
        self.streams.iter().any(|s| s.codec_type == "video")
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    format: ProbeFormat,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeFormat {
    // Sorted so that keys differing only in case resolve the same way every run.
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
}

pub struct MetadataExtractor {
    probe_path: PathBuf,
    timeout: Option<Duration>,
}

impl MetadataExtractor {
    pub fn new(encoder_path: impl AsRef<Path>, timeout: Option<Duration>) -> Self {
        Self {
            probe_path: Self::probe_path_for(encoder_path),
            timeout,
        }
    }

    /// The probe lives in the same directory as the encoder.
    pub fn probe_path_for(encoder_path: impl AsRef<Path>) -> PathBuf {
        let name = if cfg!(windows) { "ffprobe.exe" } else { "ffprobe" };
        match encoder_path.as_ref().parent() {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }

    pub fn probe_path(&self) -> &Path {
        &self.probe_path
    }

    pub fn extract_metadata(
        &self,
        path: impl AsRef<Path>,
        cancel: &CancellationToken,
    ) -> Result<Metadata> {
        let path = path.as_ref();
        let probe_error = |message: String| ConvertError::Probe {
            path: path.to_path_buf(),
            message,
        };

        let output = ToolCommand::new(&self.probe_path)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .timeout(self.timeout)
            .cancel_on(cancel)
            .execute()
            .map_err(|e| probe_error(e.to_string()))?;

        Metadata::from_json(&output.stdout)
            .map_err(|e| probe_error(format!("invalid probe output: {}", e)))
    }
}
