use std::path::PathBuf;
use std::time::Duration;

pub mod audio;
pub mod codec;
pub mod pipeline;
pub mod utils;
pub mod cli;

use codec::policy::Codec;

/// Immutable description of one conversion run.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub input_root: PathBuf,
    pub output_root: PathBuf,
    pub codec: Codec,
    /// Add the extra parameters tuned for iPod playback.
    pub device_optimized: bool,
    /// Leave lyrics out of the re-added tag set.
    pub strip_lyrics: bool,
    pub encoder_path: PathBuf,
    pub dry_run: bool,
    /// Upper bound for each probe/encoder invocation. `None` waits forever.
    pub timeout: Option<Duration>,
    /// Worker count override. Defaults to the number of logical CPUs.
    pub workers: Option<usize>,
}

impl ConversionJob {
    pub fn new(
        input_root: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
        codec: Codec,
        encoder_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            input_root: input_root.into(),
            output_root: output_root.into(),
            codec,
            device_optimized: false,
            strip_lyrics: false,
            encoder_path: encoder_path.into(),
            dry_run: false,
            timeout: None,
            workers: None,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.filter(|n| *n > 0).unwrap_or_else(num_cpus::get)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory traversal error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("input directory does not exist: {}", .0.display())]
    InputNotFound(PathBuf),
    #[error("failed to create output directory {}: {source}", path.display())]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unsupported codec: {0} (expected one of alac, aac, flac, mp3, opus, wav)")]
    UnsupportedCodec(String),
    #[error("failed to extract metadata from {}: {message}", path.display())]
    Probe { path: PathBuf, message: String },
    #[error("conversion failed for {}: {message}", path.display())]
    Encode { path: PathBuf, message: String },
    #[error("{tool}: {message}")]
    Tool { tool: String, message: String },
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, ConvertError>;

// Re-exports for convenience
pub use audio::discovery::{AudioFile, FileDiscoverer};
pub use audio::metadata::{Metadata, MetadataExtractor, StreamInfo};
pub use codec::capabilities::EncoderCapabilities;
pub use pipeline::dispatcher::Dispatcher;
pub use pipeline::task::{ConversionOutcome, ConversionTask};
pub use utils::parallel::CancellationToken;
pub use utils::reporting::{Failure, Reporter, RunSummary};
