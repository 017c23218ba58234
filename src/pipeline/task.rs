//! Conversion of a single file: skip check, probe, argument construction and
//! the encoder invocation.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::audio::discovery::AudioFile;
use crate::audio::metadata::{Metadata, MetadataExtractor};
use crate::codec::capabilities::EncoderSupport;
use crate::utils::file_ops::FileManager;
use crate::utils::parallel::CancellationToken;
use crate::utils::process::ToolCommand;
use crate::{ConversionJob, ConvertError, Result};

/// Tags carried over from the source file, in the order they are re-added.
pub const KEPT_TAGS: [&str; 7] = ["title", "artist", "album", "date", "track", "genre", "disc"];
/// Re-added unless the job strips it.
pub const LYRICS_TAG: &str = "lyrics";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    /// Output already present, or the run is a dry run.
    Skipped,
    Converted,
    Failed(String),
}

/// Full encoder argument list for one file.
///
/// All source metadata is dropped and the allow-listed tags are re-added
/// before the codec parameters; the output path always comes last. Paths
/// are passed through byte for byte.
pub fn build_encoder_args(
    input: &Path,
    output: &Path,
    metadata: &Metadata,
    strip_lyrics: bool,
    codec_params: Vec<String>,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-i".into(),
        input.into(),
        "-map".into(),
        "0".into(),
        "-map_metadata".into(),
        "-1".into(),
    ];

    let lyrics = (!strip_lyrics).then_some(LYRICS_TAG);
    for key in KEPT_TAGS.into_iter().chain(lyrics) {
        if let Some(value) = metadata.tag(key) {
            args.push("-metadata".into());
            args.push(format!("{}={}", key, value).into());
        }
    }

    args.extend(codec_params.into_iter().map(OsString::from));
    args.push(output.into());
    args
}

pub struct ConversionTask<'a> {
    job: &'a ConversionJob,
    extractor: &'a MetadataExtractor,
    support: &'a dyn EncoderSupport,
    files: FileManager,
    cancel: CancellationToken,
}

impl<'a> ConversionTask<'a> {
    pub fn new(
        job: &'a ConversionJob,
        extractor: &'a MetadataExtractor,
        support: &'a dyn EncoderSupport,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            job,
            extractor,
            support,
            files: FileManager::new(&job.output_root),
            cancel,
        }
    }

    pub fn output_path(&self, file: &AudioFile) -> PathBuf {
        self.files
            .output_path(&file.relative_path, self.job.codec.extension())
    }

    /// Run the file through to a terminal outcome. Errors never escape; they
    /// become [`ConversionOutcome::Failed`].
    pub fn run(&self, file: &AudioFile) -> ConversionOutcome {
        match self.convert(file) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("{}: {}", file.relative_path.display(), e);
                ConversionOutcome::Failed(e.to_string())
            }
        }
    }

    fn convert(&self, file: &AudioFile) -> Result<ConversionOutcome> {
        let relative = file.relative_path.display();
        let output_path = self.output_path(file);

        if output_path.exists() {
            println!("✓ Skipping (exists): {}", relative);
            return Ok(ConversionOutcome::Skipped);
        }

        let metadata = self.extractor.extract_metadata(&file.path, &self.cancel)?;
        debug!(
            "{}: {} tags, {} streams",
            relative,
            metadata.tag_count(),
            metadata.streams.len()
        );

        // Only a complete encode ever appears at `output_path`.
        let partial_path = self.files.partial_path(&output_path);
        let codec_params = self
            .job
            .codec
            .parameters(self.job.device_optimized, self.support);
        let args = build_encoder_args(
            &file.path,
            &partial_path,
            &metadata,
            self.job.strip_lyrics,
            codec_params,
        );

        if self.job.dry_run {
            println!(
                "[DRY RUN] {} -> {}",
                file.path.display(),
                output_path.display()
            );
            println!(
                "  Command: {} {}\n",
                self.job.encoder_path.display(),
                args.iter()
                    .map(|a| a.to_string_lossy())
                    .collect::<Vec<_>>()
                    .join(" ")
            );
            return Ok(ConversionOutcome::Skipped);
        }

        self.files.ensure_parent(&output_path)?;
        // Leftover from an earlier run that was killed mid-write.
        self.files.discard(&partial_path);

        println!("Converting: {}", relative);
        let encoded = ToolCommand::new(&self.job.encoder_path)
            .args(args)
            .timeout(self.job.timeout)
            .cancel_on(&self.cancel)
            .execute();
        if let Err(e) = encoded {
            self.files.discard(&partial_path);
            return Err(ConvertError::Encode {
                path: file.path.clone(),
                message: e.to_string(),
            });
        }

        if let Err(e) = std::fs::rename(&partial_path, &output_path) {
            self.files.discard(&partial_path);
            return Err(ConvertError::Encode {
                path: file.path.clone(),
                message: format!("failed to move output into place: {}", e),
            });
        }

        println!("✓ Completed: {}", relative);
        Ok(ConversionOutcome::Converted)
    }
}
