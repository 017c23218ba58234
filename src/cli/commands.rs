use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::codec::policy::Codec;
use crate::ConversionJob;

#[derive(Parser, Debug)]
#[command(name = "audio-batch-converter")]
#[command(version)]
#[command(about = "Batch-convert a directory tree of audio files with ffmpeg", long_about = None)]
pub struct Cli {
    /// Input directory containing audio files
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,

    /// Output directory for converted files
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,

    /// Target codec: alac, aac, flac, mp3, opus, wav
    #[arg(short = 'c', long, value_parser = parse_codec)]
    pub codec: Option<Codec>,

    /// Enable iPod optimizations (defaults the codec to aac)
    #[arg(long)]
    pub ipod: bool,

    /// Strip lyrics metadata
    #[arg(long)]
    pub no_lyrics: bool,

    /// Path to the ffmpeg binary; ffprobe is expected next to it
    #[arg(long, default_value = "ffmpeg")]
    pub ffmpeg: PathBuf,

    /// Show what would be done without converting
    #[arg(short = 'd', long)]
    pub dry_run: bool,

    /// Kill any single ffmpeg/ffprobe call running longer than this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Number of parallel workers (defaults to the number of logical CPUs)
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,

    /// Write a CSV report of failed files
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,
}

fn parse_codec(s: &str) -> Result<Codec, String> {
    s.parse::<Codec>().map_err(|e| e.to_string())
}

impl Cli {
    /// Codec to convert to. iPod mode without an explicit codec means AAC.
    pub fn target_codec(&self) -> Option<Codec> {
        match (self.codec, self.ipod) {
            (Some(codec), _) => Some(codec),
            (None, true) => Some(Codec::Aac),
            (None, false) => None,
        }
    }

    pub fn into_job(self) -> Option<ConversionJob> {
        let codec = self.target_codec()?;
        Some(ConversionJob {
            input_root: self.input,
            output_root: self.output,
            codec,
            device_optimized: self.ipod,
            strip_lyrics: self.no_lyrics,
            encoder_path: self.ffmpeg,
            dry_run: self.dry_run,
            timeout: self.timeout.map(Duration::from_secs),
            workers: self.threads,
        })
    }
}
