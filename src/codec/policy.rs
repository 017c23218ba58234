//! Target codecs and the ffmpeg parameters each one is encoded with.

use std::fmt;
use std::str::FromStr;

use crate::codec::capabilities::EncoderSupport;
use crate::ConvertError;

/// Extension used when a codec name is not recognised.
pub const FALLBACK_EXTENSION: &str = ".m4a";

/// Alternative AAC implementations, best first. `aac` is always available.
pub const AAC_VARIANTS: [&str; 2] = ["aac_at", "libfdk_aac"];
pub const BASELINE_AAC: &str = "aac";

/// Extra parameters shared by both iPod-friendly MPEG-4 targets.
const DEVICE_MP4_PARAMS: [&str; 6] = [
    "-ar",
    "44100",
    "-movflags",
    "+faststart",
    "-disposition:a",
    "0",
];

type ParamBuilder = fn(bool, &dyn EncoderSupport) -> Vec<String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    Alac,
    Aac,
    Flac,
    Mp3,
    Opus,
    Wav,
}

impl Codec {
    pub const ALL: [Codec; 6] = [
        Codec::Alac,
        Codec::Aac,
        Codec::Flac,
        Codec::Mp3,
        Codec::Opus,
        Codec::Wav,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Codec::Alac => "alac",
            Codec::Aac => "aac",
            Codec::Flac => "flac",
            Codec::Mp3 => "mp3",
            Codec::Opus => "opus",
            Codec::Wav => "wav",
        }
    }

    /// Output extension, including the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            Codec::Alac | Codec::Aac => ".m4a",
            Codec::Flac => ".flac",
            Codec::Mp3 => ".mp3",
            Codec::Opus => ".opus",
            Codec::Wav => ".wav",
        }
    }

    fn builder(self) -> ParamBuilder {
        match self {
            Codec::Alac => alac_params,
            Codec::Aac => aac_params,
            Codec::Flac => flac_params,
            Codec::Mp3 => mp3_params,
            Codec::Opus => opus_params,
            Codec::Wav => wav_params,
        }
    }

    /// Ordered encoder parameters for this codec. Only the AAC target
    /// consults `support`.
    pub fn parameters(self, device_optimized: bool, support: &dyn EncoderSupport) -> Vec<String> {
        (self.builder())(device_optimized, support)
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Codec {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Codec::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| ConvertError::UnsupportedCodec(s.to_string()))
    }
}

/// Extension for a raw codec name, falling back to [`FALLBACK_EXTENSION`].
pub fn output_extension(codec: &str) -> &'static str {
    codec
        .parse::<Codec>()
        .map(Codec::extension)
        .unwrap_or(FALLBACK_EXTENSION)
}

/// First available AAC variant in priority order, else the built-in encoder.
pub fn best_aac_encoder(support: &dyn EncoderSupport) -> &'static str {
    AAC_VARIANTS
        .into_iter()
        .find(|variant| support.supports(variant))
        .unwrap_or(BASELINE_AAC)
}

fn params(tokens: &[&str]) -> Vec<String> {
    tokens.iter().map(|t| t.to_string()).collect()
}

fn alac_params(device_optimized: bool, _: &dyn EncoderSupport) -> Vec<String> {
    let mut p = params(&["-c:a", "alac", "-c:v", "copy"]);
    if device_optimized {
        p.extend(params(&["-sample_fmt", "s16p"]));
        p.extend(params(&DEVICE_MP4_PARAMS));
    }
    p
}

fn aac_params(device_optimized: bool, support: &dyn EncoderSupport) -> Vec<String> {
    let mut p = params(&["-c:a", best_aac_encoder(support), "-b:a", "256k", "-c:v", "copy"]);
    if device_optimized {
        p.extend(params(&DEVICE_MP4_PARAMS));
    }
    p
}

fn flac_params(_: bool, _: &dyn EncoderSupport) -> Vec<String> {
    params(&["-c:a", "flac", "-c:v", "copy"])
}

fn mp3_params(_: bool, _: &dyn EncoderSupport) -> Vec<String> {
    params(&["-c:a", "libmp3lame", "-q:a", "0"])
}

fn opus_params(_: bool, _: &dyn EncoderSupport) -> Vec<String> {
    params(&["-c:a", "libopus", "-b:a", "128k", "-vn"])
}

fn wav_params(_: bool, _: &dyn EncoderSupport) -> Vec<String> {
    params(&["-c:a", "pcm_s16le", "-vn"])
}
