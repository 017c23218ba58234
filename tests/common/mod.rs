//! Fake ffmpeg/ffprobe pair for driving the pipeline without real media.
//!
//! The fake probe prints the input file itself, so each test track simply
//! contains the probe JSON it should report. The fake encoder writes its
//! argument list, one per line, into the output file.
//!
//! Inputs named `*fail*` make the encoder write a few bytes and then fail,
//! `*hang*` leave a `sleep` child holding its pipes. While a
//! `stall` marker sits next to the fake binaries, capability checks and
//! inputs named `*stall*` write partial output and then block.

use std::collections::BTreeMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use audio_batch_converter::codec::policy::Codec;
use audio_batch_converter::ConversionJob;
use serde_json::json;
use tempfile::TempDir;
use walkdir::WalkDir;

const FAKE_PROBE: &str = r#"#!/bin/sh
for last; do :; done
case "$(basename "$last")" in
    *corrupt*) echo "Invalid data found when processing input" >&2; exit 1 ;;
esac
exec cat "$last"
"#;

const FAKE_ENCODER: &str = r#"#!/bin/sh
bin="$(dirname "$0")"
if [ "$1" = "-h" ]; then
    echo "$2" >> "$bin/capability_checks.log"
    [ -f "$bin/stall" ] && sleep 5
    for e in @SUPPORTED@; do
        [ "$2" = "encoder=$e" ] && echo "Encoder $e [fake $e encoder]:"
    done
    exit 0
fi
[ -f "$2" ] || { echo "$2: No such file or directory" >&2; exit 1; }
for last; do :; done
case "$(basename "$2")" in
    *fail*)
        echo "partial" > "$last"
        echo "Error while decoding stream #0:0: Invalid data" >&2
        exit 1 ;;
    *hang*) sleep 5 ;;
    *stall*)
        if [ -f "$bin/stall" ]; then
            echo "partial" > "$last"
            sleep 5
        fi ;;
esac
printf '%s\n' "$@" > "$last"
"#;

pub struct Fixture {
    _dir: TempDir,
    pub input: PathBuf,
    pub output: PathBuf,
    pub ffmpeg: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_encoders(&[])
    }

    /// `encoders` are the optional AAC implementations the fake encoder claims.
    pub fn with_encoders(encoders: &[&str]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input");
        let output = dir.path().join("output");
        let bin = dir.path().join("bin");
        for d in [&input, &bin] {
            fs::create_dir_all(d).unwrap();
        }

        let ffmpeg = bin.join("ffmpeg");
        write_script(&ffmpeg, &FAKE_ENCODER.replace("@SUPPORTED@", &encoders.join(" ")));
        write_script(&bin.join("ffprobe"), FAKE_PROBE);

        Self {
            _dir: dir,
            input,
            output,
            ffmpeg,
        }
    }

    pub fn job(&self, codec: Codec) -> ConversionJob {
        let mut job = ConversionJob::new(&self.input, &self.output, codec, &self.ffmpeg);
        job.workers = Some(3);
        job
    }

    /// Add a track whose probe output carries `tags` and a single audio stream.
    pub fn add_track(&self, relative: impl AsRef<Path>, tags: &[(&str, &str)]) -> PathBuf {
        let tags: serde_json::Map<_, _> = tags
            .iter()
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect();
        let probe = json!({
            "streams": [{ "index": 0, "codec_type": "audio" }],
            "format": { "tags": tags },
        });
        self.add_raw(relative, &probe.to_string())
    }

    pub fn add_raw(&self, relative: impl AsRef<Path>, contents: &str) -> PathBuf {
        let path = self.input.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    /// Arguments the fake encoder received when producing `relative`.
    pub fn encoder_args(&self, relative: &str) -> Vec<String> {
        fs::read_to_string(self.output.join(relative))
            .unwrap()
            .lines()
            .map(String::from)
            .collect()
    }

    /// Make `*stall*` inputs and capability checks block after writing.
    pub fn set_stall(&self, stall: bool) {
        let marker = self.ffmpeg.with_file_name("stall");
        if stall {
            fs::write(marker, b"").unwrap();
        } else {
            fs::remove_file(marker).unwrap();
        }
    }

    pub fn capability_checks(&self) -> Vec<String> {
        let log = self.ffmpeg.with_file_name("capability_checks.log");
        fs::read_to_string(log)
            .map(|s| s.lines().map(String::from).collect())
            .unwrap_or_default()
    }

    /// Every file under the output root with its contents.
    pub fn output_snapshot(&self) -> BTreeMap<PathBuf, Vec<u8>> {
        WalkDir::new(&self.output)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(|e| {
                let relative = e.path().strip_prefix(&self.output).unwrap().to_path_buf();
                (relative, fs::read(e.path()).unwrap())
            })
            .collect()
    }
}

fn write_script(path: &Path, body: &str) {
    fs::write(path, body).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

pub fn metadata_pairs(args: &[String]) -> Vec<String> {
    args.windows(2)
        .filter(|w| w[0] == "-metadata")
        .map(|w| w[1].clone())
        .collect()
}
