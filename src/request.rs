use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use serde_derive::Serialize;
use snafu::{ensure, ResultExt, Snafu};
use crate::bitrate::{self, BitrateMode};
use crate::interval::ClipInterval;

/// Video codec requested from the media server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    H264,
    H265,
}

impl Codec {
    pub const NAMES: &'static [&'static str] = &["h264", "h265"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Codec::H264 => "h264",
            Codec::H265 => "h265",
        }
    }
}

impl Default for Codec {
    fn default() -> Self {
        Codec::H265
    }
}

impl FromStr for Codec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "h264" => Ok(Codec::H264),
            "h265" => Ok(Codec::H265),
            _ => UnsupportedCodecSnafu { codec: s }.fail(),
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the user asked for, before validation.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub media_id: String,
    pub output: PathBuf,
    pub clip: Option<ClipInterval>,
    pub bitrate: BitrateMode,
    pub codec: Codec,
    pub audio_track_index: u32,
    /// Replace `output` if it already exists.
    pub overwrite: bool,
}

/// A validated download. A size limit is only ever set together with a clip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadRequest {
    pub media_id: String,
    pub output: PathBuf,
    pub video_bitrate_bps: u64,
    pub audio_bitrate_bps: u64,
    pub codec: Codec,
    pub audio_track_index: u32,
    pub clip: Option<ClipInterval>,
    pub size_limit_bytes: Option<u64>,
    pub overwrite: bool,
}

impl DownloadRequest {
    /// Validates `options` and plans bitrates, using `size_limit_bytes` for size-capped mode.
    pub fn new(options: RequestOptions, size_limit_bytes: u64) -> Result<Self, Error> {
        let RequestOptions { media_id, output, clip, bitrate, codec, audio_track_index, overwrite } = options;

        ensure!(!media_id.trim().is_empty(), EmptyMediaIdSnafu);
        check_output_path(&output, overwrite)?;

        let plan = bitrate::plan(bitrate, clip.as_ref(), size_limit_bytes).context(PlanBitrateSnafu)?;

        Ok(DownloadRequest {
            media_id,
            output,
            video_bitrate_bps: plan.video_bps,
            audio_bitrate_bps: plan.audio_bps,
            codec,
            audio_track_index,
            clip,
            size_limit_bytes: plan.size_limit_bytes,
            overwrite,
        })
    }
}

fn check_output_path(output: &Path, overwrite: bool) -> Result<(), Error> {
    ensure!(output.file_name().is_some(), InvalidOutputPathSnafu {
        path: output,
        reason: "it does not name a file",
    });

    let parent = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    ensure!(parent.is_dir(), InvalidOutputPathSnafu {
        path: output,
        reason: format!("{} does not exist", parent.display()),
    });
    ensure!(!output.is_dir(), InvalidOutputPathSnafu {
        path: output,
        reason: "it is a directory",
    });
    ensure!(overwrite || !output.exists(), OutputExistsSnafu { path: output });

    Ok(())
}

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Unsupported codec '{}'. Must be one of {}", codec, Codec::NAMES.join(", ")))]
    UnsupportedCodec {
        codec: String,
    },
    #[snafu(display("The media id must not be empty"))]
    EmptyMediaId,
    #[snafu(display("Invalid output path {}: {}", path.display(), reason))]
    InvalidOutputPath {
        path: PathBuf,
        reason: String,
    },
    #[snafu(display("Output file {} already exists. Pass --force to overwrite it", path.display()))]
    OutputExists {
        path: PathBuf,
    },
    #[snafu(display("{}", source))]
    PlanBitrate {
        source: bitrate::Error,
    },
}
