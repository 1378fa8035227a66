use std::str::FromStr;
use serde_derive::Serialize;
use snafu::{ensure, OptionExt, Snafu};
use crate::interval::ClipInterval;

/// Audio is always requested at this rate, in bits/second.
pub const AUDIO_BITRATE: u64 = 128_000;
/// Total bitrate used when none is given, in bits/second.
pub const DEFAULT_BITRATE: u64 = 10_000_000;
/// Upload ceiling used by size-capped mode, in bytes.
pub const DEFAULT_SIZE_LIMIT: u64 = 10_000_000;
/// Longest clip size-capped mode will plan for, in seconds.
pub const MAX_CAPPED_DURATION: u64 = 120;

const SIZE_CAPPED_KEYWORD: &str = "discord";

/// How the total bitrate is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitrateMode {
    /// A fixed total bitrate in bits/second.
    Explicit(u64),
    /// Derive the bitrate from the size limit and the clip duration.
    SizeCapped,
}

impl Default for BitrateMode {
    fn default() -> Self {
        BitrateMode::Explicit(DEFAULT_BITRATE)
    }
}

impl FromStr for BitrateMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        if s == SIZE_CAPPED_KEYWORD {
            return Ok(BitrateMode::SizeCapped);
        }

        parse_scaled(s).map(BitrateMode::Explicit)
    }
}

/// Parses a plain integer or one with a `k`/`K` (thousands) or `M` (millions) suffix.
pub fn parse_scaled(value: &str) -> Result<u64, Error> {
    let (digits, scale) = match value.as_bytes().last() {
        Some(b'k') | Some(b'K') => (&value[..value.len() - 1], 1_000),
        Some(b'M') => (&value[..value.len() - 1], 1_000_000),
        _ => (value, 1),
    };

    ensure!(
        !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()),
        InvalidQuantitySnafu { value }
    );

    digits
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(scale))
        .context(InvalidQuantitySnafu { value })
}

/// The bitrates handed to the media server, plus the optional output size cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BitratePlan {
    pub total_bps: u64,
    pub video_bps: u64,
    pub audio_bps: u64,
    pub size_limit_bytes: Option<u64>,
}

/// Spreads `byte_limit` over `duration_seconds`, rounded down to a whole kbit/s.
pub fn size_capped_total(byte_limit: u64, duration_seconds: u64) -> Result<u64, Error> {
    ensure!(
        (1..=MAX_CAPPED_DURATION).contains(&duration_seconds),
        UnsupportedDurationSnafu { duration_seconds }
    );

    let bits = byte_limit.checked_mul(8).context(InvalidQuantitySnafu { value: byte_limit.to_string() })?;

    Ok(bits / (duration_seconds * 1000) * 1000)
}

pub fn plan(mode: BitrateMode, clip: Option<&ClipInterval>, byte_limit: u64) -> Result<BitratePlan, Error> {
    let (total_bps, size_limit_bytes) = match mode {
        BitrateMode::Explicit(total) => (total, None),
        BitrateMode::SizeCapped => {
            let clip = clip.context(MissingIntervalSnafu)?;
            let total = size_capped_total(byte_limit, clip.duration_seconds())?;
            (total, Some(byte_limit))
        }
    };

    ensure!(total_bps > AUDIO_BITRATE, BitrateTooLowSnafu { total_bps });

    Ok(BitratePlan {
        total_bps,
        video_bps: total_bps - AUDIO_BITRATE,
        audio_bps: AUDIO_BITRATE,
        size_limit_bytes,
    })
}

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Invalid quantity '{}'. Must be an integer, optionally suffixed with k or M", value))]
    InvalidQuantity {
        value: String,
    },
    #[snafu(display("Size-capped bitrate ('{}') can only be used together with --clip", SIZE_CAPPED_KEYWORD))]
    MissingInterval,
    #[snafu(display(
        "Size-capped bitrate needs a clip between 1 and {} seconds long, got {} seconds",
        MAX_CAPPED_DURATION,
        duration_seconds
    ))]
    UnsupportedDuration {
        duration_seconds: u64,
    },
    #[snafu(display(
        "Total bitrate of {} bits/s leaves no room for video next to {} bits/s of audio",
        total_bps,
        AUDIO_BITRATE
    ))]
    BitrateTooLow {
        total_bps: u64,
    },
}
