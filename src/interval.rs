use serde_derive::Serialize;
use snafu::{ensure, OptionExt, ResultExt, Snafu};

/// A portion of the source media, in whole seconds.
///
/// The duration is always at least one second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClipInterval {
    start_seconds: u64,
    duration_seconds: u64,
}

impl ClipInterval {
    pub fn new(start_seconds: u64, duration_seconds: u64) -> Option<Self> {
        if duration_seconds == 0 {
            return None;
        }

        Some(Self { start_seconds, duration_seconds })
    }

    pub fn start_seconds(&self) -> u64 {
        self.start_seconds
    }

    pub fn duration_seconds(&self) -> u64 {
        self.duration_seconds
    }
}

/// Parses `START-END` or `START+DURATION`, where each part is `SS`, `MM:SS` or `HH:MM:SS`.
pub fn parse_clip_interval(interval: &str) -> Result<ClipInterval, Error> {
    let (start, duration) = if let Some((start, duration)) = interval.split_once('+') {
        let start = parse_timestamp(start).context(InvalidTimestampSnafu { interval })?;
        let duration = parse_timestamp(duration).context(InvalidTimestampSnafu { interval })?;
        (start, duration)
    } else if let Some((start, end)) = interval.split_once('-') {
        let start = parse_timestamp(start).context(InvalidTimestampSnafu { interval })?;
        let end = parse_timestamp(end).context(InvalidTimestampSnafu { interval })?;
        ensure!(end > start, EmptyIntervalSnafu { interval });
        (start, end - start)
    } else {
        return InvalidIntervalFormatSnafu { interval }.fail();
    };

    ClipInterval::new(start, duration).context(EmptyIntervalSnafu { interval })
}

/// Reduces a `SS`, `MM:SS` or `HH:MM:SS` timestamp to seconds.
///
/// Missing higher units are treated as zero. Minutes and seconds must be
/// below 60; hours are unbounded.
pub fn parse_timestamp(timestamp: &str) -> Result<u64, TimestampError> {
    let components = timestamp.split(':').collect::<Vec<_>>();
    ensure!(components.len() <= 3, TooManyComponentsSnafu { timestamp });

    let mut padded = [0u64; 3];
    let offset = 3 - components.len();

    for (i, component) in components.iter().enumerate() {
        let value = parse_component(component)?;
        let slot = offset + i;

        if slot > 0 {
            ensure!(value < 60, OutOfRangeSnafu { component: *component });
        }

        padded[slot] = value;
    }

    let [hours, minutes, seconds] = padded;

    hours
        .checked_mul(3600)
        .and_then(|h| h.checked_add(minutes * 60 + seconds))
        .context(OverflowSnafu { timestamp })
}

fn parse_component(component: &str) -> Result<u64, TimestampError> {
    ensure!(
        !component.is_empty() && component.bytes().all(|b| b.is_ascii_digit()),
        NotANumberSnafu { component }
    );

    component.parse::<u64>().ok().context(OverflowSnafu { timestamp: component })
}

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Invalid clip interval '{}'. Must be (HH:)MM:SS-(HH:)MM:SS or (HH:)MM:SS+(MM:)SS", interval))]
    InvalidIntervalFormat {
        interval: String,
    },
    #[snafu(display("Invalid clip interval '{}': {}", interval, source))]
    InvalidTimestamp {
        interval: String,
        source: TimestampError,
    },
    #[snafu(display("Clip interval '{}' is empty: the end must come after the start", interval))]
    EmptyInterval {
        interval: String,
    },
}

#[derive(Debug, Snafu)]
pub enum TimestampError {
    #[snafu(display("'{}' has more than three components", timestamp))]
    TooManyComponents {
        timestamp: String,
    },
    #[snafu(display("'{}' is not a number", component))]
    NotANumber {
        component: String,
    },
    #[snafu(display("'{}' must be below 60", component))]
    OutOfRange {
        component: String,
    },
    #[snafu(display("'{}' is too large", timestamp))]
    Overflow {
        timestamp: String,
    },
}
