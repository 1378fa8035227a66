use std::fs;
use serde_derive::Serialize;
use snafu::{ResultExt, Snafu};
use url::Url;

pub mod bitrate;
pub mod config;
pub mod interval;
pub mod request;
pub mod stream;
pub mod transcode;

pub use bitrate::{BitrateMode, BitratePlan};
pub use config::Config;
pub use interval::{parse_clip_interval, ClipInterval};
pub use request::{Codec, DownloadRequest, RequestOptions};
pub use transcode::{Ffmpeg, TranscodeJob, Transcoder};

pub type Result<T = (), E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("{}", source))]
    InvalidRequest {
        source: request::Error,
    },
    #[snafu(display("Could not build stream URL: {}", source))]
    BuildUrl {
        source: stream::Error,
    },
    #[snafu(display("Could not download: {}", source))]
    Transcode {
        source: transcode::Error,
    },
}

/// A validated request together with the URL it will stream from.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub request: DownloadRequest,
    #[serde(serialize_with = "serialize_url")]
    pub url: Url,
}

/// Validates `options` against `config` without touching the network.
pub fn plan(config: &Config, options: RequestOptions) -> Result<Plan> {
    let request = DownloadRequest::new(options, config.size_limit_bytes).context(InvalidRequestSnafu)?;
    let url = stream::stream_url(&config.base_url, &request).context(BuildUrlSnafu)?;

    Ok(Plan { request, url })
}

/// Plans the request and hands it to `transcoder`.
///
/// If the transcode fails and the output did not exist beforehand, whatever
/// was written is removed.
pub fn download<T>(config: &Config, options: RequestOptions, transcoder: &T) -> Result<Plan>
where
    T: Transcoder + ?Sized,
{
    let plan = plan(config, options)?;
    let request = &plan.request;
    let header = config.authorization_header();

    tracing::info!(
        media_id = %request.media_id,
        codec = %request.codec,
        video_bitrate = request.video_bitrate_bps,
        audio_track = request.audio_track_index,
        "downloading into {}",
        request.output.display()
    );

    if let Some(clip) = request.clip {
        tracing::info!(start = clip.start_seconds(), duration = clip.duration_seconds(), "clipping");
    }
    if let Some(limit) = request.size_limit_bytes {
        tracing::info!(size_limit = limit, "capping output size");
    }

    let existed = request.output.exists();
    let job = TranscodeJob {
        input: &plan.url,
        header: &header,
        clip: request.clip,
        size_limit_bytes: request.size_limit_bytes,
        output: &request.output,
        overwrite: request.overwrite,
    };

    if let Err(err) = transcoder.transcode(&job) {
        if !existed && request.output.exists() {
            match fs::remove_file(&request.output) {
                Ok(()) => tracing::warn!("removed partial output {}", request.output.display()),
                Err(e) => tracing::warn!("could not remove partial output {}: {}", request.output.display(), e),
            }
        }

        return Err(err).context(TranscodeSnafu);
    }

    Ok(plan)
}

fn serialize_url<S>(url: &Url, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(url.as_str())
}
