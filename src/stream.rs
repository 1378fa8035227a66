use snafu::{OptionExt, Snafu};
use url::Url;
use crate::request::DownloadRequest;

const MAX_AUDIO_CHANNELS: u32 = 2;
const AUDIO_CODEC: &str = "aac";
const PLAYLIST: &str = "main.m3u8";

/// Query parameters of the transcoding stream, in the order the server receives them.
pub fn transcoding_params(request: &DownloadRequest) -> Vec<(&'static str, String)> {
    vec![
        ("maxAudioChannels", MAX_AUDIO_CHANNELS.to_string()),
        ("TranscodingMaxAudioChannels", MAX_AUDIO_CHANNELS.to_string()),
        ("AudioBitrate", request.audio_bitrate_bps.to_string()),
        ("VideoBitrate", request.video_bitrate_bps.to_string()),
        ("VideoCodec", request.codec.to_string()),
        ("AudioCodec", AUDIO_CODEC.to_string()),
        ("AudioStreamIndex", request.audio_track_index.to_string()),
    ]
}

/// Builds `<base>/Videos/<id>/main.m3u8?<params>`.
pub fn stream_url(base: &Url, request: &DownloadRequest) -> Result<Url, Error> {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);

    url.path_segments_mut()
        .ok()
        .context(NotABaseSnafu { url: base.as_str() })?
        .pop_if_empty()
        .extend(&["Videos", request.media_id.as_str(), PLAYLIST]);

    url.query_pairs_mut().extend_pairs(transcoding_params(request));

    Ok(url)
}

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Cannot append a path to '{}'", url))]
    NotABase {
        url: String,
    },
}
