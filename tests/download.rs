use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use jellyclip::transcode::{self, TranscodeJob, Transcoder};
use jellyclip::{bitrate, request};
use jellyclip::{BitrateMode, ClipInterval, Codec, Config, Error, RequestOptions};

#[derive(Debug, Clone, PartialEq)]
struct RecordedJob {
    input: String,
    header: String,
    clip: Option<ClipInterval>,
    size_limit_bytes: Option<u64>,
    output: PathBuf,
    overwrite: bool,
}

#[derive(Default)]
struct FakeTranscoder {
    jobs: RefCell<Vec<RecordedJob>>,
    fail_with_partial_output: bool,
}

impl Transcoder for FakeTranscoder {
    fn transcode(&self, job: &TranscodeJob<'_>) -> Result<(), transcode::Error> {
        self.jobs.borrow_mut().push(RecordedJob {
            input: job.input.to_string(),
            header: job.header.to_string(),
            clip: job.clip,
            size_limit_bytes: job.size_limit_bytes,
            output: job.output.to_path_buf(),
            overwrite: job.overwrite,
        });

        fs::write(job.output, b"partial").unwrap();

        if self.fail_with_partial_output {
            return Err(transcode::Error::Ffmpeg { status: failed_status() });
        }

        Ok(())
    }
}

#[cfg(unix)]
fn failed_status() -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    ExitStatus::from_raw(1 << 8)
}

#[cfg(windows)]
fn failed_status() -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    ExitStatus::from_raw(1)
}

fn config() -> Config {
    Config::from_lookup(|name| match name {
        "API_KEY" => Some("secret".into()),
        "BASE_URL" => Some("https://media.example.com".into()),
        _ => None,
    })
    .unwrap()
}

fn options(output: &Path) -> RequestOptions {
    RequestOptions {
        media_id: "abc123".into(),
        output: output.to_path_buf(),
        clip: None,
        bitrate: BitrateMode::default(),
        codec: Codec::default(),
        audio_track_index: 1,
        overwrite: false,
    }
}

#[test]
fn size_capped_clip_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.mkv");
    let mut options = options(&output);
    options.clip = Some(jellyclip::parse_clip_interval("00:01:00-00:01:30").unwrap());
    options.bitrate = "discord".parse().unwrap();

    let transcoder = FakeTranscoder::default();
    let plan = jellyclip::download(&config(), options, &transcoder).unwrap();

    assert_eq!(plan.request.clip, ClipInterval::new(60, 30));
    assert_eq!(plan.request.video_bitrate_bps, 2_538_000);
    assert_eq!(plan.request.size_limit_bytes, Some(10_000_000));
    assert_eq!(plan.request.codec, Codec::H265);

    let jobs = transcoder.jobs.borrow();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0], RecordedJob {
        input: "https://media.example.com/Videos/abc123/main.m3u8\
                ?maxAudioChannels=2&TranscodingMaxAudioChannels=2&AudioBitrate=128000\
                &VideoBitrate=2538000&VideoCodec=h265&AudioCodec=aac&AudioStreamIndex=1"
            .into(),
        header: "Authorization: MediaBrowser Token=\"secret\"".into(),
        clip: ClipInterval::new(60, 30),
        size_limit_bytes: Some(10_000_000),
        output: output.clone(),
        overwrite: false,
    });
    assert!(output.exists());
}

#[test]
fn explicit_bitrate_without_clip() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.mp4");
    let mut options = options(&output);
    options.bitrate = "500k".parse().unwrap();
    options.codec = Codec::H264;
    options.audio_track_index = 2;

    let transcoder = FakeTranscoder::default();
    jellyclip::download(&config(), options, &transcoder).unwrap();

    let jobs = transcoder.jobs.borrow();
    assert_eq!(jobs[0].clip, None);
    assert_eq!(jobs[0].size_limit_bytes, None);
    assert!(jobs[0].input.contains("VideoBitrate=372000"));
    assert!(jobs[0].input.contains("VideoCodec=h264"));
    assert!(jobs[0].input.contains("AudioStreamIndex=2"));
}

#[test]
fn size_capped_without_clip_never_transcodes() {
    let dir = tempfile::tempdir().unwrap();
    let mut options = options(&dir.path().join("out.mkv"));
    options.bitrate = BitrateMode::SizeCapped;

    let transcoder = FakeTranscoder::default();
    let err = jellyclip::download(&config(), options, &transcoder).unwrap_err();

    assert!(matches!(
        err,
        Error::InvalidRequest {
            source: request::Error::PlanBitrate { source: bitrate::Error::MissingInterval },
        }
    ));
    assert!(transcoder.jobs.borrow().is_empty());
}

#[test]
fn size_capped_clip_too_long() {
    let dir = tempfile::tempdir().unwrap();
    let mut options = options(&dir.path().join("out.mkv"));
    options.bitrate = BitrateMode::SizeCapped;
    options.clip = Some(jellyclip::parse_clip_interval("00:00+02:01").unwrap());

    let transcoder = FakeTranscoder::default();
    let err = jellyclip::download(&config(), options, &transcoder).unwrap_err();

    assert!(matches!(
        err,
        Error::InvalidRequest {
            source: request::Error::PlanBitrate {
                source: bitrate::Error::UnsupportedDuration { duration_seconds: 121 },
            },
        }
    ));
    assert!(transcoder.jobs.borrow().is_empty());
}

#[test]
fn failed_transcode_removes_new_output() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.mkv");

    let transcoder = FakeTranscoder {
        fail_with_partial_output: true,
        ..FakeTranscoder::default()
    };
    let err = jellyclip::download(&config(), options(&output), &transcoder).unwrap_err();

    assert!(matches!(err, Error::Transcode { .. }));
    assert!(!output.exists());
}

#[test]
fn failed_transcode_keeps_preexisting_output() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.mkv");
    fs::write(&output, b"old").unwrap();
    let mut options = options(&output);
    options.overwrite = true;

    let transcoder = FakeTranscoder {
        fail_with_partial_output: true,
        ..FakeTranscoder::default()
    };

    assert!(jellyclip::download(&config(), options, &transcoder).is_err());
    assert!(output.exists());
    assert!(transcoder.jobs.borrow()[0].overwrite);
}

#[test]
fn existing_output_is_rejected_without_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.mkv");
    fs::write(&output, b"old").unwrap();

    let transcoder = FakeTranscoder::default();
    let err = jellyclip::download(&config(), options(&output), &transcoder).unwrap_err();

    assert!(matches!(err, Error::InvalidRequest { .. }));
    assert_eq!(fs::read(&output).unwrap(), b"old");
    assert!(transcoder.jobs.borrow().is_empty());
}

#[test]
fn plan_is_stable_and_serializable() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.mkv");
    let mut options = options(&output);
    options.clip = ClipInterval::new(10, 20);

    let first = jellyclip::plan(&config(), options.clone()).unwrap();
    let second = jellyclip::plan(&config(), options).unwrap();
    assert_eq!(first.url.as_str(), second.url.as_str());

    let json = serde_json::to_value(&first).unwrap();
    assert_eq!(json["url"], first.url.as_str());
    assert_eq!(json["request"]["codec"], "h265");
    assert_eq!(json["request"]["video_bitrate_bps"], 9_872_000);
    assert_eq!(json["request"]["clip"]["start_seconds"], 10);
    assert_eq!(json["request"]["clip"]["duration_seconds"], 20);
    assert!(!json.to_string().contains("secret"));
}
