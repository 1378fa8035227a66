use std::ffi::OsString;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use snafu::{ensure, ResultExt, Snafu};
use url::Url;
use crate::interval::ClipInterval;

/// One invocation of the transcoding engine.
#[derive(Debug, Clone, Copy)]
pub struct TranscodeJob<'a> {
    pub input: &'a Url,
    /// Raw header line sent with every HTTP request, without the trailing CRLF.
    pub header: &'a str,
    /// Seek and duration applied on the input side.
    pub clip: Option<ClipInterval>,
    /// Output size cap in bytes.
    pub size_limit_bytes: Option<u64>,
    pub output: &'a Path,
    pub overwrite: bool,
}

/// Something that can turn a stream URL into a local file.
pub trait Transcoder {
    fn transcode(&self, job: &TranscodeJob<'_>) -> Result<(), Error>;
}

/// Runs the `ffmpeg` binary, stream-copying the already transcoded input.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    program: PathBuf,
}

impl Ffmpeg {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Ffmpeg { program: program.into() }
    }

    pub fn args(job: &TranscodeJob<'_>) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-hide_banner".into(),
            "-nostats".into(),
            "-progress".into(), "pipe:1".into(),
            "-loglevel".into(), "error".into(),
            (if job.overwrite { "-y" } else { "-n" }).into(),
        ];

        if let Some(clip) = job.clip {
            args.push("-ss".into());
            args.push(clip.start_seconds().to_string().into());
            args.push("-t".into());
            args.push(clip.duration_seconds().to_string().into());
        }

        args.push("-headers".into());
        args.push(format!("{}\r\n", job.header).into());
        args.push("-i".into());
        args.push(job.input.as_str().into());
        args.push("-c".into());
        args.push("copy".into());

        if let Some(limit) = job.size_limit_bytes {
            args.push("-fs".into());
            args.push(limit.to_string().into());
        }

        args.push(job.output.into());
        args
    }
}

impl Transcoder for Ffmpeg {
    fn transcode(&self, job: &TranscodeJob<'_>) -> Result<(), Error> {
        let program = self.program.as_path();

        tracing::debug!(program = %program.display(), output = %job.output.display(), "starting ffmpeg");

        let mut ffmpeg = Command::new(program)
            .args(Self::args(job))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .spawn()
            .context(ProcessSnafu { program })?;

        if let Some(stdout) = ffmpeg.stdout.take() {
            let mut progress = Progress::new(job.clip.map(|clip| clip.duration_seconds()));

            for line in BufReader::new(stdout).lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(_) => break,
                };

                if let Some(percent) = progress.update(&line) {
                    eprint!("\rEncoding progress: {:.2}%", percent);
                    io::stderr().flush().ok();
                }
            }

            if progress.reported() {
                eprintln!();
            }
        }

        let status = ffmpeg.wait().context(ProcessSnafu { program })?;
        ensure!(status.success(), FfmpegSnafu { status });

        Ok(())
    }
}

/// Tracks ffmpeg's `-progress` key/value output.
#[derive(Debug)]
pub struct Progress {
    duration_us: Option<f64>,
    reported: bool,
}

impl Progress {
    pub fn new(duration_seconds: Option<u64>) -> Self {
        Progress {
            duration_us: duration_seconds.map(|secs| secs as f64 * 1_000_000.),
            reported: false,
        }
    }

    /// Returns the completion percentage if `line` carries the output position.
    pub fn update(&mut self, line: &str) -> Option<f64> {
        // Both keys are in microseconds.
        const OUT_TIME_US: &str = "out_time_us=";
        const OUT_TIME_MS: &str = "out_time_ms=";

        let duration_us = self.duration_us?;
        let value = line
            .strip_prefix(OUT_TIME_US)
            .or_else(|| line.strip_prefix(OUT_TIME_MS))?;
        let position = value.trim().parse::<f64>().ok()?;

        self.reported = true;

        Some((position / duration_us * 100.).max(0.).min(100.))
    }

    pub fn reported(&self) -> bool {
        self.reported
    }
}

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Could not run {}: {}", program.display(), source))]
    Process {
        program: PathBuf,
        source: io::Error,
    },
    #[snafu(display("ffmpeg exited unsuccessfully ({})", status))]
    Ffmpeg {
        status: ExitStatus,
    },
}
