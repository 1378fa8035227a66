use std::path::PathBuf;
use std::process;
use snafu::{ResultExt, Snafu};
use structopt::StructOpt;
use tracing_subscriber::EnvFilter;
use jellyclip::bitrate::BitrateMode;
use jellyclip::config::{self, Config};
use jellyclip::{ClipInterval, Codec, Ffmpeg, RequestOptions};

#[derive(Debug, StructOpt)]
#[structopt(name = "jellyclip", about = "Download a video, or a clip of it, from a Jellyfin server")]
struct Opt {
    /// The id of the video to download
    id: String,
    /// The output file. Its directory must already exist
    #[structopt(parse(from_os_str))]
    output: PathBuf,
    /// Clip the specified interval: (HH:)MM:SS-(HH:)MM:SS or (HH:)MM:SS+(MM:)SS
    #[structopt(long, parse(try_from_str = jellyclip::parse_clip_interval))]
    clip: Option<ClipInterval>,
    /// The index of the audio stream to download
    #[structopt(long, default_value = "1")]
    audio_index: u32,
    /// The target bitrate in bits/second (k and M suffixes allowed), or "discord" to fit the
    /// clip under the size limit
    #[structopt(long, default_value = "10000000")]
    bitrate: BitrateMode,
    /// The codec to use for the video
    #[structopt(long, default_value = "h265", possible_values = Codec::NAMES)]
    codec: Codec,
    /// Byte limit for "discord" bitrate, overriding SIZE_LIMIT
    #[structopt(long, parse(try_from_str = config::parse_size_limit))]
    size_limit: Option<u64>,
    /// Read API_KEY and BASE_URL from this file instead of ./.env
    #[structopt(long, parse(from_os_str))]
    env_file: Option<PathBuf>,
    /// Overwrite the output file if it exists
    #[structopt(short, long)]
    force: bool,
    /// Print the planned download as JSON instead of running ffmpeg
    #[structopt(long)]
    dry_run: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("jellyclip=info")))
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let opt = Opt::from_args();

    if let Err(e) = run(opt) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

impl Opt {
    fn request_options(&self) -> RequestOptions {
        RequestOptions {
            media_id: self.id.clone(),
            output: self.output.clone(),
            clip: self.clip,
            bitrate: self.bitrate,
            codec: self.codec,
            audio_track_index: self.audio_index,
            overwrite: self.force,
        }
    }
}

fn run(opt: Opt) -> Result<(), Error> {
    config::load_env_file(opt.env_file.as_deref()).context(ConfigSnafu)?;

    let mut config = Config::from_env().context(ConfigSnafu)?;
    if let Some(limit) = opt.size_limit {
        config.size_limit_bytes = limit;
    }

    tracing::debug!(?config, "loaded configuration");

    let options = opt.request_options();

    if opt.dry_run {
        let plan = jellyclip::plan(&config, options).context(DownloadSnafu)?;
        let json = serde_json::to_string_pretty(&plan).context(PrintPlanSnafu)?;
        println!("{}", json);
        return Ok(());
    }

    let plan = jellyclip::download(&config, options, &Ffmpeg::new(&config.ffmpeg)).context(DownloadSnafu)?;

    eprintln!("Done! You can open the output file '{}' to see the result", plan.request.output.display());

    Ok(())
}

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("{}", source))]
    Config {
        source: config::Error,
    },
    #[snafu(display("{}", source))]
    Download {
        source: jellyclip::Error,
    },
    #[snafu(display("Could not print plan: {}", source))]
    PrintPlan {
        source: serde_json::Error,
    },
}
