use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

use tubefetch::jobs::JobKind;

#[derive(Parser, Debug)]
#[command(name = "tubefetch")]
#[command(about = "Download videos, audio and playlists through yt-dlp", long_about = None)]
pub struct Cli {
    /// Config file (overrides TUBEFETCH_CONFIG and config/tubefetch.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API
    Server(ServerArgs),
    /// Download one URL and wait for it to finish
    Fetch(FetchArgs),
    /// Print title, duration and uploader without downloading
    Probe(ProbeArgs),
}

#[derive(clap::Args, Debug)]
pub struct ServerArgs {
    /// Address to bind the HTTP server to [default: server.bind_addr]
    #[arg(long)]
    pub address: Option<SocketAddr>,
}

#[derive(clap::Args, Debug)]
pub struct FetchArgs {
    pub url: String,

    #[arg(long, short, default_value = "video", value_parser = parse_kind)]
    pub kind: JobKind,

    /// e.g. Best, 1080p, 720p for video; 192k, 128k for audio [default: jobs.default_quality]
    #[arg(long, short)]
    pub quality: Option<String>,

    /// Created if missing [default: jobs.default_output_dir]
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Do not look the URL up before downloading
    #[arg(long)]
    pub skip_probe: bool,
}

#[derive(clap::Args, Debug)]
pub struct ProbeArgs {
    pub url: String,
}

fn parse_kind(value: &str) -> Result<JobKind, String> {
    value.parse().map_err(|e: tubefetch::jobs::UnknownKind| e.to_string())
}
