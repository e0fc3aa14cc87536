use anyhow::{Context, anyhow};
use clap::{Args, Parser, Subcommand};
use std::{
    path::PathBuf,
    sync::{Arc, atomic::AtomicBool},
    time::Duration,
};

use crate::{
    config::Config,
    http::server::HttpServer,
    ingest::{
        gateway::Gateway,
        message::{MessageAdapter, MessageBus},
        socket::SocketFeed,
    },
    library::{
        self,
        filter::TrackFilter,
        playlist::{Playlist, PlaylistStore},
        stats::LibraryStats,
    },
    notify::LogNotifier,
};

const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "musicdeck")]
#[command(version = "0.1")]
#[command(about = "Music library browser and track ingestion service")]
pub struct Cli {
    /// Path to the config TOML file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run http server, and the socket feed when configured
    Serve,
    /// Submit a JSON track payload through the in-process message channel
    Ingest {
        /// File holding the candidate track
        file: PathBuf,
    },
    /// List tracks in the library
    List(ListArgs),
    /// Show library statistics
    Stats,
    /// Build a playlist from library tracks and print it
    Playlist(PlaylistArgs),
}

#[derive(Args, Debug)]
pub struct PlaylistArgs {
    #[arg(short, long)]
    pub name: String,
    #[arg(short, long)]
    pub description: Option<String>,
    #[arg(long)]
    pub cover_image: Option<String>,
    /// Comma separated track ids, in playlist order
    #[arg(short, long, value_delimiter = ',')]
    pub tracks: Vec<String>,
}

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Case-insensitive match on title, artist or genre
    #[arg(short, long)]
    pub search: Option<String>,
    #[arg(long, value_delimiter = ',')]
    pub genre: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    pub mood: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    pub instrument: Vec<String>,
    #[arg(long)]
    pub bpm_min: Option<f64>,
    #[arg(long)]
    pub bpm_max: Option<f64>,
    #[arg(long)]
    pub energy_min: Option<f64>,
    #[arg(long)]
    pub energy_max: Option<f64>,
}

impl ListArgs {
    fn into_filter(self) -> TrackFilter {
        let defaults = TrackFilter::default();
        TrackFilter {
            search: self.search,
            genres: self.genre,
            moods: self.mood,
            instruments: self.instrument,
            bpm_range: (
                self.bpm_min.unwrap_or(defaults.bpm_range.0),
                self.bpm_max.unwrap_or(defaults.bpm_range.1),
            ),
            energy_range: (
                self.energy_min.unwrap_or(defaults.energy_range.0),
                self.energy_max.unwrap_or(defaults.energy_range.1),
            ),
        }
    }
}

/// Entrypoint for CLI
pub fn run() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;
    let store = library::open_store(&cfg.library)?;

    match cli.command {
        Commands::Serve => {
            let gateway = Arc::new(Gateway::new(store.clone(), Arc::new(LogNotifier)));

            if let Some(socket) = cfg.socket {
                println!("Starting socket feed from {}...", socket.addr);
                let stop = Arc::new(AtomicBool::new(false));
                SocketFeed::new(socket, Arc::clone(&gateway)).spawn(stop);
            }

            println!("Starting HTTP server...");
            let http_server =
                HttpServer::new(gateway, store, PlaylistStore::new().shared(), cfg.http);
            println!(
                "HTTP server running at http://{}:{}",
                http_server.config.bind_addr, http_server.config.port
            );
            http_server.run();
        }

        Commands::Ingest { file } => {
            let contents = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.to_string_lossy()))?;
            let track: serde_json::Value = serde_json::from_str(&contents)
                .with_context(|| format!("{} is not valid JSON", file.to_string_lossy()))?;

            let gateway = Arc::new(Gateway::new(store.clone(), Arc::new(LogNotifier)));
            let bus = MessageBus::attach(MessageAdapter::new(cfg.app.origin.clone(), gateway));
            let replies = bus.post(
                cfg.app.origin.clone(),
                serde_json::json!({ "type": crate::ingest::ADD_MUSIC_TRACK, "track": track }),
            )?;
            let reply = replies
                .recv_timeout(REPLY_TIMEOUT)
                .map_err(|e| anyhow!("No reply from the message channel: {e}"))?;
            bus.detach();

            println!("Reply to {}:", reply.target_origin);
            println!("{}", serde_json::to_string_pretty(&reply.body)?);
            let store = store
                .lock()
                .map_err(|e| anyhow!("Could not access track store under lock: {e}"))?;
            println!("Library now holds {} tracks", store.len());
        }

        Commands::List(args) => {
            let filter = args.into_filter();
            let store = store
                .lock()
                .map_err(|e| anyhow!("Could not access track store under lock: {e}"))?;
            let tracks = store.filter(&filter);

            if tracks.is_empty() {
                println!("No tracks found :(");
            }
            for track in tracks {
                println!(
                    "{}  {} - {}  [{}]  {:.0} bpm, energy {:.2}",
                    track.id,
                    track.artist,
                    track.title,
                    track.top_genre(),
                    track.bpm,
                    track.energy
                );
            }
        }

        Commands::Stats => {
            let store = store
                .lock()
                .map_err(|e| anyhow!("Could not access track store under lock: {e}"))?;
            let stats = LibraryStats::compute(store.tracks());
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }

        Commands::Playlist(args) => {
            let store = store
                .lock()
                .map_err(|e| anyhow!("Could not access track store under lock: {e}"))?;
            let tracks = args
                .tracks
                .iter()
                .map(|id| {
                    store
                        .find(id)
                        .cloned()
                        .ok_or_else(|| anyhow!("No track with id {id} in the library"))
                })
                .collect::<anyhow::Result<Vec<_>>>()?;
            let playlist = Playlist::create(
                &args.name,
                args.description.as_deref(),
                args.cover_image.as_deref(),
                tracks,
            )
            .context("Could not create playlist")?;

            let summary = playlist.summary();
            println!(
                "{}: {} tracks, {:.0} min, mostly {}",
                summary.name,
                summary.track_count,
                summary.duration_seconds / 60.0,
                summary.primary_genre
            );
            for track in &playlist.tracks {
                println!("  {}  {} - {}", track.id, track.artist, track.title);
            }
        }
    }

    Ok(())
}
