use clap::{Parser, Subcommand};
use songfeed::{
    converters, CanonicalSong, ClientConfig, FileCredentialStore, SongFilter, SongfeedApi,
    SongfeedError,
};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "songfeed-cli")]
#[command(about = "CLI for songfeed - browse recommendations and liked songs", long_about = None)]
struct Cli {
    /// Backend base URL
    #[arg(long, env = "SONGFEED_BASE_URL")]
    base_url: Option<String>,

    /// File holding the session tokens
    #[arg(long, env = "SONGFEED_CREDENTIALS")]
    credentials: Option<PathBuf>,

    /// Print songs as JSON instead of a listing
    #[arg(long, global = true)]
    json: bool,

    /// Hide songs without a track ID or cover art
    #[arg(long, global = true)]
    playable: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and save the session tokens
    Login {
        username: String,

        /// Password (can also be set via SONGFEED_PASSWORD env var)
        #[arg(long, env = "SONGFEED_PASSWORD")]
        password: String,
    },
    /// Forget the saved session
    Logout,
    /// Show recommended songs
    Recommendations,
    /// Show liked songs
    Liked,
    /// Show the songs in a playlist
    Playlist { id: String },
    /// Like a track
    Like { track_id: String },
    /// Remove a track from liked songs
    Unlike { track_id: String },
    /// Normalize a saved API response ("-" reads stdin)
    Normalize { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("songfeed=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let filter = if cli.playable {
        SongFilter::Playable
    } else {
        SongFilter::All
    };

    // Offline command, no client needed
    if let Commands::Normalize { file } = &cli.command {
        let text = if file.as_os_str() == "-" {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        } else {
            std::fs::read_to_string(file)?
        };
        let payload: serde_json::Value = serde_json::from_str(&text)?;
        print_songs(&converters::normalize_with(&payload, filter), cli.json)?;
        return Ok(());
    }

    let mut config = ClientConfig::from_env();
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    if let Some(path) = cli.credentials {
        config.credentials_path = path;
    }
    let store = Arc::new(FileCredentialStore::open(&config.credentials_path));
    let api = SongfeedApi::new(config, store)?;

    let result = match &cli.command {
        Commands::Login { username, password } => api.login(username, password).await.map(|_| {
            println!("✅ Logged in as {}", username);
        }),
        Commands::Logout => {
            api.logout();
            println!("Logged out");
            Ok(())
        }
        Commands::Recommendations => api
            .recommendations(filter)
            .await
            .and_then(|songs| print_songs(&songs, cli.json)),
        Commands::Liked => api
            .liked_songs(filter)
            .await
            .and_then(|songs| print_songs(&songs, cli.json)),
        Commands::Playlist { id } => api
            .playlist_songs(id, filter)
            .await
            .and_then(|songs| print_songs(&songs, cli.json)),
        Commands::Like { track_id } => api.like_song(track_id).await.map(|_| {
            println!("❤️  Liked {}", track_id);
        }),
        Commands::Unlike { track_id } => api.unlike_song(track_id).await.map(|_| {
            println!("Removed {} from liked songs", track_id);
        }),
        Commands::Normalize { .. } => Ok(()),
    };

    match result {
        Err(e) if e.requires_login() => {
            eprintln!("{}. Run `songfeed-cli login <username>` first.", e);
            std::process::exit(2);
        }
        other => Ok(other?),
    }
}

fn print_songs(songs: &[CanonicalSong], json: bool) -> Result<(), SongfeedError> {
    if json {
        println!("{}", serde_json::to_string_pretty(songs)?);
        return Ok(());
    }

    if songs.is_empty() {
        println!("No songs.");
    }
    for (i, song) in songs.iter().enumerate() {
        println!(
            "{}. {} - {} (popularity {}, track: {})",
            i + 1,
            song.artist,
            song.title,
            song.popularity,
            if song.track_id.is_empty() {
                "?"
            } else {
                &song.track_id
            }
        );
    }
    Ok(())
}
