mod commands;

use clap::{Parser, Subcommand};

use cinedex_core::config::Config;

#[derive(Debug, Parser)]
#[command(name = "cinedex", version, about = "Search, filter and sync a movie catalog")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Type-ahead search: replays TEXT as keystrokes through the debouncer.
    Search(commands::SearchArgs),
    /// Load a listing and narrow it with facets.
    Browse(commands::BrowseArgs),
    /// Recommendations for a comma-separated genre list.
    Recommend(commands::RecommendArgs),
    /// Show a profile and follow its watchlist and ratings.
    Profile(commands::ProfileArgs),
    /// Remove an entry from a profile's watchlist.
    Unwatch(commands::UnwatchArgs),
    /// Write a profile's preferred genres.
    Prefs(commands::PrefsArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ── Logging ──────────────────────────────────────────────────────────────
    let data_dir = cinedex_core::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join("cinedex.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // RUST_LOG wins; otherwise keep HTTP client internals quiet.
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        "info,cinedex_core=debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string()
    });
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    eprintln!("cinedex log: {}", log_path.display());
    tracing::info!("cinedex starting: {:?}", cli.command);

    // ── Config ───────────────────────────────────────────────────────────────
    let config = Config::load().unwrap_or_default();

    match cli.command {
        Commands::Search(args) => commands::search(args, &config).await,
        Commands::Browse(args) => commands::browse(args, &config).await,
        Commands::Recommend(args) => commands::recommend(args, &config).await,
        Commands::Profile(args) => commands::profile(args, &config).await,
        Commands::Unwatch(args) => commands::unwatch(args, &config).await,
        Commands::Prefs(args) => commands::prefs(args, &config).await,
    }
}
