//! Subcommand bodies.  Each builds the real collaborators from config and
//! drives one piece of the core.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::{info, warn};

use cinedex_core::catalog::{load_listing, CatalogSource, Listing};
use cinedex_core::classify::Route;
use cinedex_core::config::Config;
use cinedex_core::facets::{FacetFilterEngine, ViewMode};
use cinedex_core::firestore::FirestoreStore;
use cinedex_core::model::{CatalogItem, Collection, ProfileCollectionEntry};
use cinedex_core::profile::{parse_preferences, toggle_preference, UserDocument};
use cinedex_core::recommend::RecommendationDeriver;
use cinedex_core::search::DebouncedQuery;
use cinedex_core::store::ProfileStore;
use cinedex_core::sync::{LiveCollectionSync, SyncUpdate};
use cinedex_core::tmdb::TmdbClient;

/// Gap between replayed keystrokes; shorter than any sane debounce window.
const KEYSTROKE_GAP: Duration = Duration::from_millis(60);

fn catalog(config: &Config) -> Result<Arc<dyn CatalogSource>> {
    if config.catalog.resolved_api_key().is_empty() {
        bail!(
            "no TMDB key: set catalog.api_key in {} or TMDB_API_KEY",
            Config::config_path().display()
        );
    }
    Ok(Arc::new(TmdbClient::new(&config.catalog)?))
}

fn profile_store(config: &Config) -> Result<Arc<dyn ProfileStore>> {
    let store = FirestoreStore::new(&config.profile_store).with_context(|| {
        format!(
            "profile store is not configured in {}",
            Config::config_path().display()
        )
    })?;
    Ok(Arc::new(store))
}

// ── search ────────────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Text to type.
    pub text: String,
}

pub async fn search(args: SearchArgs, config: &Config) -> Result<()> {
    let mut query = DebouncedQuery::new(catalog(config)?, config.search.debounce());

    let mut typed = String::new();
    for ch in args.text.chars() {
        typed.push(ch);
        query.on_input(&typed);
        tokio::time::sleep(KEYSTROKE_GAP).await;
    }

    while let Some(event) = query.next_event().await {
        info!("search event: {:?}", event);
    }

    if let Some(notice) = query.notice() {
        println!("{notice}");
    }
    let results = query.results();
    print_bucket(
        "Movies",
        results
            .movies
            .iter()
            .map(|r| (r.title.as_str(), Route::Movie(r.id))),
    );
    print_bucket(
        "TV Shows",
        results
            .shows
            .iter()
            .map(|r| (r.title.as_str(), Route::Show(r.id))),
    );
    print_bucket(
        "Actors",
        results
            .people
            .iter()
            .map(|p| (p.name.as_str(), Route::Actor(p.id))),
    );
    Ok(())
}

fn print_bucket<'a>(heading: &str, rows: impl Iterator<Item = (&'a str, Route)>) {
    let rows: Vec<_> = rows.collect();
    if rows.is_empty() {
        return;
    }
    println!("{heading}");
    for (name, route) in rows {
        println!("  {:<48} {}", name, route.path());
    }
}

// ── browse ────────────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct BrowseArgs {
    /// popular, trending, upcoming or people.
    #[arg(long, default_value = "popular")]
    pub listing: String,

    /// Genre id to include; repeat for more.
    #[arg(long)]
    pub genre: Vec<u32>,

    #[arg(long)]
    pub year: Option<String>,

    #[arg(long)]
    pub min_rating: Option<f32>,

    #[arg(long)]
    pub max_rating: Option<f32>,

    /// Free-text filter token; repeat for more.
    #[arg(long)]
    pub contains: Vec<String>,

    /// grid or list.
    #[arg(long, default_value = "grid")]
    pub view: String,
}

pub async fn browse(args: BrowseArgs, config: &Config) -> Result<()> {
    let listing = Listing::from_label(&args.listing)
        .with_context(|| format!("unknown listing {:?}", args.listing))?;
    let view = ViewMode::from_label(&args.view)
        .with_context(|| format!("unknown view mode {:?}", args.view))?;

    let catalog = catalog(config)?;
    let genre_names: HashMap<u32, String> = match catalog.genre_catalog().await {
        Ok(genres) => genres.into_iter().map(|g| (g.id, g.name)).collect(),
        Err(e) => {
            warn!("genre catalog unavailable: {}", e);
            HashMap::new()
        }
    };

    let (cache, notice) = load_listing(catalog.as_ref(), listing).await;
    if let Some(notice) = notice {
        println!("{notice}");
    }

    let mut engine = FacetFilterEngine::new();
    for id in &args.genre {
        engine.toggle_genre(*id);
    }
    if let Some(year) = &args.year {
        engine.toggle_year(year);
    }
    if let Some(min) = args.min_rating {
        engine.set_min_rating(min);
    }
    if let Some(max) = args.max_rating {
        engine.set_max_rating(max);
    }
    for token in &args.contains {
        engine.add_token(token);
    }
    engine.set_view_mode(view);

    let visible = engine.apply(&cache);
    println!(
        "{} of {} {} titles",
        visible.len(),
        cache.len(),
        listing.label()
    );
    for item in &visible {
        print_item(item, engine.state().view_mode, &genre_names, config);
    }
    Ok(())
}

fn print_item(
    item: &CatalogItem,
    view: ViewMode,
    genre_names: &HashMap<u32, String>,
    config: &Config,
) {
    let year = item.year_label().unwrap_or_else(|| "----".to_string());
    match view {
        ViewMode::Grid => println!("  {:<40} {} {:>4.1}", item.title, year, item.rating),
        ViewMode::List => {
            let genres: Vec<&str> = item
                .genre_ids
                .iter()
                .filter_map(|id| genre_names.get(id).map(String::as_str))
                .collect();
            println!("  {} ({}) [{}]", item.title, year, item.kind.label());
            println!("      rating {:.1}  genres {}", item.rating, genres.join(", "));
            if let Some(url) = item.image_url(&config.catalog.image_base_url) {
                println!("      {url}");
            }
        }
    }
}

// ── recommend ─────────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RecommendArgs {
    /// Comma-separated genre names, e.g. "Horror,Science Fiction".
    pub genres: String,
}

pub async fn recommend(args: RecommendArgs, config: &Config) -> Result<()> {
    let deriver = RecommendationDeriver::new(catalog(config)?, config.recommendations.max_results);
    let picks = deriver.derive(&parse_preferences(&args.genres)).await;
    if picks.is_empty() {
        println!("No recommendations.");
    }
    for item in &picks {
        print_item(item, ViewMode::Grid, &HashMap::new(), config);
    }
    Ok(())
}

// ── profile ───────────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ProfileArgs {
    pub uid: String,

    /// Mirror updates to print before exiting.
    #[arg(long, default_value = "2")]
    pub updates: usize,
}

pub async fn profile(args: ProfileArgs, config: &Config) -> Result<()> {
    let store = profile_store(config)?;

    match store.fetch_user(&args.uid).await? {
        Some(user) => {
            println!("{} {}", user.username, user.profile_picture);
            println!("preferences: {}", user.preference_list().join(", "));
        }
        None => println!("no profile document for {}", args.uid),
    }

    let mut sync = LiveCollectionSync::new(store);
    sync.attach(&args.uid);
    for _ in 0..args.updates {
        match sync.next_update().await {
            Some(SyncUpdate::Replaced { .. }) => print_mirror(&sync, config),
            Some(SyncUpdate::Disconnected { error, .. }) => println!("{error}"),
            None => break,
        }
    }
    sync.teardown();
    Ok(())
}

fn print_mirror(sync: &LiveCollectionSync, config: &Config) {
    let base = &config.catalog.image_base_url;
    println!("watchlist ({})", sync.watchlist().len());
    for entry in sync.watchlist() {
        print_entry(entry, base);
    }
    println!("rated ({})", sync.rated_items().len());
    for entry in sync.rated_items() {
        print_entry(entry, base);
    }
}

fn print_entry(entry: &ProfileCollectionEntry, image_base: &str) {
    match entry.rating {
        Some(r) => println!("  {:<12} {:<40} {:>4.1}", entry.id, entry.title, r),
        None => println!("  {:<12} {:<40} {}", entry.id, entry.title, entry.poster_url(image_base)),
    }
}

// ── unwatch ───────────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct UnwatchArgs {
    pub uid: String,
    pub entry_id: String,
}

pub async fn unwatch(args: UnwatchArgs, config: &Config) -> Result<()> {
    let mut sync = LiveCollectionSync::new(profile_store(config)?);
    sync.attach(&args.uid);

    // initial snapshot of both collections
    for _ in 0..Collection::ALL.len() {
        if sync.next_update().await.is_none() {
            break;
        }
    }

    sync.remove_from_watchlist(&args.entry_id).await?;
    println!("delete requested for {}", args.entry_id);

    // the mirror only changes once the store reports the new state
    let wait = config.profile_store.poll_interval() * 3;
    let confirmed = tokio::time::timeout(wait, async {
        while let Some(update) = sync.next_update().await {
            if let SyncUpdate::Replaced {
                collection: Collection::Watchlist,
                ..
            } = update
            {
                return true;
            }
        }
        false
    })
    .await
    .unwrap_or(false);

    if !confirmed {
        println!("store has not confirmed the removal yet");
    }
    print_mirror(&sync, config);
    sync.teardown();
    Ok(())
}

// ── prefs ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PrefsArgs {
    pub uid: String,

    /// Comma-separated genre names.
    pub genres: String,

    /// Toggle each genre against the stored list instead of replacing it.
    #[arg(long)]
    pub toggle: bool,
}

pub async fn prefs(args: PrefsArgs, config: &Config) -> Result<()> {
    let store = profile_store(config)?;
    let mut user: UserDocument = store.fetch_user(&args.uid).await?.unwrap_or_default();

    let requested = parse_preferences(&args.genres);
    let genres = if args.toggle {
        let mut current = user.preference_list();
        for genre in &requested {
            toggle_preference(&mut current, genre);
        }
        current
    } else {
        requested
    };
    user.set_preferences(&genres);

    store.merge_user(&args.uid, &user).await?;
    println!("preferences: {}", user.preferences);
    Ok(())
}
