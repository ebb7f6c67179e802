//! Обслуживание каталога из командной строки.

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::time::Duration;
use tracing::info;

use cinema_booking::{
    config::Config,
    database::Database,
    init_tracing,
    services::{
        catalogue::{self, CatalogueImporter},
        tmdb::TmdbClient,
    },
};

#[derive(Parser, Debug)]
#[command(name = "catalogue_sync")]
#[command(about = "Import and maintain the movie catalogue", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Import popular English-language movies from TMDb
    Import {
        /// Maximum number of discover pages (default: TMDB_MAX_PAGES)
        #[arg(long)]
        pages: Option<u32>,
    },

    /// Mark movies released inside a date window as now showing
    NowShowing {
        /// Window start, YYYY-MM-DD (default: `days` ago)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Window end, YYYY-MM-DD (default: today)
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Window length in days when `from` is not given
        #[arg(long, default_value = "45")]
        days: i64,
    },

    /// Delete movies without a poster and without shows
    Prune,

    /// Create a sample theatre with show times for today and tomorrow
    SeedShows {
        /// Movie to schedule (default: first now-showing movie)
        #[arg(long)]
        movie_id: Option<i32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    let config = Config::from_env().context("failed to load configuration")?;
    init_tracing(&config.app);

    let db = Database::new(&config.database)
        .await
        .context("failed to connect to database")?;
    db.run_migrations().await.context("failed to run migrations")?;

    match args.command {
        Commands::Import { pages } => {
            let tmdb = TmdbClient::new(&config.tmdb)?;
            let importer = CatalogueImporter::new(
                db.pool.clone(),
                tmdb,
                pages.unwrap_or(config.tmdb.max_pages),
                Duration::from_millis(config.tmdb.request_delay_ms),
            );
            let report = importer.run().await?;
            info!(
                "imported {} new and {} updated movies ({} skipped, {} failed)",
                report.inserted, report.updated, report.skipped, report.failed
            );
        }
        Commands::NowShowing { from, to, days } => {
            let (default_from, default_to) = catalogue::default_window(days);
            let report = catalogue::mark_now_showing(
                &db.pool,
                from.unwrap_or(default_from),
                to.unwrap_or(default_to),
            )
            .await?;
            info!("{} movies marked now showing, {} cleared", report.marked, report.cleared);
        }
        Commands::Prune => {
            let removed = catalogue::prune_posterless(&db.pool).await?;
            info!("{} movies removed", removed);
        }
        Commands::SeedShows { movie_id } => {
            let report =
                catalogue::seed_sample_showtimes(&db.pool, movie_id, Utc::now().date_naive()).await?;
            info!(
                "{} show times created for movie {} at theatre {}",
                report.created, report.movie_id, report.theatre_id
            );
        }
    }

    db.pool.close().await;
    Ok(())
}
