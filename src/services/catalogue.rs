//! catalogue.rs
//!
//! Наполнение и обслуживание каталога: импорт из TMDb, отметка "сейчас в прокате",
//! чистка фильмов без постера и тестовое расписание сеансов.
//!
//! Все записи идемпотентны: повторный импорт обновляет существующие строки,
//! а не плодит дубликаты.

use chrono::{Duration as ChronoDuration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::{PgExecutor, PgPool};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::services::tmdb::{is_importable, pick_trailer, DiscoveredMovie, TmdbClient, TmdbError};

const SAMPLE_DISTRICT: &str = "Sample District";
const SAMPLE_THEATRE: &str = "Sample Theatre";

#[derive(Debug, Error)]
pub enum CatalogueError {
    #[error(transparent)]
    Tmdb(#[from] TmdbError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("invalid window: {from} is after {to}")]
    InvalidWindow { from: NaiveDate, to: NaiveDate },
    #[error("no movies in the catalogue, run the import first")]
    NoMovies,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub pages: u32,
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NowShowingReport {
    pub marked: u64,
    pub cleared: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub movie_id: i32,
    pub theatre_id: i32,
    pub created: u64,
}

pub struct CatalogueImporter {
    pool: PgPool,
    tmdb: TmdbClient,
    max_pages: u32,
    delay: Duration,
}

impl CatalogueImporter {
    pub fn new(pool: PgPool, tmdb: TmdbClient, max_pages: u32, delay: Duration) -> Self {
        Self { pool, tmdb, max_pages, delay }
    }

    /// Проходит страницы discover, пока они не кончатся или не упрёмся в `max_pages`.
    /// Ошибка одного фильма не останавливает импорт.
    pub async fn run(&self) -> Result<ImportReport, CatalogueError> {
        let mut report = ImportReport::default();
        let mut page = 1;

        while page <= self.max_pages {
            let discovered = self.tmdb.discover_movies(page).await?;
            report.pages += 1;

            if discovered.results.is_empty() {
                info!("page {} is empty, stopping", page);
                break;
            }
            info!(
                "page {}/{}: {} movies",
                page,
                discovered.total_pages,
                discovered.results.len()
            );

            for movie in &discovered.results {
                let release = match is_importable(movie) {
                    Ok(date) => date,
                    Err(reason) => {
                        debug!("skipping {:?}: {}", movie.title, reason);
                        report.skipped += 1;
                        continue;
                    }
                };

                match self.import_movie(movie, release).await {
                    Ok(true) => report.inserted += 1,
                    Ok(false) => report.updated += 1,
                    Err(e) => {
                        warn!("failed to import {:?} (tmdb {}): {}", movie.title, movie.id, e);
                        report.failed += 1;
                    }
                }

                tokio::time::sleep(self.delay).await;
            }

            if page >= discovered.total_pages {
                break;
            }
            page += 1;
        }

        info!(
            "import done: {} inserted, {} updated, {} skipped, {} failed over {} pages",
            report.inserted, report.updated, report.skipped, report.failed, report.pages
        );
        Ok(report)
    }

    /// Возвращает `true`, если фильм новый.
    async fn import_movie(&self, movie: &DiscoveredMovie, release: NaiveDate) -> Result<bool, CatalogueError> {
        let (details, videos, credits) = futures::try_join!(
            self.tmdb.movie_details(movie.id),
            self.tmdb.movie_videos(movie.id),
            self.tmdb.credits(movie.id),
        )?;

        let mut tx = self.pool.begin().await?;

        let dir_id = match credits.director() {
            Some(name) => Some(upsert_director(&mut *tx, name).await?),
            None => None,
        };

        let record = MovieRecord {
            name: &movie.title,
            language: &movie.original_language,
            release_date: release,
            synopsis: movie.overview.as_deref().filter(|s| !s.trim().is_empty()),
            runtime: details.runtime.filter(|r| *r > 0),
            poster: self.tmdb.image_url(movie.poster_path.as_deref()),
            trailer: pick_trailer(&videos),
            rating: movie.vote_average,
            dir_id,
        };
        let (movie_id, inserted) = upsert_movie(&mut *tx, &record).await?;

        for (order, member) in credits.top_cast().iter().enumerate() {
            let photo = self.tmdb.image_url(member.profile_path.as_deref());
            let cast_id = upsert_cast_member(&mut *tx, &member.name, photo.as_deref()).await?;
            link_cast(&mut *tx, movie_id, cast_id, order as i32).await?;
        }

        tx.commit().await?;

        debug!("imported {:?} as movie {} (new: {})", movie.title, movie_id, inserted);
        Ok(inserted)
    }
}

struct MovieRecord<'a> {
    name: &'a str,
    language: &'a str,
    release_date: NaiveDate,
    synopsis: Option<&'a str>,
    runtime: Option<i32>,
    poster: Option<String>,
    trailer: Option<String>,
    rating: Option<f64>,
    dir_id: Option<i32>,
}

async fn upsert_director<'e, E: PgExecutor<'e>>(executor: E, name: &str) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar(
        "INSERT INTO directors (dir_name) VALUES ($1)
         ON CONFLICT (dir_name) DO UPDATE SET dir_name = EXCLUDED.dir_name
         RETURNING dir_id"
    )
    .bind(name)
    .fetch_one(executor)
    .await
}

async fn upsert_cast_member<'e, E: PgExecutor<'e>>(
    executor: E,
    name: &str,
    photo: Option<&str>,
) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar(
        "INSERT INTO cast_members (name, photo) VALUES ($1, $2)
         ON CONFLICT (name) DO UPDATE SET photo = COALESCE(cast_members.photo, EXCLUDED.photo)
         RETURNING cast_id"
    )
    .bind(name)
    .bind(photo)
    .fetch_one(executor)
    .await
}

/// `xmax = 0` только у только что вставленной строки.
async fn upsert_movie<'e, E: PgExecutor<'e>>(
    executor: E,
    movie: &MovieRecord<'_>,
) -> Result<(i32, bool), sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO movies (name, language, release_date, synopsis, runtime, poster, trailer, rating, dir_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (name, release_date) DO UPDATE SET
            synopsis = COALESCE(EXCLUDED.synopsis, movies.synopsis),
            runtime  = COALESCE(EXCLUDED.runtime, movies.runtime),
            poster   = COALESCE(EXCLUDED.poster, movies.poster),
            trailer  = COALESCE(EXCLUDED.trailer, movies.trailer),
            rating   = COALESCE(EXCLUDED.rating, movies.rating),
            dir_id   = COALESCE(EXCLUDED.dir_id, movies.dir_id)
        RETURNING movie_id, (xmax = 0) AS inserted
        "#
    )
    .bind(movie.name)
    .bind(movie.language)
    .bind(movie.release_date)
    .bind(movie.synopsis)
    .bind(movie.runtime)
    .bind(movie.poster.as_deref())
    .bind(movie.trailer.as_deref())
    .bind(movie.rating)
    .bind(movie.dir_id)
    .fetch_one(executor)
    .await
}

async fn link_cast<'e, E: PgExecutor<'e>>(
    executor: E,
    movie_id: i32,
    cast_id: i32,
    billing_order: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO movie_cast (movie_id, cast_id, billing_order) VALUES ($1, $2, $3)
         ON CONFLICT (movie_id, cast_id) DO UPDATE SET billing_order = EXCLUDED.billing_order"
    )
    .bind(movie_id)
    .bind(cast_id)
    .bind(billing_order)
    .execute(executor)
    .await?;
    Ok(())
}

/// Фильмы с релизом в окне `[from, to]` в прокате, остальные сняты.
pub async fn mark_now_showing(
    pool: &PgPool,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<NowShowingReport, CatalogueError> {
    if from > to {
        return Err(CatalogueError::InvalidWindow { from, to });
    }

    let mut tx = pool.begin().await?;

    let cleared = sqlx::query(
        "UPDATE movies SET now_showing = FALSE
         WHERE now_showing AND (release_date IS NULL OR release_date NOT BETWEEN $1 AND $2)"
    )
    .bind(from)
    .bind(to)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let marked = sqlx::query(
        "UPDATE movies SET now_showing = TRUE
         WHERE NOT now_showing AND release_date BETWEEN $1 AND $2"
    )
    .bind(from)
    .bind(to)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    tx.commit().await?;

    info!("now showing {}..{}: {} marked, {} cleared", from, to, marked, cleared);
    Ok(NowShowingReport { marked, cleared })
}

/// Удаляет фильмы без постера, у которых нет сеансов.
pub async fn prune_posterless(pool: &PgPool) -> Result<u64, CatalogueError> {
    let removed = sqlx::query(
        "DELETE FROM movies m
         WHERE (m.poster IS NULL OR btrim(m.poster) = '')
           AND NOT EXISTS (SELECT 1 FROM shows s WHERE s.movie_id = m.movie_id)"
    )
    .execute(pool)
    .await?
    .rows_affected();

    info!("pruned {} movies without a poster", removed);
    Ok(removed)
}

/// Тестовое расписание: сегодня 14:00 и 19:30, завтра 12:00, 16:00 и 20:00 (UTC).
pub fn sample_show_times(today: NaiveDate) -> Vec<NaiveDateTime> {
    let tomorrow = today + ChronoDuration::days(1);
    [
        (today, 14, 0),
        (today, 19, 30),
        (tomorrow, 12, 0),
        (tomorrow, 16, 0),
        (tomorrow, 20, 0),
    ]
    .into_iter()
    .filter_map(|(date, h, m)| NaiveTime::from_hms_opt(h, m, 0).map(|t| date.and_time(t)))
    .collect()
}

/// Создаёт район, кинотеатр и сеансы для фильма `movie_id`
/// (по умолчанию первого в прокате, иначе первого в каталоге).
pub async fn seed_sample_showtimes(
    pool: &PgPool,
    movie_id: Option<i32>,
    today: NaiveDate,
) -> Result<SeedReport, CatalogueError> {
    let mut tx = pool.begin().await?;

    let movie_id: Option<i32> = match movie_id {
        Some(id) => sqlx::query_scalar::<_, i32>("SELECT movie_id FROM movies WHERE movie_id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?,
        None => sqlx::query_scalar::<_, i32>(
            "SELECT movie_id FROM movies ORDER BY now_showing DESC, movie_id LIMIT 1"
        )
        .fetch_optional(&mut *tx)
        .await?,
    };
    let movie_id = movie_id.ok_or(CatalogueError::NoMovies)?;

    let district_id: i32 = sqlx::query_scalar(
        "INSERT INTO districts (name) VALUES ($1)
         ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
         RETURNING district_id"
    )
    .bind(SAMPLE_DISTRICT)
    .fetch_one(&mut *tx)
    .await?;

    let theatre_id: i32 = sqlx::query_scalar(
        "INSERT INTO theatres (name, district_id) VALUES ($1, $2)
         ON CONFLICT (name, district_id) DO UPDATE SET name = EXCLUDED.name
         RETURNING theatre_id"
    )
    .bind(SAMPLE_THEATRE)
    .bind(district_id)
    .fetch_one(&mut *tx)
    .await?;

    let mut created = 0;
    for time in sample_show_times(today) {
        created += sqlx::query(
            "INSERT INTO shows (movie_id, theatre_id, show_time) VALUES ($1, $2, $3)
             ON CONFLICT (movie_id, theatre_id, show_time) DO NOTHING"
        )
        .bind(movie_id)
        .bind(theatre_id)
        .bind(time.and_utc())
        .execute(&mut *tx)
        .await?
        .rows_affected();
    }

    tx.commit().await?;

    info!("seeded {} show times for movie {} at theatre {}", created, movie_id, theatre_id);
    Ok(SeedReport { movie_id, theatre_id, created })
}

/// Окно проката по умолчанию: последние `days` дней по сегодня.
pub fn default_window(days: i64) -> (NaiveDate, NaiveDate) {
    let today = Utc::now().date_naive();
    (today - ChronoDuration::days(days), today)
}
