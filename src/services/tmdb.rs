//! tmdb.rs
//!
//! Клиент TMDb для импорта каталога.
//!
//! Каждый запрос делается до трёх раз:
//! *   на 429 ждём столько, сколько сказал `Retry-After` (по умолчанию 1 с);
//! *   на сетевые ошибки и 5xx ждём секунду;
//! *   остальные 4xx не повторяем.

use chrono::{Datelike, NaiveDate};
use reqwest::{header::RETRY_AFTER, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::TmdbConfig;

const MAX_ATTEMPTS: usize = 3;
const RETRY_BACKOFF: Duration = Duration::from_secs(1);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Дата, которой TMDb заполняет отсутствующий релиз.
const PLACEHOLDER_RELEASE: &str = "2000-01-01";
const MIN_RELEASE_YEAR: i32 = 2000;
pub const TOP_CAST: usize = 10;

#[derive(Debug, Error)]
pub enum TmdbError {
    #[error("TMDB_API_KEY is not set")]
    MissingApiKey,
    #[error("TMDb request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("TMDb returned {status} for {path}")]
    Status { status: StatusCode, path: String },
    #[error("TMDb rate limit persisted for {path}")]
    RateLimited { path: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscoverPage {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub results: Vec<DiscoveredMovie>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveredMovie {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub original_language: String,
    pub release_date: Option<String>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub vote_average: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MovieDetails {
    pub runtime: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Video {
    pub key: String,
    pub site: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub official: bool,
}

#[derive(Debug, Deserialize)]
struct VideoList {
    #[serde(default)]
    results: Vec<Video>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credits {
    #[serde(default)]
    pub cast: Vec<CastCredit>,
    #[serde(default)]
    pub crew: Vec<CrewCredit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CastCredit {
    pub name: String,
    pub character: Option<String>,
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CrewCredit {
    pub name: String,
    pub job: String,
}

impl Credits {
    pub fn director(&self) -> Option<&str> {
        self.crew
            .iter()
            .find(|member| member.job == "Director")
            .map(|member| member.name.as_str())
    }

    pub fn top_cast(&self) -> &[CastCredit] {
        &self.cast[..self.cast.len().min(TOP_CAST)]
    }
}

/// Почему фильм из discover не импортируется.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("no release date")]
    MissingReleaseDate,
    #[error("placeholder release date {PLACEHOLDER_RELEASE}")]
    PlaceholderDate,
    #[error("unparseable release date {0:?}")]
    InvalidDate(String),
    #[error("released in {0}, before {MIN_RELEASE_YEAR}")]
    TooOld(i32),
    #[error("original language is {0:?}, not English")]
    NotEnglish(String),
}

/// Фильтр импорта. Возвращает дату релиза, если фильм подходит.
pub fn is_importable(movie: &DiscoveredMovie) -> Result<NaiveDate, SkipReason> {
    let raw = movie
        .release_date
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .ok_or(SkipReason::MissingReleaseDate)?;

    if raw == PLACEHOLDER_RELEASE {
        return Err(SkipReason::PlaceholderDate);
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| SkipReason::InvalidDate(raw.to_string()))?;
    if date.year() < MIN_RELEASE_YEAR {
        return Err(SkipReason::TooOld(date.year()));
    }

    if movie.original_language != "en" {
        return Err(SkipReason::NotEnglish(movie.original_language.clone()));
    }

    Ok(date)
}

/// Официальный трейлер с YouTube, иначе любой трейлер с YouTube.
pub fn pick_trailer(videos: &[Video]) -> Option<String> {
    let is_trailer = |v: &&Video| v.kind == "Trailer" && v.site == "YouTube";
    videos
        .iter()
        .filter(is_trailer)
        .find(|v| v.official)
        .or_else(|| videos.iter().find(is_trailer))
        .map(|v| format!("https://www.youtube.com/watch?v={}", v.key))
}

/// Секунды из `Retry-After`; HTTP-дату не разбираем.
fn retry_after(value: Option<&reqwest::header::HeaderValue>) -> Duration {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(RETRY_BACKOFF)
}

#[derive(Clone)]
pub struct TmdbClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    image_base_url: String,
}

impl TmdbClient {
    pub fn new(config: &TmdbConfig) -> Result<Self, TmdbError> {
        let api_key = config.api_key.clone().ok_or(TmdbError::MissingApiKey)?;
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            image_base_url: config.image_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn image_url(&self, path: Option<&str>) -> Option<String> {
        let path = path.map(str::trim).filter(|p| !p.is_empty())?;
        Some(format!("{}{}", self.image_base_url, path))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, TmdbError> {
        let url = format!("{}{}", self.base_url, path);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let last = attempt >= MAX_ATTEMPTS;

            let response = self
                .http
                .get(&url)
                .query(&[("api_key", self.api_key.as_str())])
                .query(query)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) if !last => {
                    warn!("TMDb {} failed ({}/{}): {}", path, attempt, MAX_ATTEMPTS, e);
                    tokio::time::sleep(RETRY_BACKOFF).await;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                if last {
                    return Err(TmdbError::RateLimited { path: path.to_string() });
                }
                let wait = retry_after(response.headers().get(RETRY_AFTER));
                warn!("TMDb rate limit on {}, waiting {:?}", path, wait);
                tokio::time::sleep(wait).await;
                continue;
            }
            if status.is_server_error() && !last {
                warn!("TMDb {} returned {} ({}/{})", path, status, attempt, MAX_ATTEMPTS);
                tokio::time::sleep(RETRY_BACKOFF).await;
                continue;
            }
            if !status.is_success() {
                return Err(TmdbError::Status { status, path: path.to_string() });
            }

            debug!("TMDb {} ok after {} attempt(s)", path, attempt);
            return Ok(response.json::<T>().await?);
        }
    }

    /// Популярные англоязычные фильмы с релизом не раньше 2000 года.
    pub async fn discover_movies(&self, page: u32) -> Result<DiscoverPage, TmdbError> {
        self.get_json(
            "/discover/movie",
            &[
                ("primary_release_date.gte", PLACEHOLDER_RELEASE.to_string()),
                ("sort_by", "popularity.desc".to_string()),
                ("page", page.to_string()),
                ("include_adult", "false".to_string()),
                ("with_release_type", "2|3".to_string()),
                ("with_original_language", "en".to_string()),
            ],
        )
        .await
    }

    pub async fn movie_details(&self, tmdb_id: i64) -> Result<MovieDetails, TmdbError> {
        self.get_json(&format!("/movie/{tmdb_id}"), &[]).await
    }

    pub async fn movie_videos(&self, tmdb_id: i64) -> Result<Vec<Video>, TmdbError> {
        let list: VideoList = self.get_json(&format!("/movie/{tmdb_id}/videos"), &[]).await?;
        Ok(list.results)
    }

    pub async fn credits(&self, tmdb_id: i64) -> Result<Credits, TmdbError> {
        self.get_json(&format!("/movie/{tmdb_id}/credits"), &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(date: Option<&str>, lang: &str) -> DiscoveredMovie {
        DiscoveredMovie {
            id: 1,
            title: "Test".into(),
            original_language: lang.into(),
            release_date: date.map(String::from),
            overview: None,
            poster_path: None,
            vote_average: None,
        }
    }

    fn video(kind: &str, site: &str, official: bool, key: &str) -> Video {
        Video { key: key.into(), site: site.into(), kind: kind.into(), official }
    }

    #[test]
    fn import_filter() {
        assert_eq!(
            is_importable(&movie(Some("2019-05-01"), "en")),
            Ok(NaiveDate::from_ymd_opt(2019, 5, 1).unwrap())
        );
        assert_eq!(is_importable(&movie(None, "en")), Err(SkipReason::MissingReleaseDate));
        assert_eq!(is_importable(&movie(Some(""), "en")), Err(SkipReason::MissingReleaseDate));
        assert_eq!(is_importable(&movie(Some("2000-01-01"), "en")), Err(SkipReason::PlaceholderDate));
        assert_eq!(is_importable(&movie(Some("1999-12-31"), "en")), Err(SkipReason::TooOld(1999)));
        assert_eq!(
            is_importable(&movie(Some("2021-03-04"), "fr")),
            Err(SkipReason::NotEnglish("fr".into()))
        );
        assert!(matches!(
            is_importable(&movie(Some("soon"), "en")),
            Err(SkipReason::InvalidDate(_))
        ));
    }

    #[test]
    fn official_youtube_trailer_wins() {
        let videos = vec![
            video("Teaser", "YouTube", true, "teaser"),
            video("Trailer", "YouTube", false, "fan"),
            video("Trailer", "Vimeo", true, "vimeo"),
            video("Trailer", "YouTube", true, "official"),
        ];
        assert_eq!(
            pick_trailer(&videos).as_deref(),
            Some("https://www.youtube.com/watch?v=official")
        );
    }

    #[test]
    fn falls_back_to_any_youtube_trailer() {
        let videos = vec![video("Clip", "YouTube", true, "clip"), video("Trailer", "YouTube", false, "t1")];
        assert_eq!(pick_trailer(&videos).as_deref(), Some("https://www.youtube.com/watch?v=t1"));
        assert_eq!(pick_trailer(&[video("Trailer", "Vimeo", true, "v")]), None);
    }

    #[test]
    fn director_and_top_cast() {
        let credits: Credits = serde_json::from_value(serde_json::json!({
            "cast": (0..15).map(|i| serde_json::json!({"name": format!("Actor {i}")})).collect::<Vec<_>>(),
            "crew": [
                {"name": "Someone", "job": "Producer"},
                {"name": "Jane Doe", "job": "Director"}
            ]
        }))
        .unwrap();
        assert_eq!(credits.director(), Some("Jane Doe"));
        assert_eq!(credits.top_cast().len(), TOP_CAST);
        assert_eq!(credits.top_cast()[0].name, "Actor 0");
    }

    #[test]
    fn retry_after_parsing() {
        use reqwest::header::HeaderValue;
        assert_eq!(retry_after(Some(&HeaderValue::from_static("3"))), Duration::from_secs(3));
        assert_eq!(retry_after(Some(&HeaderValue::from_static("soon"))), RETRY_BACKOFF);
        assert_eq!(retry_after(None), RETRY_BACKOFF);
    }
}
