use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::cache::movies::search_key;
use crate::error::{AppError, AppResult};
use crate::models::movie::movie_exists;
use crate::models::review::MovieReview;
use crate::models::{MovieDetail, ShowTime};
use crate::search_client::MovieQuery;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_movies))
        .route("/{id}", get(get_movie))
        .route("/{id}/showtimes", get(get_showtimes))
        .route("/{id}/reviews", get(get_movie_reviews))
}

#[derive(Debug, Deserialize)]
pub struct MoviesParams {
    pub q: Option<String>,
    pub now_showing: Option<bool>,
    pub language: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

fn json_response(json: String, cache: &'static str) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json"), (header::HeaderName::from_static("x-cache"), cache)],
        Body::from(json),
    )
        .into_response()
}

// GET /movies
async fn list_movies(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MoviesParams>,
) -> AppResult<Response> {
    let query = MovieQuery::new(params.q, params.now_showing, params.language, params.limit, params.offset);

    // 1. Пытаемся получить результат из кеша
    let cache_key = search_key(&query);
    if let Some(cached) = state.cache.get_cached_json(&cache_key).await {
        return Ok(json_response(cached, "HIT"));
    }

    // 2. Cache Miss: идем в базу данных
    let movies = state.search_client.search_movies(&query).await?;
    let body = json!({
        "movies": movies,
        "count": movies.len(),
        "limit": query.limit,
        "offset": query.offset,
    });

    // 3. Сериализуем и сохраняем результат в кеш
    let json_str = serde_json::to_string(&body)
        .map_err(|e| AppError::Internal(format!("serialize movies: {e}")))?;
    state.cache.cache_search_result(&cache_key, &json_str).await;

    Ok(json_response(json_str, "MISS"))
}

// GET /movies/{id}
async fn get_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> AppResult<Response> {
    if let Some(cached) = state.cache.get_cached_json(&crate::cache::movies::movie_key(id)).await {
        return Ok(json_response(cached, "HIT"));
    }

    let movie = MovieDetail::find(id, &state.db.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Movie not found".into()))?;

    let json_str = serde_json::to_string(&movie)
        .map_err(|e| AppError::Internal(format!("serialize movie: {e}")))?;
    state.cache.cache_movie(id, &json_str).await;

    Ok(json_response(json_str, "MISS"))
}

// GET /movies/{id}/showtimes
async fn get_showtimes(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    if !movie_exists(id, &state.db.pool).await? {
        return Err(AppError::NotFound("Movie not found".into()));
    }

    let shows = ShowTime::upcoming_for_movie(id, &state.db.pool).await?;

    Ok(Json(json!({
        "movie_id": id,
        "showTimes": shows,
    })))
}

// GET /movies/{id}/reviews
async fn get_movie_reviews(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    if !movie_exists(id, &state.db.pool).await? {
        return Err(AppError::NotFound("Movie not found".into()));
    }

    let reviews = MovieReview::for_movie(id, &state.db.pool).await?;
    let average = crate::models::review::average_rating(reviews.iter().map(|r| r.rating));

    Ok(Json(json!({
        "movie_id": id,
        "reviews": reviews,
        "average_rating": average,
    })))
}
