//! Movie route handlers: listing, lookup, creation, and plot import.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use wl_core::Error;
use wl_db::models::Movie;

use crate::context::AppContext;
use crate::enrichment::EnrichmentReport;
use crate::error::AppError;
use crate::middleware::request_id::RequestId;

/// Request body for adding a movie.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateMovieRequest {
    pub id: String,
    pub name: String,
    pub year: i64,
    pub score: f64,
    #[serde(default)]
    pub plot: String,
}

/// Movie response.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct MovieResponse {
    pub id: String,
    pub name: String,
    pub year: i64,
    pub score: f64,
    pub plot: String,
}

impl From<Movie> for MovieResponse {
    fn from(m: Movie) -> Self {
        Self {
            id: m.id,
            name: m.name,
            year: m.year,
            score: m.score,
            plot: m.plot,
        }
    }
}

/// GET /api/v1/movies
#[utoipa::path(
    get,
    path = "/api/v1/movies",
    responses(
        (status = 200, description = "All movies in storage order", body = Vec<MovieResponse>)
    )
)]
pub async fn list_movies(
    State(ctx): State<AppContext>,
) -> Result<Json<Vec<MovieResponse>>, AppError> {
    let conn = wl_db::pool::get_conn(&ctx.db)?;
    let movies = wl_db::queries::movies::list_movies(&conn)?;
    Ok(Json(movies.into_iter().map(MovieResponse::from).collect()))
}

/// GET /api/v1/movies/{id}
#[utoipa::path(
    get,
    path = "/api/v1/movies/{id}",
    params(("id" = String, Path, description = "IMDb identifier")),
    responses(
        (status = 200, description = "Movie details", body = MovieResponse),
        (status = 404, description = "Movie not found")
    )
)]
pub async fn get_movie(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<MovieResponse>, AppError> {
    let conn = wl_db::pool::get_conn(&ctx.db)?;
    let movie = wl_db::queries::movies::get_movie(&conn, &id)?
        .ok_or_else(|| Error::not_found("movie", &id))?;
    Ok(Json(movie.into()))
}

/// POST /api/v1/movies
#[utoipa::path(
    post,
    path = "/api/v1/movies",
    request_body = CreateMovieRequest,
    responses(
        (status = 201, description = "Movie created", body = MovieResponse),
        (status = 400, description = "Malformed body or empty id"),
        (status = 409, description = "A movie with this id already exists")
    )
)]
pub async fn create_movie(
    State(ctx): State<AppContext>,
    payload: Result<Json<CreateMovieRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;

    let id = payload.id.trim();
    if id.is_empty() {
        return Err(Error::Validation("id is required".into()).into());
    }

    let movie = Movie {
        id: id.to_string(),
        name: payload.name,
        year: payload.year,
        score: payload.score,
        plot: payload.plot,
    };

    let conn = wl_db::pool::get_conn(&ctx.db)?;
    wl_db::queries::movies::insert_movie(&conn, &movie)?;
    tracing::info!(movie_id = %movie.id, "Movie added");

    Ok((StatusCode::CREATED, Json(MovieResponse::from(movie))))
}

/// GET /api/v1/movies/import
///
/// Runs one enrichment pass over every stored movie and returns once all
/// workers have finished.
#[utoipa::path(
    get,
    path = "/api/v1/movies/import",
    responses(
        (status = 200, description = "Enrichment finished", body = EnrichmentReport),
        (status = 400, description = "OMDb API key not configured"),
        (status = 409, description = "An enrichment run is already in progress")
    )
)]
pub async fn import_plots(
    State(ctx): State<AppContext>,
    Extension(request_id): Extension<RequestId>,
) -> Result<Json<EnrichmentReport>, AppError> {
    let tagged = |e: Error| AppError::from(e).with_request_id(request_id.0.clone());

    let enricher = ctx.enricher().map_err(tagged)?;

    let _running = ctx
        .enrichment_lock
        .try_lock()
        .map_err(|_| tagged(Error::Conflict("an enrichment run is already in progress".into())))?;

    let report = enricher
        .run(ctx.shutdown.child_token())
        .await
        .map_err(tagged)?;

    Ok(Json(report))
}
