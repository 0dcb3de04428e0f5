//! Axum router construction.

use axum::middleware;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::context::AppContext;
use crate::middleware::request_id::request_id_middleware;
use crate::routes;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::health::health_check,
        routes::movies::list_movies,
        routes::movies::get_movie,
        routes::movies::create_movie,
        routes::movies::import_plots,
    ),
    components(schemas(
        routes::movies::MovieResponse,
        routes::movies::CreateMovieRequest,
        crate::enrichment::EnrichmentReport,
        crate::enrichment::EnrichmentFailure,
    ))
)]
struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Build the complete Axum router.
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route(
            "/movies",
            get(routes::movies::list_movies).post(routes::movies::create_movie),
        )
        // Static segment; matched ahead of `{id}`.
        .route("/movies/import", get(routes::movies::import_plots))
        .route("/movies/{id}", get(routes::movies::get_movie))
        .route("/openapi.json", get(openapi_json));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api/v1", api)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
