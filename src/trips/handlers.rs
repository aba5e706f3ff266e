use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::dto::{CreateTripRequest, Pagination, RecentQuery};
use super::repo_types::Trip;
use super::services;
use crate::{auth::extractors::AuthUser, error::AppResult, state::AppState};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/trips", get(list_trips))
        .route("/trips/recent", get(recent_trips))
}

pub fn write_routes() -> Router<AppState> {
    Router::new().route("/trips", post(create_trip))
}

#[instrument(skip(state, payload))]
pub async fn create_trip(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateTripRequest>,
) -> AppResult<(StatusCode, HeaderMap, Json<Trip>)> {
    let trip =
        services::create_trip(state.users.as_ref(), state.trips.as_ref(), user_id, payload).await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("/api/trips/{}", trip.id).parse() {
        headers.insert(axum::http::header::LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(trip)))
}

#[instrument(skip(state))]
pub async fn recent_trips(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<RecentQuery>,
) -> AppResult<Json<Vec<Trip>>> {
    Ok(Json(services::list_recent_trips(state.trips.as_ref(), user_id, q.limit).await?))
}

#[instrument(skip(state))]
pub async fn list_trips(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(p): Query<Pagination>,
) -> AppResult<Json<Vec<Trip>>> {
    Ok(Json(services::list_trips(state.trips.as_ref(), user_id, p.limit, p.offset).await?))
}
