use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use super::dto::{GeocodeQuery, GeocodeResponse, RouteQuery};
use crate::{
    error::{AppError, AppResult},
    routing::{Coordinate, RouteProfile, RouteRequest, RouteResponse, TruckConstraints},
    state::AppState,
};

pub fn mapping_routes() -> Router<AppState> {
    Router::new()
        .route("/geocode", get(geocode))
        .route("/route", get(route))
}

#[instrument(skip(state))]
pub async fn geocode(
    State(state): State<AppState>,
    Query(q): Query<GeocodeQuery>,
) -> AppResult<Json<GeocodeResponse>> {
    let c = state.mapping.geocode(&q.address).await?;
    Ok(Json(GeocodeResponse {
        latitude: c.lat,
        longitude: c.lng,
    }))
}

#[instrument(skip(state))]
pub async fn route(
    State(state): State<AppState>,
    Query(q): Query<RouteQuery>,
) -> AppResult<Json<RouteResponse>> {
    let request = route_request(q)?;
    let route = state.mapping.route(&request).await?;
    info!(
        profile = request.profile.as_str(),
        distance_m = route.summary.distance_meters,
        "route proxied"
    );
    Ok(Json(route))
}

fn parse_point(field: &str, raw: &str) -> AppResult<Coordinate> {
    Coordinate::parse_lng_lat(raw)
        .ok_or_else(|| AppError::validation(format!("{field} must be a 'lng,lat' pair")))
}

fn positive(field: &str, v: Option<f64>) -> AppResult<Option<f64>> {
    match v {
        Some(x) if !(x.is_finite() && x > 0.0) => {
            Err(AppError::validation(format!("{field} must be a positive number")))
        }
        other => Ok(other),
    }
}

fn route_request(q: RouteQuery) -> AppResult<RouteRequest> {
    let start = parse_point("start", &q.start)?;
    let end = parse_point("end", &q.end)?;
    let stops = q
        .via
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .map(|v| v.split(';').map(|p| parse_point("via", p)).collect::<AppResult<Vec<_>>>())
        .transpose()?
        .unwrap_or_default();
    let truck = TruckConstraints {
        height_ft: positive("height", q.height)?,
        weight_lbs: positive("weight", q.weight)?,
    };

    let mut request = RouteRequest::new(start, stops, end);
    match q.profile {
        Some(RouteProfile::Driving) => {}
        Some(RouteProfile::HeavyGoods) => {
            request.profile = RouteProfile::HeavyGoods;
            request = request.with_truck(truck);
        }
        None => request = request.with_truck(truck),
    }
    Ok(request)
}
