use tracing::info;
use uuid::Uuid;

use super::dto::CreateTripRequest;
use super::repo::TripStore;
use super::repo_types::{NewTrip, Trip};
use crate::auth::repo::UserStore;
use crate::error::{AppError, AppResult};
use crate::routing::{Origin, RouteSummary};

/// Trips shown on the dashboard and returned by `/trips/recent` by default.
pub const RECENT_TRIPS: i64 = 5;
pub const MAX_PAGE: i64 = 50;

fn dimension(field: &str, value: Option<serde_json::Value>) -> AppResult<Option<f64>> {
    let number = match value {
        None | Some(serde_json::Value::Null) => return Ok(None),
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    match number {
        Some(v) if v.is_finite() && v > 0.0 => Ok(Some(v)),
        _ => Err(AppError::validation(format!("{field} must be a positive number"))),
    }
}

/// Checks a raw payload and turns it into the canonical trip shape.
/// `auth_user` is the token subject; the payload may only write for it.
pub fn validate(auth_user: Uuid, req: CreateTripRequest) -> AppResult<NewTrip> {
    let user = req
        .user
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| AppError::validation("Missing required field: user"))?;
    let user_id = Uuid::parse_str(user.trim())
        .map_err(|_| AppError::validation("user is not a valid id"))?;
    if user_id != auth_user {
        return Err(AppError::Forbidden("Trips can only be saved for the signed-in user".into()));
    }

    let destination = req
        .end
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::validation("Missing required field: end"))?;

    let route_raw = req
        .route
        .filter(|r| !r.is_null())
        .ok_or_else(|| AppError::validation("Missing required field: route"))?;
    let route: RouteSummary = serde_json::from_value(route_raw)
        .map_err(|e| AppError::validation(format!("Invalid route: {e}")))?;

    let origin = match req.start {
        None | Some(serde_json::Value::Null) => None,
        Some(raw) => {
            let origin: Origin = serde_json::from_value(raw).map_err(|_| {
                AppError::validation("start must be an address or a {lat, lng} pair")
            })?;
            if let Origin::Coordinates(c) = &origin {
                if !c.is_valid() {
                    return Err(AppError::validation("start coordinates are out of range"));
                }
            }
            (!origin.is_blank()).then_some(origin)
        }
    };

    let stops: Vec<String> = req.stops.unwrap_or_default();
    if stops.iter().any(|s| s.trim().is_empty()) {
        return Err(AppError::validation("Stops must not be blank"));
    }

    Ok(NewTrip {
        user_id,
        origin,
        destination,
        stops: stops.into_iter().map(|s| s.trim().to_string()).collect(),
        truck_height_ft: dimension("truckHeight", req.truck_height)?,
        truck_weight_lbs: dimension("truckWeight", req.truck_weight)?,
        route,
    })
}

pub async fn create_trip(
    users: &dyn UserStore,
    trips: &dyn TripStore,
    auth_user: Uuid,
    req: CreateTripRequest,
) -> AppResult<Trip> {
    let new = validate(auth_user, req)?;
    if users.find_by_id(new.user_id).await?.is_none() {
        return Err(AppError::validation("user does not exist"));
    }
    let trip = trips.insert(new).await?;
    info!(
        trip_id = %trip.id,
        user_id = %trip.user,
        distance_m = trip.route.distance_meters,
        "trip saved"
    );
    Ok(trip)
}

pub async fn list_recent_trips(
    trips: &dyn TripStore,
    user_id: Uuid,
    limit: i64,
) -> AppResult<Vec<Trip>> {
    Ok(trips.list(user_id, limit.clamp(1, MAX_PAGE), 0).await?)
}

pub async fn list_trips(
    trips: &dyn TripStore,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> AppResult<Vec<Trip>> {
    Ok(trips.list(user_id, limit.clamp(1, MAX_PAGE), offset.max(0)).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::trips::dto::RecentQuery;

    fn payload(user: Uuid) -> CreateTripRequest {
        serde_json::from_value(json!({
            "user": user.to_string(),
            "start": "A",
            "end": "B",
            "route": { "distance": "10 mi", "duration": "15 mins" }
        }))
        .unwrap()
    }

    #[test]
    fn minimal_payload_is_accepted() {
        let id = Uuid::new_v4();
        let trip = validate(id, payload(id)).unwrap();
        assert_eq!(trip.destination, "B");
        assert_eq!(trip.origin, Some(Origin::Address("A".into())));
        assert!(trip.stops.is_empty());
        assert_eq!(trip.route.duration_seconds, 900.0);
    }

    #[test]
    fn recent_query_defaults_to_dashboard_size() {
        let q: RecentQuery = serde_json::from_value(json!({})).unwrap();
        assert_eq!(q.limit, RECENT_TRIPS);
    }

    #[test]
    fn each_required_field_is_enforced() {
        let id = Uuid::new_v4();
        for field in ["user", "end", "route"] {
            let mut raw = serde_json::to_value(payload(id)).unwrap();
            raw[field] = serde_json::Value::Null;
            let req: CreateTripRequest = serde_json::from_value(raw).unwrap();
            match validate(id, req) {
                Err(AppError::Validation(msg)) => assert!(msg.contains(field), "{msg}"),
                other => panic!("expected validation error for {field}, got {other:?}"),
            }
        }
        let mut blank = payload(id);
        blank.end = Some("   ".into());
        assert!(matches!(validate(id, blank), Err(AppError::Validation(_))));
    }

    #[test]
    fn other_users_cannot_be_written() {
        let id = Uuid::new_v4();
        let err = validate(Uuid::new_v4(), payload(id)).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn truck_dimensions_accept_numbers_and_numeric_strings() {
        let id = Uuid::new_v4();
        let mut req = payload(id);
        req.truck_height = Some(json!("13.5"));
        req.truck_weight = Some(json!(30000));
        let trip = validate(id, req).unwrap();
        assert_eq!(trip.truck_height_ft, Some(13.5));
        assert_eq!(trip.truck_weight_lbs, Some(30_000.0));

        let mut empty = payload(id);
        empty.truck_height = Some(json!(""));
        assert_eq!(validate(id, empty).unwrap().truck_height_ft, None);

        for bad in [json!(0), json!(-4), json!("tall"), json!(true)] {
            let mut req = payload(id);
            req.truck_weight = Some(bad);
            assert!(matches!(validate(id, req), Err(AppError::Validation(_))));
        }
    }

    #[test]
    fn blank_stops_and_bad_routes_are_rejected() {
        let id = Uuid::new_v4();
        let mut req = payload(id);
        req.stops = Some(vec!["Tempe".into(), " ".into()]);
        assert!(matches!(validate(id, req), Err(AppError::Validation(_))));

        let mut req = payload(id);
        req.route = Some(json!({ "distance": "far" }));
        assert!(matches!(validate(id, req), Err(AppError::Validation(_))));
    }

    #[test]
    fn coordinate_origin_is_kept() {
        let id = Uuid::new_v4();
        let mut req = payload(id);
        req.start = Some(json!({ "lat": 33.4, "lng": -112.0 }));
        let trip = validate(id, req).unwrap();
        assert!(matches!(trip.origin, Some(Origin::Coordinates(_))));
    }
}
