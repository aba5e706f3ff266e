use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::routing::{Origin, RouteSummary};

/// Stored trip as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: Uuid,
    pub user: Uuid,
    pub start: Option<Origin>,
    pub end: String,
    pub stops: Vec<String>,
    pub truck_height: Option<f64>, // feet
    pub truck_weight: Option<f64>, // pounds
    pub route: RouteSummary,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Validated input for a trip insert.
#[derive(Debug, Clone)]
pub struct NewTrip {
    pub user_id: Uuid,
    pub origin: Option<Origin>,
    pub destination: String,
    pub stops: Vec<String>,
    pub truck_height_ft: Option<f64>,
    pub truck_weight_lbs: Option<f64>,
    pub route: RouteSummary,
}

#[derive(Debug, FromRow)]
pub struct TripRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub origin: Option<Json<Origin>>,
    pub destination: String,
    pub stops: Json<Vec<String>>,
    pub truck_height_ft: Option<f64>,
    pub truck_weight_lbs: Option<f64>,
    pub route: Json<RouteSummary>,
    pub created_at: OffsetDateTime,
}

impl From<TripRow> for Trip {
    fn from(r: TripRow) -> Self {
        Self {
            id: r.id,
            user: r.user_id,
            start: r.origin.map(|o| o.0),
            end: r.destination,
            stops: r.stops.0,
            truck_height: r.truck_height_ft,
            truck_weight: r.truck_weight_lbs,
            route: r.route.0,
            created_at: r.created_at,
        }
    }
}
