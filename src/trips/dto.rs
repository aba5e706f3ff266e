use serde::{Deserialize, Serialize};

use super::services::RECENT_TRIPS;

/// Trip payload as clients send it. Every field is optional here so that a
/// missing one becomes a readable validation error rather than a decode
/// failure; older clients also sent truck dimensions as strings and route
/// summaries as formatted text.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateTripRequest {
    pub user: Option<String>,
    pub start: Option<serde_json::Value>,
    pub end: Option<String>,
    pub stops: Option<Vec<String>>,
    pub truck_height: Option<serde_json::Value>,
    pub truck_weight: Option<serde_json::Value>,
    pub route: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    #[serde(default = "default_recent_limit")]
    pub limit: i64,
}

fn default_recent_limit() -> i64 {
    RECENT_TRIPS
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}
