use serde::{Deserialize, Serialize};

use crate::routing::RouteProfile;

#[derive(Debug, Serialize, Deserialize)]
pub struct GeocodeQuery {
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct GeocodeResponse {
    pub latitude: f64,
    pub longitude: f64,
}

/// `start`/`end` are `"lng,lat"`; `via` is `"lng,lat;lng,lat"`.
/// `height` is feet and `weight` pounds.
#[derive(Debug, Serialize, Deserialize)]
pub struct RouteQuery {
    pub start: String,
    pub end: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub via: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<RouteProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}
