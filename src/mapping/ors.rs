//! OpenRouteService client.
//!
//! Geocoding goes through `GET /geocode/search`; directions through
//! `POST /v2/directions/{profile}/geojson`, which accepts heavy-goods
//! restrictions and returns the polyline with per-step maneuvers.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

use super::{MappingProvider, UpstreamError};
use crate::config::MappingConfig;
use crate::routing::{Coordinate, Maneuver, RouteProfile, RouteRequest, RouteResponse, RouteSummary};

#[derive(Clone)]
pub struct OrsClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl OrsClient {
    pub fn new(config: &MappingConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: reqwest::Client, config: &MappingConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    fn key(&self) -> Result<&str, UpstreamError> {
        self.api_key.as_deref().ok_or(UpstreamError::NotConfigured)
    }

    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, UpstreamError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(UpstreamError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[derive(Debug, Deserialize)]
struct FeatureCollection<P> {
    #[serde(default = "Vec::new")]
    features: Vec<Feature<P>>,
}

#[derive(Debug, Deserialize)]
struct Feature<P> {
    geometry: Geometry,
    properties: P,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Geometry {
    Point { coordinates: [f64; 2] },
    Line { coordinates: Vec<[f64; 2]> },
}

#[derive(Debug, Deserialize)]
struct GeocodeProps {}

#[derive(Debug, Deserialize)]
struct DirectionsProps {
    #[serde(default)]
    summary: Measurements,
    #[serde(default)]
    segments: Vec<Segment>,
}

#[derive(Debug, Default, Deserialize)]
struct Measurements {
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    duration: f64,
}

#[derive(Debug, Deserialize)]
struct Segment {
    #[serde(default)]
    steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
struct Step {
    #[serde(default)]
    instruction: String,
    way_points: [usize; 2],
}

fn directions_body(request: &RouteRequest) -> serde_json::Value {
    let coordinates: Vec<[f64; 2]> =
        request.waypoints.iter().map(Coordinate::as_position).collect();
    let mut body = json!({
        "coordinates": coordinates,
        "instructions": true,
        "units": "m",
    });

    if request.profile == RouteProfile::HeavyGoods {
        let mut restrictions = serde_json::Map::new();
        if let Some(truck) = &request.truck {
            if let Some(h) = truck.height_meters() {
                restrictions.insert("height".into(), json!(h));
            }
            if let Some(w) = truck.weight_tonnes() {
                restrictions.insert("weight".into(), json!(w));
            }
        }
        body["options"] = json!({
            "vehicle_type": "hgv",
            "profile_params": { "restrictions": restrictions },
        });
    }
    body
}

fn reshape(feature: Feature<DirectionsProps>) -> Result<RouteResponse, UpstreamError> {
    let geometry: Vec<Coordinate> = match feature.geometry {
        Geometry::Line { coordinates } => {
            coordinates.into_iter().map(Coordinate::from_position).collect()
        }
        Geometry::Point { .. } => {
            return Err(UpstreamError::Decode("route geometry is not a line".into()))
        }
    };

    let point = |i: usize| {
        geometry
            .get(i)
            .copied()
            .ok_or_else(|| UpstreamError::Decode(format!("way point {i} outside geometry")))
    };

    let mut maneuvers = Vec::new();
    for step in feature.properties.segments.iter().flat_map(|s| s.steps.iter()) {
        maneuvers.push(Maneuver {
            start: point(step.way_points[0])?,
            end: point(step.way_points[1])?,
            instructions: step.instruction.clone(),
        });
    }

    let m = &feature.properties.summary;
    Ok(RouteResponse {
        summary: RouteSummary::from_measurements(m.distance, m.duration, maneuvers),
        geometry,
    })
}

#[async_trait]
impl MappingProvider for OrsClient {
    #[instrument(skip(self))]
    async fn geocode(&self, address: &str) -> Result<Coordinate, UpstreamError> {
        let key = self.key()?;
        let response = self
            .client
            .get(format!("{}/geocode/search", self.base_url))
            .query(&[("api_key", key), ("text", address), ("size", "1")])
            .send()
            .await?;
        let collection: FeatureCollection<GeocodeProps> = Self::ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| UpstreamError::Decode(e.to_string()))?;

        let feature = collection
            .features
            .into_iter()
            .next()
            .ok_or(UpstreamError::Empty("geocode"))?;
        match feature.geometry {
            Geometry::Point { coordinates } => {
                let c = Coordinate::from_position(coordinates);
                debug!(%c, "geocoded");
                Ok(c)
            }
            Geometry::Line { .. } => {
                Err(UpstreamError::Decode("geocode geometry is not a point".into()))
            }
        }
    }

    #[instrument(
        skip(self, request),
        fields(profile = request.profile.as_str(), points = request.waypoints.len())
    )]
    async fn route(&self, request: &RouteRequest) -> Result<RouteResponse, UpstreamError> {
        let key = self.key()?;
        let response = self
            .client
            .post(format!(
                "{}/v2/directions/{}/geojson",
                self.base_url,
                request.profile.as_str()
            ))
            .header(reqwest::header::AUTHORIZATION, key)
            .json(&directions_body(request))
            .send()
            .await?;
        let collection: FeatureCollection<DirectionsProps> = Self::ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| UpstreamError::Decode(e.to_string()))?;

        let feature = collection
            .features
            .into_iter()
            .next()
            .ok_or(UpstreamError::Empty("route"))?;
        let route = reshape(feature)?;
        debug!(distance_m = route.summary.distance_meters, "route computed");
        Ok(route)
    }
}
