use serde::{Deserialize, Serialize};

use super::{Coordinate, RouteSummary};

const METERS_PER_FOOT: f64 = 0.3048;
const TONNES_PER_POUND: f64 = 0.000_453_592_37;

/// Provider routing profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RouteProfile {
    #[default]
    #[serde(rename = "driving-car")]
    Driving,
    #[serde(rename = "driving-hgv")]
    HeavyGoods,
}

impl RouteProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteProfile::Driving => "driving-car",
            RouteProfile::HeavyGoods => "driving-hgv",
        }
    }
}

/// Truck dimensions in the units the planner form collects.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TruckConstraints {
    pub height_ft: Option<f64>,
    pub weight_lbs: Option<f64>,
}

impl TruckConstraints {
    pub fn is_empty(&self) -> bool {
        self.height_ft.is_none() && self.weight_lbs.is_none()
    }

    pub fn height_meters(&self) -> Option<f64> {
        self.height_ft.map(|ft| ft * METERS_PER_FOOT)
    }

    pub fn weight_tonnes(&self) -> Option<f64> {
        self.weight_lbs.map(|lbs| lbs * TONNES_PER_POUND)
    }
}

/// Origin, optional stops, destination, in travel order.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRequest {
    pub waypoints: Vec<Coordinate>,
    pub profile: RouteProfile,
    pub truck: Option<TruckConstraints>,
}

impl RouteRequest {
    pub fn new(start: Coordinate, stops: Vec<Coordinate>, end: Coordinate) -> Self {
        let mut waypoints = Vec::with_capacity(stops.len() + 2);
        waypoints.push(start);
        waypoints.extend(stops);
        waypoints.push(end);
        Self {
            waypoints,
            profile: RouteProfile::Driving,
            truck: None,
        }
    }

    /// Switches to the heavy-goods profile when any dimension is present.
    pub fn with_truck(mut self, truck: TruckConstraints) -> Self {
        if !truck.is_empty() {
            self.profile = RouteProfile::HeavyGoods;
            self.truck = Some(truck);
        }
        self
    }

    pub fn start(&self) -> Option<&Coordinate> {
        self.waypoints.first()
    }

    pub fn end(&self) -> Option<&Coordinate> {
        self.waypoints.last()
    }

    pub fn stops(&self) -> &[Coordinate] {
        match self.waypoints.len() {
            0..=2 => &[],
            n => &self.waypoints[1..n - 1],
        }
    }
}

/// Reshaped provider answer: summary plus the drawn polyline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResponse {
    pub summary: RouteSummary,
    pub geometry: Vec<Coordinate>,
}
