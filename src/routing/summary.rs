use serde::{Deserialize, Serialize};

use super::format::{
    format_distance, format_duration, parse_distance_meters, parse_duration_seconds,
};
use super::Coordinate;

/// Where a trip starts: whatever the user typed, or a device position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Origin {
    Coordinates(Coordinate),
    Address(String),
}

impl Origin {
    pub fn is_blank(&self) -> bool {
        matches!(self, Origin::Address(a) if a.trim().is_empty())
    }
}

/// One turn-by-turn step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Maneuver {
    pub start: Coordinate,
    pub end: Coordinate,
    pub instructions: String,
}

/// Canonical route summary. The numeric fields are authoritative; `distance`
/// and `duration` are display strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RouteSummaryInput")]
pub struct RouteSummary {
    pub distance: String,
    pub duration: String,
    pub distance_meters: f64,
    pub duration_seconds: f64,
    pub waypoints: Vec<Maneuver>,
}

impl RouteSummary {
    pub fn from_measurements(
        distance_meters: f64,
        duration_seconds: f64,
        waypoints: Vec<Maneuver>,
    ) -> Self {
        Self {
            distance: format_distance(distance_meters),
            duration: format_duration(duration_seconds),
            distance_meters,
            duration_seconds,
            waypoints,
        }
    }
}

/// A measurement as older clients sent it: a raw number or formatted text.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Measure {
    Number(f64),
    Text(String),
}

/// Any route summary shape seen on the wire. Converted into [`RouteSummary`]
/// at the boundary; legacy text is parsed exactly once, here.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSummaryInput {
    pub distance: Option<Measure>,
    pub duration: Option<Measure>,
    pub distance_meters: Option<f64>,
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub waypoints: Vec<Maneuver>,
}

impl TryFrom<RouteSummaryInput> for RouteSummary {
    type Error = String;

    fn try_from(input: RouteSummaryInput) -> Result<Self, Self::Error> {
        let (distance_meters, distance) = resolve(
            input.distance_meters,
            input.distance,
            parse_distance_meters,
            format_distance,
        )
        .ok_or("route.distance is missing or unreadable")?;
        let (duration_seconds, duration) = resolve(
            input.duration_seconds,
            input.duration,
            parse_duration_seconds,
            format_duration,
        )
        .ok_or("route.duration is missing or unreadable")?;

        if distance_meters < 0.0 || duration_seconds < 0.0 {
            return Err("route measurements must not be negative".into());
        }

        Ok(Self {
            distance,
            duration,
            distance_meters,
            duration_seconds,
            waypoints: input.waypoints,
        })
    }
}

fn resolve(
    raw: Option<f64>,
    shown: Option<Measure>,
    parse: fn(&str) -> Option<f64>,
    format: fn(f64) -> String,
) -> Option<(f64, String)> {
    match (raw.filter(|v| v.is_finite()), shown) {
        (Some(v), Some(Measure::Text(t))) => Some((v, t)),
        (Some(v), _) => Some((v, format(v))),
        (None, Some(Measure::Number(v))) if v.is_finite() => Some((v, format(v))),
        (None, Some(Measure::Text(t))) => parse(&t).map(|v| (v, t)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn legacy_text_summary_is_parsed_and_text_kept() {
        let s: RouteSummary =
            serde_json::from_value(json!({ "distance": "10 mi", "duration": "15 mins" })).unwrap();
        assert_eq!(s.distance, "10 mi");
        assert_eq!(s.duration, "15 mins");
        assert!((s.distance_meters - 16_093.44).abs() < 0.01);
        assert_eq!(s.duration_seconds, 900.0);
        assert!(s.waypoints.is_empty());
    }

    #[test]
    fn numeric_summary_gets_display_text() {
        let s: RouteSummary = serde_json::from_value(json!({
            "distanceMeters": 19_794.9,
            "durationSeconds": 3_900.0,
            "waypoints": [{
                "start": { "lat": 33.44, "lng": -112.07 },
                "end": { "lat": 33.50, "lng": -112.07 },
                "instructions": "Head north on Central Ave"
            }]
        }))
        .unwrap();
        assert_eq!(s.distance, "12.3 mi");
        assert_eq!(s.duration, "1 hour 5 mins");
        assert_eq!(s.waypoints.len(), 1);
    }

    #[test]
    fn bare_numbers_in_display_fields_are_raw_units() {
        let s: RouteSummary =
            serde_json::from_value(json!({ "distance": 1609.344, "duration": 60 })).unwrap();
        assert_eq!(s.distance, "1.0 mi");
        assert_eq!(s.duration, "1 min");
    }

    #[test]
    fn missing_or_garbled_measurements_are_rejected() {
        assert!(serde_json::from_value::<RouteSummary>(json!({ "duration": "5 mins" })).is_err());
        assert!(serde_json::from_value::<RouteSummary>(
            json!({ "distance": "a while", "duration": "5 mins" })
        )
        .is_err());
        assert!(serde_json::from_value::<RouteSummary>(
            json!({ "distanceMeters": -1.0, "durationSeconds": 5.0 })
        )
        .is_err());
    }

    #[test]
    fn serialized_summary_reads_back_identically() {
        let s = RouteSummary::from_measurements(
            8_046.72,
            600.0,
            vec![Maneuver {
                start: Coordinate::new(1.0, 2.0),
                end: Coordinate::new(1.5, 2.5),
                instructions: "Turn left".into(),
            }],
        );
        let back: RouteSummary = serde_json::from_value(serde_json::to_value(&s).unwrap()).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn origin_accepts_text_or_coordinates() {
        let a: Origin = serde_json::from_value(json!("100 N Central Ave")).unwrap();
        assert_eq!(a, Origin::Address("100 N Central Ave".into()));
        let c: Origin = serde_json::from_value(json!({ "lat": 33.4, "lng": -112.0 })).unwrap();
        assert_eq!(c, Origin::Coordinates(Coordinate::new(33.4, -112.0)));
        assert!(Origin::Address("  ".into()).is_blank());
    }
}
