//! Display formatting for route measurements, plus the one-way parsers used
//! to migrate older trip payloads that only carried formatted text.

use lazy_static::lazy_static;
use regex::Regex;

pub const METERS_PER_MILE: f64 = 1_609.344;
const FEET_PER_METER: f64 = 3.280_84;

pub fn meters_to_miles(meters: f64) -> f64 {
    meters / METERS_PER_MILE
}

/// `"12.3 mi"`, or feet below a tenth of a mile.
pub fn format_distance(meters: f64) -> String {
    let miles = meters_to_miles(meters);
    if miles < 0.1 {
        format!("{} ft", (meters * FEET_PER_METER).round() as i64)
    } else {
        format!("{miles:.1} mi")
    }
}

/// `"1 hour 5 mins"`, `"15 mins"`, `"2 days 3 hours"`.
pub fn format_duration(seconds: f64) -> String {
    let total = (seconds.max(0.0) / 60.0).round() as u64;
    let (days, hours, mins) = (total / 1_440, (total % 1_440) / 60, total % 60);

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(plural(days, "day", "days"));
    }
    if hours > 0 {
        parts.push(plural(hours, "hour", "hours"));
    }
    if mins > 0 || parts.is_empty() {
        parts.push(plural(mins, "min", "mins"));
    }
    parts.join(" ")
}

fn plural(n: u64, one: &str, many: &str) -> String {
    format!("{n} {}", if n == 1 { one } else { many })
}

lazy_static! {
    static ref DISTANCE_RE: Regex = Regex::new(
        r"^\s*(\d*\.?\d+)\s*(miles?|mi|kilometers?|kilometres?|km|meters?|metres?|m|feet|ft)\s*$"
    )
    .unwrap();
    static ref DURATION_PART_RE: Regex = Regex::new(
        r"(\d*\.?\d+)\s*(days?|d|hours?|hrs?|h|minutes?|mins?|m|seconds?|secs?|s)\b"
    )
    .unwrap();
}

/// Parses `"12.3 mi"`, `"850 m"`, `"1,204 km"`, `"500 ft"` into meters.
pub fn parse_distance_meters(text: &str) -> Option<f64> {
    let cleaned = text.to_lowercase().replace(',', "");
    let caps = DISTANCE_RE.captures(&cleaned)?;
    let value: f64 = caps[1].parse().ok()?;
    let factor = match &caps[2] {
        "mi" | "mile" | "miles" => METERS_PER_MILE,
        "km" | "kilometer" | "kilometers" | "kilometre" | "kilometres" => 1_000.0,
        "ft" | "feet" => 1.0 / FEET_PER_METER,
        _ => 1.0,
    };
    Some(value * factor)
}

/// Parses `"15 mins"`, `"1 hour 5 mins"`, `"2 hrs"` into seconds.
pub fn parse_duration_seconds(text: &str) -> Option<f64> {
    let lowered = text.to_lowercase();
    let mut total = 0.0;
    let mut matched = false;
    for caps in DURATION_PART_RE.captures_iter(&lowered) {
        let value: f64 = caps[1].parse().ok()?;
        let unit = match caps[2].chars().next()? {
            'd' => 86_400.0,
            'h' => 3_600.0,
            'm' => 60.0,
            _ => 1.0,
        };
        total += value * unit;
        matched = true;
    }
    matched.then_some(total)
}
