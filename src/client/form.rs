use crate::routing::TruckConstraints;

/// What the planner form collects. `origin` is only needed when the device
/// position is unavailable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripForm {
    pub origin: Option<String>,
    pub destination: String,
    pub stops: Vec<String>,
    pub truck_height: Option<f64>, // feet
    pub truck_weight: Option<f64>, // pounds
}

/// One reason a form cannot be submitted, worded for the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormIssue {
    #[error("Please enter a starting location.")]
    MissingOrigin,

    #[error("Please enter a destination.")]
    MissingDestination,

    /// 1-based position in the stop list.
    #[error("Stop {0} is empty. Fill it in or remove it.")]
    BlankStop(usize),

    #[error("Please enter the truck height.")]
    MissingTruckHeight,

    #[error("Truck height must be greater than zero.")]
    InvalidTruckHeight,

    #[error("Please enter the truck weight.")]
    MissingTruckWeight,

    #[error("Truck weight must be greater than zero.")]
    InvalidTruckWeight,
}

fn blank(s: &str) -> bool {
    s.trim().is_empty()
}

fn positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

impl TripForm {
    pub fn origin_text(&self) -> Option<&str> {
        self.origin.as_deref().map(str::trim).filter(|o| !o.is_empty())
    }

    /// Collects every issue rather than stopping at the first one.
    pub fn validate(&self, needs_origin: bool, require_truck: bool) -> Result<(), Vec<FormIssue>> {
        let mut issues = Vec::new();

        if needs_origin && self.origin_text().is_none() {
            issues.push(FormIssue::MissingOrigin);
        }
        if blank(&self.destination) {
            issues.push(FormIssue::MissingDestination);
        }
        issues.extend(
            self.stops
                .iter()
                .enumerate()
                .filter(|(_, s)| blank(s))
                .map(|(i, _)| FormIssue::BlankStop(i + 1)),
        );

        match self.truck_height {
            None if require_truck => issues.push(FormIssue::MissingTruckHeight),
            Some(h) if !positive(h) => issues.push(FormIssue::InvalidTruckHeight),
            _ => {}
        }
        match self.truck_weight {
            None if require_truck => issues.push(FormIssue::MissingTruckWeight),
            Some(w) if !positive(w) => issues.push(FormIssue::InvalidTruckWeight),
            _ => {}
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }

    pub fn truck(&self) -> TruckConstraints {
        TruckConstraints {
            height_ft: self.truck_height,
            weight_lbs: self.truck_weight,
        }
    }
}
