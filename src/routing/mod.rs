//! Route domain types shared by the backend proxy, the trip store and the
//! planning client.

pub mod format;
pub mod geo;
mod request;
mod summary;

pub use geo::Coordinate;
pub use request::{RouteProfile, RouteRequest, RouteResponse, TruckConstraints};
pub use summary::{Maneuver, Measure, Origin, RouteSummary, RouteSummaryInput};
