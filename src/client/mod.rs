//! Client side of Freight Flow: the typed backend client, the session it
//! shares with every view, and the planner and dashboard workflows.

pub mod api;
pub mod dashboard;
pub mod form;
pub mod location;
pub mod nav;
pub mod planner;
pub mod session;

pub use api::{ClientError, FreightClient};
pub use dashboard::{load_dashboard, Dashboard, DashboardView, TripFeed, TripStats};
pub use form::{FormIssue, TripForm};
pub use location::{
    position_channel, LocationError, PositionFeed, PositionSource, PositionWatch,
    ReplayPositionSource,
};
pub use nav::{visible_links, NavLink};
pub use planner::{
    PlannerError, PlannerOptions, PlannerState, RoutePlanner, RouteService, TrackingEvent,
    TrackingOutcome, TripSink,
};
pub use session::Session;
