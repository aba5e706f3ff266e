//! Route-planning workflow.
//!
//! One planner drives a single view: it acquires the device position,
//! validates the form, asks the backend for a route, saves the trip, and
//! optionally follows the truck until it arrives.
//!
//! ```text
//! Idle -> LocationPending -> Ready -> RouteRequested -> RouteDisplayed -> Tracking -> Ended
//!                              ^            |                               |
//!                              +-- failure -+        deviation: RouteRequested, back to Tracking
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use super::api::ClientError;
use super::form::{FormIssue, TripForm};
use super::location::{LocationError, PositionSource, PositionWatch};
use crate::routing::geo::distance_to_path_meters;
use crate::routing::{Coordinate, Origin, RouteRequest, RouteResponse, TruckConstraints};
use crate::trips::dto::CreateTripRequest;
use crate::trips::repo_types::Trip;

/// Farther than this from every segment of the drawn route counts as off route.
pub const DEVIATION_THRESHOLD_METERS: f64 = 50.0;
/// Within this of the destination (or a stop) counts as arrived.
pub const ARRIVAL_THRESHOLD_METERS: f64 = 100.0;

#[async_trait]
pub trait RouteService: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<Coordinate, ClientError>;

    async fn route(&self, request: &RouteRequest) -> Result<RouteResponse, ClientError>;
}

#[async_trait]
pub trait TripSink: Send + Sync {
    /// Whether a signed-in user is known to save trips for.
    fn can_persist(&self) -> bool;

    async fn save_trip(&self, request: CreateTripRequest) -> Result<Trip, ClientError>;
}

#[async_trait]
impl<T: RouteService + ?Sized> RouteService for Arc<T> {
    async fn geocode(&self, address: &str) -> Result<Coordinate, ClientError> {
        (**self).geocode(address).await
    }

    async fn route(&self, request: &RouteRequest) -> Result<RouteResponse, ClientError> {
        (**self).route(request).await
    }
}

#[async_trait]
impl<T: TripSink + ?Sized> TripSink for Arc<T> {
    fn can_persist(&self) -> bool {
        (**self).can_persist()
    }

    async fn save_trip(&self, request: CreateTripRequest) -> Result<Trip, ClientError> {
        (**self).save_trip(request).await
    }
}

#[async_trait]
impl<T: PositionSource + ?Sized> PositionSource for Arc<T> {
    async fn current_position(&self) -> Result<Coordinate, LocationError> {
        (**self).current_position().await
    }

    async fn watch_position(&self) -> Result<PositionWatch, LocationError> {
        (**self).watch_position().await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerState {
    Idle,
    LocationPending,
    Ready,
    RouteRequested,
    RouteDisplayed,
    Tracking,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannerOptions {
    pub require_truck_dimensions: bool,
    pub persist_trips: bool,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self {
            require_truck_dimensions: false,
            persist_trips: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    #[error("cannot {action} while {state:?}")]
    InvalidTransition { state: PlannerState, action: &'static str },

    #[error("the form has {} problem(s)", .0.len())]
    Invalid(Vec<FormIssue>),

    #[error(transparent)]
    Route(#[from] ClientError),

    #[error(transparent)]
    Location(#[from] LocationError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingEvent {
    OnRoute,
    Rerouted,
    /// The previous route is kept.
    RerouteFailed,
    Arrived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingOutcome {
    Arrived,
    /// The position feed stopped; the route stays displayed.
    FeedClosed,
}

/// Where the current route goes, kept for recomputes while tracking.
#[derive(Debug, Clone)]
struct Itinerary {
    stops: Vec<Coordinate>,
    destination: Coordinate,
    truck: TruckConstraints,
}

pub struct RoutePlanner<R, T, P> {
    routes: R,
    trips: T,
    positions: P,
    options: PlannerOptions,
    state: PlannerState,
    position: Option<Coordinate>,
    manual_origin: bool,
    itinerary: Option<Itinerary>,
    route: Option<RouteResponse>,
    saved_trip: Option<Trip>,
    banner: Option<String>,
    watch: Option<PositionWatch>,
}

impl<R: RouteService, T: TripSink, P: PositionSource> RoutePlanner<R, T, P> {
    pub fn new(routes: R, trips: T, positions: P, options: PlannerOptions) -> Self {
        Self {
            routes,
            trips,
            positions,
            options,
            state: PlannerState::Idle,
            position: None,
            manual_origin: false,
            itinerary: None,
            route: None,
            saved_trip: None,
            banner: None,
            watch: None,
        }
    }

    pub fn state(&self) -> PlannerState {
        self.state
    }

    /// Message for the dismissible banner, if any.
    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }

    pub fn route(&self) -> Option<&RouteResponse> {
        self.route.as_ref()
    }

    pub fn position(&self) -> Option<Coordinate> {
        self.position
    }

    /// The device position was unavailable; the form must name an origin.
    pub fn is_manual_origin(&self) -> bool {
        self.manual_origin
    }

    pub fn saved_trip(&self) -> Option<&Trip> {
        self.saved_trip.as_ref()
    }

    pub fn is_watching(&self) -> bool {
        self.watch.is_some()
    }

    fn expect_state(
        &self,
        allowed: &[PlannerState],
        action: &'static str,
    ) -> Result<(), PlannerError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(PlannerError::InvalidTransition {
                state: self.state,
                action,
            })
        }
    }

    /// Requests the device position. Failure is not fatal: the planner
    /// becomes ready in manual-origin mode.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> Result<(), PlannerError> {
        self.expect_state(&[PlannerState::Idle], "start")?;
        self.state = PlannerState::LocationPending;
        match self.positions.current_position().await {
            Ok(position) => {
                self.position = Some(position);
                self.manual_origin = false;
            }
            Err(e) => {
                warn!(error = %e, "position unavailable; falling back to a typed origin");
                self.manual_origin = true;
                self.banner = Some(format!(
                    "Couldn't get your location ({e}). Enter a starting address instead."
                ));
            }
        }
        self.state = PlannerState::Ready;
        Ok(())
    }

    async fn geocode(&self, address: &str) -> Result<Coordinate, ClientError> {
        self.routes.geocode(address.trim()).await
    }

    async fn compute(
        &self,
        form: &TripForm,
    ) -> Result<(RouteResponse, Itinerary, Origin), ClientError> {
        let (start, origin) = match (form.origin_text(), self.position) {
            (Some(text), _) => (self.geocode(text).await?, Origin::Address(text.to_string())),
            (None, Some(position)) => (position, Origin::Coordinates(position)),
            (None, None) => return Err(ClientError::InvalidRequest("no starting location")),
        };
        let mut stops = Vec::with_capacity(form.stops.len());
        for stop in &form.stops {
            stops.push(self.geocode(stop).await?);
        }
        let destination = self.geocode(&form.destination).await?;
        let truck = form.truck();

        let request = RouteRequest::new(start, stops.clone(), destination).with_truck(truck);
        let route = self.routes.route(&request).await?;
        Ok((
            route,
            Itinerary {
                stops,
                destination,
                truck,
            },
            origin,
        ))
    }

    fn trip_request(
        form: &TripForm,
        origin: Origin,
        route: &RouteResponse,
    ) -> Option<CreateTripRequest> {
        Some(CreateTripRequest {
            user: None,
            start: serde_json::to_value(origin).ok(),
            end: Some(form.destination.trim().to_string()),
            stops: Some(form.stops.iter().map(|s| s.trim().to_string()).collect()),
            truck_height: form.truck_height.map(serde_json::Value::from),
            truck_weight: form.truck_weight.map(serde_json::Value::from),
            route: Some(serde_json::to_value(&route.summary).ok()?),
        })
    }

    /// Validates the form, computes the route, and saves the trip when a
    /// user is signed in. Validation problems leave the state unchanged;
    /// a routing failure returns to `Ready` with a banner.
    #[instrument(skip(self, form))]
    pub async fn submit(&mut self, form: &TripForm) -> Result<(), PlannerError> {
        self.expect_state(
            &[PlannerState::Ready, PlannerState::RouteDisplayed, PlannerState::Ended],
            "submit a route",
        )?;
        form.validate(self.position.is_none(), self.options.require_truck_dimensions)
            .map_err(PlannerError::Invalid)?;

        self.state = PlannerState::RouteRequested;
        self.banner = None;
        self.saved_trip = None;

        let (route, itinerary, origin) = match self.compute(form).await {
            Ok(computed) => computed,
            Err(e) => {
                warn!(error = %e, "route request failed");
                self.state = PlannerState::Ready;
                self.route = None;
                self.itinerary = None;
                self.banner = Some(format!("Failed to fetch route. Please try again. ({e})"));
                return Err(e.into());
            }
        };

        info!(
            distance_m = route.summary.distance_meters,
            stops = itinerary.stops.len(),
            "route displayed"
        );
        let trip = Self::trip_request(form, origin, &route);
        self.route = Some(route);
        self.itinerary = Some(itinerary);
        self.state = PlannerState::RouteDisplayed;

        if self.options.persist_trips && self.trips.can_persist() {
            let saved = match trip {
                Some(request) => self.trips.save_trip(request).await,
                None => Err(ClientError::InvalidRequest("route could not be encoded")),
            };
            match saved {
                Ok(trip) => self.saved_trip = Some(trip),
                Err(e) => {
                    warn!(error = %e, "trip not saved");
                    self.banner =
                        Some(format!("Route shown, but the trip could not be saved. ({e})"));
                }
            }
        }
        Ok(())
    }

    /// Begins following the device. The watch lives until arrival,
    /// [`RoutePlanner::end_trip`], or the planner is dropped.
    pub async fn start_tracking(&mut self) -> Result<(), PlannerError> {
        self.expect_state(&[PlannerState::RouteDisplayed], "start tracking")?;
        match self.positions.watch_position().await {
            Ok(watch) => {
                self.watch = Some(watch);
                self.state = PlannerState::Tracking;
                info!("tracking started");
                Ok(())
            }
            Err(e) => {
                self.banner = Some(format!("Couldn't follow your location ({e})."));
                Err(e.into())
            }
        }
    }

    fn finish(&mut self) {
        self.watch = None;
        self.state = PlannerState::Ended;
    }

    /// Handles one position fix while tracking.
    pub async fn on_position(
        &mut self,
        position: Coordinate,
    ) -> Result<TrackingEvent, PlannerError> {
        self.expect_state(&[PlannerState::Tracking], "track a position")?;
        self.position = Some(position);

        let Some(itinerary) = self.itinerary.as_mut() else {
            return Ok(TrackingEvent::OnRoute);
        };
        if position.haversine_meters(&itinerary.destination) <= ARRIVAL_THRESHOLD_METERS {
            info!("arrived at destination");
            self.finish();
            return Ok(TrackingEvent::Arrived);
        }
        itinerary
            .stops
            .retain(|stop| position.haversine_meters(stop) > ARRIVAL_THRESHOLD_METERS);

        let geometry = self.route.as_ref().map(|r| r.geometry.as_slice()).unwrap_or_default();
        let off_by = distance_to_path_meters(&position, geometry);
        if !off_by.is_some_and(|d| d > DEVIATION_THRESHOLD_METERS) {
            return Ok(TrackingEvent::OnRoute);
        }

        let request = RouteRequest::new(position, itinerary.stops.clone(), itinerary.destination)
            .with_truck(itinerary.truck);
        warn!(off_by_m = off_by.unwrap_or_default(), "off route; recomputing");
        self.state = PlannerState::RouteRequested;
        let recomputed = self.routes.route(&request).await;
        self.state = PlannerState::Tracking;
        match recomputed {
            Ok(route) => {
                self.route = Some(route);
                self.banner = None;
                Ok(TrackingEvent::Rerouted)
            }
            Err(e) => {
                warn!(error = %e, "recompute failed; keeping previous route");
                self.banner = Some(format!("Couldn't update the route. ({e})"));
                Ok(TrackingEvent::RerouteFailed)
            }
        }
    }

    /// Feeds positions from the watch into [`RoutePlanner::on_position`]
    /// until arrival or the feed closes.
    pub async fn run_tracking(&mut self) -> Result<TrackingOutcome, PlannerError> {
        self.expect_state(&[PlannerState::Tracking], "run tracking")?;
        loop {
            let next = match self.watch.as_mut() {
                Some(watch) => watch.recv().await,
                None => None,
            };
            let Some(position) = next else {
                self.watch = None;
                self.state = PlannerState::RouteDisplayed;
                self.banner = Some("Location updates stopped.".into());
                return Ok(TrackingOutcome::FeedClosed);
            };
            if self.on_position(position).await? == TrackingEvent::Arrived {
                return Ok(TrackingOutcome::Arrived);
            }
        }
    }

    pub fn end_trip(&mut self) -> Result<(), PlannerError> {
        self.expect_state(&[PlannerState::RouteDisplayed, PlannerState::Tracking], "end the trip")?;
        self.finish();
        info!("trip ended");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use uuid::Uuid;

    use super::*;
    use crate::client::location::{position_channel, PositionFeed, ReplayPositionSource};
    use crate::routing::{RouteProfile, RouteSummary};

    const PHOENIX: Coordinate = Coordinate { lat: 33.4484, lng: -112.0740 };
    const TEMPE: Coordinate = Coordinate { lat: 33.4255, lng: -111.9400 };
    const MESA: Coordinate = Coordinate { lat: 33.4152, lng: -111.8315 };

    /// Straight line of `n + 1` evenly spaced points.
    fn line(from: Coordinate, to: Coordinate, n: usize) -> Vec<Coordinate> {
        (0..=n)
            .map(|i| {
                let t = i as f64 / n as f64;
                Coordinate::new(
                    from.lat + (to.lat - from.lat) * t,
                    from.lng + (to.lng - from.lng) * t,
                )
            })
            .collect()
    }

    #[derive(Default)]
    struct FakeRoutes {
        places: HashMap<String, Coordinate>,
        fail_route: Mutex<bool>,
        /// Return only the waypoints as geometry, like a straight highway.
        sparse: Mutex<bool>,
        requests: Mutex<Vec<RouteRequest>>,
    }

    impl FakeRoutes {
        fn new() -> Arc<Self> {
            let places = [("Phoenix", PHOENIX), ("Tempe", TEMPE), ("Mesa", MESA)]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect();
            Arc::new(Self {
                places,
                ..Default::default()
            })
        }

        fn fail(&self, fail: bool) {
            *self.fail_route.lock().unwrap() = fail;
        }

        fn requests(&self) -> Vec<RouteRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RouteService for FakeRoutes {
        async fn geocode(&self, address: &str) -> Result<Coordinate, ClientError> {
            self.places.get(address).copied().ok_or(ClientError::Api {
                status: 502,
                message: "mapping provider returned no geocode results".into(),
            })
        }

        async fn route(&self, request: &RouteRequest) -> Result<RouteResponse, ClientError> {
            self.requests.lock().unwrap().push(request.clone());
            if *self.fail_route.lock().unwrap() {
                return Err(ClientError::Api {
                    status: 502,
                    message: "mapping provider returned no route results".into(),
                });
            }
            let geometry = if *self.sparse.lock().unwrap() {
                request.waypoints.clone()
            } else {
                request
                    .waypoints
                    .windows(2)
                    .flat_map(|w| line(w[0], w[1], 400))
                    .collect()
            };
            Ok(RouteResponse {
                summary: RouteSummary::from_measurements(25_000.0, 1_500.0, vec![]),
                geometry,
            })
        }
    }

    #[derive(Default)]
    struct FakeSink {
        signed_in: bool,
        fail: bool,
        saved: Mutex<Vec<CreateTripRequest>>,
    }

    #[async_trait]
    impl TripSink for FakeSink {
        fn can_persist(&self) -> bool {
            self.signed_in
        }

        async fn save_trip(&self, request: CreateTripRequest) -> Result<Trip, ClientError> {
            if self.fail {
                return Err(ClientError::Api {
                    status: 500,
                    message: "An internal error occurred".into(),
                });
            }
            let route: RouteSummary =
                serde_json::from_value(request.route.clone().unwrap()).unwrap();
            let trip = Trip {
                id: Uuid::new_v4(),
                user: Uuid::new_v4(),
                start: None,
                end: request.end.clone().unwrap(),
                stops: request.stops.clone().unwrap_or_default(),
                truck_height: None,
                truck_weight: None,
                route,
                created_at: time::OffsetDateTime::now_utc(),
            };
            self.saved.lock().unwrap().push(request);
            Ok(trip)
        }
    }

    /// Position source whose watch is driven by the test.
    struct ManualPositions {
        current: Result<Coordinate, LocationError>,
        feed: Mutex<Option<PositionFeed>>,
    }

    impl ManualPositions {
        fn at(current: Result<Coordinate, LocationError>) -> Arc<Self> {
            Arc::new(Self {
                current,
                feed: Mutex::new(None),
            })
        }

        fn feed(&self) -> PositionFeed {
            self.feed.lock().unwrap().clone().expect("watch not started")
        }
    }

    #[async_trait]
    impl PositionSource for ManualPositions {
        async fn current_position(&self) -> Result<Coordinate, LocationError> {
            self.current.clone()
        }

        async fn watch_position(&self) -> Result<PositionWatch, LocationError> {
            let (feed, watch) = position_channel(8);
            *self.feed.lock().unwrap() = Some(feed);
            Ok(watch)
        }
    }

    type Planner = RoutePlanner<Arc<FakeRoutes>, Arc<FakeSink>, Arc<ManualPositions>>;

    fn planner(
        routes: &Arc<FakeRoutes>,
        sink: &Arc<FakeSink>,
        positions: &Arc<ManualPositions>,
        options: PlannerOptions,
    ) -> Planner {
        RoutePlanner::new(routes.clone(), sink.clone(), positions.clone(), options)
    }

    fn to_tempe() -> TripForm {
        TripForm {
            destination: "Tempe".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn start_acquires_position() {
        let routes = FakeRoutes::new();
        let sink = Arc::new(FakeSink::default());
        let positions = ManualPositions::at(Ok(PHOENIX));
        let mut p = planner(&routes, &sink, &positions, PlannerOptions::default());

        assert_eq!(p.state(), PlannerState::Idle);
        p.start().await.unwrap();
        assert_eq!(p.state(), PlannerState::Ready);
        assert_eq!(p.position(), Some(PHOENIX));
        assert!(!p.is_manual_origin());
        assert!(p.start().await.is_err());
    }

    #[tokio::test]
    async fn denied_location_requires_typed_origin() {
        let routes = FakeRoutes::new();
        let sink = Arc::new(FakeSink::default());
        let positions = ManualPositions::at(Err(LocationError::Denied));
        let mut p = planner(&routes, &sink, &positions, PlannerOptions::default());

        p.start().await.unwrap();
        assert_eq!(p.state(), PlannerState::Ready);
        assert!(p.is_manual_origin());
        assert!(p.banner().unwrap().contains("permission denied"));

        match p.submit(&to_tempe()).await {
            Err(PlannerError::Invalid(issues)) => assert_eq!(issues, [FormIssue::MissingOrigin]),
            other => panic!("unexpected {other:?}"),
        }
        assert!(routes.requests().is_empty());

        let form = TripForm {
            origin: Some("Phoenix".into()),
            ..to_tempe()
        };
        p.submit(&form).await.unwrap();
        assert_eq!(p.state(), PlannerState::RouteDisplayed);
        assert_eq!(routes.requests()[0].start(), Some(&PHOENIX));
    }

    #[tokio::test]
    async fn invalid_form_blocks_the_request() {
        let routes = FakeRoutes::new();
        let sink = Arc::new(FakeSink::default());
        let positions = ManualPositions::at(Ok(PHOENIX));
        let options = PlannerOptions {
            require_truck_dimensions: true,
            persist_trips: true,
        };
        let mut p = planner(&routes, &sink, &positions, options);
        p.start().await.unwrap();

        let form = TripForm {
            destination: "".into(),
            stops: vec![" ".into()],
            truck_height: Some(13.5),
            truck_weight: Some(0.0),
            ..Default::default()
        };
        match p.submit(&form).await {
            Err(PlannerError::Invalid(issues)) => assert_eq!(
                issues,
                [
                    FormIssue::MissingDestination,
                    FormIssue::BlankStop(1),
                    FormIssue::InvalidTruckWeight
                ]
            ),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(p.state(), PlannerState::Ready);
        assert!(routes.requests().is_empty());
    }

    #[tokio::test]
    async fn successful_route_is_displayed_and_saved() {
        let routes = FakeRoutes::new();
        let sink = Arc::new(FakeSink {
            signed_in: true,
            ..Default::default()
        });
        let positions = ManualPositions::at(Ok(PHOENIX));
        let mut p = planner(&routes, &sink, &positions, PlannerOptions::default());
        p.start().await.unwrap();

        let form = TripForm {
            stops: vec!["Mesa".into()],
            truck_height: Some(13.5),
            truck_weight: Some(30_000.0),
            ..to_tempe()
        };
        p.submit(&form).await.unwrap();

        assert_eq!(p.state(), PlannerState::RouteDisplayed);
        assert!(p.route().is_some());
        assert!(p.saved_trip().is_some());
        assert_eq!(p.banner(), None);

        let sent = &routes.requests()[0];
        assert_eq!(sent.profile, RouteProfile::HeavyGoods);
        assert_eq!(sent.stops(), [MESA]);

        let saved = sink.saved.lock().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].end.as_deref(), Some("Tempe"));
        assert_eq!(saved[0].stops.as_deref(), Some(&["Mesa".to_string()][..]));
        assert_eq!(saved[0].truck_weight, Some(serde_json::json!(30_000.0)));
    }

    #[tokio::test]
    async fn signed_out_routes_are_not_saved() {
        let routes = FakeRoutes::new();
        let sink = Arc::new(FakeSink::default());
        let positions = ManualPositions::at(Ok(PHOENIX));
        let mut p = planner(&routes, &sink, &positions, PlannerOptions::default());
        p.start().await.unwrap();
        p.submit(&to_tempe()).await.unwrap();
        assert_eq!(p.state(), PlannerState::RouteDisplayed);
        assert!(sink.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn routing_failure_returns_to_ready_without_a_trip() {
        let routes = FakeRoutes::new();
        routes.fail(true);
        let sink = Arc::new(FakeSink {
            signed_in: true,
            ..Default::default()
        });
        let positions = ManualPositions::at(Ok(PHOENIX));
        let mut p = planner(&routes, &sink, &positions, PlannerOptions::default());
        p.start().await.unwrap();

        assert!(matches!(p.submit(&to_tempe()).await, Err(PlannerError::Route(_))));
        assert_eq!(p.state(), PlannerState::Ready);
        assert!(p.banner().unwrap().starts_with("Failed to fetch route"));
        assert!(p.route().is_none());
        assert!(sink.saved.lock().unwrap().is_empty());

        let unknown = TripForm {
            destination: "Atlantis".into(),
            ..Default::default()
        };
        routes.fail(false);
        assert!(p.submit(&unknown).await.is_err());
        assert_eq!(p.state(), PlannerState::Ready);
    }

    #[tokio::test]
    async fn save_failure_is_only_a_banner() {
        let routes = FakeRoutes::new();
        let sink = Arc::new(FakeSink {
            signed_in: true,
            fail: true,
            ..Default::default()
        });
        let positions = ManualPositions::at(Ok(PHOENIX));
        let mut p = planner(&routes, &sink, &positions, PlannerOptions::default());
        p.start().await.unwrap();
        p.submit(&to_tempe()).await.unwrap();
        assert_eq!(p.state(), PlannerState::RouteDisplayed);
        assert!(p.banner().unwrap().contains("could not be saved"));
    }

    #[tokio::test]
    async fn tracking_reroutes_when_off_route_without_saving() {
        let routes = FakeRoutes::new();
        let sink = Arc::new(FakeSink {
            signed_in: true,
            ..Default::default()
        });
        let positions = ManualPositions::at(Ok(PHOENIX));
        let mut p = planner(&routes, &sink, &positions, PlannerOptions::default());
        p.start().await.unwrap();
        p.submit(&to_tempe()).await.unwrap();
        p.start_tracking().await.unwrap();
        assert_eq!(p.state(), PlannerState::Tracking);

        let on_route = line(PHOENIX, TEMPE, 400)[100];
        assert_eq!(p.on_position(on_route).await.unwrap(), TrackingEvent::OnRoute);

        // about 1.1 km north of the line
        let detour = Coordinate::new(on_route.lat + 0.01, on_route.lng);
        assert_eq!(p.on_position(detour).await.unwrap(), TrackingEvent::Rerouted);
        assert_eq!(p.state(), PlannerState::Tracking);
        assert_eq!(routes.requests().last().unwrap().start(), Some(&detour));
        assert_eq!(sink.saved.lock().unwrap().len(), 1);

        routes.fail(true);
        let before = p.route().cloned();
        let farther = Coordinate::new(detour.lat + 0.02, detour.lng);
        assert_eq!(p.on_position(farther).await.unwrap(), TrackingEvent::RerouteFailed);
        assert_eq!(p.route().cloned(), before);
        assert!(p.banner().is_some());
    }

    #[tokio::test]
    async fn driving_between_sparse_vertices_stays_on_route() {
        let routes = FakeRoutes::new();
        *routes.sparse.lock().unwrap() = true;
        let sink = Arc::new(FakeSink::default());
        let positions = ManualPositions::at(Ok(PHOENIX));
        let mut p = planner(&routes, &sink, &positions, PlannerOptions::default());
        p.start().await.unwrap();
        p.submit(&to_tempe()).await.unwrap();
        assert_eq!(p.route().unwrap().geometry, [PHOENIX, TEMPE]);
        p.start_tracking().await.unwrap();

        let midway = line(PHOENIX, TEMPE, 2)[1];
        assert_eq!(p.on_position(midway).await.unwrap(), TrackingEvent::OnRoute);
        assert_eq!(routes.requests().len(), 1);

        let detour = Coordinate::new(midway.lat + 0.01, midway.lng);
        assert_eq!(p.on_position(detour).await.unwrap(), TrackingEvent::Rerouted);
    }

    #[tokio::test]
    async fn arrival_ends_trip_and_releases_watch() {
        let routes = FakeRoutes::new();
        let sink = Arc::new(FakeSink::default());
        let positions = ManualPositions::at(Ok(PHOENIX));
        let mut p = planner(&routes, &sink, &positions, PlannerOptions::default());
        p.start().await.unwrap();
        p.submit(&to_tempe()).await.unwrap();
        p.start_tracking().await.unwrap();

        let feed = positions.feed();
        let path = line(PHOENIX, TEMPE, 400);
        for point in [path[50], path[200], path[399]] {
            assert!(feed.send(point).await);
        }
        assert_eq!(p.run_tracking().await.unwrap(), TrackingOutcome::Arrived);
        assert_eq!(p.state(), PlannerState::Ended);
        assert!(!p.is_watching());
        assert!(feed.is_cancelled());
    }

    #[tokio::test]
    async fn end_trip_and_drop_release_watch() {
        let routes = FakeRoutes::new();
        let sink = Arc::new(FakeSink::default());
        let positions = ManualPositions::at(Ok(PHOENIX));

        let mut p = planner(&routes, &sink, &positions, PlannerOptions::default());
        p.start().await.unwrap();
        p.submit(&to_tempe()).await.unwrap();
        p.start_tracking().await.unwrap();
        let feed = positions.feed();
        p.end_trip().unwrap();
        assert_eq!(p.state(), PlannerState::Ended);
        assert!(feed.is_cancelled());

        // a new route can be planned after ending
        p.submit(&to_tempe()).await.unwrap();
        p.start_tracking().await.unwrap();
        let feed = positions.feed();
        assert!(!feed.is_cancelled());
        drop(p);
        assert!(feed.is_cancelled());
    }

    #[tokio::test]
    async fn closed_feed_keeps_route_displayed() {
        let routes = FakeRoutes::new();
        let sink = Arc::new(FakeSink::default());
        let track = line(PHOENIX, TEMPE, 400)[..3].to_vec();
        let positions = Arc::new(ReplayPositionSource::new(track, Duration::from_millis(1)));
        let mut p = RoutePlanner::new(routes.clone(), sink, positions, PlannerOptions::default());
        p.start().await.unwrap();
        p.submit(&to_tempe()).await.unwrap();
        p.start_tracking().await.unwrap();

        assert_eq!(p.run_tracking().await.unwrap(), TrackingOutcome::FeedClosed);
        assert_eq!(p.state(), PlannerState::RouteDisplayed);
        assert!(p.route().is_some());
    }

    #[tokio::test]
    async fn transitions_are_guarded() {
        let routes = FakeRoutes::new();
        let sink = Arc::new(FakeSink::default());
        let positions = ManualPositions::at(Ok(PHOENIX));
        let mut p = planner(&routes, &sink, &positions, PlannerOptions::default());

        assert!(matches!(
            p.submit(&to_tempe()).await,
            Err(PlannerError::InvalidTransition { state: PlannerState::Idle, .. })
        ));
        assert!(p.start_tracking().await.is_err());
        assert!(p.end_trip().is_err());
        assert!(p.on_position(PHOENIX).await.is_err());
    }
}
