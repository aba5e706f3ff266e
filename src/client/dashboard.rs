use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use super::api::ClientError;
use crate::routing::format::meters_to_miles;
use crate::trips::repo_types::Trip;
use crate::trips::services::RECENT_TRIPS;

/// Freight trucks are assumed to get 7 miles per gallon.
pub const ASSUMED_MPG: f64 = 7.0;

#[async_trait]
pub trait TripFeed: Send + Sync {
    /// The signed-in user, or `None` when the session is not valid.
    async fn check(&self) -> Result<Option<Uuid>, ClientError>;

    async fn recent_trips(&self, limit: i64) -> Result<Vec<Trip>, ClientError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct TripStats {
    pub count: usize,
    pub average_distance_miles: Option<f64>,
    pub average_duration_minutes: Option<f64>,
    pub total_distance_miles: f64,
    pub estimated_fuel_gallons: f64,
}

impl TripStats {
    /// Aggregates the numeric route fields; display text is never parsed.
    pub fn from_trips(trips: &[Trip]) -> Self {
        let count = trips.len();
        let total_meters: f64 = trips.iter().map(|t| t.route.distance_meters).sum();
        let total_seconds: f64 = trips.iter().map(|t| t.route.duration_seconds).sum();
        let total_distance_miles = meters_to_miles(total_meters);

        let mean = |total: f64| (count > 0).then(|| total / count as f64);
        Self {
            count,
            average_distance_miles: mean(total_distance_miles),
            average_duration_minutes: mean(total_seconds / 60.0),
            total_distance_miles,
            estimated_fuel_gallons: total_distance_miles / ASSUMED_MPG,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub trips: Vec<Trip>,
    pub stats: TripStats,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DashboardView {
    SignInRequired,
    Ready(Dashboard),
}

/// Verifies the session first; a rejected or missing session shows the
/// sign-in prompt instead of an error.
pub async fn load_dashboard<F: TripFeed + ?Sized>(feed: &F) -> Result<DashboardView, ClientError> {
    let user = match feed.check().await {
        Ok(user) => user,
        Err(e) if e.is_unauthorized() => None,
        Err(e) => return Err(e),
    };
    let Some(user) = user else {
        return Ok(DashboardView::SignInRequired);
    };

    let trips = match feed.recent_trips(RECENT_TRIPS).await {
        Ok(trips) => trips,
        Err(e) if e.is_unauthorized() => return Ok(DashboardView::SignInRequired),
        Err(e) => return Err(e),
    };
    let stats = TripStats::from_trips(&trips);
    debug!(user_id = %user, trips = stats.count, "dashboard loaded");
    Ok(DashboardView::Ready(Dashboard { trips, stats }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::RouteSummary;
    use time::OffsetDateTime;

    fn trip(user: Uuid, meters: f64, seconds: f64) -> Trip {
        Trip {
            id: Uuid::new_v4(),
            user,
            start: None,
            end: "B".into(),
            stops: vec![],
            truck_height: None,
            truck_weight: None,
            route: RouteSummary::from_measurements(meters, seconds, vec![]),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    struct Feed {
        user: Result<Option<Uuid>, u16>,
        trips: Vec<Trip>,
    }

    #[async_trait]
    impl TripFeed for Feed {
        async fn check(&self) -> Result<Option<Uuid>, ClientError> {
            self.user.map_err(|status| ClientError::Api {
                status,
                message: "nope".into(),
            })
        }

        async fn recent_trips(&self, limit: i64) -> Result<Vec<Trip>, ClientError> {
            Ok(self.trips.iter().take(limit as usize).cloned().collect())
        }
    }

    #[test]
    fn stats_use_numeric_fields() {
        let user = Uuid::new_v4();
        // 10 mi / 20 min and 4 mi / 10 min
        let trips = [trip(user, 16_093.44, 1_200.0), trip(user, 6_437.376, 600.0)];
        let stats = TripStats::from_trips(&trips);
        assert_eq!(stats.count, 2);
        assert!((stats.average_distance_miles.unwrap() - 7.0).abs() < 1e-9);
        assert!((stats.average_duration_minutes.unwrap() - 15.0).abs() < 1e-9);
        assert!((stats.total_distance_miles - 14.0).abs() < 1e-9);
        assert!((stats.estimated_fuel_gallons - 2.0).abs() < 1e-9);
    }

    #[test]
    fn no_trips_no_averages() {
        let stats = TripStats::from_trips(&[]);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.average_distance_miles, None);
        assert_eq!(stats.average_duration_minutes, None);
        assert_eq!(stats.estimated_fuel_gallons, 0.0);
    }

    #[tokio::test]
    async fn signed_out_sees_prompt() {
        let feed = Feed { user: Ok(None), trips: vec![] };
        assert_eq!(load_dashboard(&feed).await.unwrap(), DashboardView::SignInRequired);

        let expired = Feed { user: Err(401), trips: vec![] };
        assert_eq!(load_dashboard(&expired).await.unwrap(), DashboardView::SignInRequired);

        let broken = Feed { user: Err(500), trips: vec![] };
        assert!(load_dashboard(&broken).await.is_err());
    }

    #[tokio::test]
    async fn signed_in_gets_five_trips_and_stats() {
        let user = Uuid::new_v4();
        let trips = (0..7).map(|_| trip(user, 1_609.344, 60.0)).collect();
        let feed = Feed { user: Ok(Some(user)), trips };
        let DashboardView::Ready(dashboard) = load_dashboard(&feed).await.unwrap() else {
            panic!("expected a dashboard");
        };
        assert_eq!(dashboard.trips.len(), RECENT_TRIPS as usize);
        assert_eq!(dashboard.stats.count, 5);
        assert!((dashboard.stats.total_distance_miles - 5.0).abs() < 1e-9);
    }
}
