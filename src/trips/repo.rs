use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use super::repo_types::{NewTrip, Trip, TripRow};
use crate::error::StoreError;

/// Trip record store. Records are write-once.
#[async_trait]
pub trait TripStore: Send + Sync {
    async fn insert(&self, new: NewTrip) -> Result<Trip, StoreError>;

    /// Newest first; ties on `created_at` resolve by insertion order.
    async fn list(&self, user_id: Uuid, limit: i64, offset: i64) -> Result<Vec<Trip>, StoreError>;

    async fn delete_for_user(&self, user_id: Uuid) -> Result<u64, StoreError>;
}

#[derive(Clone)]
pub struct PgTripStore {
    db: PgPool,
}

impl PgTripStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TripStore for PgTripStore {
    async fn insert(&self, new: NewTrip) -> Result<Trip, StoreError> {
        let row = sqlx::query_as::<_, TripRow>(
            r#"
            INSERT INTO trips (id, user_id, origin, destination, stops,
                               truck_height_ft, truck_weight_lbs, route)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, user_id, origin, destination, stops,
                      truck_height_ft, truck_weight_lbs, route, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.user_id)
        .bind(new.origin.map(Json))
        .bind(&new.destination)
        .bind(Json(&new.stops))
        .bind(new.truck_height_ft)
        .bind(new.truck_weight_lbs)
        .bind(Json(&new.route))
        .fetch_one(&self.db)
        .await?;
        Ok(row.into())
    }

    async fn list(&self, user_id: Uuid, limit: i64, offset: i64) -> Result<Vec<Trip>, StoreError> {
        let rows = sqlx::query_as::<_, TripRow>(
            r#"
            SELECT id, user_id, origin, destination, stops,
                   truck_height_ft, truck_weight_lbs, route, created_at
            FROM trips
            WHERE user_id = $1
            ORDER BY created_at DESC, seq DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Trip::from).collect())
    }

    async fn delete_for_user(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let res = sqlx::query("DELETE FROM trips WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected())
    }
}
