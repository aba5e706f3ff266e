//! In-memory stores. Used when no `DATABASE_URL` is configured and by tests.
//! Contents are lost on restart.

use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::repo::UserStore;
use crate::auth::repo_types::{NewUser, User, UserChanges};
use crate::error::StoreError;
use crate::trips::repo::TripStore;
use crate::trips::repo_types::{NewTrip, Trip};

#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }
}

fn collision(
    users: &HashMap<Uuid, User>,
    id: Uuid,
    username: Option<&str>,
    email: Option<&str>,
) -> Option<&'static str> {
    users.values().filter(|u| u.id != id).find_map(|u| {
        if email == Some(u.email.as_str()) {
            Some("email")
        } else if username == Some(u.username.as_str()) {
            Some("username")
        } else {
            None
        }
    })
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn create(&self, new: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        let id = Uuid::new_v4();
        if let Some(field) = collision(&users, id, Some(&new.username), Some(&new.email)) {
            return Err(StoreError::Duplicate(field));
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id,
            username: new.username,
            email: new.email,
            password_hash: new.password.into_inner(),
            created_at: now,
            updated_at: now,
        };
        users.insert(id, user.clone());
        Ok(user)
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write().await;
        let taken = collision(&users, id, changes.username.as_deref(), changes.email.as_deref());
        if let Some(field) = taken {
            return Err(StoreError::Duplicate(field));
        }
        let Some(user) = users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(username) = changes.username {
            user.username = username;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(password) = changes.password {
            user.password_hash = password.into_inner();
        }
        user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.users.write().await.remove(&id).is_some())
    }
}

/// Trips kept in insertion order; the position breaks `created_at` ties.
#[derive(Default)]
pub struct MemoryTripStore {
    trips: RwLock<Vec<Trip>>,
}

#[async_trait]
impl TripStore for MemoryTripStore {
    async fn insert(&self, new: NewTrip) -> Result<Trip, StoreError> {
        let trip = Trip {
            id: Uuid::new_v4(),
            user: new.user_id,
            start: new.origin,
            end: new.destination,
            stops: new.stops,
            truck_height: new.truck_height_ft,
            truck_weight: new.truck_weight_lbs,
            route: new.route,
            created_at: OffsetDateTime::now_utc(),
        };
        self.trips.write().await.push(trip.clone());
        Ok(trip)
    }

    async fn list(&self, user_id: Uuid, limit: i64, offset: i64) -> Result<Vec<Trip>, StoreError> {
        let trips = self.trips.read().await;
        let mut owned: Vec<(usize, &Trip)> = trips
            .iter()
            .enumerate()
            .filter(|(_, t)| t.user == user_id)
            .collect();
        owned.sort_by(|(ia, a), (ib, b)| b.created_at.cmp(&a.created_at).then(ib.cmp(ia)));
        Ok(owned
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|(_, t)| t.clone())
            .collect())
    }

    async fn delete_for_user(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let mut trips = self.trips.write().await;
        let before = trips.len();
        trips.retain(|t| t.user != user_id);
        Ok((before - trips.len()) as u64)
    }
}
