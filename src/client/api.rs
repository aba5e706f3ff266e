//! Typed HTTP client for the Freight Flow backend.
//!
//! Every authenticated call reads its bearer token from the shared
//! [`Session`]; signup and login populate it, logout clears it.

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::dashboard::TripFeed;
use super::planner::{RouteService, TripSink};
use super::session::Session;
use crate::auth::dto::{
    AuthCheckResponse, LoginRequest, SignupRequest, TokenResponse, UpdateProfileRequest,
    UpdateProfileResponse,
};
use crate::auth::repo_types::User;
use crate::mapping::dto::{GeocodeQuery, GeocodeResponse, RouteQuery};
use crate::routing::{Coordinate, RouteRequest, RouteResponse};
use crate::trips::dto::CreateTripRequest;
use crate::trips::repo_types::Trip;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport failure (connection, TLS, timeout, undecodable body).
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Backend answered with a non-2xx status.
    #[error("{message} ({status})")]
    Api { status: u16, message: String },

    #[error("not signed in")]
    NotSignedIn,

    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),
}

impl ClientError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::NotSignedIn | ClientError::Api { status: 401, .. })
    }
}

#[derive(Clone)]
pub struct FreightClient {
    http: reqwest::Client,
    base_url: String,
    session: Session,
}

impl FreightClient {
    pub fn new(base_url: impl Into<String>, session: Session) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, session)
    }

    pub fn with_client(
        http: reqwest::Client,
        base_url: impl Into<String>,
        session: Session,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    fn authed(&self, request: RequestBuilder) -> Result<RequestBuilder, ClientError> {
        let token = self.session.token().ok_or(ClientError::NotSignedIn)?;
        Ok(request.bearer_auth(token))
    }

    /// Non-2xx becomes [`ClientError::Api`] carrying the backend's
    /// `error` (or `message`) field, else the raw body.
    async fn check_status(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| {
                v.get("error")
                    .or_else(|| v.get("message"))
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
            })
            .unwrap_or(body);
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn parse_response<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        Ok(Self::check_status(response).await?.json::<T>().await?)
    }

    /// The token is kept only once `/auth/check` confirms it and names the
    /// user; any other answer leaves the session signed out.
    async fn start_session(&self, token: String) -> Result<(), ClientError> {
        self.session.begin(token);
        match self.check().await {
            Ok(AuthCheckResponse {
                is_authenticated: true,
                user_id: Some(user_id),
            }) => {
                self.session.set_user(user_id);
                Ok(())
            }
            Ok(_) => {
                self.session.end();
                Err(ClientError::Api {
                    status: 401,
                    message: "session was not accepted".into(),
                })
            }
            Err(e) => {
                self.session.end();
                Err(e)
            }
        }
    }

    #[instrument(skip_all)]
    pub async fn signup(&self, request: &SignupRequest) -> Result<(), ClientError> {
        let response = self.http.post(self.url("/auth/signup")).json(request).send().await?;
        let TokenResponse { token } = Self::parse_response(response).await?;
        self.start_session(token).await
    }

    #[instrument(skip_all)]
    pub async fn login(&self, request: &LoginRequest) -> Result<(), ClientError> {
        let response = self.http.post(self.url("/auth/login")).json(request).send().await?;
        let TokenResponse { token } = Self::parse_response(response).await?;
        self.start_session(token).await
    }

    pub fn logout(&self) {
        self.session.end();
    }

    /// Without a token this answers locally; no request is sent.
    pub async fn check(&self) -> Result<AuthCheckResponse, ClientError> {
        if !self.session.is_authenticated() {
            return Ok(AuthCheckResponse {
                is_authenticated: false,
                user_id: None,
            });
        }
        let response = self.authed(self.http.get(self.url("/auth/check")))?.send().await?;
        Self::parse_response(response).await
    }

    pub async fn profile(&self) -> Result<User, ClientError> {
        let response = self.authed(self.http.get(self.url("/auth/user")))?.send().await?;
        Self::parse_response(response).await
    }

    pub async fn update_profile(
        &self,
        request: &UpdateProfileRequest,
    ) -> Result<UpdateProfileResponse, ClientError> {
        let response = self
            .authed(self.http.put(self.url("/auth/user")))?
            .json(request)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// Deletes the account and its trips, then ends the session.
    pub async fn delete_account(&self) -> Result<(), ClientError> {
        let response = self.authed(self.http.delete(self.url("/auth/user")))?.send().await?;
        Self::check_status(response).await?;
        self.session.end();
        Ok(())
    }

    pub async fn recent_trips(&self, limit: i64) -> Result<Vec<Trip>, ClientError> {
        let response = self
            .authed(self.http.get(self.url("/trips/recent")))?
            .query(&[("limit", limit)])
            .send()
            .await?;
        Self::parse_response(response).await
    }

    pub async fn trips(&self, limit: i64, offset: i64) -> Result<Vec<Trip>, ClientError> {
        let response = self
            .authed(self.http.get(self.url("/trips")))?
            .query(&[("limit", limit), ("offset", offset)])
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// Fills `user` from the session when the caller left it empty.
    pub async fn save_trip(&self, mut request: CreateTripRequest) -> Result<Trip, ClientError> {
        if request.user.is_none() {
            request.user = self.session.user_id().map(|id| id.to_string());
        }
        let response = self
            .authed(self.http.post(self.url("/trips")))?
            .json(&request)
            .send()
            .await?;
        let trip: Trip = Self::parse_response(response).await?;
        debug!(trip_id = %trip.id, "trip saved");
        Ok(trip)
    }

    pub async fn geocode(&self, address: &str) -> Result<Coordinate, ClientError> {
        let response = self
            .http
            .get(self.url("/geocode"))
            .query(&GeocodeQuery {
                address: address.to_string(),
            })
            .send()
            .await?;
        let found: GeocodeResponse = Self::parse_response(response).await?;
        Ok(Coordinate::new(found.latitude, found.longitude))
    }

    pub async fn route(&self, request: &RouteRequest) -> Result<RouteResponse, ClientError> {
        let (Some(start), Some(end)) = (request.start(), request.end()) else {
            return Err(ClientError::InvalidRequest("a route needs a start and an end"));
        };
        let stops = request.stops();
        let truck = request.truck.unwrap_or_default();
        let query = RouteQuery {
            start: start.to_lng_lat(),
            end: end.to_lng_lat(),
            via: (!stops.is_empty()).then(|| {
                stops.iter().map(Coordinate::to_lng_lat).collect::<Vec<_>>().join(";")
            }),
            profile: Some(request.profile),
            height: truck.height_ft,
            weight: truck.weight_lbs,
        };
        let response = self.http.get(self.url("/route")).query(&query).send().await?;
        Self::parse_response(response).await
    }
}

#[async_trait]
impl RouteService for FreightClient {
    async fn geocode(&self, address: &str) -> Result<Coordinate, ClientError> {
        FreightClient::geocode(self, address).await
    }

    async fn route(&self, request: &RouteRequest) -> Result<RouteResponse, ClientError> {
        FreightClient::route(self, request).await
    }
}

#[async_trait]
impl TripSink for FreightClient {
    fn can_persist(&self) -> bool {
        self.session.user_id().is_some()
    }

    async fn save_trip(&self, request: CreateTripRequest) -> Result<Trip, ClientError> {
        FreightClient::save_trip(self, request).await
    }
}

#[async_trait]
impl TripFeed for FreightClient {
    async fn check(&self) -> Result<Option<Uuid>, ClientError> {
        let check = FreightClient::check(self).await?;
        Ok(check.user_id.filter(|_| check.is_authenticated))
    }

    async fn recent_trips(&self, limit: i64) -> Result<Vec<Trip>, ClientError> {
        FreightClient::recent_trips(self, limit).await
    }
}
