use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthCheckResponse, LoginRequest, SignupRequest, TokenResponse, UpdateProfileRequest,
            UpdateProfileResponse,
        },
        extractors::{AuthUser, MaybeAuthUser},
        jwt::JwtKeys,
        repo_types::User,
        services,
    },
    error::{AppError, AppResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/check", get(check))
}

pub fn user_routes() -> Router<AppState> {
    Router::new().route(
        "/auth/user",
        get(get_user).put(update_user).delete(delete_user),
    )
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> AppResult<(StatusCode, Json<TokenResponse>)> {
    let keys = JwtKeys::from_ref(&state);
    let (_, token) = services::signup(state.users.as_ref(), &keys, payload).await?;
    Ok((StatusCode::CREATED, Json(TokenResponse { token })))
}

/// Unknown email and wrong password produce the same response.
#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let keys = JwtKeys::from_ref(&state);
    match services::login(state.users.as_ref(), &keys, payload).await {
        Ok((_, token)) => Ok(Json(TokenResponse { token })),
        Err(AppError::NotFound(_)) | Err(AppError::InvalidCredentials) => {
            Err(AppError::InvalidCredentials)
        }
        Err(e) => Err(e),
    }
}

#[instrument(skip(state, session))]
pub async fn check(
    State(state): State<AppState>,
    session: MaybeAuthUser,
) -> AppResult<Json<AuthCheckResponse>> {
    let user_id = match session.0 {
        Some(id) => state.users.find_by_id(id).await?.map(|u| u.id),
        None => None,
    };
    if session.0.is_some() && user_id.is_none() {
        warn!("valid token for a deleted user");
    }
    Ok(Json(AuthCheckResponse {
        is_authenticated: user_id.is_some(),
        user_id,
    }))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<User>> {
    Ok(Json(services::profile(state.users.as_ref(), user_id).await?))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<UpdateProfileResponse>> {
    let user = services::update_profile(state.users.as_ref(), user_id, payload).await?;
    Ok(Json(UpdateProfileResponse {
        message: "Profile updated successfully".into(),
        user,
    }))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<StatusCode> {
    services::delete_account(state.users.as_ref(), state.trips.as_ref(), user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
