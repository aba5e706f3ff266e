use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{
    dto::{LoginRequest, SignupRequest, UpdateProfileRequest},
    jwt::JwtKeys,
    password::{hash_password, verify_password},
    repo::UserStore,
    repo_types::{NewUser, User, UserChanges},
};
use crate::error::{AppError, AppResult};
use crate::trips::repo::TripStore;

pub const MIN_PASSWORD_LEN: usize = 6;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn check_email(email: &str) -> AppResult<()> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(AppError::validation("Invalid email"))
    }
}

fn check_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn check_username(username: &str) -> AppResult<()> {
    if username.is_empty() {
        return Err(AppError::validation("Username is required"));
    }
    Ok(())
}

/// Registers a user and returns it with a fresh session token.
pub async fn signup(
    users: &dyn UserStore,
    keys: &JwtKeys,
    req: SignupRequest,
) -> AppResult<(User, String)> {
    let username = req.username.trim().to_string();
    let email = normalize_email(&req.email);
    check_username(&username)?;
    check_email(&email)?;
    check_password(&req.password)?;

    if users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::DuplicateUser("User already exists".into()));
    }

    let new = NewUser {
        username,
        email,
        password: hash_password(&req.password)?,
    };
    let user = users.create(new).await?;
    let token = keys.sign(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((user, token))
}

/// Distinguishes [`AppError::NotFound`] from [`AppError::InvalidCredentials`];
/// the HTTP layer decides how much of that to reveal.
pub async fn login(
    users: &dyn UserStore,
    keys: &JwtKeys,
    req: LoginRequest,
) -> AppResult<(User, String)> {
    let email = normalize_email(&req.email);

    let Some(user) = users.find_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AppError::NotFound("User not found".into()));
    };

    if !verify_password(&req.password, &user.password_hash)? {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let token = keys.sign(user.id)?;
    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok((user, token))
}

pub async fn profile(users: &dyn UserStore, user_id: Uuid) -> AppResult<User> {
    users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

fn supplied(field: Option<String>) -> Option<String> {
    field.filter(|v| !v.trim().is_empty())
}

pub async fn update_profile(
    users: &dyn UserStore,
    user_id: Uuid,
    req: UpdateProfileRequest,
) -> AppResult<User> {
    let mut changes = UserChanges::default();

    if let Some(username) = supplied(req.username) {
        changes.username = Some(username.trim().to_string());
    }
    if let Some(email) = supplied(req.email) {
        let email = normalize_email(&email);
        check_email(&email)?;
        if let Some(other) = users.find_by_email(&email).await? {
            if other.id != user_id {
                warn!(user_id = %user_id, "email change collides with another user");
                return Err(AppError::DuplicateUser("Email already registered".into()));
            }
        }
        changes.email = Some(email);
    }
    if let Some(password) = supplied(req.password) {
        check_password(&password)?;
        changes.password = Some(hash_password(&password)?);
    }

    if changes.is_empty() {
        return profile(users, user_id).await;
    }

    let user = users
        .update(user_id, changes)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    info!(user_id = %user.id, "profile updated");
    Ok(user)
}

/// Removes the account together with every trip it owns.
pub async fn delete_account(
    users: &dyn UserStore,
    trips: &dyn TripStore,
    user_id: Uuid,
) -> AppResult<()> {
    let removed_trips = trips.delete_for_user(user_id).await?;
    if !users.delete(user_id).await? {
        return Err(AppError::NotFound("User not found".into()));
    }
    info!(user_id = %user_id, removed_trips, "account deleted");
    Ok(())
}
