use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRequestParts, Path, State},
    http::request::Parts,
};

use crate::{
    error::AppError,
    state::AppState,
    types::{Engagement, ItemId, UserId},
};

/// Header set by the authentication layer in front of this service.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Caller identity extractor. Rejects with 401 when the gateway header is
/// missing or not a numeric user id.
pub struct AuthUser(pub UserId);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok())
            .map(UserId)
            .ok_or(AppError::Unauthorized)?;

        Ok(AuthUser(user))
    }
}

async fn ensure_item(state: &AppState, item: ItemId) -> Result<(), AppError> {
    if !state.snapshots.item_exists(item).await? {
        return Err(AppError::ItemNotFound(item));
    }

    Ok(())
}

pub async fn like_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(item): Path<ItemId>,
) -> Result<Json<Engagement>, AppError> {
    ensure_item(&state, item).await?;

    Ok(Json(state.votes.like(user, item).await?))
}

pub async fn unlike_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(item): Path<ItemId>,
) -> Result<Json<Engagement>, AppError> {
    ensure_item(&state, item).await?;

    Ok(Json(state.votes.unlike(user, item).await?))
}

pub async fn dislike_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(item): Path<ItemId>,
) -> Result<Json<Engagement>, AppError> {
    ensure_item(&state, item).await?;

    Ok(Json(state.votes.dislike(user, item).await?))
}

pub async fn undislike_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(item): Path<ItemId>,
) -> Result<Json<Engagement>, AppError> {
    ensure_item(&state, item).await?;

    Ok(Json(state.votes.undislike(user, item).await?))
}

pub async fn status_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(item): Path<ItemId>,
) -> Result<Json<Engagement>, AppError> {
    ensure_item(&state, item).await?;

    Ok(Json(state.votes.status(user, item).await?))
}
