use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::types::ItemId;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing or malformed caller identity")]
    Unauthorized,

    #[error("Item {0} not found")]
    ItemNotFound(ItemId),

    #[error("Not liked")]
    NotLiked,

    #[error("Not disliked")]
    NotDisliked,

    #[error("Engagement cache unavailable: {0}")]
    CacheUnavailable(#[from] redis::RedisError),

    #[error("Durable store error: {0}")]
    DurableStore(#[from] meilisearch_sdk::errors::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::ItemNotFound { .. } => StatusCode::NOT_FOUND,
            AppError::NotLiked | AppError::NotDisliked => StatusCode::BAD_REQUEST,
            AppError::CacheUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::DurableStore { .. } => StatusCode::BAD_GATEWAY,
        };

        (status, self.to_string()).into_response()
    }
}
