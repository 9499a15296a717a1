use axum::{
    extract::{Json, Query, State, rejection::JsonRejection},
    http::StatusCode,
};

use super::model::LocationQuery;
use crate::AppState;
use crate::error::AppError;
use crate::models::{Message, NewMessage};

#[axum::debug_handler]
pub async fn put_message(
    State(state): State<AppState>,
    body: Result<Json<NewMessage>, JsonRejection>,
) -> Result<(StatusCode, Json<Message>), AppError> {
    let Json(req) = body.map_err(|rejection| {
        tracing::debug!("Rejected message body: {}", rejection.body_text());
        AppError::InvalidRequest(format!("Invalid Json: {}", rejection.body_text()))
    })?;

    match state.index.insert(req).await {
        Ok(message) => Ok((StatusCode::CREATED, Json(message))),
        Err(e) => {
            tracing::error!("Failed to store message: {}", e);
            Err(AppError::from_write(e))
        }
    }
}

#[axum::debug_handler]
pub async fn get_messages(
    State(state): State<AppState>,
    Query(query): Query<LocationQuery>,
) -> Result<Json<Vec<Message>>, AppError> {
    let (latitude, longitude) = query.parse()?;

    match state.index.nearby(latitude, longitude).await {
        Ok(messages) => Ok(Json(messages)),
        Err(e) => {
            tracing::error!("Failed to get messages: {}", e);
            Err(AppError::from_read(e))
        }
    }
}
