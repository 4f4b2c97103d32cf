use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::NaiveDate;

use crate::errors::AppError;
use crate::handlers::check_auth;
use crate::models::ScheduledSlot;
use crate::services::scheduling;
use crate::state::AppState;

// GET /api/schedule/:detailer_id/:date
pub async fn day_schedule(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((detailer_id, date)): Path<(String, NaiveDate)>,
) -> Result<Json<Vec<ScheduledSlot>>, AppError> {
    check_auth(&headers, &state.config.staff_token)?;

    let db = state.db.lock().unwrap();
    let slots = scheduling::get_schedule(&db, &detailer_id, Some(date))?;
    Ok(Json(slots))
}

// GET /api/schedule/:detailer_id
pub async fn full_schedule(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(detailer_id): Path<String>,
) -> Result<Json<Vec<ScheduledSlot>>, AppError> {
    check_auth(&headers, &state.config.staff_token)?;

    let db = state.db.lock().unwrap();
    let slots = scheduling::get_schedule(&db, &detailer_id, None)?;
    Ok(Json(slots))
}
