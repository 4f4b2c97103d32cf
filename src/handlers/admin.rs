use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::check_auth;
use crate::models::{Staff, StaffRole};
use crate::state::AppState;

// GET /api/stats
#[derive(Serialize)]
pub struct StatsResponse {
    requested_count: i64,
    pending_count: i64,
    finished_count: i64,
    pending_today: i64,
}

pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<StatsResponse>, AppError> {
    check_auth(&headers, &state.config.staff_token)?;

    let today = Utc::now().date_naive();
    let stats = {
        let db = state.db.lock().unwrap();
        queries::get_dashboard_stats(&db, today)?
    };

    Ok(Json(StatsResponse {
        requested_count: stats.requested_count,
        pending_count: stats.pending_count,
        finished_count: stats.finished_count,
        pending_today: stats.pending_today,
    }))
}

// GET /api/staff
#[derive(Deserialize)]
pub struct StaffQuery {
    pub role: Option<String>,
}

pub async fn list_staff(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<StaffQuery>,
) -> Result<Json<Vec<Staff>>, AppError> {
    check_auth(&headers, &state.config.staff_token)?;

    let role = match query.role.as_deref() {
        Some(r) => Some(
            StaffRole::parse(r).ok_or_else(|| AppError::Validation(format!("unknown role: {r}")))?,
        ),
        None => None,
    };

    let staff = {
        let db = state.db.lock().unwrap();
        queries::list_staff(&db, role)?
    };
    Ok(Json(staff))
}

// POST /api/staff
#[derive(Deserialize)]
pub struct CreateStaffRequest {
    pub name: String,
    #[serde(default)]
    pub phone: String,
    pub role: StaffRole,
}

pub async fn create_staff(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateStaffRequest>,
) -> Result<(StatusCode, Json<Staff>), AppError> {
    check_auth(&headers, &state.config.staff_token)?;

    if body.name.trim().is_empty() {
        return Err(AppError::Validation("name is required".to_string()));
    }

    let staff = Staff {
        id: Uuid::new_v4().to_string(),
        name: body.name,
        phone: body.phone,
        role: body.role,
    };

    {
        let db = state.db.lock().unwrap();
        queries::create_staff(&db, &staff)?;
    }

    tracing::info!(staff_id = %staff.id, role = staff.role.as_str(), "staff member added");
    Ok((StatusCode::CREATED, Json(staff)))
}
