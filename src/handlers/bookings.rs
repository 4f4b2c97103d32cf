use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::queries::{self, BookingFilter};
use crate::errors::AppError;
use crate::handlers::check_auth;
use crate::models::{Booking, BookingStatus, PaymentMethod, ServiceCategory};
use crate::services::scheduling::{self, AssignmentRequest};
use crate::state::AppState;

// POST /api/bookings
#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub customer_name: String,
    pub customer_phone: String,
    pub service: ServiceCategory,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    if body.customer_name.trim().is_empty() {
        return Err(AppError::Validation("customer_name is required".to_string()));
    }
    if body.customer_phone.trim().is_empty() {
        return Err(AppError::Validation("customer_phone is required".to_string()));
    }

    let now = Utc::now().naive_utc();
    let booking = Booking {
        id: Uuid::new_v4().to_string(),
        customer_name: body.customer_name,
        customer_phone: body.customer_phone,
        service: body.service,
        status: BookingStatus::Requested,
        date: None,
        start_time: None,
        end_time: None,
        detailer_id: None,
        secretary_id: None,
        price: None,
        location: None,
        cancel_reason: None,
        payment_method: None,
        created_at: now,
        updated_at: now,
    };

    {
        let db = state.db.lock().unwrap();
        queries::create_booking(&db, &booking)?;
    }

    tracing::info!(booking_id = %booking.id, service = booking.service.as_str(), "booking requested");
    Ok((StatusCode::CREATED, Json(booking)))
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let booking = {
        let db = state.db.lock().unwrap();
        queries::get_booking_by_id(&db, &id)?
    };

    booking
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))
}

// GET /api/bookings
#[derive(Deserialize)]
pub struct BookingsQuery {
    pub status: Option<String>,
    pub detailer_id: Option<String>,
    pub phone: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    check_auth(&headers, &state.config.staff_token)?;

    let status = match query.status.as_deref() {
        Some(s) => Some(
            BookingStatus::parse(s)
                .ok_or_else(|| AppError::Validation(format!("unknown status: {s}")))?,
        ),
        None => None,
    };

    let filter = BookingFilter {
        status,
        detailer_id: query.detailer_id,
        customer_phone: query.phone,
        from: query.from,
        to: query.to,
        limit: query.limit.unwrap_or(50),
        offset: query.offset.unwrap_or(0),
    };

    let bookings = {
        let db = state.db.lock().unwrap();
        queries::list_bookings(&db, &filter)?
    };
    Ok(Json(bookings))
}

// POST /api/bookings/:id/accept
#[derive(Deserialize)]
pub struct AcceptRequest {
    pub detailer_id: String,
    pub secretary_id: String,
    pub date: NaiveDate,
    #[serde(with = "crate::models::slot::hhmm")]
    pub start: NaiveTime,
    #[serde(with = "crate::models::slot::hhmm")]
    pub end: NaiveTime,
    pub price: i64,
    pub location: String,
}

pub async fn accept_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<AcceptRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.staff_token)?;

    let request = AssignmentRequest {
        booking_id: id,
        detailer_id: body.detailer_id,
        secretary_id: body.secretary_id,
        date: body.date,
        start: body.start,
        end: body.end,
        price: body.price,
        location: body.location,
    };

    let booking = {
        let mut db = state.db.lock().unwrap();
        scheduling::assign(&mut db, &request)?
    };

    tracing::info!(
        booking_id = %booking.id,
        detailer_id = %request.detailer_id,
        date = %request.date,
        "booking assigned"
    );
    Ok(Json(serde_json::json!({
        "status": "assigned",
        "booking": booking,
    })))
}

// POST /api/bookings/:id/finish
#[derive(Deserialize)]
pub struct FinishRequest {
    pub payment_method: PaymentMethod,
}

pub async fn finish_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<FinishRequest>,
) -> Result<Json<Booking>, AppError> {
    check_auth(&headers, &state.config.staff_token)?;

    let db = state.db.lock().unwrap();
    let booking = queries::get_booking_by_id(&db, &id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;

    match booking.status {
        BookingStatus::Pending => {}
        BookingStatus::Requested => {
            return Err(AppError::InvalidTransition(
                format!("booking {id} has not been scheduled yet"),
            ));
        }
        BookingStatus::Finished | BookingStatus::Canceled => {
            return Err(AppError::InvalidTransition(format!(
                "booking {id} is already {}",
                booking.status.as_str()
            )));
        }
    }

    if !queries::finish_booking(&db, &id, body.payment_method)? {
        return Err(AppError::InvalidTransition(
            format!("booking {id} is no longer pending"),
        ));
    }

    let booking = queries::get_booking_by_id(&db, &id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;
    Ok(Json(booking))
}

// POST /api/bookings/:id/cancel
#[derive(Deserialize)]
pub struct CancelRequest {
    pub reason: String,
}

pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<CancelRequest>,
) -> Result<Json<Booking>, AppError> {
    check_auth(&headers, &state.config.staff_token)?;

    if body.reason.trim().is_empty() {
        return Err(AppError::Validation("cancellation reason is required".to_string()));
    }

    let db = state.db.lock().unwrap();
    let booking = queries::get_booking_by_id(&db, &id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;

    match booking.status {
        BookingStatus::Requested | BookingStatus::Pending => {}
        BookingStatus::Finished | BookingStatus::Canceled => {
            return Err(AppError::InvalidTransition(format!(
                "booking {id} is already {}",
                booking.status.as_str()
            )));
        }
    }

    if !queries::cancel_booking(&db, &id, body.reason.trim())? {
        return Err(AppError::InvalidTransition(
            format!("booking {id} can no longer be canceled"),
        ));
    }

    let booking = queries::get_booking_by_id(&db, &id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;
    Ok(Json(booking))
}

// POST /api/bookings/:id/rating
#[derive(Deserialize)]
pub struct RatingRequest {
    pub rating_number: i64,
    pub comment: Option<String>,
}

pub async fn rate_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<RatingRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !(0..=5).contains(&body.rating_number) {
        return Err(AppError::Validation(
            "rating_number must be between 0 and 5".to_string(),
        ));
    }

    let db = state.db.lock().unwrap();
    let booking = queries::get_booking_by_id(&db, &id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;

    if booking.status != BookingStatus::Finished {
        return Err(AppError::Validation(
            "only finished bookings can be rated".to_string(),
        ));
    }
    if queries::get_rating(&db, &id)?.is_some() {
        return Err(AppError::Validation(format!("booking {id} is already rated")));
    }

    queries::create_rating(&db, &id, body.rating_number, body.comment.as_deref())?;
    Ok(Json(serde_json::json!({ "ok": true })))
}
