use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rusqlite::{params, Connection};

use crate::models::slot;
use crate::models::{
    Booking, BookingStatus, PaymentMethod, ScheduledSlot, ServiceCategory, Staff, StaffRole,
};

const BOOKING_COLUMNS: &str = "id, customer_name, customer_phone, service, status, date, \
     start_time, end_time, detailer_id, secretary_id, price, location, cancel_reason, \
     payment_method, created_at, updated_at";

// ── Bookings ──

pub fn create_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        &format!("INSERT INTO bookings ({BOOKING_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)"),
        params![
            booking.id,
            booking.customer_name,
            booking.customer_phone,
            booking.service.as_str(),
            booking.status.as_str(),
            booking.date.map(|d| d.to_string()),
            booking.start_time.map(|t| slot::format_time(&t)),
            booking.end_time.map(|t| slot::format_time(&t)),
            booking.detailer_id,
            booking.secretary_id,
            booking.price,
            booking.location,
            booking.cancel_reason,
            booking.payment_method.map(|m| m.as_str()),
            fmt_dt(&booking.created_at),
            fmt_dt(&booking.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
        params![id],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// One filter spec for every booking list endpoint. Builds the WHERE clause
/// and its parameters together so callers cannot drift out of sync.
#[derive(Debug, Default, Clone)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub detailer_id: Option<String>,
    pub customer_phone: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: i64,
    pub offset: i64,
}

impl BookingFilter {
    fn clauses(&self) -> (String, Vec<Box<dyn rusqlite::types::ToSql>>) {
        let mut conds: Vec<String> = vec![];
        let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![];

        if let Some(status) = self.status {
            values.push(Box::new(status.as_str().to_string()));
            conds.push(format!("status = ?{}", values.len()));
        }
        if let Some(detailer_id) = &self.detailer_id {
            values.push(Box::new(detailer_id.clone()));
            conds.push(format!("detailer_id = ?{}", values.len()));
        }
        if let Some(phone) = &self.customer_phone {
            values.push(Box::new(phone.clone()));
            conds.push(format!("customer_phone = ?{}", values.len()));
        }
        if let Some(from) = self.from {
            values.push(Box::new(from.to_string()));
            conds.push(format!("date >= ?{}", values.len()));
        }
        if let Some(to) = self.to {
            values.push(Box::new(to.to_string()));
            conds.push(format!("date <= ?{}", values.len()));
        }

        let where_clause = if conds.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conds.join(" AND "))
        };
        (where_clause, values)
    }
}

pub fn list_bookings(conn: &Connection, filter: &BookingFilter) -> anyhow::Result<Vec<Booking>> {
    let (where_clause, mut values) = filter.clauses();

    let limit = if filter.limit > 0 { filter.limit } else { 50 };
    values.push(Box::new(limit));
    let limit_idx = values.len();
    values.push(Box::new(filter.offset.max(0)));
    let offset_idx = values.len();

    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings{where_clause} \
         ORDER BY created_at DESC LIMIT ?{limit_idx} OFFSET ?{offset_idx}"
    );

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        values.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

// ── Scheduling ──

/// Committed intervals for one detailer on one date, start ascending. Only
/// `pending` bookings occupy the calendar.
pub fn find_pending_slots(
    conn: &Connection,
    detailer_id: &str,
    date: NaiveDate,
) -> anyhow::Result<Vec<ScheduledSlot>> {
    let mut stmt = conn.prepare(
        "SELECT id, date, start_time, end_time FROM bookings
         WHERE detailer_id = ?1 AND date = ?2 AND status = 'pending'
         ORDER BY start_time ASC",
    )?;

    let rows = stmt.query_map(params![detailer_id, date.to_string()], |row| {
        Ok(parse_slot_row(row))
    })?;

    let mut slots = vec![];
    for row in rows {
        slots.push(row??);
    }
    Ok(slots)
}

/// Full forward schedule for a detailer, `(date, start)` ascending.
pub fn find_detailer_schedule(
    conn: &Connection,
    detailer_id: &str,
) -> anyhow::Result<Vec<ScheduledSlot>> {
    let mut stmt = conn.prepare(
        "SELECT id, date, start_time, end_time FROM bookings
         WHERE detailer_id = ?1 AND status = 'pending'
         ORDER BY date ASC, start_time ASC",
    )?;

    let rows = stmt.query_map(params![detailer_id], |row| Ok(parse_slot_row(row)))?;

    let mut slots = vec![];
    for row in rows {
        slots.push(row??);
    }
    Ok(slots)
}

/// Populates the schedule fields and flips the booking to `pending` in one
/// statement. The `status = 'requested'` guard is the last-resort safety net
/// under the application-level conflict check: a booking that raced past us
/// is left alone and zero rows are reported back.
#[allow(clippy::too_many_arguments)]
pub fn commit_assignment(
    conn: &Connection,
    booking_id: &str,
    detailer_id: &str,
    secretary_id: &str,
    date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
    price: i64,
    location: &str,
) -> anyhow::Result<bool> {
    let now = fmt_dt(&Utc::now().naive_utc());
    let count = conn.execute(
        "UPDATE bookings SET
            status = 'pending', detailer_id = ?1, secretary_id = ?2, date = ?3,
            start_time = ?4, end_time = ?5, price = ?6, location = ?7, updated_at = ?8
         WHERE id = ?9 AND status = 'requested'",
        params![
            detailer_id,
            secretary_id,
            date.to_string(),
            slot::format_time(&start),
            slot::format_time(&end),
            price,
            location,
            now,
            booking_id,
        ],
    )?;
    Ok(count > 0)
}

pub fn finish_booking(
    conn: &Connection,
    id: &str,
    payment_method: PaymentMethod,
) -> anyhow::Result<bool> {
    let now = fmt_dt(&Utc::now().naive_utc());
    let count = conn.execute(
        "UPDATE bookings SET status = 'finished', payment_method = ?1, updated_at = ?2
         WHERE id = ?3 AND status = 'pending'",
        params![payment_method.as_str(), now, id],
    )?;
    Ok(count > 0)
}

pub fn cancel_booking(conn: &Connection, id: &str, reason: &str) -> anyhow::Result<bool> {
    let now = fmt_dt(&Utc::now().naive_utc());
    let count = conn.execute(
        "UPDATE bookings SET status = 'canceled', cancel_reason = ?1, updated_at = ?2
         WHERE id = ?3 AND status IN ('requested', 'pending')",
        params![reason, now, id],
    )?;
    Ok(count > 0)
}

// ── Staff ──

pub fn create_staff(conn: &Connection, staff: &Staff) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO staff (id, name, phone, role) VALUES (?1, ?2, ?3, ?4)",
        params![staff.id, staff.name, staff.phone, staff.role.as_str()],
    )?;
    Ok(())
}

pub fn get_staff_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Staff>> {
    let result = conn.query_row(
        "SELECT id, name, phone, role FROM staff WHERE id = ?1",
        params![id],
        |row| Ok(parse_staff_row(row)),
    );

    match result {
        Ok(staff) => Ok(Some(staff?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_staff(conn: &Connection, role: Option<StaffRole>) -> anyhow::Result<Vec<Staff>> {
    let (sql, role_param) = match role {
        Some(role) => (
            "SELECT id, name, phone, role FROM staff WHERE role = ?1 ORDER BY name ASC",
            Some(role.as_str().to_string()),
        ),
        None => (
            "SELECT id, name, phone, role FROM staff ORDER BY name ASC",
            None,
        ),
    };

    let mut stmt = conn.prepare(sql)?;
    let mut staff = vec![];
    match role_param {
        Some(r) => {
            let rows = stmt.query_map(params![r], |row| Ok(parse_staff_row(row)))?;
            for row in rows {
                staff.push(row??);
            }
        }
        None => {
            let rows = stmt.query_map([], |row| Ok(parse_staff_row(row)))?;
            for row in rows {
                staff.push(row??);
            }
        }
    }
    Ok(staff)
}

// ── Ratings ──

pub fn create_rating(
    conn: &Connection,
    booking_id: &str,
    rating_number: i64,
    comment: Option<&str>,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO ratings (booking_id, rating_number, comment) VALUES (?1, ?2, ?3)",
        params![booking_id, rating_number, comment],
    )?;
    Ok(())
}

pub fn get_rating(conn: &Connection, booking_id: &str) -> anyhow::Result<Option<i64>> {
    let result = conn.query_row(
        "SELECT rating_number FROM ratings WHERE booking_id = ?1",
        params![booking_id],
        |row| row.get(0),
    );

    match result {
        Ok(rating) => Ok(Some(rating)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// ── Dashboard ──

pub struct DashboardStats {
    pub requested_count: i64,
    pub pending_count: i64,
    pub finished_count: i64,
    pub pending_today: i64,
}

pub fn get_dashboard_stats(conn: &Connection, today: NaiveDate) -> anyhow::Result<DashboardStats> {
    let count_for = |status: &str| -> i64 {
        conn.query_row(
            "SELECT COUNT(*) FROM bookings WHERE status = ?1",
            params![status],
            |row| row.get(0),
        )
        .unwrap_or(0)
    };

    let pending_today: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM bookings WHERE status = 'pending' AND date = ?1",
            params![today.to_string()],
            |row| row.get(0),
        )
        .unwrap_or(0);

    Ok(DashboardStats {
        requested_count: count_for("requested"),
        pending_count: count_for("pending"),
        finished_count: count_for("finished"),
        pending_today,
    })
}

// ── Row parsing ──

fn fmt_dt(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn parse_dt(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .unwrap_or_else(|_| Utc::now().naive_utc())
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let id: String = row.get(0)?;
    let service_str: String = row.get(3)?;
    let status_str: String = row.get(4)?;
    let date_str: Option<String> = row.get(5)?;
    let start_str: Option<String> = row.get(6)?;
    let end_str: Option<String> = row.get(7)?;
    let payment_str: Option<String> = row.get(13)?;
    let created_at_str: String = row.get(14)?;
    let updated_at_str: String = row.get(15)?;

    let service = ServiceCategory::parse(&service_str)
        .with_context(|| format!("booking {id}: unknown service {service_str:?}"))?;
    let status = BookingStatus::parse(&status_str)
        .with_context(|| format!("booking {id}: unknown status {status_str:?}"))?;

    let date = match date_str {
        Some(s) => Some(
            NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .with_context(|| format!("booking {id}: bad date {s:?}"))?,
        ),
        None => None,
    };
    let start_time = match start_str {
        Some(s) => Some(
            slot::parse_time(&s).with_context(|| format!("booking {id}: bad start time {s:?}"))?,
        ),
        None => None,
    };
    let end_time = match end_str {
        Some(s) => {
            Some(slot::parse_time(&s).with_context(|| format!("booking {id}: bad end time {s:?}"))?)
        }
        None => None,
    };
    let payment_method = match payment_str {
        Some(s) => Some(
            PaymentMethod::parse(&s)
                .with_context(|| format!("booking {id}: unknown payment method {s:?}"))?,
        ),
        None => None,
    };

    Ok(Booking {
        id,
        customer_name: row.get(1)?,
        customer_phone: row.get(2)?,
        service,
        status,
        date,
        start_time,
        end_time,
        detailer_id: row.get(8)?,
        secretary_id: row.get(9)?,
        price: row.get(10)?,
        location: row.get(11)?,
        cancel_reason: row.get(12)?,
        payment_method,
        created_at: parse_dt(&created_at_str),
        updated_at: parse_dt(&updated_at_str),
    })
}

fn parse_slot_row(row: &rusqlite::Row) -> anyhow::Result<ScheduledSlot> {
    let booking_id: String = row.get(0)?;
    let date_str: String = row.get(1)?;
    let start_str: String = row.get(2)?;
    let end_str: String = row.get(3)?;

    let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
        .with_context(|| format!("booking {booking_id}: bad date {date_str:?}"))?;
    let start = slot::parse_time(&start_str)
        .with_context(|| format!("booking {booking_id}: bad start time {start_str:?}"))?;
    let end = slot::parse_time(&end_str)
        .with_context(|| format!("booking {booking_id}: bad end time {end_str:?}"))?;

    Ok(ScheduledSlot {
        booking_id,
        date,
        start,
        end,
    })
}

fn parse_staff_row(row: &rusqlite::Row) -> anyhow::Result<Staff> {
    let id: String = row.get(0)?;
    let role_str: String = row.get(3)?;
    let role = StaffRole::parse(&role_str)
        .with_context(|| format!("staff {id}: unknown role {role_str:?}"))?;

    Ok(Staff {
        id,
        name: row.get(1)?,
        phone: row.get(2)?,
        role,
    })
}
