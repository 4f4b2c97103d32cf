use chrono::{NaiveDate, NaiveTime};
use rusqlite::{Connection, TransactionBehavior};

use crate::db::queries;
use crate::models::{Booking, BookingStatus, ScheduledSlot};

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("end time must be after start time")]
    InvalidInterval,

    #[error("booking not found: {0}")]
    BookingNotFound(String),

    #[error("detailer not found: {0}")]
    DetailerNotFound(String),

    #[error("booking {id} is {}, only requested bookings can be scheduled", .status.as_str())]
    InvalidTransition { id: String, status: BookingStatus },

    #[error("booking {0} was modified concurrently, retry the assignment")]
    ConcurrentUpdate(String),

    #[error("detailer busy at this time")]
    Conflict { blocking: Vec<ScheduledSlot> },

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct AssignmentRequest {
    pub booking_id: String,
    pub detailer_id: String,
    pub secretary_id: String,
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub price: i64,
    pub location: String,
}

/// Accepts a `requested` booking onto a detailer's calendar.
///
/// The fetch-check-commit sequence runs inside a single IMMEDIATE
/// transaction, so two staff members racing to fill the same slot cannot
/// both observe it free: one commits, the other sees the committed interval
/// and gets `Conflict`. On any failure the transaction rolls back and the
/// booking keeps its prior state.
pub fn assign(conn: &mut Connection, req: &AssignmentRequest) -> Result<Booking, ScheduleError> {
    if req.end <= req.start {
        return Err(ScheduleError::InvalidInterval);
    }

    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| ScheduleError::Storage(e.into()))?;

    let booking = queries::get_booking_by_id(&tx, &req.booking_id)?
        .ok_or_else(|| ScheduleError::BookingNotFound(req.booking_id.clone()))?;

    if booking.status != BookingStatus::Requested {
        return Err(ScheduleError::InvalidTransition {
            id: booking.id,
            status: booking.status,
        });
    }

    if queries::get_staff_by_id(&tx, &req.detailer_id)?.is_none() {
        return Err(ScheduleError::DetailerNotFound(req.detailer_id.clone()));
    }

    let blocking: Vec<ScheduledSlot> =
        queries::find_pending_slots(&tx, &req.detailer_id, req.date)?
            .into_iter()
            .filter(|s| s.overlaps(req.start, req.end))
            .collect();

    if !blocking.is_empty() {
        return Err(ScheduleError::Conflict { blocking });
    }

    let committed = queries::commit_assignment(
        &tx,
        &req.booking_id,
        &req.detailer_id,
        &req.secretary_id,
        req.date,
        req.start,
        req.end,
        req.price,
        &req.location,
    )?;
    if !committed {
        // Guarded UPDATE matched nothing: the booking left `requested`
        // underneath us.
        return Err(ScheduleError::ConcurrentUpdate(req.booking_id.clone()));
    }

    let updated = queries::get_booking_by_id(&tx, &req.booking_id)?
        .ok_or_else(|| ScheduleError::BookingNotFound(req.booking_id.clone()))?;

    tx.commit().map_err(|e| ScheduleError::Storage(e.into()))?;

    Ok(updated)
}

/// Committed intervals for a detailer, `(date, start)` ascending. Pure read;
/// each call takes a fresh snapshot.
pub fn get_schedule(
    conn: &Connection,
    detailer_id: &str,
    date: Option<NaiveDate>,
) -> Result<Vec<ScheduledSlot>, ScheduleError> {
    if queries::get_staff_by_id(conn, detailer_id)?.is_none() {
        return Err(ScheduleError::DetailerNotFound(detailer_id.to_string()));
    }

    let slots = match date {
        Some(date) => queries::find_pending_slots(conn, detailer_id, date)?,
        None => queries::find_detailer_schedule(conn, detailer_id)?,
    };
    Ok(slots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::{PaymentMethod, ServiceCategory, Staff, StaffRole};
    use chrono::Utc;
    use uuid::Uuid;

    fn setup_db() -> Connection {
        let conn = db::init_db(":memory:").unwrap();
        queries::create_staff(
            &conn,
            &Staff {
                id: "det-1".to_string(),
                name: "Marko".to_string(),
                phone: "+38160111".to_string(),
                role: StaffRole::Detailer,
            },
        )
        .unwrap();
        queries::create_staff(
            &conn,
            &Staff {
                id: "det-2".to_string(),
                name: "Jovana".to_string(),
                phone: "+38160222".to_string(),
                role: StaffRole::Detailer,
            },
        )
        .unwrap();
        queries::create_staff(
            &conn,
            &Staff {
                id: "sec-1".to_string(),
                name: "Ana".to_string(),
                phone: "+38160333".to_string(),
                role: StaffRole::Secretary,
            },
        )
        .unwrap();
        conn
    }

    fn insert_requested(conn: &Connection) -> String {
        let now = Utc::now().naive_utc();
        let id = Uuid::new_v4().to_string();
        queries::create_booking(
            conn,
            &Booking {
                id: id.clone(),
                customer_name: "Petar".to_string(),
                customer_phone: "+38164000".to_string(),
                service: ServiceCategory::Wash,
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
            },
        )
        .unwrap();
        id
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    fn request(booking_id: &str, detailer: &str, date: &str, start: &str, end: &str) -> AssignmentRequest {
        AssignmentRequest {
            booking_id: booking_id.to_string(),
            detailer_id: detailer.to_string(),
            secretary_id: "sec-1".to_string(),
            date: d(date),
            start: t(start),
            end: t(end),
            price: 4500,
            location: "Bulevar 12".to_string(),
        }
    }

    #[test]
    fn test_overlap_predicate() {
        let slot = ScheduledSlot {
            booking_id: "b".to_string(),
            date: d("2025-09-01"),
            start: t("09:00"),
            end: t("10:00"),
        };

        assert!(slot.overlaps(t("09:30"), t("10:30")));
        assert!(slot.overlaps(t("08:30"), t("09:30")));
        assert!(slot.overlaps(t("09:15"), t("09:45"))); // contained
        assert!(slot.overlaps(t("08:00"), t("11:00"))); // containing
        assert!(slot.overlaps(t("09:00"), t("10:00"))); // identical

        // Touching boundaries are not conflicts.
        assert!(!slot.overlaps(t("10:00"), t("11:00")));
        assert!(!slot.overlaps(t("08:00"), t("09:00")));
        assert!(!slot.overlaps(t("07:00"), t("08:00")));
    }

    #[test]
    fn test_assign_success_populates_schedule() {
        let mut conn = setup_db();
        let id = insert_requested(&conn);

        let booking = assign(&mut conn, &request(&id, "det-1", "2025-09-01", "09:00", "10:00"))
            .unwrap();

        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.detailer_id.as_deref(), Some("det-1"));
        assert_eq!(booking.secretary_id.as_deref(), Some("sec-1"));
        assert_eq!(booking.date, Some(d("2025-09-01")));
        assert_eq!(booking.start_time, Some(t("09:00")));
        assert_eq!(booking.end_time, Some(t("10:00")));
        assert_eq!(booking.price, Some(4500));
        assert_eq!(booking.location.as_deref(), Some("Bulevar 12"));
    }

    #[test]
    fn test_overlapping_assignment_reports_blocking_interval() {
        let mut conn = setup_db();
        let first = insert_requested(&conn);
        let second = insert_requested(&conn);

        assign(&mut conn, &request(&first, "det-1", "2025-09-01", "09:00", "10:00")).unwrap();

        let err = assign(&mut conn, &request(&second, "det-1", "2025-09-01", "09:30", "10:30"))
            .unwrap_err();
        match err {
            ScheduleError::Conflict { blocking } => {
                assert_eq!(blocking.len(), 1);
                assert_eq!(blocking[0].booking_id, first);
                assert_eq!(blocking[0].start, t("09:00"));
                assert_eq!(blocking[0].end, t("10:00"));
            }
            other => panic!("expected Conflict, got {other:?}"),
        }

        // Rejected booking is untouched.
        let second = queries::get_booking_by_id(&conn, &second).unwrap().unwrap();
        assert_eq!(second.status, BookingStatus::Requested);
        assert!(second.date.is_none());
    }

    #[test]
    fn test_back_to_back_is_allowed() {
        let mut conn = setup_db();
        let first = insert_requested(&conn);
        let second = insert_requested(&conn);
        let third = insert_requested(&conn);

        assign(&mut conn, &request(&first, "det-1", "2025-09-01", "09:00", "10:00")).unwrap();
        assign(&mut conn, &request(&second, "det-1", "2025-09-01", "10:00", "11:00")).unwrap();
        assign(&mut conn, &request(&third, "det-1", "2025-09-01", "08:00", "09:00")).unwrap();
    }

    #[test]
    fn test_finished_and_canceled_do_not_block() {
        let mut conn = setup_db();

        let occupied = insert_requested(&conn);
        assign(&mut conn, &request(&occupied, "det-1", "2025-09-01", "09:00", "10:00")).unwrap();
        queries::finish_booking(&conn, &occupied, PaymentMethod::Card).unwrap();

        // Same slot is free again once the earlier booking is finished.
        let next = insert_requested(&conn);
        assign(&mut conn, &request(&next, "det-1", "2025-09-01", "09:00", "10:00")).unwrap();

        queries::cancel_booking(&conn, &next, "customer no-show").unwrap();
        let after_cancel = insert_requested(&conn);
        assign(&mut conn, &request(&after_cancel, "det-1", "2025-09-01", "09:00", "10:00"))
            .unwrap();
    }

    #[test]
    fn test_conflict_is_scoped_to_detailer_and_date() {
        let mut conn = setup_db();
        let first = insert_requested(&conn);
        assign(&mut conn, &request(&first, "det-1", "2025-09-01", "09:00", "10:00")).unwrap();

        // Same interval, different detailer.
        let other_detailer = insert_requested(&conn);
        assign(&mut conn, &request(&other_detailer, "det-2", "2025-09-01", "09:00", "10:00"))
            .unwrap();

        // Same interval and detailer, different date.
        let other_date = insert_requested(&conn);
        assign(&mut conn, &request(&other_date, "det-1", "2025-09-02", "09:00", "10:00")).unwrap();
    }

    #[test]
    fn test_invalid_interval_rejected_before_storage() {
        let mut conn = setup_db();
        let id = insert_requested(&conn);

        let err = assign(&mut conn, &request(&id, "det-1", "2025-09-01", "10:00", "09:00"))
            .unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidInterval));

        let err = assign(&mut conn, &request(&id, "det-1", "2025-09-01", "10:00", "10:00"))
            .unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidInterval));
    }

    #[test]
    fn test_missing_booking_and_detailer() {
        let mut conn = setup_db();

        let err = assign(&mut conn, &request("nope", "det-1", "2025-09-01", "09:00", "10:00"))
            .unwrap_err();
        assert!(matches!(err, ScheduleError::BookingNotFound(_)));

        let id = insert_requested(&conn);
        let err = assign(&mut conn, &request(&id, "ghost", "2025-09-01", "09:00", "10:00"))
            .unwrap_err();
        assert!(matches!(err, ScheduleError::DetailerNotFound(_)));
    }

    #[test]
    fn test_only_requested_bookings_can_be_assigned() {
        let mut conn = setup_db();
        let id = insert_requested(&conn);
        assign(&mut conn, &request(&id, "det-1", "2025-09-01", "09:00", "10:00")).unwrap();

        let err = assign(&mut conn, &request(&id, "det-2", "2025-09-02", "09:00", "10:00"))
            .unwrap_err();
        match err {
            ScheduleError::InvalidTransition { status, .. } => {
                assert_eq!(status, BookingStatus::Pending);
            }
            other => panic!("expected InvalidTransition, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_row_commit_reports_concurrent_update() {
        let mut conn = setup_db();
        let id = insert_requested(&conn);

        // Make the guarded UPDATE match nothing without raising an error.
        conn.execute_batch(
            "CREATE TRIGGER skip BEFORE UPDATE ON bookings
             BEGIN SELECT RAISE(IGNORE); END;",
        )
        .unwrap();

        let err = assign(&mut conn, &request(&id, "det-1", "2025-09-01", "09:00", "10:00"))
            .unwrap_err();
        match err {
            ScheduleError::ConcurrentUpdate(booking_id) => assert_eq!(booking_id, id),
            other => panic!("expected ConcurrentUpdate, got {other:?}"),
        }

        conn.execute_batch("DROP TRIGGER skip;").unwrap();

        let booking = queries::get_booking_by_id(&conn, &id).unwrap().unwrap();
        assert_eq!(booking.status, BookingStatus::Requested);
        assert!(booking.detailer_id.is_none());
    }

    #[test]
    fn test_commit_failure_leaves_booking_untouched() {
        let mut conn = setup_db();
        let id = insert_requested(&conn);

        // Fail the UPDATE after the free-check has passed.
        conn.execute_batch(
            "CREATE TRIGGER boom BEFORE UPDATE ON bookings
             BEGIN SELECT RAISE(ABORT, 'simulated storage failure'); END;",
        )
        .unwrap();

        let err = assign(&mut conn, &request(&id, "det-1", "2025-09-01", "09:00", "10:00"))
            .unwrap_err();
        assert!(matches!(err, ScheduleError::Storage(_)));

        conn.execute_batch("DROP TRIGGER boom;").unwrap();

        let booking = queries::get_booking_by_id(&conn, &id).unwrap().unwrap();
        assert_eq!(booking.status, BookingStatus::Requested);
        assert!(booking.date.is_none());
        assert!(booking.start_time.is_none());
        assert!(booking.detailer_id.is_none());
    }

    #[test]
    fn test_get_schedule_is_ordered_and_repeatable() {
        let mut conn = setup_db();
        for (date, start, end) in [
            ("2025-09-02", "11:00", "12:00"),
            ("2025-09-01", "14:00", "15:00"),
            ("2025-09-01", "09:00", "10:00"),
        ] {
            let id = insert_requested(&conn);
            assign(&mut conn, &request(&id, "det-1", date, start, end)).unwrap();
        }

        let all = get_schedule(&conn, "det-1", None).unwrap();
        let keys: Vec<_> = all.iter().map(|s| (s.date, s.start)).collect();
        assert_eq!(
            keys,
            vec![
                (d("2025-09-01"), t("09:00")),
                (d("2025-09-01"), t("14:00")),
                (d("2025-09-02"), t("11:00")),
            ]
        );

        let day = get_schedule(&conn, "det-1", Some(d("2025-09-01"))).unwrap();
        assert_eq!(day.len(), 2);

        // No intervening commit: identical results.
        assert_eq!(all, get_schedule(&conn, "det-1", None).unwrap());

        let err = get_schedule(&conn, "ghost", None).unwrap_err();
        assert!(matches!(err, ScheduleError::DetailerNotFound(_)));
    }
}
