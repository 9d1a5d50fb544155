use chrono::{DateTime, Datelike, Duration, NaiveDateTime, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::queries;
use crate::errors::{AppError, ScheduleError};
use crate::models::{Booking, BookingStatus, TutorProfile, User, WeekDay};

/// Sessions are a fixed hour; two bookings for the same tutor may not start
/// within an hour of each other.
const SESSION_MINUTES: i64 = 60;

/// ISO-8601 instants, with fallbacks for legacy payloads that sent a bare
/// datetime. Everything is read as UTC wall-clock.
fn parse_session_date(input: &str) -> Option<NaiveDateTime> {
    let trimmed = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt);
        }
    }
    None
}

/// Second-resolution now, matching what the store keeps, so returned rows
/// equal what a re-read would produce.
fn status_change_instant() -> NaiveDateTime {
    use chrono::Timelike;
    let now = Utc::now().naive_utc();
    now.with_nanosecond(0).unwrap_or(now)
}

fn day_of(when: &NaiveDateTime) -> WeekDay {
    WeekDay::from_index(when.weekday().num_days_from_sunday() as usize)
        .unwrap_or(WeekDay::Sunday)
}

/// Validates and creates a booking. Availability is matched by day name only
/// (the booking's UTC day or the previous calendar day, to tolerate
/// overnight schedules whose boundary handling lives on the client); the
/// collision check is the exclusive ±60-minute window around the instant.
pub fn create_booking(
    conn: &Connection,
    student_id: &str,
    tutor_id: &str,
    session_date: &str,
    now: DateTime<Utc>,
) -> Result<Booking, AppError> {
    let when = parse_session_date(session_date).ok_or(ScheduleError::InvalidDate)?;

    if when < now.naive_utc() {
        return Err(ScheduleError::PastBooking.into());
    }

    let day = day_of(&when);
    let previous_day = day.previous();

    let tx = conn.unchecked_transaction()?;

    let matching =
        queries::count_slots_on_days(&tx, tutor_id, day.as_str(), previous_day.as_str())?;
    if matching == 0 {
        return Err(ScheduleError::NoAvailability.into());
    }

    let window_start = when - Duration::minutes(SESSION_MINUTES);
    let window_end = when + Duration::minutes(SESSION_MINUTES);
    let clashes = queries::count_bookings_in_window(&tx, tutor_id, &window_start, &window_end)?;
    if clashes > 0 {
        return Err(ScheduleError::SlotTaken.into());
    }

    let booking = Booking {
        id: Uuid::new_v4().to_string(),
        student_id: student_id.to_string(),
        tutor_id: tutor_id.to_string(),
        session_date: when,
        status: BookingStatus::Upcoming,
        created_at: now.naive_utc(),
        updated_at: now.naive_utc(),
    };
    queries::create_booking(&tx, &booking)?;

    tx.commit()?;
    Ok(booking)
}

/// A student's bookings, newest-created first, each with the tutor's profile
/// and the tutor's user record.
pub fn my_bookings(
    conn: &Connection,
    student_id: &str,
) -> Result<Vec<(Booking, TutorProfile, User)>, AppError> {
    Ok(queries::bookings_for_student(conn, student_id)?)
}

/// A booking owned by the student, or nothing. "Exists but not yours" and
/// "does not exist" are indistinguishable here on purpose.
pub fn booking_for_student(
    conn: &Connection,
    booking_id: &str,
    student_id: &str,
) -> Result<Option<(Booking, TutorProfile, User)>, AppError> {
    Ok(queries::booking_for_student(conn, booking_id, student_id)?)
}

/// Cancels the student's booking. Re-cancelling is a no-op that returns the
/// booking unchanged.
pub fn cancel_booking(
    conn: &Connection,
    booking_id: &str,
    student_id: &str,
) -> Result<Option<Booking>, AppError> {
    let tx = conn.unchecked_transaction()?;

    let Some(mut booking) = queries::booking_row_for_student(&tx, booking_id, student_id)? else {
        return Ok(None);
    };

    if booking.status == BookingStatus::Cancelled {
        return Ok(Some(booking));
    }

    let at = status_change_instant();
    queries::update_booking_status(&tx, booking_id, BookingStatus::Cancelled, &at)?;
    tx.commit()?;

    booking.status = BookingStatus::Cancelled;
    booking.updated_at = at;
    Ok(Some(booking))
}

/// Marks a booking completed on behalf of the tutor user. The booking must
/// belong to the caller's tutor profile and be in the upcoming state.
pub fn complete_booking(
    conn: &Connection,
    booking_id: &str,
    tutor_user_id: &str,
) -> Result<Booking, AppError> {
    let tx = conn.unchecked_transaction()?;

    let profile = queries::profile_for_user(&tx, tutor_user_id)?
        .ok_or(ScheduleError::TutorProfileNotFound)?;

    let mut booking = queries::booking_for_tutor(&tx, booking_id, &profile.id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;

    match booking.status {
        BookingStatus::Completed => return Err(ScheduleError::AlreadyCompleted.into()),
        BookingStatus::Cancelled => return Err(ScheduleError::CannotCompleteCancelled.into()),
        BookingStatus::Upcoming => {}
    }

    let at = status_change_instant();
    queries::update_booking_status(&tx, booking_id, BookingStatus::Completed, &at)?;
    tx.commit()?;

    booking.status = BookingStatus::Completed;
    booking.updated_at = at;
    Ok(booking)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::{SlotBatch, SlotInput};
    use crate::services::availability;
    use chrono::TimeZone;

    fn setup_db() -> Connection {
        db::init_db(":memory:").unwrap()
    }

    fn seed_user(conn: &Connection, id: &str, role: &str) {
        conn.execute(
            "INSERT INTO users (id, name, email, password_hash, role) VALUES (?1, ?1, ?1 || '@x.io', 'h', ?2)",
            [id, role],
        )
        .unwrap();
    }

    fn seed_tutor(conn: &Connection, user_id: &str, tutor_id: &str) {
        seed_user(conn, user_id, "tutor");
        conn.execute(
            "INSERT INTO tutor_profiles (id, user_id, hourly_rate) VALUES (?1, ?2, 25.0)",
            [tutor_id, user_id],
        )
        .unwrap();
    }

    fn set_availability(conn: &Connection, tutor_id: &str, day: &str, start: &str, end: &str) {
        let batch = availability::normalize_slot_batch(SlotBatch::One(SlotInput {
            day: day.to_string(),
            start_time: start.to_string(),
            end_time: end.to_string(),
        }))
        .unwrap();
        availability::reconcile(conn, tutor_id, &batch).unwrap();
    }

    fn test_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
    }

    fn schedule_err(err: AppError) -> ScheduleError {
        match err {
            AppError::Schedule(e) => e,
            other => panic!("expected schedule error, got: {other}"),
        }
    }

    #[test]
    fn test_invalid_date_rejected() {
        let conn = setup_db();
        seed_user(&conn, "s1", "student");
        seed_tutor(&conn, "u1", "t1");

        let err = create_booking(&conn, "s1", "t1", "not-a-date", test_now()).unwrap_err();
        assert_eq!(schedule_err(err), ScheduleError::InvalidDate);
    }

    #[test]
    fn test_past_booking_rejected_regardless_of_availability() {
        let conn = setup_db();
        seed_user(&conn, "s1", "student");
        seed_tutor(&conn, "u1", "t1");
        set_availability(&conn, "t1", "Monday", "09:00", "12:00");

        let err =
            create_booking(&conn, "s1", "t1", "2020-06-08T10:00:00Z", test_now()).unwrap_err();
        assert_eq!(schedule_err(err), ScheduleError::PastBooking);
    }

    #[test]
    fn test_no_availability_rejected() {
        let conn = setup_db();
        seed_user(&conn, "s1", "student");
        seed_tutor(&conn, "u1", "t1");
        set_availability(&conn, "t1", "Tuesday", "09:00", "12:00");

        // 2030-06-10 is a Monday; the previous day (Sunday) has no slots either
        let err =
            create_booking(&conn, "s1", "t1", "2030-06-10T10:00:00Z", test_now()).unwrap_err();
        assert_eq!(schedule_err(err), ScheduleError::NoAvailability);
    }

    #[test]
    fn test_previous_day_availability_matches() {
        let conn = setup_db();
        seed_user(&conn, "s1", "student");
        seed_tutor(&conn, "u1", "t1");
        // only Sunday published; a Monday small-hours booking still matches
        // through the previous-day rule for overnight schedules
        set_availability(&conn, "t1", "Sunday", "20:00", "00:00");

        let booking =
            create_booking(&conn, "s1", "t1", "2030-06-10T00:30:00Z", test_now()).unwrap();
        assert_eq!(booking.status, BookingStatus::Upcoming);
    }

    #[test]
    fn test_collision_window() {
        let conn = setup_db();
        seed_user(&conn, "s1", "student");
        seed_user(&conn, "s2", "student");
        seed_tutor(&conn, "u1", "t1");
        set_availability(&conn, "t1", "Monday", "09:00", "12:00");

        let first =
            create_booking(&conn, "s1", "t1", "2030-06-10T10:00:00Z", test_now()).unwrap();
        assert_eq!(first.status, BookingStatus::Upcoming);

        // 30 minutes later is inside the ±60-minute window
        let err =
            create_booking(&conn, "s2", "t1", "2030-06-10T10:30:00Z", test_now()).unwrap_err();
        assert_eq!(schedule_err(err), ScheduleError::SlotTaken);

        // 90 minutes later is clear
        let third =
            create_booking(&conn, "s2", "t1", "2030-06-10T11:30:00Z", test_now()).unwrap();
        assert_eq!(third.status, BookingStatus::Upcoming);
    }

    #[test]
    fn test_adjacent_hour_is_not_a_collision() {
        let conn = setup_db();
        seed_user(&conn, "s1", "student");
        seed_tutor(&conn, "u1", "t1");
        set_availability(&conn, "t1", "Monday", "09:00", "12:00");

        create_booking(&conn, "s1", "t1", "2030-06-10T10:00:00Z", test_now()).unwrap();
        // exactly one hour later: window is exclusive, so this is allowed
        let second =
            create_booking(&conn, "s1", "t1", "2030-06-10T11:00:00Z", test_now()).unwrap();
        assert_eq!(second.status, BookingStatus::Upcoming);
    }

    #[test]
    fn test_cancelled_bookings_free_the_window() {
        let conn = setup_db();
        seed_user(&conn, "s1", "student");
        seed_tutor(&conn, "u1", "t1");
        set_availability(&conn, "t1", "Monday", "09:00", "12:00");

        let first =
            create_booking(&conn, "s1", "t1", "2030-06-10T10:00:00Z", test_now()).unwrap();
        cancel_booking(&conn, &first.id, "s1").unwrap().unwrap();

        let second =
            create_booking(&conn, "s1", "t1", "2030-06-10T10:00:00Z", test_now()).unwrap();
        assert_eq!(second.status, BookingStatus::Upcoming);
    }

    #[test]
    fn test_my_bookings_newest_first() {
        let conn = setup_db();
        seed_user(&conn, "s1", "student");
        seed_tutor(&conn, "u1", "t1");
        set_availability(&conn, "t1", "Monday", "09:00", "18:00");

        let a = create_booking(&conn, "s1", "t1", "2030-06-10T09:00:00Z", test_now()).unwrap();
        let b = create_booking(&conn, "s1", "t1", "2030-06-10T12:00:00Z", test_now()).unwrap();

        let bookings = my_bookings(&conn, "s1").unwrap();
        assert_eq!(bookings.len(), 2);
        assert_eq!(bookings[0].0.id, b.id);
        assert_eq!(bookings[1].0.id, a.id);
        assert_eq!(bookings[0].2.id, "u1");
    }

    #[test]
    fn test_booking_for_student_hides_other_students() {
        let conn = setup_db();
        seed_user(&conn, "s1", "student");
        seed_user(&conn, "s2", "student");
        seed_tutor(&conn, "u1", "t1");
        set_availability(&conn, "t1", "Monday", "09:00", "12:00");

        let booking =
            create_booking(&conn, "s1", "t1", "2030-06-10T10:00:00Z", test_now()).unwrap();

        assert!(booking_for_student(&conn, &booking.id, "s1")
            .unwrap()
            .is_some());
        assert!(booking_for_student(&conn, &booking.id, "s2")
            .unwrap()
            .is_none());
        assert!(booking_for_student(&conn, "missing", "s1")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let conn = setup_db();
        seed_user(&conn, "s1", "student");
        seed_tutor(&conn, "u1", "t1");
        set_availability(&conn, "t1", "Monday", "09:00", "12:00");

        let booking =
            create_booking(&conn, "s1", "t1", "2030-06-10T10:00:00Z", test_now()).unwrap();

        let first = cancel_booking(&conn, &booking.id, "s1").unwrap().unwrap();
        assert_eq!(first.status, BookingStatus::Cancelled);

        let second = cancel_booking(&conn, &booking.id, "s1").unwrap().unwrap();
        assert_eq!(second.status, BookingStatus::Cancelled);

        assert!(cancel_booking(&conn, &booking.id, "s2").unwrap().is_none());
    }

    #[test]
    fn test_status_change_timestamps_match_store() {
        let conn = setup_db();
        seed_user(&conn, "s1", "student");
        seed_tutor(&conn, "u1", "t1");
        set_availability(&conn, "t1", "Monday", "09:00", "18:00");

        let a = create_booking(&conn, "s1", "t1", "2030-06-10T10:00:00Z", test_now()).unwrap();
        let cancelled = cancel_booking(&conn, &a.id, "s1").unwrap().unwrap();
        let stored = queries::booking_row_for_student(&conn, &a.id, "s1")
            .unwrap()
            .unwrap();
        assert_eq!(cancelled.updated_at, stored.updated_at);

        let b = create_booking(&conn, "s1", "t1", "2030-06-10T14:00:00Z", test_now()).unwrap();
        let completed = complete_booking(&conn, &b.id, "u1").unwrap();
        let stored = queries::booking_row_for_student(&conn, &b.id, "s1")
            .unwrap()
            .unwrap();
        assert_eq!(completed.updated_at, stored.updated_at);
    }

    #[test]
    fn test_complete_booking_lifecycle() {
        let conn = setup_db();
        seed_user(&conn, "s1", "student");
        seed_tutor(&conn, "u1", "t1");
        set_availability(&conn, "t1", "Monday", "09:00", "12:00");

        let booking =
            create_booking(&conn, "s1", "t1", "2030-06-10T10:00:00Z", test_now()).unwrap();

        let completed = complete_booking(&conn, &booking.id, "u1").unwrap();
        assert_eq!(completed.status, BookingStatus::Completed);

        let err = complete_booking(&conn, &booking.id, "u1").unwrap_err();
        assert_eq!(schedule_err(err), ScheduleError::AlreadyCompleted);
    }

    #[test]
    fn test_complete_cancelled_booking_rejected() {
        let conn = setup_db();
        seed_user(&conn, "s1", "student");
        seed_tutor(&conn, "u1", "t1");
        set_availability(&conn, "t1", "Monday", "09:00", "12:00");

        let booking =
            create_booking(&conn, "s1", "t1", "2030-06-10T10:00:00Z", test_now()).unwrap();
        cancel_booking(&conn, &booking.id, "s1").unwrap();

        let err = complete_booking(&conn, &booking.id, "u1").unwrap_err();
        assert_eq!(schedule_err(err), ScheduleError::CannotCompleteCancelled);
    }

    #[test]
    fn test_complete_requires_tutor_profile_and_ownership() {
        let conn = setup_db();
        seed_user(&conn, "s1", "student");
        seed_tutor(&conn, "u1", "t1");
        seed_tutor(&conn, "u2", "t2");
        set_availability(&conn, "t1", "Monday", "09:00", "12:00");

        let booking =
            create_booking(&conn, "s1", "t1", "2030-06-10T10:00:00Z", test_now()).unwrap();

        let err = complete_booking(&conn, &booking.id, "s1").unwrap_err();
        assert_eq!(schedule_err(err), ScheduleError::TutorProfileNotFound);

        let err = complete_booking(&conn, &booking.id, "u2").unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_parse_session_date_formats() {
        assert!(parse_session_date("2030-06-10T10:00:00Z").is_some());
        assert!(parse_session_date("2030-06-10T10:00:00+02:00").is_some());
        assert!(parse_session_date("2030-06-10 10:00:00").is_some());
        assert!(parse_session_date("2030-06-10 10:00").is_some());
        assert!(parse_session_date("June 10th").is_none());
        assert!(parse_session_date("").is_none());
    }

    #[test]
    fn test_offset_instants_normalize_to_utc() {
        let conn = setup_db();
        seed_user(&conn, "s1", "student");
        seed_tutor(&conn, "u1", "t1");
        set_availability(&conn, "t1", "Monday", "09:00", "12:00");

        // 12:00+02:00 is 10:00 UTC, colliding with a 10:30 UTC booking
        create_booking(&conn, "s1", "t1", "2030-06-10T10:30:00Z", test_now()).unwrap();
        let err = create_booking(&conn, "s1", "t1", "2030-06-10T12:00:00+02:00", test_now())
            .unwrap_err();
        assert_eq!(schedule_err(err), ScheduleError::SlotTaken);
    }
}
