use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection};

use crate::models::tutor::TutorFilters;
use crate::models::{AvailabilitySlot, Booking, BookingStatus, Review, Role, TutorProfile, User};

// ── Users ──

pub fn create_user(conn: &Connection, user: &User) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO users (id, name, email, password_hash, role, is_banned, banned_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            user.id,
            user.name,
            user.email,
            user.password_hash,
            user.role.as_str(),
            user.is_banned,
            user.banned_at.map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string()),
            user.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_user(conn: &Connection, id: &str) -> anyhow::Result<Option<User>> {
    let result = conn.query_row(
        "SELECT id, name, email, password_hash, role, is_banned, banned_at, created_at
         FROM users WHERE id = ?1",
        params![id],
        |row| Ok(parse_user_row(row)),
    );

    match result {
        Ok(user) => Ok(Some(user?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> anyhow::Result<Option<User>> {
    let result = conn.query_row(
        "SELECT id, name, email, password_hash, role, is_banned, banned_at, created_at
         FROM users WHERE email = ?1",
        params![email],
        |row| Ok(parse_user_row(row)),
    );

    match result {
        Ok(user) => Ok(Some(user?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_users(conn: &Connection) -> anyhow::Result<Vec<User>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, email, password_hash, role, is_banned, banned_at, created_at
         FROM users ORDER BY created_at ASC, rowid ASC",
    )?;

    let rows = stmt.query_map([], |row| Ok(parse_user_row(row)))?;

    let mut users = vec![];
    for row in rows {
        users.push(row??);
    }
    Ok(users)
}

pub fn set_user_banned(
    conn: &Connection,
    id: &str,
    banned: bool,
    at: &NaiveDateTime,
) -> anyhow::Result<bool> {
    let banned_at = banned.then(|| at.format("%Y-%m-%d %H:%M:%S").to_string());
    let count = conn.execute(
        "UPDATE users SET is_banned = ?1, banned_at = ?2 WHERE id = ?3",
        params![banned, banned_at, id],
    )?;
    Ok(count > 0)
}

fn parse_user_row(row: &rusqlite::Row) -> anyhow::Result<User> {
    parse_user_row_at(row, 0)
}

// ── Tutor profiles ──

pub fn create_profile(conn: &Connection, profile: &TutorProfile) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO tutor_profiles (id, user_id, bio, hourly_rate, subject, rating, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            profile.id,
            profile.user_id,
            profile.bio,
            profile.hourly_rate,
            profile.subject,
            profile.rating,
            profile.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;
    Ok(())
}

pub fn profile_for_user(conn: &Connection, user_id: &str) -> anyhow::Result<Option<TutorProfile>> {
    let result = conn.query_row(
        "SELECT id, user_id, bio, hourly_rate, subject, rating, created_at
         FROM tutor_profiles WHERE user_id = ?1",
        params![user_id],
        |row| Ok(parse_profile_row(row)),
    );

    match result {
        Ok(profile) => Ok(Some(profile?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn profile_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<TutorProfile>> {
    let result = conn.query_row(
        "SELECT id, user_id, bio, hourly_rate, subject, rating, created_at
         FROM tutor_profiles WHERE id = ?1",
        params![id],
        |row| Ok(parse_profile_row(row)),
    );

    match result {
        Ok(profile) => Ok(Some(profile?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn update_profile(conn: &Connection, profile: &TutorProfile) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE tutor_profiles SET bio = ?1, hourly_rate = ?2, subject = ?3 WHERE id = ?4",
        params![profile.bio, profile.hourly_rate, profile.subject, profile.id],
    )?;
    Ok(())
}

pub fn set_profile_rating(conn: &Connection, tutor_id: &str, rating: f64) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE tutor_profiles SET rating = ?1 WHERE id = ?2",
        params![rating, tutor_id],
    )?;
    Ok(())
}

pub fn list_profiles(
    conn: &Connection,
    filters: &TutorFilters,
) -> anyhow::Result<Vec<(TutorProfile, User)>> {
    let mut sql = String::from(
        "SELECT p.id, p.user_id, p.bio, p.hourly_rate, p.subject, p.rating, p.created_at,
                u.id, u.name, u.email, u.password_hash, u.role, u.is_banned, u.banned_at, u.created_at
         FROM tutor_profiles p
         INNER JOIN users u ON u.id = p.user_id",
    );

    let mut clauses: Vec<&str> = vec![];
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = vec![];

    if let Some(max_price) = filters.max_price {
        clauses.push("p.hourly_rate <= ?");
        params_vec.push(Box::new(max_price));
    }
    if let Some(min_rating) = filters.min_rating {
        clauses.push("p.rating >= ?");
        params_vec.push(Box::new(min_rating));
    }
    if let Some(subject) = &filters.subject {
        clauses.push("LOWER(p.subject) = LOWER(?)");
        params_vec.push(Box::new(subject.clone()));
    }

    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY p.rating DESC, p.hourly_rate ASC");

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| {
        Ok((parse_profile_row(row), parse_user_row_at(row, 7)))
    })?;

    let mut profiles = vec![];
    for row in rows {
        let (profile, user) = row?;
        profiles.push((profile?, user?));
    }
    Ok(profiles)
}

fn parse_profile_row(row: &rusqlite::Row) -> anyhow::Result<TutorProfile> {
    let created_at_str: String = row.get(6)?;
    Ok(TutorProfile {
        id: row.get(0)?,
        user_id: row.get(1)?,
        bio: row.get(2)?,
        hourly_rate: row.get(3)?,
        subject: row.get(4)?,
        rating: row.get(5)?,
        created_at: parse_datetime(&created_at_str),
    })
}

fn parse_user_row_at(row: &rusqlite::Row, offset: usize) -> anyhow::Result<User> {
    let role_str: String = row.get(offset + 4)?;
    let banned_at_str: Option<String> = row.get(offset + 6)?;
    let created_at_str: String = row.get(offset + 7)?;
    Ok(User {
        id: row.get(offset)?,
        name: row.get(offset + 1)?,
        email: row.get(offset + 2)?,
        password_hash: row.get(offset + 3)?,
        role: Role::parse(&role_str).unwrap_or(Role::Student),
        is_banned: row.get(offset + 5)?,
        banned_at: banned_at_str.as_deref().map(parse_datetime),
        created_at: parse_datetime(&created_at_str),
    })
}

// ── Availability slots ──

pub fn create_slot(conn: &Connection, slot: &AvailabilitySlot) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO availability_slots (id, tutor_id, day, start_minute, end_minute)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            slot.id,
            slot.tutor_id,
            slot.day,
            slot.start_minute,
            slot.end_minute
        ],
    )?;
    Ok(())
}

pub fn slots_for_tutor(conn: &Connection, tutor_id: &str) -> anyhow::Result<Vec<AvailabilitySlot>> {
    let mut stmt = conn.prepare(
        "SELECT id, tutor_id, day, start_minute, end_minute
         FROM availability_slots WHERE tutor_id = ?1",
    )?;

    let rows = stmt.query_map(params![tutor_id], |row| Ok(parse_slot_row(row)))?;

    let mut slots = vec![];
    for row in rows {
        slots.push(row??);
    }
    Ok(slots)
}

pub fn slot_by_id(
    conn: &Connection,
    tutor_id: &str,
    slot_id: &str,
) -> anyhow::Result<Option<AvailabilitySlot>> {
    let result = conn.query_row(
        "SELECT id, tutor_id, day, start_minute, end_minute
         FROM availability_slots WHERE id = ?1 AND tutor_id = ?2",
        params![slot_id, tutor_id],
        |row| Ok(parse_slot_row(row)),
    );

    match result {
        Ok(slot) => Ok(Some(slot?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn update_slot(conn: &Connection, slot: &AvailabilitySlot) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE availability_slots SET day = ?1, start_minute = ?2, end_minute = ?3
         WHERE id = ?4 AND tutor_id = ?5",
        params![
            slot.day,
            slot.start_minute,
            slot.end_minute,
            slot.id,
            slot.tutor_id
        ],
    )?;
    Ok(count > 0)
}

pub fn delete_slot(conn: &Connection, tutor_id: &str, slot_id: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "DELETE FROM availability_slots WHERE id = ?1 AND tutor_id = ?2",
        params![slot_id, tutor_id],
    )?;
    Ok(count > 0)
}

pub fn delete_slots_for_tutor(conn: &Connection, tutor_id: &str) -> anyhow::Result<usize> {
    let count = conn.execute(
        "DELETE FROM availability_slots WHERE tutor_id = ?1",
        params![tutor_id],
    )?;
    Ok(count)
}

/// Case-insensitive count of slot rows on either of two day names. Used by
/// the booking path, which matches on day name only.
pub fn count_slots_on_days(
    conn: &Connection,
    tutor_id: &str,
    day: &str,
    previous_day: &str,
) -> anyhow::Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM availability_slots
         WHERE tutor_id = ?1 AND LOWER(day) IN (LOWER(?2), LOWER(?3))",
        params![tutor_id, day, previous_day],
        |row| row.get(0),
    )?;
    Ok(count)
}

fn parse_slot_row(row: &rusqlite::Row) -> anyhow::Result<AvailabilitySlot> {
    Ok(AvailabilitySlot {
        id: row.get(0)?,
        tutor_id: row.get(1)?,
        day: row.get(2)?,
        start_minute: row.get(3)?,
        end_minute: row.get(4)?,
    })
}

// ── Bookings ──

pub fn create_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, student_id, tutor_id, session_date, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            booking.id,
            booking.student_id,
            booking.tutor_id,
            booking.session_date.format("%Y-%m-%d %H:%M:%S").to_string(),
            booking.status.as_str(),
            booking.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            booking.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;
    Ok(())
}

/// Non-cancelled bookings whose start falls strictly inside the window.
pub fn count_bookings_in_window(
    conn: &Connection,
    tutor_id: &str,
    window_start: &NaiveDateTime,
    window_end: &NaiveDateTime,
) -> anyhow::Result<i64> {
    let start_str = window_start.format("%Y-%m-%d %H:%M:%S").to_string();
    let end_str = window_end.format("%Y-%m-%d %H:%M:%S").to_string();

    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings
         WHERE tutor_id = ?1 AND status != 'CANCELLED'
           AND session_date > ?2 AND session_date < ?3",
        params![tutor_id, start_str, end_str],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn bookings_for_student(
    conn: &Connection,
    student_id: &str,
) -> anyhow::Result<Vec<(Booking, TutorProfile, User)>> {
    let mut stmt = conn.prepare(
        "SELECT b.id, b.student_id, b.tutor_id, b.session_date, b.status, b.created_at, b.updated_at,
                p.id, p.user_id, p.bio, p.hourly_rate, p.subject, p.rating, p.created_at,
                u.id, u.name, u.email, u.password_hash, u.role, u.is_banned, u.banned_at, u.created_at
         FROM bookings b
         INNER JOIN tutor_profiles p ON p.id = b.tutor_id
         INNER JOIN users u ON u.id = p.user_id
         WHERE b.student_id = ?1
         ORDER BY b.created_at DESC, b.rowid DESC",
    )?;

    let rows = stmt.query_map(params![student_id], |row| {
        Ok((
            parse_booking_row(row),
            parse_profile_row_at(row, 7),
            parse_user_row_at(row, 14),
        ))
    })?;

    let mut bookings = vec![];
    for row in rows {
        let (booking, profile, user) = row?;
        bookings.push((booking?, profile?, user?));
    }
    Ok(bookings)
}

pub fn booking_for_student(
    conn: &Connection,
    booking_id: &str,
    student_id: &str,
) -> anyhow::Result<Option<(Booking, TutorProfile, User)>> {
    let result = conn.query_row(
        "SELECT b.id, b.student_id, b.tutor_id, b.session_date, b.status, b.created_at, b.updated_at,
                p.id, p.user_id, p.bio, p.hourly_rate, p.subject, p.rating, p.created_at,
                u.id, u.name, u.email, u.password_hash, u.role, u.is_banned, u.banned_at, u.created_at
         FROM bookings b
         INNER JOIN tutor_profiles p ON p.id = b.tutor_id
         INNER JOIN users u ON u.id = p.user_id
         WHERE b.id = ?1 AND b.student_id = ?2",
        params![booking_id, student_id],
        |row| {
            Ok((
                parse_booking_row(row),
                parse_profile_row_at(row, 7),
                parse_user_row_at(row, 14),
            ))
        },
    );

    match result {
        Ok((booking, profile, user)) => Ok(Some((booking?, profile?, user?))),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn booking_row_for_student(
    conn: &Connection,
    booking_id: &str,
    student_id: &str,
) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        "SELECT id, student_id, tutor_id, session_date, status, created_at, updated_at
         FROM bookings WHERE id = ?1 AND student_id = ?2",
        params![booking_id, student_id],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn booking_for_tutor(
    conn: &Connection,
    booking_id: &str,
    tutor_id: &str,
) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        "SELECT id, student_id, tutor_id, session_date, status, created_at, updated_at
         FROM bookings WHERE id = ?1 AND tutor_id = ?2",
        params![booking_id, tutor_id],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn bookings_for_tutor(conn: &Connection, tutor_id: &str) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(
        "SELECT id, student_id, tutor_id, session_date, status, created_at, updated_at
         FROM bookings WHERE tutor_id = ?1 ORDER BY session_date ASC",
    )?;

    let rows = stmt.query_map(params![tutor_id], |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

/// Every booking in the system with the student and the tutor side joined
/// in, newest-created first. Admin listing only.
pub fn list_all_bookings(
    conn: &Connection,
) -> anyhow::Result<Vec<(Booking, User, TutorProfile, User)>> {
    let mut stmt = conn.prepare(
        "SELECT b.id, b.student_id, b.tutor_id, b.session_date, b.status, b.created_at, b.updated_at,
                s.id, s.name, s.email, s.password_hash, s.role, s.is_banned, s.banned_at, s.created_at,
                p.id, p.user_id, p.bio, p.hourly_rate, p.subject, p.rating, p.created_at,
                u.id, u.name, u.email, u.password_hash, u.role, u.is_banned, u.banned_at, u.created_at
         FROM bookings b
         INNER JOIN users s ON s.id = b.student_id
         INNER JOIN tutor_profiles p ON p.id = b.tutor_id
         INNER JOIN users u ON u.id = p.user_id
         ORDER BY b.created_at DESC, b.rowid DESC",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok((
            parse_booking_row(row),
            parse_user_row_at(row, 7),
            parse_profile_row_at(row, 15),
            parse_user_row_at(row, 22),
        ))
    })?;

    let mut bookings = vec![];
    for row in rows {
        let (booking, student, profile, tutor_user) = row?;
        bookings.push((booking?, student?, profile?, tutor_user?));
    }
    Ok(bookings)
}

/// The caller supplies the instant so the row and any in-memory copy agree.
pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    status: BookingStatus,
    at: &NaiveDateTime,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![
            status.as_str(),
            at.format("%Y-%m-%d %H:%M:%S").to_string(),
            id
        ],
    )?;
    Ok(count > 0)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let session_date_str: String = row.get(3)?;
    let status_str: String = row.get(4)?;
    let created_at_str: String = row.get(5)?;
    let updated_at_str: String = row.get(6)?;

    Ok(Booking {
        id: row.get(0)?,
        student_id: row.get(1)?,
        tutor_id: row.get(2)?,
        session_date: parse_datetime(&session_date_str),
        status: BookingStatus::parse(&status_str),
        created_at: parse_datetime(&created_at_str),
        updated_at: parse_datetime(&updated_at_str),
    })
}

fn parse_profile_row_at(row: &rusqlite::Row, offset: usize) -> anyhow::Result<TutorProfile> {
    let created_at_str: String = row.get(offset + 6)?;
    Ok(TutorProfile {
        id: row.get(offset)?,
        user_id: row.get(offset + 1)?,
        bio: row.get(offset + 2)?,
        hourly_rate: row.get(offset + 3)?,
        subject: row.get(offset + 4)?,
        rating: row.get(offset + 5)?,
        created_at: parse_datetime(&created_at_str),
    })
}

// ── Reviews ──

pub fn create_review(conn: &Connection, review: &Review) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO reviews (id, student_id, tutor_id, rating, comment, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            review.id,
            review.student_id,
            review.tutor_id,
            review.rating,
            review.comment,
            review.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;
    Ok(())
}

pub fn review_exists(
    conn: &Connection,
    student_id: &str,
    tutor_id: &str,
) -> anyhow::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM reviews WHERE student_id = ?1 AND tutor_id = ?2",
        params![student_id, tutor_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn has_completed_booking(
    conn: &Connection,
    student_id: &str,
    tutor_id: &str,
) -> anyhow::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings
         WHERE student_id = ?1 AND tutor_id = ?2 AND status = 'COMPLETED'",
        params![student_id, tutor_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn average_rating(conn: &Connection, tutor_id: &str) -> anyhow::Result<Option<f64>> {
    let avg: Option<f64> = conn.query_row(
        "SELECT AVG(rating) FROM reviews WHERE tutor_id = ?1",
        params![tutor_id],
        |row| row.get(0),
    )?;
    Ok(avg)
}

pub fn reviews_for_tutor(conn: &Connection, tutor_id: &str) -> anyhow::Result<Vec<Review>> {
    let mut stmt = conn.prepare(
        "SELECT id, student_id, tutor_id, rating, comment, created_at
         FROM reviews WHERE tutor_id = ?1 ORDER BY created_at DESC",
    )?;

    let rows = stmt.query_map(params![tutor_id], |row| Ok(parse_review_row(row)))?;

    let mut reviews = vec![];
    for row in rows {
        reviews.push(row??);
    }
    Ok(reviews)
}

fn parse_review_row(row: &rusqlite::Row) -> anyhow::Result<Review> {
    let created_at_str: String = row.get(5)?;
    Ok(Review {
        id: row.get(0)?,
        student_id: row.get(1)?,
        tutor_id: row.get(2)?,
        rating: row.get(3)?,
        comment: row.get(4)?,
        created_at: parse_datetime(&created_at_str),
    })
}

fn parse_datetime(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .unwrap_or_else(|_| Utc::now().naive_utc())
}
