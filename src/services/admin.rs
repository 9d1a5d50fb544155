use chrono::{DateTime, Timelike, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, Role, TutorProfile, User};
use crate::services::auth;

pub fn list_users(conn: &Connection) -> Result<Vec<User>, AppError> {
    Ok(queries::list_users(conn)?)
}

/// Every booking with both sides joined in, newest-created first.
pub fn list_bookings(
    conn: &Connection,
) -> Result<Vec<(Booking, User, TutorProfile, User)>, AppError> {
    Ok(queries::list_all_bookings(conn)?)
}

/// Bans or unbans a user. Banning stamps `banned_at`; unbanning clears it.
/// Applying the current status again is a plain overwrite, not an error.
pub fn set_user_banned(
    conn: &Connection,
    user_id: &str,
    banned: bool,
    now: DateTime<Utc>,
) -> Result<User, AppError> {
    let tx = conn.unchecked_transaction()?;

    let mut user = queries::get_user(&tx, user_id)?
        .ok_or_else(|| AppError::NotFound(format!("user {user_id}")))?;

    let at = now.naive_utc();
    let at = at.with_nanosecond(0).unwrap_or(at);
    queries::set_user_banned(&tx, user_id, banned, &at)?;
    tx.commit()?;

    user.is_banned = banned;
    user.banned_at = banned.then_some(at);
    Ok(user)
}

/// Creates the admin account on startup if no user holds the configured
/// email yet. Returns whether a row was created.
pub fn seed_admin(conn: &Connection, email: &str, password: &str) -> Result<bool, AppError> {
    if queries::get_user_by_email(conn, email)?.is_some() {
        return Ok(false);
    }

    let user = User {
        id: Uuid::new_v4().to_string(),
        name: "Admin".to_string(),
        email: email.to_string(),
        password_hash: auth::hash_password(password),
        role: Role::Admin,
        is_banned: false,
        banned_at: None,
        created_at: Utc::now().naive_utc(),
    };
    queries::create_user(conn, &user)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::BookingStatus;
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

    fn test_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_ban_and_unban() {
        let conn = setup_db();
        seed_user(&conn, "u1", "student");

        let banned = set_user_banned(&conn, "u1", true, test_now()).unwrap();
        assert!(banned.is_banned);
        assert_eq!(banned.banned_at, Some(test_now().naive_utc()));

        let stored = queries::get_user(&conn, "u1").unwrap().unwrap();
        assert!(stored.is_banned);
        assert_eq!(stored.banned_at, banned.banned_at);

        let unbanned = set_user_banned(&conn, "u1", false, test_now()).unwrap();
        assert!(!unbanned.is_banned);
        assert!(unbanned.banned_at.is_none());

        let stored = queries::get_user(&conn, "u1").unwrap().unwrap();
        assert!(!stored.is_banned);
        assert!(stored.banned_at.is_none());
    }

    #[test]
    fn test_ban_unknown_user() {
        let conn = setup_db();
        let err = set_user_banned(&conn, "missing", true, test_now()).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_list_users_includes_everyone() {
        let conn = setup_db();
        seed_user(&conn, "u1", "student");
        seed_user(&conn, "u2", "tutor");
        seed_admin(&conn, "admin@x.io", "admin1234").unwrap();

        let users = list_users(&conn).unwrap();
        assert_eq!(users.len(), 3);
        assert!(users.iter().any(|u| u.role == Role::Admin));
    }

    #[test]
    fn test_list_bookings_enriched_newest_first() {
        let conn = setup_db();
        seed_user(&conn, "s1", "student");
        seed_user(&conn, "u1", "tutor");
        conn.execute(
            "INSERT INTO tutor_profiles (id, user_id, hourly_rate) VALUES ('t1', 'u1', 25.0)",
            [],
        )
        .unwrap();
        for (id, created) in [("b1", "2030-01-01 00:00:00"), ("b2", "2030-01-02 00:00:00")] {
            conn.execute(
                "INSERT INTO bookings (id, student_id, tutor_id, session_date, status, created_at, updated_at)
                 VALUES (?1, 's1', 't1', '2030-06-10 10:00:00', 'UPCOMING', ?2, ?2)",
                [id, created],
            )
            .unwrap();
        }

        let bookings = list_bookings(&conn).unwrap();
        assert_eq!(bookings.len(), 2);
        assert_eq!(bookings[0].0.id, "b2");
        assert_eq!(bookings[0].0.status, BookingStatus::Upcoming);
        assert_eq!(bookings[0].1.id, "s1");
        assert_eq!(bookings[0].2.id, "t1");
        assert_eq!(bookings[0].3.id, "u1");
    }

    #[test]
    fn test_seed_admin_is_idempotent() {
        let conn = setup_db();
        assert!(seed_admin(&conn, "admin@x.io", "admin1234").unwrap());
        assert!(!seed_admin(&conn, "admin@x.io", "admin1234").unwrap());

        let admin = queries::get_user_by_email(&conn, "admin@x.io")
            .unwrap()
            .unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert!(auth::verify_password("admin1234", &admin.password_hash));
    }
}
