use anyhow::Context;
use rusqlite::Connection;

/// Migrations are embedded so in-memory databases (tests) get the full
/// schema without a migrations directory on disk.
const MIGRATIONS: &[(&str, &str)] = &[
    (
        "001_users",
        "CREATE TABLE users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    ),
    (
        "002_tutor_profiles",
        "CREATE TABLE tutor_profiles (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL UNIQUE REFERENCES users(id),
            bio TEXT,
            hourly_rate REAL NOT NULL DEFAULT 0,
            subject TEXT,
            rating REAL NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    ),
    (
        "003_availability_slots",
        "CREATE TABLE availability_slots (
            id TEXT PRIMARY KEY,
            tutor_id TEXT NOT NULL REFERENCES tutor_profiles(id),
            day TEXT NOT NULL,
            start_minute INTEGER NOT NULL,
            end_minute INTEGER NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX idx_slots_tutor_day ON availability_slots(tutor_id, day);",
    ),
    (
        "004_bookings",
        "CREATE TABLE bookings (
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL REFERENCES users(id),
            tutor_id TEXT NOT NULL REFERENCES tutor_profiles(id),
            session_date TEXT NOT NULL,
            status TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX idx_bookings_tutor_date ON bookings(tutor_id, session_date);
        CREATE INDEX idx_bookings_student ON bookings(student_id);",
    ),
    (
        "005_reviews",
        "CREATE TABLE reviews (
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL REFERENCES users(id),
            tutor_id TEXT NOT NULL REFERENCES tutor_profiles(id),
            rating INTEGER NOT NULL,
            comment TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(student_id, tutor_id)
        );",
    ),
    (
        "006_user_bans",
        "ALTER TABLE users ADD COLUMN is_banned INTEGER NOT NULL DEFAULT 0;
        ALTER TABLE users ADD COLUMN banned_at TEXT;",
    ),
];

pub fn run_migrations(conn: &Connection) -> anyhow::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
    .context("failed to create migrations table")?;

    for (name, sql) in MIGRATIONS {
        let already_applied: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM _migrations WHERE name = ?1",
                [name],
                |row| row.get(0),
            )
            .context("failed to check migration status")?;

        if already_applied {
            continue;
        }

        conn.execute_batch(sql)
            .with_context(|| format!("failed to apply migration: {name}"))?;

        conn.execute("INSERT INTO _migrations (name) VALUES (?1)", [name])
            .with_context(|| format!("failed to record migration: {name}"))?;

        tracing::info!("applied migration: {name}");
    }

    Ok(())
}
