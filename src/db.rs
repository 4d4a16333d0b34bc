use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;

use crate::error::Result;
use crate::model::Status;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id       INTEGER PRIMARY KEY,
    fullname TEXT NOT NULL CHECK(length(fullname) BETWEEN 1 AND 100),
    email    TEXT NOT NULL CHECK(length(email) BETWEEN 1 AND 100),
    CONSTRAINT uq_users_email UNIQUE (email)
);

CREATE TABLE IF NOT EXISTS status (
    id   INTEGER PRIMARY KEY,
    name TEXT NOT NULL CHECK(name IN ('new', 'in progress', 'completed')),
    CONSTRAINT uq_status_name UNIQUE (name)
);

CREATE TABLE IF NOT EXISTS tasks (
    id          INTEGER PRIMARY KEY,
    title       TEXT NOT NULL CHECK(length(title) BETWEEN 1 AND 100),
    description TEXT,
    status_id   INTEGER NOT NULL
        REFERENCES status(id) ON UPDATE RESTRICT ON DELETE RESTRICT,
    user_id     INTEGER NOT NULL
        REFERENCES users(id) ON UPDATE RESTRICT ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_tasks_status_id ON tasks (status_id);
CREATE INDEX IF NOT EXISTS idx_tasks_user_id   ON tasks (user_id);
";

fn set_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;",
    )?;
    Ok(())
}

/// `lower_unicode(text)`: full Unicode lowercase. SQLite's own `lower()`
/// only folds ASCII.
fn register_functions(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        "lower_unicode",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|t| t.to_lowercase()))
        },
    )?;
    Ok(())
}

pub fn open(path: &str) -> Result<Connection> {
    let conn = Connection::open(path)?;
    set_pragmas(&conn)?;
    register_functions(&conn)?;
    tracing::debug!(path, "opened database");
    Ok(conn)
}

/// Create tables and the status vocabulary. Safe to run repeatedly.
pub fn init(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    let mut stmt = conn.prepare_cached("INSERT OR IGNORE INTO status (name) VALUES (?1)")?;
    let mut added = 0;
    for status in Status::ALL {
        added += stmt.execute([status.as_str()])?;
    }
    if added > 0 {
        tracing::info!(added, "seeded status vocabulary");
    }
    Ok(())
}

#[cfg(test)]
pub fn open_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    set_pragmas(&conn)?;
    register_functions(&conn)?;
    init(&conn)?;
    Ok(conn)
}
