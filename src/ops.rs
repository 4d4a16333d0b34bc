use rusqlite::{Connection, OptionalExtension, Params, Row};

use crate::error::{Error, Result};
use crate::model::{
    EmailFilter, NewTask, Status, StatusCount, StatusRef, StatusRow, Task, User, UserTask,
    UserTaskCount,
};
use crate::validate::{validate_email, validate_fullname, validate_title};

const TASK_COLUMNS: &str = "t.id, t.title, t.description, t.status_id, t.user_id";

const USER_COLUMNS: &str = "u.id, u.fullname, u.email";

const INSERT_TASK: &str = "
INSERT INTO tasks (title, description, status_id, user_id)
VALUES (?1, ?2, ?3, ?4)
";

const INSERT_USER: &str = "
INSERT INTO users (fullname, email)
VALUES (?1, ?2)
ON CONFLICT (email) DO NOTHING
";

const SET_TASK_STATUS: &str = "UPDATE tasks SET status_id = ?1 WHERE id = ?2";

const SET_USER_FULLNAME: &str = "UPDATE users SET fullname = ?1 WHERE id = ?2";

const COUNT_PER_STATUS: &str = "
SELECT s.name, COUNT(t.id)
FROM status s
LEFT JOIN tasks t ON t.status_id = s.id
GROUP BY s.id, s.name
ORDER BY s.id
";

const COUNT_PER_USER: &str = "
SELECT u.id, u.fullname, u.email, COUNT(t.id) AS task_count
FROM users u
LEFT JOIN tasks t ON t.user_id = u.id
GROUP BY u.id, u.fullname, u.email
ORDER BY task_count DESC, u.id ASC
";

fn read_task_at(row: &Row, offset: usize) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(offset)?,
        title: row.get(offset + 1)?,
        description: row.get(offset + 2)?,
        status_id: row.get(offset + 3)?,
        user_id: row.get(offset + 4)?,
    })
}

fn read_task_row(row: &Row) -> rusqlite::Result<Task> {
    read_task_at(row, 0)
}

fn read_user_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        fullname: row.get(1)?,
        email: row.get(2)?,
    })
}

/// User columns first, then task columns.
fn read_user_task_row(row: &Row) -> rusqlite::Result<UserTask> {
    Ok(UserTask {
        user: read_user_row(row)?,
        task: read_task_at(row, 3)?,
    })
}

fn query_tasks<P: Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<Task>> {
    let mut stmt = conn.prepare_cached(sql)?;
    let rows = stmt.query_map(params, read_task_row)?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(Into::into)
}

fn query_users<P: Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<User>> {
    let mut stmt = conn.prepare_cached(sql)?;
    let rows = stmt.query_map(params, read_user_row)?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(Into::into)
}

fn query_user_tasks<P: Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<UserTask>> {
    let mut stmt = conn.prepare_cached(sql)?;
    let rows = stmt.query_map(params, read_user_task_row)?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(Into::into)
}

fn user_exists(conn: &Connection, user_id: i64) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE id = ?1",
        [user_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn require_user(conn: &Connection, user_id: i64) -> Result<()> {
    if !user_exists(conn, user_id)? {
        return Err(Error::UserNotFound(user_id));
    }
    Ok(())
}

/// Turn a status reference into the id of an existing `status` row.
///
/// Every status-aware query goes through here, so call sites never carry
/// numeric status literals and a bad name or id fails before any write.
pub fn resolve_status_id(conn: &Connection, status: StatusRef) -> Result<i64> {
    match status {
        StatusRef::Id(id) => conn
            .query_row("SELECT id FROM status WHERE id = ?1", [id], |row| row.get(0))
            .optional()?
            .ok_or(Error::StatusIdNotFound(id)),
        StatusRef::Named(name) => conn
            .query_row("SELECT id FROM status WHERE name = ?1", [name], |row| {
                row.get(0)
            })
            .optional()?
            .ok_or_else(|| Error::StatusNotFound(name.as_str().to_string())),
    }
}

pub fn list_statuses(conn: &Connection) -> Result<Vec<StatusRow>> {
    let mut stmt = conn.prepare_cached("SELECT id, name FROM status ORDER BY id")?;
    let rows = stmt.query_map([], |row| {
        Ok(StatusRow {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    })?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(Into::into)
}

// -- users --

/// Insert a user. Returns `None` when the email is already taken.
pub fn create_user(conn: &Connection, fullname: &str, email: &str) -> Result<Option<i64>> {
    validate_fullname(fullname)?;
    validate_email(email)?;
    let rows = conn.execute(INSERT_USER, rusqlite::params![fullname, email])?;
    if rows == 0 {
        tracing::debug!(email, "user already exists");
        return Ok(None);
    }
    let id = conn.last_insert_rowid();
    tracing::info!(user_id = id, email, "created user");
    Ok(Some(id))
}

pub fn get_user(conn: &Connection, user_id: i64) -> Result<Option<User>> {
    let query = format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = ?1");
    conn.query_row(&query, [user_id], read_user_row)
        .optional()
        .map_err(Into::into)
}

pub fn list_users(conn: &Connection) -> Result<Vec<User>> {
    let query = format!("SELECT {USER_COLUMNS} FROM users u ORDER BY u.id");
    query_users(conn, &query, [])
}

/// Exact match or SQL `LIKE` pattern on `users.email`.
pub fn find_users_by_email(conn: &Connection, filter: &EmailFilter) -> Result<Vec<User>> {
    match filter {
        EmailFilter::Exact(email) => {
            let query =
                format!("SELECT {USER_COLUMNS} FROM users u WHERE u.email = ?1 ORDER BY u.id");
            query_users(conn, &query, [email])
        }
        EmailFilter::Pattern(pattern) => {
            let query =
                format!("SELECT {USER_COLUMNS} FROM users u WHERE u.email LIKE ?1 ORDER BY u.id");
            query_users(conn, &query, [pattern])
        }
    }
}

/// Returns the number of rows updated: 0 when the user does not exist.
pub fn update_user_fullname(conn: &Connection, user_id: i64, fullname: &str) -> Result<usize> {
    validate_fullname(fullname)?;
    let rows = conn.execute(SET_USER_FULLNAME, rusqlite::params![fullname, user_id])?;
    tracing::info!(user_id, rows, "updated user fullname");
    Ok(rows)
}

/// Users that own no task at all.
pub fn list_users_without_tasks(conn: &Connection) -> Result<Vec<User>> {
    let query = format!(
        "SELECT {USER_COLUMNS} FROM users u
         WHERE NOT EXISTS (SELECT 1 FROM tasks t WHERE t.user_id = u.id)
         ORDER BY u.id"
    );
    query_users(conn, &query, [])
}

// -- tasks --

pub fn create_task(conn: &Connection, new: &NewTask) -> Result<i64> {
    validate_title(&new.title)?;
    let status_id = resolve_status_id(conn, new.status)?;
    require_user(conn, new.user_id)?;
    conn.execute(
        INSERT_TASK,
        rusqlite::params![new.title, new.description, status_id, new.user_id],
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!(task_id = id, user_id = new.user_id, status_id, "created task");
    Ok(id)
}

pub fn get_task(conn: &Connection, task_id: i64) -> Result<Option<Task>> {
    let query = format!("SELECT {TASK_COLUMNS} FROM tasks t WHERE t.id = ?1");
    conn.query_row(&query, [task_id], read_task_row)
        .optional()
        .map_err(Into::into)
}

pub fn list_tasks(conn: &Connection) -> Result<Vec<Task>> {
    let query = format!("SELECT {TASK_COLUMNS} FROM tasks t ORDER BY t.id");
    query_tasks(conn, &query, [])
}

pub fn list_tasks_by_user(conn: &Connection, user_id: i64) -> Result<Vec<Task>> {
    let query = format!("SELECT {TASK_COLUMNS} FROM tasks t WHERE t.user_id = ?1 ORDER BY t.id");
    query_tasks(conn, &query, [user_id])
}

pub fn list_tasks_by_status(conn: &Connection, status: Status) -> Result<Vec<Task>> {
    let status_id = resolve_status_id(conn, status.into())?;
    let query = format!("SELECT {TASK_COLUMNS} FROM tasks t WHERE t.status_id = ?1 ORDER BY t.id");
    query_tasks(conn, &query, [status_id])
}

/// Tasks whose status is anything but `completed`.
pub fn list_incomplete_tasks(conn: &Connection) -> Result<Vec<Task>> {
    let completed_id = resolve_status_id(conn, Status::Completed.into())?;
    let query = format!("SELECT {TASK_COLUMNS} FROM tasks t WHERE t.status_id != ?1 ORDER BY t.id");
    query_tasks(conn, &query, [completed_id])
}

pub fn list_tasks_missing_description(conn: &Connection) -> Result<Vec<Task>> {
    let query = format!(
        "SELECT {TASK_COLUMNS} FROM tasks t
         WHERE t.description IS NULL OR t.description = ''
         ORDER BY t.id"
    );
    query_tasks(conn, &query, [])
}

/// Returns the number of rows updated: 0 when the task does not exist.
pub fn update_task_status(conn: &Connection, task_id: i64, status: StatusRef) -> Result<usize> {
    let status_id = resolve_status_id(conn, status)?;
    let rows = conn.execute(SET_TASK_STATUS, rusqlite::params![status_id, task_id])?;
    tracing::info!(task_id, status_id, rows, "updated task status");
    Ok(rows)
}

/// Deleting a task that does not exist is a no-op returning 0.
pub fn delete_task(conn: &Connection, task_id: i64) -> Result<usize> {
    let rows = conn.execute("DELETE FROM tasks WHERE id = ?1", [task_id])?;
    tracing::info!(task_id, rows, "deleted task");
    Ok(rows)
}

// -- joins and reports --

/// Tasks whose owner's email contains `domain`. Case is folded with full
/// Unicode rules, so `@Приклад.укр` matches `@приклад.укр`.
pub fn list_tasks_by_email_domain(conn: &Connection, domain: &str) -> Result<Vec<UserTask>> {
    if domain.is_empty() {
        return Err(Error::Invalid("email domain must not be empty".into()));
    }
    let query = format!(
        "SELECT {USER_COLUMNS}, {TASK_COLUMNS}
         FROM tasks t
         JOIN users u ON u.id = t.user_id
         WHERE instr(lower_unicode(u.email), lower_unicode(?1)) > 0
         ORDER BY t.id"
    );
    query_user_tasks(conn, &query, [domain])
}

pub fn list_in_progress_assignments(conn: &Connection) -> Result<Vec<UserTask>> {
    let status_id = resolve_status_id(conn, Status::InProgress.into())?;
    let query = format!(
        "SELECT {USER_COLUMNS}, {TASK_COLUMNS}
         FROM tasks t
         JOIN users u ON u.id = t.user_id
         WHERE t.status_id = ?1
         ORDER BY u.id, t.id"
    );
    query_user_tasks(conn, &query, [status_id])
}

/// One row per status, including statuses no task uses.
pub fn count_tasks_per_status(conn: &Connection) -> Result<Vec<StatusCount>> {
    let mut stmt = conn.prepare_cached(COUNT_PER_STATUS)?;
    let rows = stmt.query_map([], |row| {
        Ok(StatusCount {
            status: row.get(0)?,
            count: row.get(1)?,
        })
    })?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(Into::into)
}

/// One row per user, zero-filled, busiest first.
pub fn count_tasks_per_user(conn: &Connection) -> Result<Vec<UserTaskCount>> {
    let mut stmt = conn.prepare_cached(COUNT_PER_USER)?;
    let rows = stmt.query_map([], |row| {
        Ok(UserTaskCount {
            user: read_user_row(row)?,
            count: row.get(3)?,
        })
    })?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(Into::into)
}
