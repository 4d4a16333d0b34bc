use std::fmt;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::Serialize;

use crate::error::{Error, Result};

/// Task lifecycle stage. Stored as a row in the `status` lookup table; this
/// enum is the name side of that mapping, ids always come from the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Status {
    #[serde(rename = "new")]
    New,
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(rename = "completed")]
    Completed,
}

impl Status {
    pub const ALL: [Self; 3] = [Self::New, Self::InProgress, Self::Completed];

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "new" => Ok(Self::New),
            "in progress" | "in-progress" | "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            _ => Err(Error::InvalidStatus(s.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::InProgress => "in progress",
            Self::Completed => "completed",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Self::New => ".",
            Self::InProgress => "*",
            Self::Completed => "x",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromSql for Status {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let name = value.as_str()?;
        Self::parse(name).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for Status {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

/// A status given either by row id or by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusRef {
    Id(i64),
    Named(Status),
}

impl StatusRef {
    /// Numeric input is an id, anything else must be a status name.
    pub fn parse(s: &str) -> Result<Self> {
        match s.parse::<i64>() {
            Ok(id) => Ok(Self::Id(id)),
            Err(_) => Status::parse(s).map(Self::Named),
        }
    }
}

impl From<Status> for StatusRef {
    fn from(status: Status) -> Self {
        Self::Named(status)
    }
}

/// How to match `users.email`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailFilter {
    Exact(String),
    /// SQL `LIKE` pattern, e.g. `%@example.com`. Case-insensitive for ASCII.
    Pattern(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,
    pub fullname: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status_id: i64,
    pub user_id: i64,
}

impl Task {
    /// Null and empty descriptions are both missing.
    pub fn has_description(&self) -> bool {
        self.description.as_deref().is_some_and(|d| !d.is_empty())
    }
}

/// Input for `ops::create_task`.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub status: StatusRef,
    pub user_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusRow {
    pub id: i64,
    pub name: Status,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserTask {
    pub user: User,
    pub task: Task,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: Status,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserTaskCount {
    #[serde(flatten)]
    pub user: User,
    pub count: i64,
}
