//! Users, a status vocabulary and tasks stored in SQLite, with the
//! queries a small task tracker needs: per-user and per-status listings,
//! status transitions, anti-joins and zero-filled counts.

pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod ops;
pub mod output;
pub mod seed;
pub mod validate;
