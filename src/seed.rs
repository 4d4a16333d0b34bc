//! Deterministic demo data: users with unique emails and tasks spread
//! randomly over existing users and statuses.

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use rusqlite::Connection;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::{NewTask, StatusRef};
use crate::ops;

const FIRST_NAMES: &[&str] = &[
    "Olena", "Taras", "Iryna", "Bohdan", "Oksana", "Mykola", "Yulia", "Andrii", "Sofia", "Dmytro",
    "Kateryna", "Petro", "Halyna", "Ostap", "Marta",
];

const LAST_NAMES: &[&str] = &[
    "Shevchenko", "Kovalenko", "Bondarenko", "Tkachenko", "Kravchenko", "Melnyk", "Boyko",
    "Oliynyk", "Lysenko", "Rudenko", "Savchenko", "Petrenko",
];

const DOMAINS: &[&str] = &["example.com", "example.org", "example.net", "mail.test"];

const WORDS: &[&str] = &[
    "review", "draft", "update", "schedule", "budget", "report", "client", "release", "backlog",
    "meeting", "invoice", "migrate", "database", "design", "notes", "quarterly", "deploy",
    "feedback", "roadmap", "audit", "prepare", "summary", "contract", "follow", "plan", "team",
];

/// Every `MISSING_EVERY`th task gets no description.
const MISSING_EVERY: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SeedOptions {
    pub users: usize,
    pub tasks: usize,
    pub seed: u64,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self {
            users: 10,
            tasks: 100,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeUser {
    pub fullname: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeTask {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FakeData {
    pub users: Vec<FakeUser>,
    pub tasks: Vec<FakeTask>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub users_added: usize,
    pub tasks_added: usize,
}

fn pick<'a>(rng: &mut StdRng, words: &[&'a str]) -> &'a str {
    words.choose(rng).copied().unwrap_or_default()
}

fn sentence(rng: &mut StdRng, words: usize) -> String {
    let mut out = String::new();
    for i in 0..words {
        let word = pick(rng, WORDS);
        if i == 0 {
            let mut chars = word.chars();
            if let Some(first) = chars.next() {
                out.extend(first.to_uppercase());
                out.push_str(chars.as_str());
            }
        } else {
            out.push(' ');
            out.push_str(word);
        }
    }
    out.push('.');
    out
}

fn paragraph(rng: &mut StdRng, sentences: usize) -> String {
    let mut parts = Vec::with_capacity(sentences);
    for _ in 0..sentences {
        let len = rng.random_range(4..=9);
        parts.push(sentence(rng, len));
    }
    parts.join(" ")
}

/// Generate users and tasks. Same inputs, same output.
pub fn generate(users: usize, tasks: usize, seed: u64) -> FakeData {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = FakeData::default();

    for n in 0..users {
        let first = pick(&mut rng, FIRST_NAMES);
        let last = pick(&mut rng, LAST_NAMES);
        let domain = pick(&mut rng, DOMAINS);
        data.users.push(FakeUser {
            fullname: format!("{first} {last}"),
            // The index keeps emails unique within a batch.
            email: format!("{}.{}{n}@{domain}", first.to_lowercase(), last.to_lowercase()),
        });
    }

    for n in 0..tasks {
        let title = sentence(&mut rng, 5);
        let description = if n % MISSING_EVERY == MISSING_EVERY - 1 {
            if (n / MISSING_EVERY) % 2 == 0 {
                None
            } else {
                Some(String::new())
            }
        } else {
            Some(paragraph(&mut rng, 3))
        };
        data.tasks.push(FakeTask { title, description });
    }

    data
}

fn user_ids(conn: &Connection) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare_cached("SELECT id FROM users ORDER BY id")?;
    let rows = stmt.query_map([], |row| row.get(0))?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(Into::into)
}

fn insert(conn: &Connection, data: &FakeData, seed: u64) -> Result<SeedReport> {
    let mut report = SeedReport::default();
    for user in &data.users {
        if ops::create_user(conn, &user.fullname, &user.email)?.is_some() {
            report.users_added += 1;
        }
    }
    tracing::info!(
        added = report.users_added,
        requested = data.users.len(),
        "seeded users"
    );

    if data.tasks.is_empty() {
        return Ok(report);
    }

    let users = user_ids(conn)?;
    if users.is_empty() {
        return Err(Error::NothingToAssign);
    }
    let statuses: Vec<i64> = ops::list_statuses(conn)?.iter().map(|s| s.id).collect();

    // Separate stream from `generate` so assignment does not shift the text.
    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(1));
    for task in &data.tasks {
        let (Some(&status_id), Some(&user_id)) = (statuses.choose(&mut rng), users.choose(&mut rng))
        else {
            return Err(Error::NothingToAssign);
        };
        ops::create_task(
            conn,
            &NewTask {
                title: task.title.clone(),
                description: task.description.clone(),
                status: StatusRef::Id(status_id),
                user_id,
            },
        )?;
        report.tasks_added += 1;
    }
    tracing::info!(added = report.tasks_added, "seeded tasks");

    Ok(report)
}

/// Insert generated data in one savepoint. Users whose email already exists
/// are skipped; tasks are always added.
pub fn seed(conn: &Connection, opts: &SeedOptions) -> Result<SeedReport> {
    let data = generate(opts.users, opts.tasks, opts.seed);

    // SAVEPOINT so this also nests inside a caller's transaction.
    conn.execute_batch("SAVEPOINT seed")?;
    match insert(conn, &data, opts.seed) {
        Ok(report) => {
            conn.execute_batch("RELEASE seed")?;
            Ok(report)
        }
        Err(e) => {
            let _ = conn.execute_batch("ROLLBACK TO seed");
            let _ = conn.execute_batch("RELEASE seed");
            tracing::error!(error = %e, "seeding rolled back");
            Err(e)
        }
    }
}
