mod cli;

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use rusqlite::Connection;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, CountBy};
use taskdb::config::Config;
use taskdb::model::{EmailFilter, NewTask, Status, StatusRef};
use taskdb::seed::SeedOptions;
use taskdb::{db, ops, output, seed};

fn default_db_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".taskdb").join("taskdb.db"))
}

/// `--db` / `TASKDB_DB`, then the config file, then the default location.
fn resolve_db_path(cli_db: Option<String>, config: &Config) -> Result<String> {
    match cli_db.or_else(|| config.database.path.clone()) {
        Some(p) => Ok(p),
        None => {
            let path = default_db_path()?;
            Ok(path
                .to_str()
                .context("default DB path is not valid UTF-8")?
                .to_string())
        }
    }
}

fn ensure_db_dir(db_path: &str) -> Result<()> {
    if let Some(parent) = std::path::Path::new(db_path).parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }
    Ok(())
}

fn open_db(db_path: &str) -> Result<Connection> {
    let conn = db::open(db_path).with_context(|| format!("failed to open {db_path}"))?;
    db::init(&conn)?;
    Ok(conn)
}

/// `RUST_LOG` wins over the configured level.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize + ?Sized>(out: &mut impl Write, value: &T) -> Result<()> {
    writeln!(out, "{}", serde_json::to_string_pretty(value)?)?;
    Ok(())
}

fn show_task(conn: &Connection, out: &mut impl Write, id: i64, json: bool) -> Result<()> {
    let Some(task) = ops::get_task(conn, id)? else {
        bail!("task #{id} not found");
    };
    let names = output::status_names(&ops::list_statuses(conn)?);
    let status = names.get(&task.status_id).copied();
    let owner = ops::get_user(conn, task.user_id)?;
    if json {
        print_json(
            out,
            &output::TaskDetail {
                task: &task,
                status,
                owner: owner.as_ref(),
            },
        )
    } else {
        let detail = output::format_task_detail(&task, status, owner.as_ref());
        write!(out, "{detail}")?;
        Ok(())
    }
}

/// Apply a status change and return the stored status name, or `None` when
/// the task does not exist.
fn set_task_status(conn: &Connection, id: i64, status: StatusRef) -> Result<Option<Status>> {
    let status_id = ops::resolve_status_id(conn, status)?;
    if ops::update_task_status(conn, id, StatusRef::Id(status_id))? == 0 {
        return Ok(None);
    }
    let names = output::status_names(&ops::list_statuses(conn)?);
    Ok(names.get(&status_id).copied())
}

/// Data goes to `out`, progress messages to stderr.
fn dispatch(
    conn: &Connection,
    config: &Config,
    command: Command,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        Command::Init => {
            // open_db already ran init
            eprintln!("Database ready");
        }

        Command::Seed {
            users,
            tasks,
            seed: rng_seed,
        } => {
            let opts = SeedOptions {
                users: users.unwrap_or(config.seed.users),
                tasks: tasks.unwrap_or(config.seed.tasks),
                seed: rng_seed.unwrap_or(config.seed.seed),
            };
            let report = seed::seed(conn, &opts)?;
            eprintln!(
                "Added {} of {} users and {} tasks",
                report.users_added, opts.users, report.tasks_added
            );
        }

        Command::Add {
            title,
            user,
            desc,
            status,
            json,
        } => {
            let status = StatusRef::parse(&status)?;
            let id = ops::create_task(
                conn,
                &NewTask {
                    title,
                    description: desc,
                    status,
                    user_id: user,
                },
            )?;
            if json {
                show_task(conn, out, id, true)?;
            } else {
                writeln!(out, "{id}")?;
            }
            eprintln!("Added task #{id}");
        }

        Command::Show { id, json } => show_task(conn, out, id, json)?,

        Command::Status { id, status } => {
            match set_task_status(conn, id, StatusRef::parse(&status)?)? {
                Some(name) => eprintln!("Task #{id} is now '{name}'"),
                None => eprintln!("No task #{id}; nothing changed"),
            }
        }

        Command::Rm { id } => {
            if ops::delete_task(conn, id)? == 0 {
                eprintln!("No task #{id}; nothing removed");
            } else {
                eprintln!("Removed task #{id}");
            }
        }

        Command::List {
            user,
            status,
            incomplete,
            no_desc,
            json,
        } => {
            let tasks = if let Some(user_id) = user {
                ops::list_tasks_by_user(conn, user_id)?
            } else if let Some(name) = status {
                ops::list_tasks_by_status(conn, Status::parse(&name)?)?
            } else if incomplete {
                ops::list_incomplete_tasks(conn)?
            } else if no_desc {
                ops::list_tasks_missing_description(conn)?
            } else {
                ops::list_tasks(conn)?
            };
            if json {
                print_json(out, &tasks)?;
            } else {
                let names = output::status_names(&ops::list_statuses(conn)?);
                write!(out, "{}", output::format_task_list(&tasks, &names))?;
            }
        }

        Command::InProgress { json } => {
            let rows = ops::list_in_progress_assignments(conn)?;
            if json {
                print_json(out, &rows)?;
            } else {
                let names = output::status_names(&ops::list_statuses(conn)?);
                write!(out, "{}", output::format_user_tasks(&rows, &names))?;
            }
        }

        Command::Domain { domain, json } => {
            let rows = ops::list_tasks_by_email_domain(conn, &domain)?;
            if json {
                print_json(out, &rows)?;
            } else {
                let names = output::status_names(&ops::list_statuses(conn)?);
                write!(out, "{}", output::format_user_tasks(&rows, &names))?;
            }
        }

        Command::Users {
            idle,
            email,
            like,
            json,
        } => {
            let users = if idle {
                ops::list_users_without_tasks(conn)?
            } else if let Some(email) = email {
                ops::find_users_by_email(conn, &EmailFilter::Exact(email))?
            } else if let Some(pattern) = like {
                ops::find_users_by_email(conn, &EmailFilter::Pattern(pattern))?
            } else {
                ops::list_users(conn)?
            };
            if json {
                print_json(out, &users)?;
            } else {
                write!(out, "{}", output::format_user_list(&users))?;
            }
        }

        Command::UserAdd { fullname, email } => {
            match ops::create_user(conn, &fullname, &email)? {
                Some(id) => {
                    writeln!(out, "{id}")?;
                    eprintln!("Added user #{id}");
                }
                None => bail!("a user with email '{email}' already exists"),
            }
        }

        Command::Rename { id, fullname } => {
            if ops::update_user_fullname(conn, id, &fullname)? == 0 {
                eprintln!("No user #{id}; nothing changed");
            } else {
                eprintln!("Renamed user #{id} to '{fullname}'");
            }
        }

        Command::Stats { by, json } => match by {
            CountBy::Status => {
                let counts = ops::count_tasks_per_status(conn)?;
                if json {
                    print_json(out, &counts)?;
                } else {
                    write!(out, "{}", output::format_status_counts(&counts))?;
                }
            }
            CountBy::User => {
                let counts = ops::count_tasks_per_user(conn)?;
                if json {
                    print_json(out, &counts)?;
                } else {
                    write!(out, "{}", output::format_user_counts(&counts))?;
                }
            }
        },

        Command::Statuses => {
            write!(out, "{}", output::format_statuses(&ops::list_statuses(conn)?))?;
        }
    }

    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    init_logging(config.log.level());
    let db_path = resolve_db_path(cli.db, &config)?;
    ensure_db_dir(&db_path)?;
    let conn = open_db(&db_path)?;
    let stdout = std::io::stdout();
    dispatch(&conn, &config, cli.command, &mut stdout.lock())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tasks.db");
        let path = path.to_str().unwrap();
        ensure_db_dir(path).unwrap();
        let conn = open_db(path).unwrap();
        (dir, conn)
    }

    fn parse(args: &[&str]) -> Command {
        let mut argv = vec!["taskdb"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap().command
    }

    /// Run one command and return what it wrote to stdout.
    fn run_cmd(conn: &Connection, args: &[&str]) -> Result<String> {
        let mut out = Vec::new();
        dispatch(conn, &Config::default(), parse(args), &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    fn run_json(conn: &Connection, args: &[&str]) -> serde_json::Value {
        serde_json::from_str(&run_cmd(conn, args).unwrap()).unwrap()
    }

    fn ids(value: &serde_json::Value) -> Vec<i64> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v["id"].as_i64().unwrap())
            .collect()
    }

    /// Users: 1 Ann (example.com), 2 Bob (test.net), 3 Idle (example.com).
    /// Tasks: 1 new "x" by Ann, 2 in progress (null desc) by Ann,
    /// 3 completed (empty desc) by Bob.
    fn fixture() -> (tempfile::TempDir, Connection) {
        let (dir, conn) = temp_db();
        run_cmd(&conn, &["user-add", "Ann Lee", "ann@example.com"]).unwrap();
        run_cmd(&conn, &["user-add", "Bob Roe", "bob@test.net"]).unwrap();
        run_cmd(&conn, &["user-add", "Idle User", "idle@example.com"]).unwrap();
        run_cmd(&conn, &["add", "a", "--user", "1", "--desc", "x"]).unwrap();
        run_cmd(&conn, &["add", "b", "--user", "1", "--status", "in-progress"]).unwrap();
        let completed = ["add", "c", "--user", "2", "--desc", "", "--status", "completed"];
        run_cmd(&conn, &completed).unwrap();
        (dir, conn)
    }

    #[test]
    fn config_path_used_when_flag_absent() {
        let config = Config {
            database: taskdb::config::DatabaseConfig {
                path: Some("/srv/tasks.db".into()),
            },
            ..Config::default()
        };
        assert_eq!(resolve_db_path(None, &config).unwrap(), "/srv/tasks.db");
        assert_eq!(
            resolve_db_path(Some("cli.db".into()), &config).unwrap(),
            "cli.db"
        );
    }

    #[test]
    fn add_then_status_then_rm() {
        let (_dir, conn) = temp_db();
        run_cmd(&conn, &["user-add", "Ann Lee", "ann@example.com"]).unwrap();
        let out = run_cmd(&conn, &["add", "Write", "--user", "1", "--desc", "soon"]).unwrap();
        assert_eq!(out, "1\n");
        run_cmd(&conn, &["status", "1", "in-progress"]).unwrap();
        assert_eq!(ops::list_in_progress_assignments(&conn).unwrap().len(), 1);
        run_cmd(&conn, &["rm", "1"]).unwrap();
        assert!(ops::get_task(&conn, 1).unwrap().is_none());
        // second removal is a no-op
        run_cmd(&conn, &["rm", "1"]).unwrap();
    }

    #[test]
    fn status_change_reports_stored_name() {
        let (_dir, conn) = fixture();
        let by_id = set_task_status(&conn, 1, StatusRef::parse("3").unwrap()).unwrap();
        assert_eq!(by_id, Some(Status::Completed));
        let in_progress = StatusRef::parse("in-progress").unwrap();
        let by_name = set_task_status(&conn, 1, in_progress).unwrap();
        assert_eq!(by_name, Some(Status::InProgress));
        assert_eq!(set_task_status(&conn, 99, StatusRef::Id(1)).unwrap(), None);
    }

    #[test]
    fn add_with_unknown_status_fails() {
        let (_dir, conn) = temp_db();
        run_cmd(&conn, &["user-add", "Ann Lee", "ann@example.com"]).unwrap();
        assert!(run_cmd(&conn, &["add", "t", "--user", "1", "--status", "done"]).is_err());
    }

    #[test]
    fn duplicate_user_add_fails() {
        let (_dir, conn) = temp_db();
        run_cmd(&conn, &["user-add", "Ann Lee", "ann@example.com"]).unwrap();
        assert!(run_cmd(&conn, &["user-add", "Ann", "ann@example.com"]).is_err());
    }

    #[test]
    fn seed_flags_override_config() {
        let (_dir, conn) = temp_db();
        run_cmd(&conn, &["seed", "--users", "2", "--tasks", "3"]).unwrap();
        assert_eq!(ops::list_users(&conn).unwrap().len(), 2);
        assert_eq!(ops::list_tasks(&conn).unwrap().len(), 3);
    }

    #[test]
    fn list_filters_conflict() {
        let argv = ["taskdb", "list", "--user", "1", "--incomplete"];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn show_missing_task_fails() {
        let (_dir, conn) = temp_db();
        assert!(run_cmd(&conn, &["show", "7"]).is_err());
    }

    #[test]
    fn show_json_includes_owner_and_status() {
        let (_dir, conn) = fixture();
        let detail = run_json(&conn, &["show", "2", "--json"]);
        assert_eq!(detail["status"], "in progress");
        assert_eq!(detail["owner"]["email"], "ann@example.com");
    }

    #[test]
    fn list_flags_select_operation() {
        let (_dir, conn) = fixture();
        assert_eq!(ids(&run_json(&conn, &["list", "--json"])), vec![1, 2, 3]);
        assert_eq!(ids(&run_json(&conn, &["list", "--user", "2", "--json"])), vec![3]);
        assert_eq!(
            ids(&run_json(&conn, &["list", "--status", "in-progress", "--json"])),
            vec![2]
        );
        assert_eq!(ids(&run_json(&conn, &["list", "--incomplete", "--json"])), vec![1, 2]);
        assert_eq!(ids(&run_json(&conn, &["list", "--no-desc", "--json"])), vec![2, 3]);
    }

    #[test]
    fn list_text_output() {
        let (_dir, conn) = fixture();
        let out = run_cmd(&conn, &["list", "--incomplete"]).unwrap();
        assert_eq!(out, ". #1 a (user 1)  x\n* #2 b (user 1)\n");
    }

    #[test]
    fn users_flags_select_operation() {
        let (_dir, conn) = fixture();
        assert_eq!(ids(&run_json(&conn, &["users", "--json"])), vec![1, 2, 3]);
        assert_eq!(ids(&run_json(&conn, &["users", "--idle", "--json"])), vec![3]);
        assert_eq!(
            ids(&run_json(&conn, &["users", "--email", "bob@test.net", "--json"])),
            vec![2]
        );
        assert_eq!(
            ids(&run_json(&conn, &["users", "--like", "%@example.com", "--json"])),
            vec![1, 3]
        );
    }

    #[test]
    fn domain_lists_owner_and_task() {
        let (_dir, conn) = fixture();
        let rows = run_json(&conn, &["domain", "@test.net", "--json"]);
        let rows = rows.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["user"]["id"], 2);
        assert_eq!(rows[0]["task"]["id"], 3);
        let text = run_cmd(&conn, &["domain", "@test.net"]).unwrap();
        assert_eq!(text, "Bob Roe <bob@test.net>  x #3 c\n");
    }

    #[test]
    fn in_progress_pairs() {
        let (_dir, conn) = fixture();
        let rows = run_json(&conn, &["in-progress", "--json"]);
        let pairs: Vec<(i64, i64)> = rows
            .as_array()
            .unwrap()
            .iter()
            .map(|r| (r["user"]["id"].as_i64().unwrap(), r["task"]["id"].as_i64().unwrap()))
            .collect();
        assert_eq!(pairs, vec![(1, 2)]);
    }

    #[test]
    fn stats_by_status_and_user() {
        let (_dir, conn) = fixture();
        let by_status = run_json(&conn, &["stats", "--json"]);
        let counts: Vec<i64> = by_status
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["count"].as_i64().unwrap())
            .collect();
        assert_eq!(counts, vec![1, 1, 1]);
        assert_eq!(by_status[1]["status"], "in progress");

        let by_user = run_json(&conn, &["stats", "--by", "user", "--json"]);
        let counts: Vec<(i64, i64)> = by_user
            .as_array()
            .unwrap()
            .iter()
            .map(|c| (c["id"].as_i64().unwrap(), c["count"].as_i64().unwrap()))
            .collect();
        assert_eq!(counts, vec![(1, 2), (2, 1), (3, 0)]);
    }

    #[test]
    fn rename_updates_user() {
        let (_dir, conn) = fixture();
        run_cmd(&conn, &["rename", "2", "Robert Roe"]).unwrap();
        assert_eq!(ops::get_user(&conn, 2).unwrap().unwrap().fullname, "Robert Roe");
        // missing user is a no-op
        run_cmd(&conn, &["rename", "9", "Nobody"]).unwrap();
    }

    #[test]
    fn statuses_lists_vocabulary() {
        let (_dir, conn) = temp_db();
        let out = run_cmd(&conn, &["statuses"]).unwrap();
        assert_eq!(out, "1 new\n2 in progress\n3 completed\n");
    }
}
