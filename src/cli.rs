use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "taskdb", about = "Users, statuses and tasks over SQLite")]
pub struct Cli {
    /// Path to the SQLite database [default: ~/.taskdb/taskdb.db]
    #[arg(long, env = "TASKDB_DB", global = true)]
    pub db: Option<String>,

    /// Path to the config file [default: ~/.taskdb/config.toml]
    #[arg(long, env = "TASKDB_CONFIG", global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum CountBy {
    #[default]
    Status,
    User,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create database, tables and statuses (idempotent)
    Init,

    /// Fill the database with generated users and tasks
    Seed {
        /// Number of users to generate
        #[arg(long)]
        users: Option<usize>,
        /// Number of tasks to generate
        #[arg(long)]
        tasks: Option<usize>,
        /// RNG seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Add a task
    Add {
        /// Task title
        title: String,
        /// Owning user id
        #[arg(short, long)]
        user: i64,
        /// Task description
        #[arg(short, long)]
        desc: Option<String>,
        /// Status name or id
        #[arg(short, long, default_value = "new")]
        status: String,
        /// Output the created task as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show task details
    Show {
        /// Task id
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change a task's status
    Status {
        /// Task id
        id: i64,
        /// New status name or id (new, in-progress, completed)
        status: String,
    },

    /// Remove a task
    Rm {
        /// Task id
        id: i64,
    },

    /// List tasks
    List {
        /// Only tasks owned by this user id
        #[arg(long, conflicts_with_all = ["status", "incomplete", "no_desc"])]
        user: Option<i64>,
        /// Only tasks with this status name
        #[arg(long, conflicts_with_all = ["incomplete", "no_desc"])]
        status: Option<String>,
        /// Only tasks that are not completed
        #[arg(long, conflicts_with = "no_desc")]
        incomplete: bool,
        /// Only tasks with a null or empty description
        #[arg(long)]
        no_desc: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List users paired with their in-progress tasks
    InProgress {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List tasks whose owner's email contains a domain
    Domain {
        /// Domain or any email substring, e.g. @example.com
        domain: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List users
    Users {
        /// Only users without tasks
        #[arg(long, conflicts_with_all = ["email", "like"])]
        idle: bool,
        /// Exact email
        #[arg(long, conflicts_with = "like")]
        email: Option<String>,
        /// SQL LIKE pattern on email, e.g. %@example.com
        #[arg(long)]
        like: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add a user
    UserAdd {
        /// Full name
        fullname: String,
        /// Email address (unique)
        email: String,
    },

    /// Change a user's full name
    Rename {
        /// User id
        id: i64,
        /// New full name
        fullname: String,
    },

    /// Count tasks per status or per user
    Stats {
        #[arg(long, value_enum, default_value_t = CountBy::Status)]
        by: CountBy,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the status vocabulary
    Statuses,
}
