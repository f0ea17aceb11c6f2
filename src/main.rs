//! # Taskboard
//!
//! A project and task tracker for managers and employees, usable from the
//! command line or an interactive terminal dashboard.
//!
//! ## Usage
//!
//! ### Interactive Mode (TUI)
//!
//! Run without arguments to open the sign-in screen:
//!
//! ```bash
//! taskboard
//! # or explicitly
//! taskboard ui
//! ```
//!
//! Managers land on the dashboard with every project's tasks; employees land
//! on their own tasks and can switch to the list of unassigned ones.
//!
//! #### TUI Key Bindings
//!
//! *   `Tab`: Next login field / switch My and Available tasks
//! *   `c`: Claim selected task (employees)
//! *   `+` / `-`: Move progress by 10%
//! *   `m`: Comment on selected task
//! *   `o`: Sign out
//! *   `q`: Quit
//!
//! ### Command Line Interface (CLI)
//!
//! ```bash
//! taskboard login manager --password manager123 --role manager
//! taskboard project add "Website" --start 2025-03-01 --end 2025-06-30
//! taskboard task add Website "Landing page" --price 1200 --hours 16 --assign anna@example.com
//! taskboard export csv report.csv
//! taskboard user share https://board.example.com/login
//! ```
//!
//! Two accounts always work, even on empty storage:
//! `manager` / `manager123` and `employee` / `employee123`.
//!
//! ## Data Storage
//!
//! One JSON file per key (`users.json`, `projects.json`, `user.json`) in
//! your local data directory:
//! *   Linux: `~/.local/share/taskboard/`
//! *   macOS: `~/Library/Application Support/taskboard/`
//! *   Windows: `%APPDATA%\taskboard\`
//!
//! Override with the `TASKBOARD_DIR` environment variable. Set `RUST_LOG`
//! (for example `RUST_LOG=taskboard=debug`) to see storage activity.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use taskboard::commands::*;
use taskboard::config::Config;
use taskboard::models::Role;
use taskboard::tui::run_tui;
use taskboard::Board;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "taskboard")]
#[command(about = "Project and task tracker for managers and employees", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in
    Login {
        /// Email or display name
        username: String,
        #[arg(short, long)]
        password: String,
        #[arg(short, long, value_enum, default_value_t = Role::Employee)]
        role: Role,
    },
    /// Sign out
    Logout,
    /// Show the signed-in account
    Whoami,
    /// Manage accounts
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Manage projects
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },
    /// Manage and work on tasks
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },
    /// Export data
    Export {
        #[command(subcommand)]
        command: ExportCommands,
    },
    /// Merge a JSON backup into storage
    Import {
        path: PathBuf,
    },
    /// Copy data to or from the cloud backup slot
    Cloud {
        #[command(subcommand)]
        command: CloudCommands,
    },
    /// Run storage self-checks
    Check,
    /// Delete all stored data
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell, elvish)
        shell: String,
    },
    /// Open interactive TUI
    Ui,
}

#[derive(Subcommand)]
enum UserCommands {
    /// Add an account
    Add {
        name: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
        #[arg(short, long, value_enum, default_value_t = Role::Employee)]
        role: Role,
    },
    /// List accounts
    List,
    /// Remove an account
    Remove {
        id: String,
    },
    /// Print a link that carries every account
    Share {
        /// Page the link should open, e.g. https://board.example.com/login
        base_url: String,
        /// Include passwords in the payload
        #[arg(long)]
        with_passwords: bool,
    },
    /// Merge accounts from a share link
    Import {
        link: String,
    },
}

#[derive(Subcommand)]
enum ProjectCommands {
    /// Add a project
    Add {
        name: String,
        #[arg(short, long)]
        description: Option<String>,
        /// Start date in YYYY-MM-DD
        #[arg(short, long)]
        start: Option<String>,
        /// End date in YYYY-MM-DD
        #[arg(short, long)]
        end: Option<String>,
    },
    /// List projects
    List,
    /// Edit a project
    Edit {
        /// Project id, id prefix or name
        project: String,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long)]
        start: Option<String>,
        #[arg(short, long)]
        end: Option<String>,
    },
    /// Remove a project and its tasks
    Remove {
        project: String,
    },
    /// Print a link that carries every project
    Share {
        base_url: String,
    },
    /// Merge projects from a share link
    Import {
        link: String,
    },
}

#[derive(clap::Args)]
struct TaskFields {
    #[arg(short, long)]
    description: Option<String>,
    #[arg(long)]
    price: Option<f64>,
    /// Estimated hours
    #[arg(short = 'H', long)]
    hours: Option<f64>,
    /// Start date in YYYY-MM-DD
    #[arg(short, long)]
    start: Option<String>,
    /// End date in YYYY-MM-DD
    #[arg(short, long)]
    end: Option<String>,
    /// Assignee id, email or name (repeatable)
    #[arg(short, long = "assign")]
    assign: Vec<String>,
    /// Percent complete, 0-100
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    progress: Option<u8>,
}

impl TaskFields {
    fn into_args(self, name: Option<String>) -> TaskArgs {
        TaskArgs {
            name,
            description: self.description,
            price: self.price,
            hours: self.hours,
            start: self.start,
            end: self.end,
            assignees: self.assign,
            progress: self.progress,
        }
    }
}

#[derive(Subcommand)]
enum TaskCommands {
    /// Add a task to a project
    Add {
        /// Project id, id prefix or name
        project: String,
        name: String,
        /// Use this id instead of a generated one
        #[arg(long)]
        id: Option<String>,
        #[command(flatten)]
        fields: TaskFields,
    },
    /// List tasks
    List {
        /// Only this project
        #[arg(short, long)]
        project: Option<String>,
    },
    /// Show a task with its comments
    Show {
        task: String,
    },
    /// Edit a task
    Edit {
        task: String,
        #[arg(short, long)]
        name: Option<String>,
        #[command(flatten)]
        fields: TaskFields,
    },
    /// Remove a task
    Remove {
        task: String,
    },
    /// Report progress (0-100)
    Progress {
        task: String,
        #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
        percent: u8,
    },
    /// Take an unassigned task
    Claim {
        task: String,
    },
    /// Comment on a task
    Comment {
        task: String,
        text: String,
    },
    /// List unassigned tasks
    Available,
    /// List tasks assigned to me
    Mine,
}

#[derive(Subcommand)]
enum ExportCommands {
    /// Semicolon-separated report of every task
    Csv {
        path: PathBuf,
    },
    /// Full JSON backup of users and projects
    Backup {
        path: PathBuf,
    },
}

#[derive(Subcommand)]
enum CloudCommands {
    /// Copy users and projects to the backup slot
    Backup,
    /// Merge the backup slot into storage
    Restore,
}

/// Logs go to stderr so tables on stdout stay clean.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(board: &Board, command: Option<Commands>) -> taskboard::Result<()> {
    match command {
        Some(Commands::Login { username, password, role }) => cmd_login(board, &username, &password, role, false).map(drop),
        Some(Commands::Logout) => cmd_logout(board, false),
        Some(Commands::Whoami) => cmd_whoami(board),
        Some(Commands::User { command }) => match command {
            UserCommands::Add { name, email, password, role } => cmd_user_add(board, name, email, password, role, false).map(drop),
            UserCommands::List => cmd_user_list(board),
            UserCommands::Remove { id } => cmd_user_remove(board, &id, false),
            UserCommands::Share { base_url, with_passwords } => cmd_user_share(board, &base_url, with_passwords).map(drop),
            UserCommands::Import { link } => cmd_user_import(board, &link, false).map(drop),
        },
        Some(Commands::Project { command }) => match command {
            ProjectCommands::Add { name, description, start, end } => cmd_project_add(board, name, description, start, end, false).map(drop),
            ProjectCommands::List => cmd_project_list(board),
            ProjectCommands::Edit { project, name, description, start, end } => {
                cmd_project_edit(board, &project, name, description, start, end, false).map(drop)
            }
            ProjectCommands::Remove { project } => cmd_project_remove(board, &project, false),
            ProjectCommands::Share { base_url } => cmd_project_share(board, &base_url).map(drop),
            ProjectCommands::Import { link } => cmd_project_import(board, &link, false).map(drop),
        },
        Some(Commands::Task { command }) => match command {
            TaskCommands::Add { project, name, id, fields } => {
                cmd_task_add(board, &project, id, fields.into_args(Some(name)), false).map(drop)
            }
            TaskCommands::List { project } => cmd_task_list(board, project),
            TaskCommands::Show { task } => cmd_task_show(board, &task),
            TaskCommands::Edit { task, name, fields } => cmd_task_edit(board, &task, fields.into_args(name), false).map(drop),
            TaskCommands::Remove { task } => cmd_task_remove(board, &task, false),
            TaskCommands::Progress { task, percent } => cmd_task_progress(board, &task, percent, false).map(drop),
            TaskCommands::Claim { task } => cmd_task_claim(board, &task, false).map(drop),
            TaskCommands::Comment { task, text } => cmd_task_comment(board, &task, &text, false),
            TaskCommands::Available => cmd_task_available(board),
            TaskCommands::Mine => cmd_task_mine(board),
        },
        Some(Commands::Export { command }) => match command {
            ExportCommands::Csv { path } => cmd_export_csv(board, &path, false),
            ExportCommands::Backup { path } => cmd_export_backup(board, &path, false),
        },
        Some(Commands::Import { path }) => cmd_import_backup(board, &path, false).map(drop),
        Some(Commands::Cloud { command }) => match command {
            CloudCommands::Backup => cmd_cloud_backup(board, false),
            CloudCommands::Restore => cmd_cloud_restore(board, false).map(drop),
        },
        Some(Commands::Check) => {
            if cmd_check(board)? {
                Ok(())
            } else {
                Err(taskboard::Error::Validation("storage self-check failed".to_string()))
            }
        }
        Some(Commands::Reset { force }) => cmd_reset(board, force),
        Some(Commands::Completions { shell }) => {
            let shell_enum = match shell.as_str() {
                "bash" => Shell::Bash,
                "zsh" => Shell::Zsh,
                "fish" => Shell::Fish,
                "powershell" => Shell::PowerShell,
                "elvish" => Shell::Elvish,
                _ => {
                    eprintln!("Unsupported shell: {}", shell);
                    return Ok(());
                }
            };
            let mut cmd = Cli::command();
            generate(shell_enum, &mut cmd, "taskboard", &mut io::stdout());
            Ok(())
        }
        Some(Commands::Ui) | None => {
            if let Err(e) = run_tui(board) {
                eprintln!("Error running TUI: {}", e);
            }
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let board = Board::open(&Config::from_env());
    match run(&board, cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
