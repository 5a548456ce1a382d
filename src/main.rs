mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use issuehub::api::{ApiClient, DEFAULT_API_URL};
use issuehub::notify::{NotificationKind, NotificationQueue};
use issuehub::query::DEFAULT_PAGE_SIZE;
use issuehub::session::{default_state_dir, SessionStore};

#[derive(Parser)]
#[command(name = "issuehub")]
#[command(about = "A terminal client for the IssueHub issue tracker")]
#[command(version)]
struct Cli {
    /// Base URL of the IssueHub API
    #[arg(long, env = "ISSUEHUB_API_URL", default_value = DEFAULT_API_URL, global = true)]
    api_url: String,

    /// Directory holding client state (session database)
    #[arg(long, env = "ISSUEHUB_STATE_DIR", global = true)]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and start a session
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Log in with an existing account
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Discard the stored session
    Logout,

    /// Show the currently authenticated user
    Whoami,

    /// Project listing and creation
    Projects {
        #[command(subcommand)]
        action: ProjectCommands,
    },

    /// Browse and mutate a project's issues
    Issues {
        #[command(subcommand)]
        action: IssueCommands,
    },

    /// Add a comment to an issue
    Comment {
        /// Issue ID
        issue: i64,
        /// Comment text
        text: String,
    },

    /// Team membership management
    Team {
        #[command(subcommand)]
        action: TeamCommands,
    },
}

#[derive(Subcommand)]
enum ProjectCommands {
    /// List your projects
    List,

    /// Create a project
    Create {
        #[arg(long)]
        name: String,
        /// Short unique project key
        #[arg(long)]
        key: String,
        #[arg(short, long)]
        description: Option<String>,
    },
}

#[derive(Subcommand)]
enum IssueCommands {
    /// List a project's issues
    List {
        /// Project ID
        project: i64,
        /// Match against issue titles
        #[arg(short, long)]
        search: Option<String>,
        /// Filter by status (open, in_progress, resolved, closed)
        #[arg(long)]
        status: Option<String>,
        /// Filter by priority (low, medium, high, critical)
        #[arg(short, long)]
        priority: Option<String>,
        /// Filter by assignee user id
        #[arg(short, long)]
        assignee: Option<String>,
        /// Sort key (created_at, priority, status)
        #[arg(long, default_value = "created_at")]
        sort: String,
        /// Zero-based page index
        #[arg(long, default_value_t = 0)]
        page: usize,
        /// Issues per page
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: usize,
    },

    /// Create an issue (maintainers only)
    Create {
        /// Project ID
        project: i64,
        #[arg(long)]
        title: String,
        #[arg(short, long)]
        description: Option<String>,
        /// Priority (low, medium, high, critical)
        #[arg(short, long, default_value = "medium")]
        priority: String,
        /// Assignee user id; empty for unassigned
        #[arg(short, long)]
        assignee: Option<String>,
    },

    /// Show issue details and comments
    Show {
        /// Issue ID
        id: i64,
    },

    /// Change status or assignee (maintainers only)
    Update {
        /// Issue ID
        id: i64,
        /// New status (open, in_progress, resolved, closed)
        #[arg(long)]
        status: Option<String>,
        /// New assignee user id; empty to unassign
        #[arg(short, long)]
        assignee: Option<String>,
    },
}

#[derive(Subcommand)]
enum TeamCommands {
    /// List a project's members
    List {
        /// Project ID
        project: i64,
    },

    /// Invite an existing user by email (maintainers only)
    Add {
        /// Project ID
        project: i64,
        #[arg(long)]
        email: String,
        /// Role (member, maintainer)
        #[arg(short, long, default_value = "member")]
        role: String,
    },

    /// Create a new user and add them to the team (maintainers only)
    Onboard {
        /// Project ID
        project: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// Temporary password for the new account
        #[arg(long)]
        password: String,
        /// Role (member, maintainer)
        #[arg(short, long, default_value = "member")]
        role: String,
    },

    /// Change a member's role (maintainers only)
    SetRole {
        /// Project ID
        project: i64,
        /// User ID
        user: i64,
        /// Role (member, maintainer)
        #[arg(long)]
        role: String,
    },

    /// Remove a member from the team (maintainers only)
    Remove {
        /// Project ID
        project: i64,
        /// User ID
        user: i64,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let notifier = NotificationQueue::new();

    let result = run(cli, &notifier).await;
    if let Err(err) = &result {
        notifier.push(err.to_string(), NotificationKind::Error);
    }
    for note in notifier.active() {
        eprintln!("[{}] {}", note.kind, note.message);
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}

async fn run(cli: Cli, notifier: &NotificationQueue) -> Result<()> {
    let state_dir = match cli.state_dir {
        Some(dir) => dir,
        None => default_state_dir()?,
    };
    let session = SessionStore::open(&state_dir.join("session.db"))?;
    let client = ApiClient::new(&cli.api_url, session)?;

    match cli.command {
        Commands::Signup {
            name,
            email,
            password,
        } => commands::account::signup(&client, notifier, &name, &email, &password).await,

        Commands::Login { email, password } => {
            commands::account::login(&client, notifier, &email, &password).await
        }

        Commands::Logout => commands::account::logout(&client),

        Commands::Whoami => commands::account::whoami(&client).await,

        Commands::Projects { action } => match action {
            ProjectCommands::List => commands::projects::list(&client).await,
            ProjectCommands::Create {
                name,
                key,
                description,
            } => commands::projects::create(&client, notifier, &name, &key, description).await,
        },

        Commands::Issues { action } => match action {
            IssueCommands::List {
                project,
                search,
                status,
                priority,
                assignee,
                sort,
                page,
                page_size,
            } => {
                let options = commands::issues::ListOptions {
                    search,
                    status,
                    priority,
                    assignee,
                    sort,
                    page,
                    page_size,
                };
                commands::issues::list(&client, project, options).await
            }
            IssueCommands::Create {
                project,
                title,
                description,
                priority,
                assignee,
            } => {
                commands::issues::create(
                    &client,
                    notifier,
                    project,
                    &title,
                    description,
                    &priority,
                    assignee.as_deref(),
                )
                .await
            }
            IssueCommands::Show { id } => commands::issues::show(&client, id).await,
            IssueCommands::Update {
                id,
                status,
                assignee,
            } => {
                commands::issues::update(
                    &client,
                    notifier,
                    id,
                    status.as_deref(),
                    assignee.as_deref(),
                )
                .await
            }
        },

        Commands::Comment { issue, text } => {
            commands::comment::run(&client, notifier, issue, &text).await
        }

        Commands::Team { action } => match action {
            TeamCommands::List { project } => commands::team::list(&client, project).await,
            TeamCommands::Add {
                project,
                email,
                role,
            } => commands::team::add(&client, notifier, project, &email, &role).await,
            TeamCommands::Onboard {
                project,
                name,
                email,
                password,
                role,
            } => {
                commands::team::onboard(
                    &client,
                    notifier,
                    project,
                    &name,
                    &email,
                    &password,
                    &role,
                )
                .await
            }
            TeamCommands::SetRole {
                project,
                user,
                role,
            } => commands::team::set_role(&client, notifier, project, user, &role).await,
            TeamCommands::Remove { project, user } => {
                commands::team::remove(&client, notifier, project, user).await
            }
        },
    }
}
