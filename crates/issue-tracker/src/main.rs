use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use issue_tracker::client::{Client, ClientError};
use issue_tracker::db::Db;
use issue_tracker::output::{self, OutputMode};
use issue_tracker::store::IssueStore;
use issue_tracker::types::{IssueFields, IssueFilter};

#[derive(Parser)]
#[command(name = "it", about = "Project-scoped issue tracker")]
struct Cli {
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP daemon
    Daemon {
        #[arg(long, env = "PORT", default_value_t = 3000)]
        port: u16,
        #[arg(long, env = "IT_DATA_DIR", default_value = ".issues")]
        data_dir: PathBuf,
        /// Keep issues in memory only; nothing is written to disk
        #[arg(long, default_value_t = false)]
        in_memory: bool,
        #[command(subcommand)]
        subcmd: Option<DaemonSubcommand>,
    },
    /// Create an issue in a project
    Create {
        project: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        text: String,
        #[arg(long = "by")]
        created_by: String,
        #[arg(short = 'a', long)]
        assignee: Option<String>,
        #[arg(long)]
        status: Option<String>,
    },
    /// List a project's issues, optionally filtered
    List {
        project: String,
        #[arg(long)]
        id: Option<String>,
        #[command(flatten)]
        fields: FieldArgs,
        #[arg(long)]
        open: Option<bool>,
    },
    /// Change fields of an issue
    Update {
        project: String,
        id: String,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// Permanently remove an issue
    Delete { project: String, id: String },
}

#[derive(Subcommand)]
enum DaemonSubcommand {
    Status,
}

#[derive(Args)]
struct FieldArgs {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    text: Option<String>,
    #[arg(long = "by")]
    created_by: Option<String>,
    #[arg(short = 'a', long)]
    assignee: Option<String>,
    #[arg(long)]
    status: Option<String>,
}

impl From<FieldArgs> for IssueFields {
    fn from(args: FieldArgs) -> Self {
        IssueFields {
            issue_title: args.title,
            issue_text: args.text,
            created_by: args.created_by,
            assigned_to: args.assignee,
            status_text: args.status,
        }
    }
}

fn fail(err: ClientError, mode: OutputMode) -> ! {
    output::print_error(&err, mode);
    process::exit(1);
}

fn run_daemon(port: u16, data_dir: PathBuf, in_memory: bool) -> Result<(), String> {
    let db = if in_memory {
        Db::open_in_memory()
    } else {
        Db::open(&data_dir)
    }
    .map_err(|e| e.to_string())?;

    match db.path() {
        Some(path) => tracing::info!("using database at {}", path.display()),
        None => tracing::info!("using in-memory database"),
    }
    let store: Arc<dyn IssueStore> = Arc::new(db);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| format!("failed to create tokio runtime: {e}"))?;
    rt.block_on(issue_tracker::daemon::start(port, store))
        .map_err(|e| format!("server error: {e}"))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    match cli.command {
        Commands::Daemon {
            port,
            data_dir,
            in_memory,
            subcmd,
        } => match subcmd {
            Some(DaemonSubcommand::Status) => {
                let client = Client::new();
                match client.check_reachable() {
                    Ok(()) => {
                        println!("daemon reachable at {}", client.base_url());
                        process::exit(0);
                    }
                    Err(e) => {
                        eprintln!("daemon unreachable: {e}");
                        process::exit(1);
                    }
                }
            }
            None => {
                if let Err(e) = run_daemon(port, data_dir, in_memory) {
                    tracing::error!("{e}");
                    process::exit(1);
                }
            }
        },

        Commands::Create {
            project,
            title,
            text,
            created_by,
            assignee,
            status,
        } => {
            let client = Client::new();
            let fields = IssueFields {
                issue_title: Some(title),
                issue_text: Some(text),
                created_by: Some(created_by),
                assigned_to: assignee,
                status_text: status,
            };
            match client.create_issue(&project, &fields) {
                Ok(v) => output::print_issue(&v, mode),
                Err(e) => fail(e, mode),
            }
        }

        Commands::List {
            project,
            id,
            fields,
            open,
        } => {
            let client = Client::new();
            let filter = IssueFilter {
                id,
                fields: fields.into(),
                open: open.map(|b| b.to_string()),
            };
            match client.list_issues(&project, &filter) {
                Ok(v) => output::print_issue_list(&v, mode),
                Err(e) => fail(e, mode),
            }
        }

        Commands::Update {
            project,
            id,
            fields,
        } => {
            let client = Client::new();
            match client.update_issue(&project, &id, &fields.into()) {
                Ok(v) => output::print_result(&v, mode),
                Err(e) => fail(e, mode),
            }
        }

        Commands::Delete { project, id } => {
            let client = Client::new();
            match client.delete_issue(&project, &id) {
                Ok(v) => output::print_result(&v, mode),
                Err(e) => fail(e, mode),
            }
        }
    }
}
