//! Helpdesk Control - CLI for bulk ticket creation
//!
//! Reads a spreadsheet into a local row store, previews the tickets it would
//! produce and submits them to the ticketing API.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use helpdesk_common::{
    BulkRequest, Config, FileRowStore, HttpTicketingClient, PreviewRequest,
    RecordingTicketingClient, TicketDraft, TicketingClient, VERSION,
};
use helpdeskctl::{commands, display};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "helpdeskctl")]
#[command(about = "Create helpdesk tickets from spreadsheet rows", long_about = None)]
#[command(version = VERSION)]
struct Cli {
    /// Config file (defaults to $HELPDESK_CONFIG or /etc/helpdesk/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Row store file
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Log progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the first worksheet of a spreadsheet into the row store
    Ingest {
        /// .xlsx file to read
        sheet: PathBuf,
    },

    /// Show the tickets the stored rows would produce
    Preview {
        #[arg(long)]
        title: String,

        #[arg(long)]
        description: String,

        /// Number of rows to show
        #[arg(long)]
        count: Option<usize>,

        /// First sheet row to consider
        #[arg(long, default_value_t = 1)]
        start: u32,

        /// Treat the first stored row as data
        #[arg(long)]
        include_header: bool,
    },

    /// Create one ticket per selected row, then clear the row store
    Submit {
        /// Requester e-mail
        #[arg(long)]
        requester: String,

        #[arg(long)]
        title: String,

        #[arg(long)]
        description: String,

        /// Maximum number of tickets
        #[arg(long)]
        count: usize,

        #[arg(long, default_value_t = 1)]
        start: u32,

        #[arg(long)]
        include_header: bool,

        /// Resolve every row without calling the ticketing API
        #[arg(long)]
        dry_run: bool,
    },

    /// Create a single ticket
    Ticket {
        #[arg(long)]
        requester: String,

        #[arg(long)]
        title: String,

        #[arg(long)]
        description: String,

        #[arg(long)]
        dry_run: bool,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn ticketing_client(config: &Config, dry_run: bool) -> Result<Arc<dyn TicketingClient>> {
    if dry_run {
        return Ok(Arc::new(RecordingTicketingClient::new()));
    }
    config.validate().context("Invalid configuration")?;
    let client = HttpTicketingClient::new(&config.ticketing)
        .context("Failed to build ticketing client")?;
    Ok(Arc::new(client))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let store = FileRowStore::new(
        cli.store
            .clone()
            .unwrap_or_else(|| config.storage.row_store_path.clone()),
    );
    let call_timeout = Duration::from_secs(config.ticketing.timeout_secs);

    match cli.command {
        Commands::Ingest { sheet } => {
            let rows = commands::ingest(&store, &sheet).await?;
            println!("Spreadsheet loaded: {} row(s) processed.", rows);
            if rows == 0 {
                println!("{}", "The first worksheet has no data.".yellow());
            }
        }
        Commands::Preview {
            title,
            description,
            count,
            start,
            include_header,
        } => {
            let req = PreviewRequest {
                title,
                description,
                count: Some(count.unwrap_or(config.bulk.default_preview_count)),
                start,
                skip_header: !include_header,
            };
            let orchestrator = commands::orchestrator(
                &store,
                Arc::new(RecordingTicketingClient::new()),
                call_timeout,
            );
            let preview = commands::preview(&orchestrator, &req).await?;
            print!("{}", display::format_preview(&preview));
        }
        Commands::Submit {
            requester,
            title,
            description,
            count,
            start,
            include_header,
            dry_run,
        } => {
            let req = BulkRequest {
                title,
                description,
                count,
                start,
                skip_header: !include_header,
            };
            let client = ticketing_client(&config, dry_run)?;
            let orchestrator = commands::orchestrator(&store, client, call_timeout);
            let result = commands::submit(&orchestrator, &requester, &req, dry_run).await?;
            print!("{}", display::format_result(&result));
            if dry_run {
                println!("{}", "Dry run: no tickets were sent.".dimmed());
            }
            if result.errors > 0 {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Ticket {
            requester,
            title,
            description,
            dry_run,
        } => {
            let client = ticketing_client(&config, dry_run)?;
            let draft = TicketDraft::new(requester, title, description);
            let receipt = commands::ticket(client.as_ref(), &draft).await?;
            println!("{} ticket created", "✓".green());
            if !dry_run {
                println!("{}", serde_json::to_string_pretty(&receipt.data)?);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
