use clap::{Parser, Subcommand};
use fieldmark::cli::commands;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fieldmark")]
#[command(author, version, about = "Record GPS field points and sync area sessions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Storage bucket holding session documents
    #[arg(short, long, global = true, env = "FIELDMARK_BUCKET", default_value = "fieldmark-sessions")]
    bucket: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Authentication commands
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Session commands
    Sessions {
        #[command(subcommand)]
        command: SessionCommands,
    },
}

#[derive(Subcommand)]
enum AuthCommands {
    /// Store an identity for storage requests
    Login {
        /// User id that keys the per-user storage layout
        #[arg(long)]
        uid: String,
        /// Bearer token for the object store
        #[arg(long, env = "FIELDMARK_TOKEN")]
        token: String,
    },
    /// Remove the stored identity
    Logout,
    /// Show the stored identity
    Status,
}

#[derive(Subcommand)]
enum SessionCommands {
    /// List saved sessions
    List,
    /// Save a new session from a JSON points file
    Save {
        /// Session name
        #[arg(long)]
        name: String,
        /// Path to a JSON array of recorded points
        #[arg(long)]
        points: PathBuf,
        /// Enclosed area in square meters
        #[arg(long, default_value_t = 0.0)]
        area: f64,
    },
    /// Load and print a session
    Show { id: String },
    /// Rename a session
    Rename { id: String, new_name: String },
    /// Delete a session
    Delete {
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Remove a stale index entry whose session blob is gone
    Repair { id: String },
    /// Delete all sessions
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> fieldmark::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Auth { command } => match command {
            AuthCommands::Login { uid, token } => commands::auth::login(uid, token).await,
            AuthCommands::Logout => commands::auth::logout().await,
            AuthCommands::Status => commands::auth::status().await,
        },
        Commands::Sessions { command } => match command {
            SessionCommands::List => commands::sessions::list(&cli.bucket).await,
            SessionCommands::Save { name, points, area } => {
                commands::sessions::save(&cli.bucket, name, &points, area).await
            }
            SessionCommands::Show { id } => commands::sessions::show(&cli.bucket, id).await,
            SessionCommands::Rename { id, new_name } => {
                commands::sessions::rename(&cli.bucket, id, new_name).await
            }
            SessionCommands::Delete { id, yes } => {
                commands::sessions::delete(&cli.bucket, id, yes).await
            }
            SessionCommands::Repair { id } => commands::sessions::repair(&cli.bucket, id).await,
            SessionCommands::Clear { yes } => commands::sessions::clear(&cli.bucket, yes).await,
        },
    }
}
