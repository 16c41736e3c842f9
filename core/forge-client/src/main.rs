//! skillforge: headless SkillForge client.
//!
//! Restores the signed-in session from local storage, polls conversations and
//! reports new messages, applying the same route guards as the web client.
//!
//! ## Subcommands
//!
//! - `watch`: Run the polling runtime; reads commands from stdin
//! - `login`: Store an issued token and validate it
//! - `logout`: Forget the stored token
//! - `status`: Restore the session and print a summary
//! - `open`: Resolve a route through the guards and remember it

mod context;
mod http;
mod logging;
mod oneshot;
mod render;
mod watch;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use context::{resolve_storage, ClientContext};
use render::Renderer;

#[derive(Parser)]
#[command(name = "skillforge")]
#[command(about = "Headless SkillForge client")]
#[command(version)]
struct Cli {
    /// Storage root (defaults to $SKILLFORGE_HOME or ~/.skillforge)
    #[arg(long, global = true, value_name = "DIR")]
    home: Option<PathBuf>,

    /// API base URL (overrides client.toml and $SKILLFORGE_API_URL)
    #[arg(long, global = true, value_name = "URL")]
    api_url: Option<String>,

    /// Print JSON lines instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll conversations and print notifications until stdin closes
    Watch,

    /// Sign in with a token issued by the server
    Login {
        #[arg(long)]
        token: String,
    },

    /// Sign out and clear the stored token
    Logout,

    /// Print session and conversation summary
    Status,

    /// Navigate to a route as the web client would
    Open {
        #[arg(value_name = "PATH")]
        path: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let storage = match resolve_storage(cli.home.clone()) {
        Ok(storage) => storage,
        Err(err) => {
            eprintln!("skillforge: {}", err);
            std::process::exit(1);
        }
    };
    let _logging_guard = logging::init(Some(&storage.logs_dir()));

    if let Err(err) = run(cli, storage) {
        tracing::error!(error = %err, "skillforge failed");
        std::process::exit(1);
    }
}

fn run(cli: Cli, storage: skillforge_core::StorageConfig) -> Result<(), String> {
    let ctx = ClientContext::load(storage, cli.api_url)?;
    let renderer = Renderer::new(cli.json);

    match cli.command {
        Commands::Watch => watch::run(&ctx, renderer)?,
        Commands::Login { token } => {
            let status = oneshot::login(&ctx, &token)?;
            renderer.status(&status);
        }
        Commands::Logout => {
            oneshot::logout(&ctx);
            renderer.message("Signed out");
        }
        Commands::Status => renderer.status(&oneshot::status(&ctx)),
        Commands::Open { path } => renderer.navigation(&oneshot::open(&ctx, &path)),
    }
    Ok(())
}
