//! huddle - ad-hoc chat rooms over WebSockets.
//!
//! ```bash
//! huddle serve --config config.toml
//! huddle register -u alice -p password123 --url http://127.0.0.1:8000
//! huddle create lobby -u alice -p password123
//! huddle rooms
//! huddle join lobby -u alice -p password123 --url ws://127.0.0.1:8000/ws
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::info;

use huddle::client::{ApiClient, ChatClient, ClientError};
use huddle::web::WebServer;
use huddle::{Config, Database};

type CliResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;

const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

#[derive(Parser)]
#[command(name = "huddle", version, about = "Ad-hoc chat rooms over WebSockets")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the chat server.
    Serve {
        #[arg(long, default_value = "config.toml")]
        config: PathBuf,
    },
    /// Register an account.
    Register {
        #[arg(short, long)]
        username: String,
        #[arg(short, long, env = "HUDDLE_PASSWORD")]
        password: String,
        #[arg(long, default_value = DEFAULT_API_URL)]
        url: String,
    },
    /// Record a room so it can be joined when registered rooms are required.
    Create {
        room_id: String,
        #[arg(short, long)]
        username: String,
        #[arg(short, long, env = "HUDDLE_PASSWORD")]
        password: String,
        #[arg(long, default_value = DEFAULT_API_URL)]
        url: String,
    },
    /// List rooms and how many people are in them.
    Rooms {
        #[arg(long, default_value = DEFAULT_API_URL)]
        url: String,
    },
    /// Join a room and chat from the terminal.
    Join {
        room_id: String,
        #[arg(short, long)]
        username: String,
        #[arg(short, long, env = "HUDDLE_PASSWORD")]
        password: String,
        #[arg(long, default_value = "ws://127.0.0.1:8000/ws")]
        url: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = runtime.block_on(run(cli)) {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn run(cli: Cli) -> CliResult<()> {
    if !matches!(cli.command, Command::Serve { .. }) {
        huddle::logging::init_console_only("warn");
    }

    match cli.command {
        Command::Serve { config } => serve(&config).await,
        Command::Register {
            username,
            password,
            url,
        } => {
            let account = ApiClient::new(&url)?.register(&username, &password).await?;
            println!("Registered {} (id {})", account.username, account.id);
            Ok(())
        }
        Command::Create {
            room_id,
            username,
            password,
            url,
        } => {
            let api = ApiClient::new(&url)?;
            match api.create_room(&username, &password, &room_id).await {
                Ok(room) => println!("Created room {}", room.room_id),
                Err(ClientError::Api { status: 409, .. }) => {
                    println!("Room {} already exists", room_id.trim())
                }
                Err(e) => return Err(e.into()),
            }
            Ok(())
        }
        Command::Rooms { url } => {
            let rooms = ApiClient::new(&url)?.list_rooms().await?;
            if rooms.is_empty() {
                println!("No rooms yet. Create one with `huddle create`.");
            }
            for room in rooms {
                println!("{} ({} online)", room.room_id, room.member_count);
            }
            Ok(())
        }
        Command::Join {
            room_id,
            username,
            password,
            url,
        } => {
            let client = ChatClient::connect(&url, &username, &password, &room_id).await?;
            println!(
                "Joined {} ({} online: {})",
                client.room_id(),
                client.members().len(),
                client.members().join(", ")
            );
            client.run_interactive().await?;
            Ok(())
        }
    }
}

fn load_config(path: &Path) -> Config {
    match Config::load_with_env(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {e}", path.display());
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    }
}

async fn serve(path: &Path) -> CliResult<()> {
    let config = load_config(path);
    config.validate()?;

    if let Err(e) = huddle::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        huddle::logging::init_console_only(&config.logging.level);
    }

    info!("Huddle chat server");
    let db = Database::open(&config.database.path).await?;
    let server = WebServer::bind(&config, db).await?;
    server
        .run_until(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown requested");
            }
        })
        .await?;
    Ok(())
}
