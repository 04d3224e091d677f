// Prompt Minder server entry point: CLI commands and bootstrap only.
// Handlers, routes and team logic live in the library crate.

use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use dotenvy::{Error as DotenvError, dotenv, from_filename};
use minder_core::{config::AppConfig, db::Database};
use minder_server::{build_state, observability, router};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Prompt Minder team service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP server
    Serve,
    /// Run database migrations
    Migrate,
    /// Create the personal team for a user if it does not exist yet
    EnsurePersonalTeam(EnsurePersonalTeamArgs),
    /// Create a collaborative team owned by an existing user
    CreateTeam(CreateTeamArgs),
}

#[derive(Args, Debug)]
struct EnsurePersonalTeamArgs {
    /// User ID that owns the personal team
    #[arg(long = "user-id", value_name = "ID")]
    user_id: String,
}

#[derive(Args, Debug)]
struct CreateTeamArgs {
    /// Owner user ID
    #[arg(long = "owner-id", value_name = "ID")]
    owner_id: String,
    /// Display name for the team
    #[arg(long, value_name = "NAME")]
    name: String,
    /// Optional description
    #[arg(long, value_name = "TEXT")]
    description: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_status = load_env_file();
    observability::init_tracing();
    report_env_status(&env_status);

    let cli = Cli::parse();
    let config = AppConfig::load()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => run_serve(config).await,
        Command::Migrate => run_migrate(config).await,
        Command::EnsurePersonalTeam(args) => run_ensure_personal_team(config, args).await,
        Command::CreateTeam(args) => run_create_team(config, args).await,
    }
}

async fn run_serve(config: AppConfig) -> anyhow::Result<()> {
    info!(
        database_path = %config.database_path,
        database_max_connections = config.database_max_connections,
        max_owned_teams = config.max_owned_teams,
        "Starting server with database configuration"
    );

    let database = Database::connect(&config).await?;
    let state = build_state(&database, &config);
    info!(
        version = %state.metadata.version,
        message = %state.metadata.message,
        "Loaded server metadata"
    );

    let app = router::build_router(state);
    let listener = TcpListener::bind(config.bind_address)
        .await
        .context("failed to bind socket")?;
    let actual_addr = listener
        .local_addr()
        .context("failed to read local address")?;
    info!("listening on {actual_addr}");

    if let Err(error) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(?error, "server terminated with error");
    }

    Ok(())
}

async fn run_migrate(config: AppConfig) -> anyhow::Result<()> {
    let database = Database::connect(&config).await?;
    info!(
        database_path = %database.database_path().display(),
        "migrations completed"
    );
    Ok(())
}

async fn run_ensure_personal_team(
    config: AppConfig,
    args: EnsurePersonalTeamArgs,
) -> anyhow::Result<()> {
    let user_id = args.user_id.trim();
    if user_id.is_empty() {
        bail!("user-id must not be empty");
    }

    let database = Database::connect(&config).await?;
    let state = build_state(&database, &config);
    let team = state
        .team_service
        .ensure_personal_team(user_id)
        .await
        .map_err(|err| anyhow!("failed to ensure personal team: {err}"))?;

    info!(team_id = %team.id, user_id, "personal team ready");
    println!("Personal team {} ready for user {}", team.id, user_id);
    Ok(())
}

async fn run_create_team(config: AppConfig, args: CreateTeamArgs) -> anyhow::Result<()> {
    let CreateTeamArgs {
        owner_id,
        name,
        description,
    } = args;

    let owner_id = owner_id.trim();
    if owner_id.is_empty() {
        bail!("owner-id must not be empty");
    }
    let trimmed_name = name.trim();
    if trimmed_name.is_empty() {
        bail!("team name must not be empty");
    }

    let database = Database::connect(&config).await?;
    let state = build_state(&database, &config);
    let team = state
        .team_service
        .create_team(owner_id, trimmed_name, description.as_deref(), None)
        .await
        .map_err(|err| anyhow!("failed to create team: {err}"))?;

    info!(
        team_id = %team.id,
        owner_id = %team.owner_id,
        "created team"
    );
    println!(
        "Created team '{}' ({}) for owner {}",
        team.name, team.id, team.owner_id
    );
    Ok(())
}

enum EnvLoadStatus {
    Loaded(PathBuf),
    NotFound,
    Failed(DotenvError),
}

fn load_env_file() -> EnvLoadStatus {
    if let Ok(env_file) = std::env::var("MINDER_ENV_FILE") {
        let trimmed = env_file.trim();
        if !trimmed.is_empty() {
            let path = PathBuf::from(trimmed);
            return match from_filename(&path) {
                Ok(_) => {
                    let display_path = make_relative(&path).unwrap_or_else(|| path.clone());
                    EnvLoadStatus::Loaded(display_path)
                }
                Err(err) => EnvLoadStatus::Failed(err),
            };
        }
    }

    match dotenv() {
        Ok(path) => {
            let display_path = make_relative(&path).unwrap_or_else(|| path.clone());
            EnvLoadStatus::Loaded(display_path)
        }
        Err(DotenvError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
            EnvLoadStatus::NotFound
        }
        Err(err) => EnvLoadStatus::Failed(err),
    }
}

fn report_env_status(status: &EnvLoadStatus) {
    match status {
        EnvLoadStatus::Loaded(path) => {
            info!("Loaded environment variables from {}", path.display());
        }
        EnvLoadStatus::NotFound => {
            info!("No .env file found; using process environment only");
        }
        EnvLoadStatus::Failed(err) => {
            warn!("Failed to load .env file: {err:?}");
        }
    }
}

fn make_relative(path: &Path) -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    path.strip_prefix(&cwd).map(|p| p.to_path_buf()).ok()
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut term), Ok(mut int)) => {
                tokio::select! {
                    _ = term.recv() => {},
                    _ = int.recv() => {},
                }
            }
            (Err(err), _) | (_, Err(err)) => {
                warn!(?err, "failed to install signal handlers; falling back to ctrl-c");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
