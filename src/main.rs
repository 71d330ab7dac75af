// src/main.rs

use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::FmtSubscriber;

use taskbot::api;
use taskbot::config::TrackerConfig;
use taskbot::db::Database;
use taskbot::notify::{Notifier, TelegramNotifier};
use taskbot::project::NewProject;
use taskbot::project::validate_project_name;
use taskbot::reminders::{ReminderEngine, ReminderScheduler};
use taskbot::state::AppState;
use taskbot::timezone::now_local;

#[derive(Parser)]
#[command(name = "taskbot", version, about = "Telegram project and task tracker")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the reminder scheduler and the admin API
    Serve,
    /// Apply database migrations and exit
    Migrate,
    /// Create a project owned by an existing user
    CreateProject {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Telegram id of the owner
        #[arg(long)]
        owner: i64,
        /// Also create the starter role hierarchy
        #[arg(long)]
        default_roles: bool,
    },
    /// Send reminders now
    Remind {
        /// Remind this project regardless of its schedule; otherwise run one normal tick
        #[arg(long)]
        project: Option<i64>,
    },
    /// Grant or revoke the admin flag
    SetAdmin {
        telegram_id: i64,
        #[arg(long)]
        revoke: bool,
    },
}

/// Graceful shutdown signal handler for SIGTERM and Ctrl+C
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = TrackerConfig::from_env().context("failed to load configuration")?;

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.logging.tracing_level())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let db = Database::connect(&config.database).await?;
    db.migrate().await?;

    let result = run(cli.command, &config, &db).await;
    db.close().await;
    result
}

async fn run(command: Command, config: &TrackerConfig, db: &Database) -> anyhow::Result<()> {
    let notifier: Arc<dyn Notifier> = Arc::new(TelegramNotifier::new(&config.telegram));

    match command {
        Command::Serve => serve(config, db, notifier).await,
        Command::Migrate => Ok(()),
        Command::CreateProject {
            name,
            description,
            owner,
            default_roles,
        } => {
            validate_project_name(&name)?;

            let mut uow = db.begin().await?;
            if uow.users().get_by_telegram_id(owner).await?.is_none() {
                bail!("user {owner} is not registered; they need to send /start to the bot first");
            }

            let project = uow
                .projects()
                .create(&NewProject {
                    name,
                    description,
                    created_by: owner,
                    reminders: config.reminders.settings()?,
                })
                .await?;
            let roles = if default_roles {
                uow.roles().create_default_set(project.id).await?
            } else {
                Vec::new()
            };
            uow.commit().await?;

            println!("Created project #{} \"{}\"", project.id, project.name);
            for role in roles {
                println!("  role #{} {} (level {})", role.id, role.name, role.level);
            }
            Ok(())
        }
        Command::Remind { project } => {
            let engine = ReminderEngine::new(db.clone(), notifier);
            match project {
                Some(project_id) => {
                    let sent = engine.send_project_reminders(project_id, now_local()).await?;
                    println!("Sent {sent} reminder(s) for project #{project_id}");
                }
                None => {
                    let report = engine.tick().await?;
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
            }
            Ok(())
        }
        Command::SetAdmin { telegram_id, revoke } => {
            let mut uow = db.begin().await?;
            let Some(user) = uow.users().set_admin(telegram_id, !revoke).await? else {
                bail!("user {telegram_id} is not registered");
            };
            uow.commit().await?;
            println!("{} admin: {}", user.mention(), user.is_admin);
            Ok(())
        }
    }
}

async fn serve(config: &TrackerConfig, db: &Database, notifier: Arc<dyn Notifier>) -> anyhow::Result<()> {
    info!("Starting taskbot");

    let engine = Arc::new(ReminderEngine::new(db.clone(), notifier.clone()));
    let mut scheduler = ReminderScheduler::new(engine);
    scheduler.start();

    let app_state = Arc::new(AppState::new(db.clone(), notifier));
    let app = api::router(app_state);

    let bind_address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("Admin API listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutting down gracefully...");
    scheduler.shutdown().await;
    info!("Shutdown complete");

    Ok(())
}
