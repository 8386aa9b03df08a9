use std::net::SocketAddr;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::config::{self, AppConfig, StoreBackend};
use crate::database::DatabaseManager;
use crate::services::UserService;
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "spraycare-api")]
#[command(about = "Total Spray Care field-service API server")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve {
        #[arg(long, help = "Port to listen on (overrides PORT)")]
        port: Option<u16>,
        #[arg(long, help = "Use the in-memory document store")]
        memory: bool,
    },

    #[command(about = "Create the documents table and indexes, then exit")]
    Migrate,

    #[command(about = "Create a super admin account if the email is unused")]
    CreateAdmin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "Administrator")]
        name: String,
    },
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Commands::Serve { port: None, memory: false }) {
        Commands::Serve { port, memory } => serve(port, memory).await,
        Commands::Migrate => migrate().await,
        Commands::CreateAdmin { email, password, name } => create_admin(&email, &password, &name).await,
    }
}

async fn serve(port: Option<u16>, memory: bool) -> anyhow::Result<()> {
    let mut config: AppConfig = config::config().clone();
    if let Some(port) = port {
        config.api.port = port;
    }
    if memory {
        config.database.backend = StoreBackend::Memory;
    }
    tracing::info!("Starting Total Spray Care API in {:?} mode", config.environment);

    let store = DatabaseManager::connect(&config).await.context("failed to open document store")?;
    if let (Some(email), Some(password)) = (&config.bootstrap.admin_email, &config.bootstrap.admin_password) {
        UserService::new(store.as_ref())
            .bootstrap_admin(email, password, "Administrator")
            .await
            .map_err(|e| anyhow::anyhow!("failed to bootstrap admin: {}", e))?;
    }

    let app = crate::app(AppState::new(store));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.api.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!("Listening on http://{}", addr);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

async fn migrate() -> anyhow::Result<()> {
    let pool = DatabaseManager::pool(config::config()).await?;
    DatabaseManager::migrate(&pool).await?;
    println!("Migrations applied");
    Ok(())
}

async fn create_admin(email: &str, password: &str, name: &str) -> anyhow::Result<()> {
    let store = DatabaseManager::connect(config::config()).await?;
    let created = UserService::new(store.as_ref())
        .bootstrap_admin(email, password, name)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    match created {
        Some(user) => println!("Created super admin {} ({})", email, user["id"]),
        None => println!("A user with email {} already exists", email),
    }
    Ok(())
}
