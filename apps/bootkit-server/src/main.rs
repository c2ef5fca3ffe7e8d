mod config;
mod orders;

use std::sync::Arc;

use anyhow::{Context, Result};
use bootkit_autoconfigure::data::DataProperties;
use bootkit_autoconfigure::{Bootstrap, Components, StaticValidationGroups};
use bootkit_data::tenant::TenantTableRegistry;
use bootkit_env::{Environment, LoggingProperties, init_logging};
use bootkit_security::InMemoryUserDetailsService;
use clap::{Parser, Subcommand};
use tower_http::trace::TraceLayer;

use crate::config::{DatabaseProperties, ServerProperties};

/// Bootkit Server - tenant-scoped SQL behind a configurable security chain
#[derive(Parser)]
#[command(name = "bootkit-server")]
#[command(about = "Bootkit Server - tenant-scoped SQL behind a configurable security chain")]
#[command(version)]
struct Cli {
    /// Configuration file locations (glob patterns allowed); later ones win
    #[arg(short, long)]
    config: Vec<String>,

    /// Port override for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print effective configuration (JSON) and exit
    #[arg(long)]
    print_config: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Validate configuration and exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let env = config::load_environment(&cli.config, cli.port)
        .context("failed to load configuration")?;

    if cli.print_config {
        let effective: serde_json::Value = env.figment().extract()?;
        println!("{}", serde_json::to_string_pretty(&effective)?);
        return Ok(());
    }

    let logging: LoggingProperties = env.bind("logging")?;
    let _guard = init_logging(&logging)?;
    tracing::info!(sources = ?env.source_names(), "Bootkit Server starting");

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(env).await,
        Commands::Check => check_config(env),
    }
}

fn assemble(env: Environment, tables: TenantTableRegistry) -> Result<Components> {
    let users = config::users(&env)?;
    tracing::info!(count = users.len(), "in-memory users loaded");
    let components = Bootstrap::new(env)
        .with_user_details(Arc::new(InMemoryUserDetailsService::new(users)))
        .with_tenant_tables(Arc::new(tables))
        .with_validation_groups(Arc::new(StaticValidationGroups::default()))
        .build()?;
    Ok(components)
}

fn check_config(env: Environment) -> Result<()> {
    tracing::info!("Checking configuration...");
    let components = assemble(env, TenantTableRegistry::new())?;
    println!("Configuration is valid");
    println!("security filters: {}", components.security.filter_names().join(", "));
    Ok(())
}

async fn run_server(env: Environment) -> Result<()> {
    let server: ServerProperties = env.bind("server")?;
    let database: DatabaseProperties = env.bind("database")?;
    let data: DataProperties = env.bind("data")?;

    let pool = orders::connect(&database.url)
        .await
        .with_context(|| format!("failed to open database {}", database.url))?;
    let tables = orders::tenant_tables(&pool, &data.tenant.column).await?;

    let components = assemble(env, tables)?;
    let state = orders::OrdersState::new(pool, components.sql, components.validator);
    let app = components
        .security
        .apply(orders::router(state))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind((server.host, server.port)).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
