use anyhow::Result;
use chat_memory_relay::cli::{Cli, Commands};
use chat_memory_relay::server::HttpServer;
use chat_memory_relay::storage::MemoryStore;
use chat_memory_relay::{build_service, open_store, utils, Settings};
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut settings = Settings::new()?;
    if let Some(dir) = cli.memory_dir.clone() {
        settings.memory.dir = dir;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                settings.server.host = host;
            }
            if let Some(port) = port {
                settings.server.port = port;
            }
            handle_serve(settings).await
        }
        Commands::Show { user } => handle_show(&open_store(&settings).await?, &user).await,
        Commands::Users => handle_users(&open_store(&settings).await?).await,
        Commands::Forget { user } => handle_forget(&open_store(&settings).await?, &user).await,
        Commands::ForgetAll => handle_forget_all(&open_store(&settings).await?).await,
    }
}

async fn handle_serve(settings: Settings) -> Result<()> {
    let api_key = Settings::api_key()?;
    let service = Arc::new(build_service(&settings, api_key).await?);

    let server = HttpServer::new(settings.server.clone(), service);
    server
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await
}

async fn handle_show(store: &MemoryStore, user: &str) -> Result<()> {
    if !store.exists(user).await? {
        utils::display::print_info(&format!("No memory stored for {}", user));
        return Ok(());
    }

    let record = store.load(user).await?;
    utils::display::print_record(user, &record);
    Ok(())
}

async fn handle_users(store: &MemoryStore) -> Result<()> {
    let users = store.list_users().await?;
    utils::display::print_header(&format!("{} stored conversations", users.len()));
    for user in users {
        println!("  {}", user);
    }
    Ok(())
}

async fn handle_forget(store: &MemoryStore, user: &str) -> Result<()> {
    store.delete(user).await?;
    utils::display::print_success(&format!("{}'s memory has been reset.", user));
    Ok(())
}

async fn handle_forget_all(store: &MemoryStore) -> Result<()> {
    match store.delete_all().await {
        Ok(0) => utils::display::print_info("There are no memories to delete."),
        Ok(removed) => utils::display::print_success(&format!("Deleted {} memories.", removed)),
        Err(e) => {
            utils::display::print_error(&format!("Failed to delete memories: {}", e));
            return Err(e.into());
        }
    }
    Ok(())
}
