use color_eyre::Result;
use std::sync::Arc;

mod adapters;
mod application;
mod cli;
mod domain;
mod ports;
#[cfg(test)]
mod test_support;

use adapters::{DefaultErrorTranslator, FileConfigStore, LocalDocumentStore, SystemClock};
use application::{AppContext, AppError};
use ports::ConfigStore;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    // Initialize logging to file
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("maint.log")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let matches = cli::build().get_matches();

    // Load configuration, then let flags and environment variables override it
    let config_store = FileConfigStore::new()?;
    let mut config = config_store.load_config().await?;

    cli::apply_overrides(&mut config, &matches, |name| std::env::var(name).ok())?;

    config_store.save_config(&config).await?;

    let current_user = config.current_user.clone().ok_or_else(|| {
        eprintln!("❌ Nobody is signed in!");
        eprintln!();
        eprintln!("Run with --user <PERSON> or export MAINT_USER=<PERSON>");
        eprintln!();
        AppError::AuthenticationRequired
    })?;

    let store_path = match &config.store_path {
        Some(path) => path.clone(),
        None => FileConfigStore::app_dir()?.join("store.json"),
    };
    tracing::info!(
        "Starting in {} with store {}",
        config.environment,
        store_path.display()
    );

    let store = Arc::new(LocalDocumentStore::open(&store_path).await?);
    let ctx = AppContext::new(
        config,
        store,
        Arc::new(DefaultErrorTranslator),
        Arc::new(SystemClock),
    );
    ctx.auth.sign_in(current_user);
    let controllers = ctx.spawn_controllers();

    let result = cli::run(&ctx, &matches).await;

    ctx.auth.sign_out();
    for controller in controllers {
        tracing::debug!("Shutting down {}", controller.collection_id());
        controller.shutdown();
    }

    if let Err(e) = result {
        eprintln!("❌ {e}");
        std::process::exit(1);
    }

    Ok(())
}
