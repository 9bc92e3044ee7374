use anyhow::Result;
use script2pdf::core::config::{Config, CONFIG_FILE};
use script2pdf::core::io::NativeStorage;
use script2pdf::services::session::SessionManager;
use script2pdf::services::store::DocumentStore;
use script2pdf::ui;
use script2pdf::utils::pdf::HelveticaLayout;
use std::path::Path;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading config: {:#}", e);
            eprintln!("Please fix or remove 'config.yml'.");
            return Err(e);
        }
    };
    if !Path::new(CONFIG_FILE).exists() {
        config.save()?;
        log::info!("Wrote default configuration to {}", CONFIG_FILE);
    }
    config.ensure_directories()?;

    let storage = Arc::new(NativeStorage::new(&config.data_folder));
    let store = DocumentStore::load(storage, &config.storage_key).await?;

    let mut session = SessionManager::new(config, store, Box::new(HelveticaLayout));
    ui::run(&mut session).await?;

    Ok(())
}
