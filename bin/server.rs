// Calf Ledger - Web Server
// JSON API over the calf registry and treatment log

use anyhow::{Context, Result};
use calf_ledger::api::{router, AppState};
use calf_ledger::{Config, NoticeLevel, RecordStore};
use log::{info, warn};
use tower_http::cors::CorsLayer;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("🌐 Calf Ledger - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = Config::from_env();
    let mut store = RecordStore::from_config(&config);

    for notice in store.take_notices() {
        match notice.level {
            NoticeLevel::Info => info!("{}", notice.text),
            NoticeLevel::Warning => warn!("{}", notice.text),
        }
    }
    println!(
        "✓ {} bezerras, {} tratamentos ({})",
        store.calves().len(),
        store.treatments().len(),
        config.data_dir.display()
    );

    let app = router(AppState::new(store)).layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&config.server_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server_addr))?;

    println!("\n🚀 Server running on http://{}", config.server_addr);
    println!("   API: http://{}/api/treatments", config.server_addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .context("Server stopped with an error")?;

    Ok(())
}
