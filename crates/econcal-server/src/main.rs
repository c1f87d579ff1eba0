use anyhow::Context;
use tracing::info;

use econcal_core::{CalendarClient, CalendarScraper, Extractor};
use econcal_server::config::ServerConfig;
use econcal_server::logging::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_logging();

    let config = ServerConfig::from_env()?;
    let layout = config.layout()?;

    let client = CalendarClient::with_config(config.client.clone())?;
    let scraper = CalendarScraper::with_fetcher(client, Extractor::new(&layout)?);
    let app = econcal_server::app(scraper);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    info!(
        addr = %config.bind_addr,
        base_url = %config.client.base_url,
        "Serving economic calendar on /calendar"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
