use anyhow::Result;
use bluecarbon_node::{config, server};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with filters
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting blue-carbon analysis node...");

    // Load configuration
    let config = config::Config::load()?;
    tracing::info!(
        "Analysis settings: quadrat {} m², carbon density {} g/m², max side {} px",
        config.analysis.quadrat_area_m2,
        config.analysis.carbon_density_g_per_m2,
        config.analysis.max_side
    );

    tokio::fs::create_dir_all(&config.upload_dir).await?;
    tracing::info!("Uploads stored under {}/", config.upload_dir);

    let app = server::build_router(&config);

    tracing::info!(
        "🌊 Upload UI and API listening on http://{}:{}",
        config.api_host,
        config.api_port
    );
    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", config.api_host, config.api_port)).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
