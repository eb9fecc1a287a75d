mod config;
mod html;
mod middleware;
mod routes;
mod state;

#[cfg(test)]
mod test_helpers;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "server stopped");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::ServerConfig::from_env()?;
    let port = config.port;
    let api_url = config.session.api_url.clone();

    let state = state::AppState::new(config)?;
    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;

    tracing::info!(%port, %api_url, "salary coherence front-end listening");
    axum::serve(listener, app).await?;
    Ok(())
}
