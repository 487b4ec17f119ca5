// Cinegraph server - film catalogue social graph over HTTP

use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use cinegraph::{app_state::AppState, config::Config, interface::create_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    let app_state = AppState::new(&config).await?;

    let app = create_router(app_state).layer(CorsLayer::permissive());

    let addr: SocketAddr = config.server_address().parse()?;
    tracing::info!("cinegraph server starting on http://{}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
