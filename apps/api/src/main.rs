mod config;
mod errors;
mod extraction;
mod models;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::extraction::engine::Extractor;
use crate::extraction::segmenter::JiebaSegmenter;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting docd API v{}", env!("CARGO_PKG_VERSION"));

    // Segmentation-dependent fields would silently degrade without a
    // dictionary, so a missing one stops startup.
    let segmenter = JiebaSegmenter::load(&config.dictionary_paths())
        .context("Failed to initialize segmenter")?;
    let extractor = Extractor::new(Arc::new(segmenter), config.extract_options());
    info!(
        "Extractor initialized (institution tag: {}, hmm: {})",
        config.institution_tag, config.segment_hmm
    );

    let state = AppState {
        config: config.clone(),
        extractor,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
