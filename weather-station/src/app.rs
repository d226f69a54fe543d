//! Startup wiring: build the collaborators, spawn the background loops, and
//! serve the control surface.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::Barrier;
use tracing::info;
use weather_core::{
    FileStore, Renderer, Screensaver, Settings, SharedContext, fetcher_from_settings,
    surface_from_settings, tasks,
};

use crate::server::{self, AppState};

pub async fn run(settings: Settings) -> Result<()> {
    let store_path = settings.store_path()?;
    let store = FileStore::open(&store_path)
        .with_context(|| format!("Failed to open store at {}", store_path.display()))?;

    let ctx = Arc::new(SharedContext::new(Box::new(store))?);
    let fetcher: Arc<dyn weather_core::Fetcher> = Arc::from(fetcher_from_settings(&settings)?);

    let renderer = Arc::new(Renderer::new(
        settings.display_width,
        settings.display_height,
        settings.celsius,
    ));
    let screensaver =
        Screensaver::new(settings.display_width, settings.display_height, settings.num_stars);
    let surface = surface_from_settings(&settings);

    // Two-party rendezvous: the first render tick waits for the first fetch
    // attempt to complete (bounded, see tasks::RENDEZVOUS_TIMEOUT).
    let barrier = Arc::new(Barrier::new(2));

    tokio::spawn(tasks::run_poller(
        Arc::clone(&ctx),
        Arc::clone(&fetcher),
        settings.refresh_interval(),
        Arc::clone(&barrier),
    ));

    tokio::spawn(tasks::run_render_loop(
        Arc::clone(&ctx),
        Arc::clone(&renderer),
        screensaver,
        surface,
        settings.render_interval(),
        barrier,
    ));

    let state = AppState { ctx, fetcher, renderer, display_height: settings.display_height };
    let app = server::router(state);

    let listener = tokio::net::TcpListener::bind(&settings.listen)
        .await
        .with_context(|| format!("Failed to bind {}", settings.listen))?;
    info!("serving control surface on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await.context("HTTP server exited")?;
    Ok(())
}
