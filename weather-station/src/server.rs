//! HTTP control surface: status page, motd updates, live preview, and an
//! out-of-band fetch trigger.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Form, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use chrono::Local;
use serde::Deserialize;
use tracing::warn;
use weather_core::{
    FetchFailure, FetchResult, Fetcher, Renderer, SharedContext, Snapshot, encode_png,
};

use crate::pages;

#[derive(Clone)]
pub struct AppState {
    pub ctx: Arc<SharedContext>,
    pub fetcher: Arc<dyn Fetcher>,
    pub renderer: Arc<Renderer>,
    pub display_height: u32,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/motd", post(update_motd).delete(clear_motd))
        .route("/preview", get(preview))
        .route("/fetch", get(trigger_fetch))
        .with_state(state)
}

async fn index(State(state): State<AppState>) -> Html<String> {
    Html(render_status(&state))
}

#[derive(Debug, Deserialize)]
struct MotdForm {
    motd: String,
}

async fn update_motd(State(state): State<AppState>, Form(form): Form<MotdForm>) -> Response {
    set_motd(&state, &form.motd)
}

async fn clear_motd(State(state): State<AppState>) -> Response {
    set_motd(&state, "")
}

fn set_motd(state: &AppState, motd: &str) -> Response {
    match state.ctx.set_motd(motd) {
        Ok(()) => Html(render_status(state)).into_response(),
        Err(err) => {
            warn!("persisting motd failed: {err}");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("failed to persist motd: {err}"))
                .into_response()
        }
    }
}

async fn preview(State(state): State<AppState>) -> Response {
    match preview_png(&state.ctx.snapshot(), &state.renderer) {
        Ok(png) => ([(header::CONTENT_TYPE, "image/png")], png).into_response(),
        Err(message) => (StatusCode::INTERNAL_SERVER_ERROR, message).into_response(),
    }
}

/// PNG of the current snapshot's forecast. When the snapshot holds a failure
/// (or nothing yet) this reports the reason instead of attempting to encode
/// a frame.
fn preview_png(snapshot: &Snapshot, renderer: &Renderer) -> Result<Vec<u8>, String> {
    match &snapshot.fetch {
        FetchResult::Ready(forecast) => {
            let frame = renderer
                .render(forecast, &snapshot.motd, Local::now())
                .map_err(|e| e.to_string())?;
            encode_png(&frame).map_err(|e| e.to_string())
        }
        FetchResult::Failed(failure) => Err(failure.message.clone()),
        FetchResult::Pending => Err("no forecast fetched yet".to_string()),
    }
}

/// Immediate out-of-band fetch. The result is recorded like any poll tick,
/// but this path never exits the process; the escalation policy belongs to
/// the poller alone.
async fn trigger_fetch(State(state): State<AppState>) -> Redirect {
    match state.fetcher.fetch().await {
        Ok(forecast) => state.ctx.record_fetch(FetchResult::Ready(forecast)),
        Err(err) => {
            warn!("manual fetch failed: {err}");
            state.ctx.record_fetch(FetchResult::Failed(FetchFailure::from(&err)));
        }
    }
    Redirect::to("/")
}

fn render_status(state: &AppState) -> String {
    pages::status_page(&state.ctx.snapshot(), state.fetcher.url(), state.display_height)
}
