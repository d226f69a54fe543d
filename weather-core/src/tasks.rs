//! The two long-lived background activities and their startup
//! synchronization.
//!
//! The poller keeps [`SharedContext`] fresh; the render loop keeps the
//! display in sync with it. Both run forever on independent intervals and
//! meet exactly once at a bounded-wait barrier, so the first render never
//! happens before the first fetch attempt has completed.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveTime, Timelike};
use thiserror::Error;
use tokio::sync::Barrier;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::context::SharedContext;
use crate::fetch::Fetcher;
use crate::model::{FetchFailure, FetchResult};
use crate::render::{RenderError, Renderer};
use crate::screensaver::Screensaver;
use crate::surface::{Surface, SurfaceError};

/// How long each party waits at the startup rendezvous before giving up and
/// starting its loop anyway.
pub const RENDEZVOUS_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of one poll tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Continue,
    /// Two consecutive DNS resolution failures: give up and let the
    /// supervisor restart the process.
    FatalDnsStreak,
}

/// Errors raised while producing or pushing one frame. Caught and logged at
/// the render-loop boundary; a bad tick never ends the loop.
#[derive(Debug, Error)]
pub enum ScreenError {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Surface(#[from] SurfaceError),
}

/// Night check: strictly after 22:00 or strictly before 06:05 local time.
/// The boundaries are exclusive on purpose; 22:00:00 sharp is still day.
pub fn is_night(t: NaiveTime) -> bool {
    let seconds = t.num_seconds_from_midnight();
    seconds > 22 * 3600 || seconds < 6 * 3600 + 5 * 60
}

/// Run one fetch attempt and record the outcome.
///
/// A failure is recorded, not propagated; only the DNS streak escalates. The
/// streak is judged against the previously stored result, so any success in
/// between resets it.
pub async fn poll_once(ctx: &SharedContext, fetcher: &dyn Fetcher) -> PollOutcome {
    info!("refreshing forecast from {}", fetcher.url());

    match fetcher.fetch().await {
        Ok(forecast) => {
            ctx.record_fetch(FetchResult::Ready(forecast));
            PollOutcome::Continue
        }
        Err(err) => {
            warn!("refreshing forecast failed: {err}");

            // DNS failures have been observed to persist until the process
            // restarts, so two in a row means exit and get restarted.
            let streak = err.is_dns_resolution() && ctx.snapshot().fetch.is_dns_failure();

            ctx.record_fetch(FetchResult::Failed(FetchFailure::from(&err)));

            if streak { PollOutcome::FatalDnsStreak } else { PollOutcome::Continue }
        }
    }
}

/// Forecast polling activity. The first fetch happens immediately; the
/// interval wait comes after each attempt, never before the first.
pub async fn run_poller(
    ctx: Arc<SharedContext>,
    fetcher: Arc<dyn Fetcher>,
    interval: Duration,
    barrier: Arc<Barrier>,
) {
    if poll_once(&ctx, fetcher.as_ref()).await == PollOutcome::FatalDnsStreak {
        fatal_dns_exit();
    }

    rendezvous(&barrier, RENDEZVOUS_TIMEOUT, "poller").await;

    info!("polling for forecast updates every {}s", interval.as_secs());
    loop {
        sleep(interval).await;
        if poll_once(&ctx, fetcher.as_ref()).await == PollOutcome::FatalDnsStreak {
            fatal_dns_exit();
        }
    }
}

fn fatal_dns_exit() -> ! {
    error!("exiting after two consecutive DNS resolution failures");
    std::process::exit(1);
}

/// Produce and push one frame, according to the current snapshot and the
/// wall clock. At night the screensaver is shown; during the day the latest
/// forecast is rendered, and when none is available the tick is skipped
/// without touching the surface. The screen timestamp is recorded only after
/// a successful push.
pub fn render_once(
    ctx: &SharedContext,
    renderer: &Renderer,
    screensaver: &Screensaver,
    surface: &mut dyn Surface,
    now: DateTime<Local>,
) -> Result<(), ScreenError> {
    let snapshot = ctx.snapshot();

    let frame = if is_night(now.time()) {
        Some(screensaver.render())
    } else {
        match &snapshot.fetch {
            FetchResult::Ready(forecast) => Some(renderer.render(forecast, &snapshot.motd, now)?),
            _ => None,
        }
    };

    if let Some(image) = frame {
        surface.update(&image)?;
        ctx.record_render();
    }

    Ok(())
}

/// Screen refresh activity.
pub async fn run_render_loop(
    ctx: Arc<SharedContext>,
    renderer: Arc<Renderer>,
    screensaver: Screensaver,
    mut surface: Box<dyn Surface>,
    interval: Duration,
    barrier: Arc<Barrier>,
) {
    info!("re-rendering every {}s", interval.as_secs());
    rendezvous(&barrier, RENDEZVOUS_TIMEOUT, "render loop").await;

    loop {
        if let Err(err) = render_once(&ctx, &renderer, &screensaver, surface.as_mut(), Local::now())
        {
            warn!("error while updating screen: {err}");
        }
        sleep(interval).await;
    }
}

/// Two-party startup barrier with a bounded wait. On timeout the caller
/// proceeds anyway, so a hang in one activity cannot keep the other from
/// ever starting its loop.
pub async fn rendezvous(barrier: &Barrier, timeout: Duration, who: &str) {
    if tokio::time::timeout(timeout, barrier.wait()).await.is_err() {
        warn!("{who}: startup rendezvous timed out after {}s, continuing", timeout.as_secs());
    }
}
