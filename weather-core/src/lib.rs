//! Core library for the e-paper weather station.
//!
//! This crate defines:
//! - Configuration handling
//! - The fetcher abstraction (remote API or fixture file)
//! - The shared context both background activities write into
//! - The poller and render loop, with their startup rendezvous
//! - Forecast rendering, the night screensaver, and output surfaces
//! - Durable storage for the message of the day
//!
//! It is used by `weather-station`, but can also be reused by other binaries
//! or services.

pub mod config;
pub mod context;
pub mod fetch;
pub mod model;
pub mod render;
pub mod screensaver;
pub mod store;
pub mod surface;
pub mod tasks;

pub use config::{Settings, SurfaceKind};
pub use context::{SharedContext, Snapshot};
pub use fetch::{FetchError, Fetcher, FixtureFetcher, OpenWeatherFetcher, fetcher_from_settings};
pub use model::{FetchFailure, FetchResult, Forecast};
pub use render::{RenderError, Renderer, encode_png};
pub use screensaver::Screensaver;
pub use store::{FileStore, MOTD_KEY, Store, StoreError};
pub use surface::{FileSurface, Surface, SurfaceError, TerminalSurface, surface_from_settings};
pub use tasks::{PollOutcome, is_night, poll_once, render_once, run_poller, run_render_loop};
