use std::path::PathBuf;

use clap::Parser;
use weather_core::Settings;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-station", version, about = "E-paper weather station")]
pub struct Cli {
    /// Path to a TOML config file (defaults to the platform config dir).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the HTTP listen address, e.g. "127.0.0.1:8888".
    #[arg(long)]
    pub listen: Option<String>,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let mut settings = match &self.config {
            Some(path) => Settings::load_from(path)?,
            None => Settings::load()?,
        };

        if let Some(listen) = self.listen {
            settings.listen = listen;
        }

        crate::app::run(settings).await
    }
}
