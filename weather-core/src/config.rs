use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

/// Where rendered frames end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceKind {
    /// Write each frame as a PNG to `surface_output`.
    File,
    /// Pipe each frame to `kitty +kitten icat`.
    Kitty,
}

/// Station configuration: TOML file in the platform config directory,
/// overridden field-by-field from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub display_width: u32,
    pub display_height: u32,

    /// Seconds between forecast fetches.
    pub weather_refresh_interval: u64,
    /// Seconds between screen re-renders.
    pub render_interval: u64,

    /// Location as `<lat>,<lon>`.
    pub coordinates: Option<String>,
    pub open_weather_token: Option<String>,

    /// Path to a canned API response; when set, no network fetch happens.
    pub example_response: Option<PathBuf>,

    /// Path of the motd store file. Defaults to the platform data dir.
    pub store_path: Option<PathBuf>,

    /// Bind address for the HTTP control surface.
    pub listen: String,

    pub surface: SurfaceKind,
    pub surface_output: PathBuf,

    /// Render temperature in Celsius (Fahrenheit otherwise).
    pub celsius: bool,
    /// Stars drawn by the night screensaver.
    pub num_stars: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            display_width: 250,
            display_height: 122,
            weather_refresh_interval: 300,
            render_interval: 60,
            coordinates: None,
            open_weather_token: None,
            example_response: None,
            store_path: None,
            listen: "0.0.0.0:8888".to_string(),
            surface: SurfaceKind::File,
            surface_output: PathBuf::from("screen.png"),
            celsius: true,
            num_stars: 100,
        }
    }
}

impl Settings {
    /// Load from the default config file location, then apply environment
    /// overrides.
    pub fn load() -> Result<Self> {
        let mut settings = match Self::config_file_path() {
            Ok(path) if path.exists() => Self::load_file(&path)?,
            _ => Self::default(),
        };
        settings.apply_env(|name| std::env::var(name).ok());
        Ok(settings)
    }

    /// Load from an explicit config file, then apply environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut settings = Self::load_file(path)?;
        settings.apply_env(|name| std::env::var(name).ok());
        Ok(settings)
    }

    fn load_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let settings: Settings = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(settings)
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = project_dirs()?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Overlay recognized environment variables. The lookup is injected so
    /// tests never touch process environment.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("DISPLAY_WIDTH").and_then(|v| v.parse().ok()) {
            self.display_width = v;
        }
        if let Some(v) = var("DISPLAY_HEIGHT").and_then(|v| v.parse().ok()) {
            self.display_height = v;
        }
        if let Some(v) = var("WEATHER_REFRESH_INTERVAL").and_then(|v| v.parse().ok()) {
            self.weather_refresh_interval = v;
        }
        if let Some(v) = var("RENDER_INTERVAL").and_then(|v| v.parse().ok()) {
            self.render_interval = v;
        }
        if let Some(v) = var("COORDINATES") {
            self.coordinates = Some(v);
        }
        if let Some(v) = var("OPEN_WEATHER_TOKEN") {
            self.open_weather_token = Some(v);
        }
        if let Some(v) = var("EXAMPLE_RESPONSE") {
            self.example_response = Some(PathBuf::from(v));
        }
        if let Some(v) = var("STORE_PATH") {
            self.store_path = Some(PathBuf::from(v));
        }
        if let Some(v) = var("LISTEN") {
            self.listen = v;
        }
        if let Some(v) = var("SURFACE") {
            match v.to_lowercase().as_str() {
                "file" => self.surface = SurfaceKind::File,
                "kitty" => self.surface = SurfaceKind::Kitty,
                other => tracing::warn!("ignoring unknown SURFACE value: {other}"),
            }
        }
        if let Some(v) = var("SURFACE_OUTPUT") {
            self.surface_output = PathBuf::from(v);
        }
        if let Some(v) = var("CELSIUS").and_then(|v| v.parse().ok()) {
            self.celsius = v;
        }
        if let Some(v) = var("NUM_STARS").and_then(|v| v.parse().ok()) {
            self.num_stars = v;
        }
    }

    /// Parse `coordinates` into `(lat, lon)`.
    pub fn lat_lon(&self) -> Result<(f64, f64)> {
        let raw = self.coordinates.as_ref().ok_or_else(|| {
            anyhow!(
                "No location configured.\n\
                 Hint: set COORDINATES to \"<lat>,<lon>\", e.g. \"45.52,-122.68\"."
            )
        })?;

        let (lat, lon) = raw
            .split_once(',')
            .ok_or_else(|| anyhow!("COORDINATES must be \"<lat>,<lon>\", got: {raw}"))?;

        let lat: f64 = lat
            .trim()
            .parse()
            .with_context(|| format!("Invalid latitude in COORDINATES: {raw}"))?;
        let lon: f64 = lon
            .trim()
            .parse()
            .with_context(|| format!("Invalid longitude in COORDINATES: {raw}"))?;

        Ok((lat, lon))
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.weather_refresh_interval)
    }

    pub fn render_interval(&self) -> Duration {
        Duration::from_secs(self.render_interval)
    }

    /// Path of the motd store, defaulting to `<data dir>/motd.json`.
    pub fn store_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.store_path {
            return Ok(path.clone());
        }
        let dirs = project_dirs()?;
        Ok(dirs.data_dir().join("motd.json"))
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("dev", "weather-station", "weather-station")
        .ok_or_else(|| anyhow!("Could not determine platform config directory"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_documented_values() {
        let s = Settings::default();
        assert_eq!(s.display_width, 250);
        assert_eq!(s.display_height, 122);
        assert_eq!(s.weather_refresh_interval, 300);
        assert_eq!(s.render_interval, 60);
        assert_eq!(s.listen, "0.0.0.0:8888");
        assert_eq!(s.num_stars, 100);
        assert!(s.celsius);
    }

    #[test]
    fn env_overrides_take_precedence() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("DISPLAY_WIDTH", "400"),
            ("WEATHER_REFRESH_INTERVAL", "600"),
            ("COORDINATES", "45.52,-122.68"),
            ("OPEN_WEATHER_TOKEN", "TOKEN"),
            ("SURFACE", "kitty"),
            ("CELSIUS", "false"),
        ]);

        let mut s = Settings::default();
        s.apply_env(|name| env.get(name).map(|v| (*v).to_string()));

        assert_eq!(s.display_width, 400);
        assert_eq!(s.display_height, 122);
        assert_eq!(s.weather_refresh_interval, 600);
        assert_eq!(s.open_weather_token.as_deref(), Some("TOKEN"));
        assert_eq!(s.surface, SurfaceKind::Kitty);
        assert!(!s.celsius);
    }

    #[test]
    fn unparseable_env_values_are_ignored() {
        let mut s = Settings::default();
        s.apply_env(|name| (name == "RENDER_INTERVAL").then(|| "soon".to_string()));
        assert_eq!(s.render_interval, 60);
    }

    #[test]
    fn lat_lon_parses_coordinate_pair() {
        let s = Settings { coordinates: Some("45.52, -122.68".into()), ..Settings::default() };

        let (lat, lon) = s.lat_lon().expect("valid coordinates");
        assert!((lat - 45.52).abs() < f64::EPSILON);
        assert!((lon + 122.68).abs() < f64::EPSILON);
    }

    #[test]
    fn lat_lon_rejects_missing_and_malformed() {
        let mut s = Settings::default();
        assert!(s.lat_lon().unwrap_err().to_string().contains("COORDINATES"));

        s.coordinates = Some("45.52".into());
        assert!(s.lat_lon().is_err());

        s.coordinates = Some("north,west".into());
        assert!(s.lat_lon().is_err());
    }

    #[test]
    fn toml_round_trip_preserves_settings() {
        let s = Settings {
            coordinates: Some("1.0,2.0".into()),
            surface: SurfaceKind::Kitty,
            ..Settings::default()
        };

        let encoded = toml::to_string(&s).expect("serialize");
        let decoded: Settings = toml::from_str(&encoded).expect("deserialize");

        assert_eq!(decoded.coordinates.as_deref(), Some("1.0,2.0"));
        assert_eq!(decoded.surface, SurfaceKind::Kitty);
    }
}
