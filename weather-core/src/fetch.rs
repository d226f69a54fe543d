use std::fmt::Debug;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;

use crate::config::Settings;
use crate::model::Forecast;

// See https://openweathermap.org/api/one-call-3#current
const DATA_SOURCE_URL: &str = "https://api.openweathermap.org/data/3.0/onecall";

/// Classified failure of a single fetch attempt.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Name resolution failed. Two of these in direct succession trigger a
    /// process restart (see the poller's escalation policy).
    #[error("DNS resolution failed: {0}")]
    DnsResolution(String),

    #[error("request to weather API failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("bad HTTP response {status}, body = {body}")]
    BadStatus { status: StatusCode, body: String },

    #[error("failed to decode weather response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to read fixture {path}: {source}")]
    Fixture {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    pub fn is_dns_resolution(&self) -> bool {
        matches!(self, FetchError::DnsResolution(_))
    }
}

/// Walk an error's source chain looking for resolver failure text. Hyper's
/// connector reports these as "dns error" / "failed to lookup address".
fn chain_mentions_dns(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut cursor: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = cursor {
        let msg = e.to_string().to_lowercase();
        if msg.contains("dns error") || msg.contains("failed to lookup address") {
            return true;
        }
        cursor = e.source();
    }
    false
}

fn classify_transport(err: reqwest::Error) -> FetchError {
    if err.is_connect() && chain_mentions_dns(&err) {
        FetchError::DnsResolution(err.to_string())
    } else {
        FetchError::Transport(err)
    }
}

/// Source of forecast documents: the remote API, or a fixture file for
/// offline runs. `url` is diagnostic only (shown on the status page).
#[async_trait]
pub trait Fetcher: Send + Sync + Debug {
    async fn fetch(&self) -> Result<Forecast, FetchError>;

    fn url(&self) -> &str;
}

/// Fetches from the OpenWeather One Call 3.0 endpoint.
#[derive(Debug, Clone)]
pub struct OpenWeatherFetcher {
    token: String,
    lat: f64,
    lon: f64,
    http: Client,
}

impl OpenWeatherFetcher {
    pub fn new(token: String, lat: f64, lon: f64) -> Self {
        Self { token, lat, lon, http: Client::new() }
    }
}

#[async_trait]
impl Fetcher for OpenWeatherFetcher {
    async fn fetch(&self) -> Result<Forecast, FetchError> {
        let res = self
            .http
            .get(DATA_SOURCE_URL)
            .query(&[
                ("lat", self.lat.to_string().as_str()),
                ("lon", self.lon.to_string().as_str()),
                ("exclude", "minutely,alerts"),
                ("appid", self.token.as_str()),
                ("units", "standard"),
            ])
            .send()
            .await
            .map_err(classify_transport)?;

        let status = res.status();
        let body = res.text().await.map_err(classify_transport)?;

        if !status.is_success() {
            return Err(FetchError::BadStatus { status, body: truncate_body(&body) });
        }

        let decoded: serde_json::Value =
            serde_json::from_str(&body).map_err(FetchError::Decode)?;

        Ok(Forecast(decoded))
    }

    fn url(&self) -> &str {
        DATA_SOURCE_URL
    }
}

/// Reads a canned API response from disk instead of calling the network.
#[derive(Debug, Clone)]
pub struct FixtureFetcher {
    path: PathBuf,
    path_display: String,
}

impl FixtureFetcher {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let path_display = path.display().to_string();
        Self { path, path_display }
    }
}

#[async_trait]
impl Fetcher for FixtureFetcher {
    async fn fetch(&self) -> Result<Forecast, FetchError> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|source| FetchError::Fixture {
            path: self.path.clone(),
            source,
        })?;

        let decoded: serde_json::Value =
            serde_json::from_slice(&bytes).map_err(FetchError::Decode)?;

        Ok(Forecast(decoded))
    }

    fn url(&self) -> &str {
        &self.path_display
    }
}

/// Construct the fetcher selected by configuration: a fixture file when
/// `EXAMPLE_RESPONSE` is set, the remote API otherwise.
pub fn fetcher_from_settings(settings: &Settings) -> anyhow::Result<Box<dyn Fetcher>> {
    if let Some(path) = &settings.example_response {
        return Ok(Box::new(FixtureFetcher::new(path)));
    }

    let token = settings.open_weather_token.clone().ok_or_else(|| {
        anyhow::anyhow!(
            "No OpenWeather token configured.\n\
             Hint: set OPEN_WEATHER_TOKEN, or EXAMPLE_RESPONSE for an offline fixture."
        )
    })?;

    let (lat, lon) = settings.lat_lon()?;

    Ok(Box::new(OpenWeatherFetcher::new(token, lat, lon)))
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        // Step back to a char boundary; MAX can land inside a multi-byte
        // character in a non-ASCII response body.
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_fixture(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("weather-fetch-{}-{name}", std::process::id()));
        let mut f = std::fs::File::create(&path).expect("create fixture");
        f.write_all(contents.as_bytes()).expect("write fixture");
        path
    }

    #[tokio::test]
    async fn fixture_fetcher_decodes_document() {
        let path = temp_fixture("ok.json", r#"{"current": {"temp": 281.5}}"#);
        let fetcher = FixtureFetcher::new(&path);

        let forecast = fetcher.fetch().await.expect("fixture should decode");
        assert_eq!(forecast.0["current"]["temp"], serde_json::json!(281.5));
        assert_eq!(fetcher.url(), path.display().to_string());

        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn fixture_fetcher_reports_missing_file() {
        let fetcher = FixtureFetcher::new("/definitely/not/here.json");
        let err = fetcher.fetch().await.unwrap_err();
        assert!(matches!(err, FetchError::Fixture { .. }));
        assert!(!err.is_dns_resolution());
    }

    #[tokio::test]
    async fn fixture_fetcher_reports_malformed_json() {
        let path = temp_fixture("bad.json", "{ not json");
        let err = FixtureFetcher::new(&path).fetch().await.unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
        std::fs::remove_file(path).ok();
    }

    #[derive(Debug, Error)]
    #[error("{msg}")]
    struct ChainLink {
        msg: String,
        #[source]
        source: Option<Box<ChainLink>>,
    }

    #[test]
    fn dns_text_detected_anywhere_in_source_chain() {
        let err = ChainLink {
            msg: "error sending request".into(),
            source: Some(Box::new(ChainLink {
                msg: "client error (Connect)".into(),
                source: Some(Box::new(ChainLink {
                    msg: "dns error: failed to lookup address information".into(),
                    source: None,
                })),
            })),
        };

        assert!(chain_mentions_dns(&err));

        let refused = ChainLink { msg: "connection refused".into(), source: None };
        assert!(!chain_mentions_dns(&refused));
    }

    #[test]
    fn bad_status_message_includes_status_and_body() {
        let err = FetchError::BadStatus {
            status: StatusCode::UNAUTHORIZED,
            body: "Invalid API key".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("401"));
        assert!(msg.contains("Invalid API key"));
    }

    #[test]
    fn truncate_body_caps_long_payloads() {
        let long = "x".repeat(500);
        let short = truncate_body(&long);
        assert!(short.len() < 210);
        assert!(short.ends_with("..."));
        assert_eq!(truncate_body("tiny"), "tiny");
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        // A multi-byte character straddling the cut point must not panic;
        // error bodies from the API are not guaranteed to be ASCII.
        let body = "x".repeat(199) + "\u{e9} and more";
        let short = truncate_body(&body);
        assert!(short.ends_with("..."));
        assert!(short.len() <= 203);

        let accented = "\u{e9}".repeat(150);
        assert!(truncate_body(&accented).ends_with("..."));
    }

    #[test]
    fn fetcher_from_settings_prefers_fixture() {
        let settings = Settings {
            example_response: Some(PathBuf::from("example.json")),
            ..Settings::default()
        };

        let fetcher = fetcher_from_settings(&settings).expect("fixture needs no token");
        assert_eq!(fetcher.url(), "example.json");
    }

    #[test]
    fn fetcher_from_settings_requires_token_for_remote() {
        let settings = Settings::default();
        let err = fetcher_from_settings(&settings).unwrap_err();
        assert!(err.to_string().contains("No OpenWeather token configured"));
    }

    #[test]
    fn fetcher_from_settings_requires_coordinates() {
        let settings = Settings {
            open_weather_token: Some("TOKEN".into()),
            ..Settings::default()
        };

        let err = fetcher_from_settings(&settings).unwrap_err();
        assert!(err.to_string().contains("COORDINATES"));
    }
}
