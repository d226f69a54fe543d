//! HTML for the status page. Small enough that a template engine would be
//! more machinery than markup.

use chrono::{DateTime, Local};
use weather_core::{FetchResult, Snapshot};

/// Render the status page from a context snapshot. Always renders, even when
/// the last fetch failed; the error text takes the forecast's place.
pub fn status_page(snapshot: &Snapshot, fetch_url: &str, display_height: u32) -> String {
    let now = Local::now();

    let forecast_text = match &snapshot.fetch {
        FetchResult::Ready(forecast) => forecast.pretty(),
        FetchResult::Failed(failure) => failure.message.clone(),
        FetchResult::Pending => "no fetch attempt has completed yet".to_string(),
    };

    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head><title>weather station</title></head>\n\
         <body>\n\
         <h1>weather station</h1>\n\
         <img src=\"/preview?ts={ts}\" height=\"{height}\" alt=\"current frame\">\n\
         <dl>\n\
         <dt>fetch URL</dt><dd>{fetch_url}</dd>\n\
         <dt>last fetch</dt><dd>{fetched}</dd>\n\
         <dt>last screen update</dt><dd>{screen}</dd>\n\
         <dt>last motd update</dt><dd>{motd_at}</dd>\n\
         </dl>\n\
         <form method=\"post\" action=\"/motd\">\n\
         <input name=\"motd\" value=\"{motd}\">\n\
         <button type=\"submit\">Set message</button>\n\
         </form>\n\
         <pre>{forecast}</pre>\n\
         </body>\n\
         </html>\n",
        ts = now.timestamp(),
        height = display_height,
        fetch_url = escape_html(fetch_url),
        fetched = format_last_update(snapshot.last_fetched_at, now),
        screen = format_last_update(snapshot.screen_updated_at, now),
        motd_at = format_last_update(snapshot.motd_updated_at, now),
        motd = escape_html(&snapshot.motd),
        forecast = escape_html(&forecast_text),
    )
}

/// "never", or a humanized age like "3m 12s ago".
pub fn format_last_update(last_update: Option<DateTime<Local>>, now: DateTime<Local>) -> String {
    let Some(at) = last_update else {
        return "never".to_string();
    };

    let since = now.signed_duration_since(at);
    let seconds = since.num_seconds().max(0);

    let (days, rest) = (seconds / 86_400, seconds % 86_400);
    let (hours, rest) = (rest / 3_600, rest % 3_600);
    let (minutes, secs) = (rest / 60, rest % 60);

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    parts.push(format!("{secs}s"));

    format!("{} ago", parts.join(" "))
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use weather_core::{FetchFailure, Forecast};

    fn sample_snapshot(fetch: FetchResult) -> Snapshot {
        Snapshot {
            fetch,
            last_fetched_at: None,
            screen_updated_at: None,
            motd_updated_at: None,
            motd: "back <soon>".to_string(),
        }
    }

    #[test]
    fn format_last_update_never() {
        let now = Local::now();
        assert_eq!(format_last_update(None, now), "never");
    }

    #[test]
    fn format_last_update_humanizes_age() {
        let now = Local.with_ymd_and_hms(2024, 6, 2, 12, 0, 30).unwrap();
        let at = Local.with_ymd_and_hms(2024, 6, 1, 11, 59, 0).unwrap();
        assert_eq!(format_last_update(Some(at), now), "1d 1m 30s ago");

        let recent = Local.with_ymd_and_hms(2024, 6, 2, 12, 0, 25).unwrap();
        assert_eq!(format_last_update(Some(recent), now), "5s ago");
    }

    #[test]
    fn status_page_shows_forecast_json() {
        let forecast = Forecast(serde_json::json!({"current": {"temp": 280.0}}));
        let page = status_page(&sample_snapshot(FetchResult::Ready(forecast)), "fixture.json", 122);

        // The forecast block is HTML-escaped, so quotes arrive as entities.
        assert!(page.contains("&quot;temp&quot;"));
        assert!(page.contains("fixture.json"));
        assert!(page.contains("never"));
    }

    #[test]
    fn status_page_shows_error_in_place_of_forecast() {
        let failed = FetchResult::Failed(FetchFailure {
            message: "bad HTTP response 502".to_string(),
            dns_resolution: false,
        });
        let page = status_page(&sample_snapshot(failed), "https://api.example", 122);

        assert!(page.contains("bad HTTP response 502"));
        assert!(page.contains("/preview"));
    }

    #[test]
    fn status_page_escapes_motd() {
        let page = status_page(&sample_snapshot(FetchResult::Pending), "u", 122);
        assert!(page.contains("back &lt;soon&gt;"));
        assert!(!page.contains("back <soon>"));
    }
}
