use std::convert::Infallible;
use std::io::Cursor;

use chrono::{DateTime, Local};
use embedded_graphics::{
    Pixel,
    mono_font::{
        MonoTextStyle,
        ascii::{FONT_6X13_BOLD, FONT_9X15, FONT_9X18_BOLD, FONT_10X20},
    },
    pixelcolor::{Rgb888, RgbColor},
    prelude::*,
    text::{Alignment, Baseline, Text, TextStyleBuilder},
};
use image::RgbImage;
use serde::Deserialize;
use thiserror::Error;

use crate::model::Forecast;

const WHITE: image::Rgb<u8> = image::Rgb([255, 255, 255]);
const INK: Rgb888 = Rgb888::BLACK;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("forecast document is missing fields the renderer needs: {0}")]
    MalformedForecast(#[source] serde_json::Error),

    #[error("failed to encode image: {0}")]
    Encode(#[from] image::ImageError),
}

/// `embedded-graphics` draw target over an [`RgbImage`], so mono-font text
/// can be laid out straight onto the frame we hand to the surface.
pub struct Canvas {
    img: RgbImage,
}

impl Canvas {
    pub fn new(width: u32, height: u32, background: image::Rgb<u8>) -> Self {
        Self { img: RgbImage::from_pixel(width, height, background) }
    }

    pub fn into_image(self) -> RgbImage {
        self.img
    }

    fn text(&mut self, s: &str, x: i32, y: i32, style: MonoTextStyle<'static, Rgb888>, align: Alignment) {
        let text_style =
            TextStyleBuilder::new().alignment(align).baseline(Baseline::Top).build();
        // Drawing on a Canvas is infallible.
        let _ = Text::with_text_style(s, Point::new(x, y), style, text_style).draw(self);
    }
}

impl OriginDimensions for Canvas {
    fn size(&self) -> Size {
        Size::new(self.img.width(), self.img.height())
    }
}

impl DrawTarget for Canvas {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let (w, h) = (self.img.width() as i32, self.img.height() as i32);
        for Pixel(point, color) in pixels {
            if point.x >= 0 && point.y >= 0 && point.x < w && point.y < h {
                self.img.put_pixel(
                    point.x as u32,
                    point.y as u32,
                    image::Rgb([color.r(), color.g(), color.b()]),
                );
            }
        }
        Ok(())
    }
}

/// The slice of the forecast document the renderer actually reads.
#[derive(Debug, Deserialize)]
struct ForecastView {
    current: CurrentView,
    daily: Vec<DailyView>,
}

#[derive(Debug, Deserialize)]
struct CurrentView {
    /// Kelvin; the API is asked for standard units.
    temp: f64,
    weather: Vec<ConditionView>,
}

#[derive(Debug, Deserialize)]
struct DailyView {
    weather: Vec<ConditionView>,
}

#[derive(Debug, Deserialize)]
struct ConditionView {
    #[serde(default)]
    icon: String,
    #[serde(default)]
    main: String,
    #[serde(default)]
    description: String,
}

/// Map an OpenWeather icon code to a short label for the center of the
/// frame.
fn icon_label(code: &str) -> &'static str {
    match code {
        "01d" => "SUN",
        "01n" => "MOON",
        "02d" | "02n" => "PART CLOUD",
        "03d" | "03n" | "04d" | "04n" => "CLOUDS",
        "09d" | "09n" => "SHOWERS",
        "10d" | "10n" => "RAIN",
        "11d" | "11n" => "STORM",
        "13d" | "13n" => "SNOW",
        "50d" => "MIST",
        "50n" => "FOG",
        _ => "?",
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Pure forecast-to-image transform. Stateless apart from configuration;
/// the motd is passed in with each call.
#[derive(Debug, Clone)]
pub struct Renderer {
    width: u32,
    height: u32,
    celsius: bool,
}

impl Renderer {
    pub fn new(width: u32, height: u32, celsius: bool) -> Self {
        Self { width, height, celsius }
    }

    pub fn render(
        &self,
        forecast: &Forecast,
        motd: &str,
        now: DateTime<Local>,
    ) -> Result<RgbImage, RenderError> {
        let view: ForecastView =
            serde_json::from_value(forecast.0.clone()).map_err(RenderError::MalformedForecast)?;

        let small = MonoTextStyle::new(&FONT_6X13_BOLD, INK);
        let medium = MonoTextStyle::new(&FONT_9X15, INK);
        let large = MonoTextStyle::new(&FONT_9X18_BOLD, INK);
        let icon = MonoTextStyle::new(&FONT_10X20, INK);

        let time_text = now.format("%-I:%M %p").to_string();

        let today = view.daily.first().and_then(|d| d.weather.first());
        let icon_text = icon_label(today.map(|c| c.icon.as_str()).unwrap_or_default());
        let main_text = today.map(|c| c.main.clone()).unwrap_or_default();

        let celsius = view.current.temp - 273.15;
        let temperature = if self.celsius {
            format!("{:.0} \u{b0}C", celsius)
        } else {
            format!("{:.0} \u{b0}F", celsius * 9.0 / 5.0 + 32.0)
        };

        let description = view
            .current
            .weather
            .first()
            .map(|c| capitalize(&c.description))
            .unwrap_or_default();

        let (w, h) = (self.width as i32, self.height as i32);
        let mut canvas = Canvas::new(self.width, self.height, WHITE);

        canvas.text(icon_text, w / 2, h / 2 - 15, icon, Alignment::Center);
        canvas.text(&time_text, 5, 5, medium, Alignment::Left);
        canvas.text(&main_text, 5, h - 36, large, Alignment::Left);
        canvas.text(&description, 5, h - 16, small, Alignment::Left);
        canvas.text(&temperature, w - 5, h - 36, large, Alignment::Right);

        if !motd.is_empty() {
            canvas.text(motd, w - 5, 5, small, Alignment::Right);
        }

        Ok(canvas.into_image())
    }
}

/// Encode a frame as PNG (preview endpoint, file and terminal surfaces).
pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, image::ImageFormat::Png)?;
    Ok(buf.into_inner())
}
