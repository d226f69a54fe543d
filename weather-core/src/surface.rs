use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use image::RgbImage;
use thiserror::Error;

use crate::config::{Settings, SurfaceKind};
use crate::render::encode_png;

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("failed to encode frame: {0}")]
    Encode(#[from] image::ImageError),

    #[error("failed to write frame to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with {status}")]
    CommandFailed { command: String, status: std::process::ExitStatus },
}

/// Output sink for rendered frames. Exactly one exists per process and only
/// the render loop touches it, so `update` may take `&mut self`.
pub trait Surface: Send {
    fn update(&mut self, image: &RgbImage) -> Result<(), SurfaceError>;
}

/// Writes each frame as a PNG file (local image sink).
#[derive(Debug)]
pub struct FileSurface {
    path: PathBuf,
}

impl FileSurface {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }
}

impl Surface for FileSurface {
    fn update(&mut self, image: &RgbImage) -> Result<(), SurfaceError> {
        let png = encode_png(image)?;
        std::fs::write(&self.path, png)
            .map_err(|source| SurfaceError::Io { path: self.path.clone(), source })?;
        tracing::debug!("wrote frame to {}", self.path.display());
        Ok(())
    }
}

const KITTY: &str = "kitty";

/// Draws each frame inline in a kitty terminal via `kitty +kitten icat`.
#[derive(Debug, Default)]
pub struct TerminalSurface;

impl Surface for TerminalSurface {
    fn update(&mut self, image: &RgbImage) -> Result<(), SurfaceError> {
        let png = encode_png(image)?;

        let mut child = Command::new(KITTY)
            .args(["+kitten", "icat"])
            .stdin(Stdio::piped())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| SurfaceError::Spawn { command: KITTY.to_string(), source })?;

        if let Some(stdin) = child.stdin.as_mut() {
            stdin
                .write_all(&png)
                .map_err(|source| SurfaceError::Spawn { command: KITTY.to_string(), source })?;
        }

        let status = child
            .wait()
            .map_err(|source| SurfaceError::Spawn { command: KITTY.to_string(), source })?;

        if !status.success() {
            return Err(SurfaceError::CommandFailed { command: KITTY.to_string(), status });
        }

        Ok(())
    }
}

/// Pick the surface once at startup based on configuration.
pub fn surface_from_settings(settings: &Settings) -> Box<dyn Surface> {
    match settings.surface {
        SurfaceKind::File => Box::new(FileSurface::new(&settings.surface_output)),
        SurfaceKind::Kitty => Box::new(TerminalSurface),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_surface_writes_png() {
        let path = std::env::temp_dir()
            .join(format!("weather-surface-{}.png", std::process::id()));
        std::fs::remove_file(&path).ok();

        let mut surface = FileSurface::new(&path);
        let frame = RgbImage::from_pixel(8, 8, image::Rgb([255, 255, 255]));
        surface.update(&frame).expect("update");

        let bytes = std::fs::read(&path).expect("file written");
        assert_eq!(&bytes[..4], &[0x89, b'P', b'N', b'G']);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn file_surface_reports_unwritable_path() {
        let mut surface = FileSurface::new("/no/such/dir/frame.png");
        let frame = RgbImage::from_pixel(2, 2, image::Rgb([0, 0, 0]));
        let err = surface.update(&frame).unwrap_err();
        assert!(matches!(err, SurfaceError::Io { .. }));
    }

    #[test]
    fn command_failed_reports_exit_status() {
        use std::os::unix::process::ExitStatusExt;

        let status = std::process::ExitStatus::from_raw(256);
        assert!(!status.success());

        let err = SurfaceError::CommandFailed { command: KITTY.to_string(), status };
        assert!(err.to_string().contains("kitty"));
    }

    #[test]
    fn settings_select_the_surface() {
        let file_settings = Settings::default();
        // Just make sure selection succeeds for both kinds.
        surface_from_settings(&file_settings);

        let kitty_settings =
            Settings { surface: SurfaceKind::Kitty, ..Settings::default() };
        surface_from_settings(&kitty_settings);
    }
}
