use image::RgbImage;
use rand::Rng;

const BLACK: image::Rgb<u8> = image::Rgb([0, 0, 0]);
const WHITE: image::Rgb<u8> = image::Rgb([255, 255, 255]);

/// Decorative night image: a black sky with random stars. Non-deterministic
/// by design; takes no input beyond its configured dimensions.
#[derive(Debug, Clone)]
pub struct Screensaver {
    width: u32,
    height: u32,
    num_stars: u32,
}

impl Screensaver {
    pub fn new(width: u32, height: u32, num_stars: u32) -> Self {
        Self { width, height, num_stars }
    }

    pub fn render(&self) -> RgbImage {
        let mut img = RgbImage::from_pixel(self.width, self.height, BLACK);
        let mut rng = rand::thread_rng();

        for _ in 0..self.num_stars {
            let x = rng.gen_range(0..self.width);
            let y = rng.gen_range(0..self.height);
            img.put_pixel(x, y, WHITE);
        }

        img
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_has_configured_dimensions() {
        let img = Screensaver::new(250, 122, 100).render();
        assert_eq!(img.width(), 250);
        assert_eq!(img.height(), 122);
    }

    #[test]
    fn sky_is_mostly_black_with_some_stars() {
        let img = Screensaver::new(250, 122, 100).render();
        let stars = img.pixels().filter(|p| p.0 == [255, 255, 255]).count();

        // Collisions can land two stars on one pixel, so only bounds hold.
        assert!(stars > 0);
        assert!(stars <= 100);

        let total = (img.width() * img.height()) as usize;
        assert!(total - stars > total / 2);
    }

    #[test]
    fn zero_stars_renders_plain_sky() {
        let img = Screensaver::new(32, 32, 0).render();
        assert!(img.pixels().all(|p| p.0 == [0, 0, 0]));
    }
}
