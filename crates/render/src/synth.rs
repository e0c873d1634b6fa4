use image::{Rgb, RgbImage};
use params::Configuration;
use rand::Rng;
use tracing::{debug, info};

use crate::registry::ColorRegistry;

pub type Color = Rgb<u8>;

/// Row-major, top-to-bottom grid of colors for one request.
pub type PixelBuffer = RgbImage;

/// Fill a `width x height` buffer with random colors.
///
/// Without a palette every pixel gets its own freshly generated color, assigned in
/// generation order. With a palette, `palette_size` colors are generated once and
/// each pixel independently picks one of them (with replacement).
pub fn synthesize<R: Rng + ?Sized>(config: &Configuration, rng: &mut R) -> PixelBuffer {
    build(config, rng).0
}

pub(crate) fn build<R: Rng + ?Sized>(
    config: &Configuration,
    rng: &mut R,
) -> (PixelBuffer, Vec<Color>) {
    let area = config.area();
    let color_count = config.color_count();

    let mut registry = ColorRegistry::new();
    let colors: Vec<Color> = (0..color_count)
        .map(|_| {
            let color = random_color(rng);
            if config.debug {
                info!(red = color[0], green = color[1], blue = color[2], "generated color");
            }
            registry.register(color);
            color
        })
        .collect();

    let mut buffer = RgbImage::new(config.width, config.height);

    if color_count == area {
        for (px, color) in buffer.pixels_mut().zip(colors.iter()) {
            *px = *color;
        }
    } else {
        for px in buffer.pixels_mut() {
            *px = colors[rng.gen_range(0..colors.len())];
        }
    }

    debug!(
        width = config.width,
        height = config.height,
        color_count,
        palette_mode = color_count != area,
        registry_limit_reached = registry.limit_reached(),
        "synthesized pixel buffer"
    );

    (buffer, colors)
}

fn random_color<R: Rng + ?Sized>(rng: &mut R) -> Color {
    let red: u8 = rng.gen();
    let green: u8 = rng.gen();
    let blue: u8 = rng.gen();
    Rgb([red, green, blue])
}
