use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::ImageEncoder;
use params::ImageFormat;
use tracing::error;

use crate::synth::PixelBuffer;

/// Per-format encoder settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityPreset {
    /// 1-100.
    pub jpeg_quality: u8,
    /// zlib-style level, 0-9.
    pub png_compression: u8,
    /// 1-100. The WebP encoder is lossless, so quality is applied by reducing
    /// the number of levels per channel before encoding; 100 keeps every level.
    pub webp_quality: u8,
}

impl Default for QualityPreset {
    fn default() -> Self {
        Self {
            jpeg_quality: 50,
            png_compression: 7,
            webp_quality: 50,
        }
    }
}

impl QualityPreset {
    fn png_compression_type(&self) -> CompressionType {
        match self.png_compression {
            0..=3 => CompressionType::Fast,
            4..=6 => CompressionType::Default,
            _ => CompressionType::Best,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("cannot encode an empty {width}x{height} image")]
    Empty { width: u32, height: u32 },
    #[error("{format} encoding failed: {source}")]
    Codec {
        format: ImageFormat,
        #[source]
        source: image::ImageError,
    },
}

/// Encode a pixel buffer into `format`.
pub fn encode(
    buffer: &PixelBuffer,
    format: ImageFormat,
    preset: &QualityPreset,
) -> Result<Vec<u8>, EncodeError> {
    let (width, height) = buffer.dimensions();
    if width == 0 || height == 0 {
        return Err(EncodeError::Empty { width, height });
    }

    let mut out = Vec::new();
    let res = match format {
        ImageFormat::Jpeg => {
            let mut enc = JpegEncoder::new_with_quality(&mut out, preset.jpeg_quality);
            enc.encode(
                buffer.as_raw(),
                width,
                height,
                image::ColorType::Rgb8.into(),
            )
        }
        ImageFormat::Png => {
            let enc = PngEncoder::new_with_quality(
                &mut out,
                preset.png_compression_type(),
                FilterType::Adaptive,
            );
            enc.write_image(buffer.as_raw(), width, height, image::ColorType::Rgb8.into())
        }
        ImageFormat::WebP => {
            let mut data = buffer.as_raw().clone();
            quantize_for_webp(&mut data, preset.webp_quality);
            let enc = WebPEncoder::new_lossless(&mut out);
            enc.write_image(&data, width, height, image::ColorType::Rgb8.into())
        }
    };
    res.map_err(|source| EncodeError::Codec { format, source })?;

    Ok(out)
}

/// Snap every RGB channel onto `webp_levels(quality)` evenly spaced levels.
fn quantize_for_webp(data: &mut [u8], quality: u8) {
    if quality >= 100 {
        return;
    }
    let step = 255.0 / (webp_levels(quality) as f32 - 1.0);
    for channel in data.iter_mut() {
        let bucket = (f32::from(*channel) / step).round();
        *channel = (bucket * step).round().clamp(0.0, 255.0) as u8;
    }
}

/// Quadratic in quality: coarse at the low end, close to 256 levels near 100.
fn webp_levels(quality: u8) -> u16 {
    if quality >= 100 {
        return 256;
    }
    let normalized = f32::from(quality).clamp(1.0, 100.0) / 100.0;
    let levels = 2.0 + normalized * normalized * 254.0;
    levels.round().clamp(2.0, 256.0) as u16
}

/// Encode and wrap the bytes as `data:image/<format>;base64,<payload>`.
pub fn data_uri(
    buffer: &PixelBuffer,
    format: ImageFormat,
    preset: &QualityPreset,
) -> Result<String, EncodeError> {
    let bytes = encode(buffer, format, preset)?;
    Ok(format!(
        "data:image/{};base64,{}",
        format.subtype(),
        STANDARD.encode(bytes)
    ))
}

/// Encode for an output boundary that must never fail: errors are logged and an
/// empty body is returned instead.
pub fn encode_or_empty(buffer: &PixelBuffer, format: ImageFormat, preset: &QualityPreset) -> Vec<u8> {
    match encode(buffer, format, preset) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(%format, error = %e, "image encoding failed");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};

    use super::*;

    fn checker(width: u32, height: u32) -> PixelBuffer {
        RgbImage::from_fn(width, height, |x, y| {
            if (x + y) % 2 == 0 {
                Rgb([250, 10, 10])
            } else {
                Rgb([10, 10, 250])
            }
        })
    }

    #[test]
    fn png_is_lossless() {
        let img = checker(10, 10);
        let bytes = encode(&img, ImageFormat::Png, &QualityPreset::default()).unwrap();
        let decoded = image::load_from_memory_with_format(&bytes, image::ImageFormat::Png)
            .unwrap()
            .to_rgb8();
        assert_eq!(decoded, img);
    }

    #[test]
    fn webp_at_full_quality_is_lossless() {
        let img = checker(7, 3);
        let preset = QualityPreset {
            webp_quality: 100,
            ..QualityPreset::default()
        };
        let bytes = encode(&img, ImageFormat::WebP, &preset).unwrap();
        let decoded = image::load_from_memory_with_format(&bytes, image::ImageFormat::WebP)
            .unwrap()
            .to_rgb8();
        assert_eq!(decoded, img);
    }

    #[test]
    fn webp_quality_reduces_channel_levels() {
        let img = RgbImage::from_fn(64, 4, |x, y| {
            let v = (x * 4 + y) as u8;
            Rgb([v, 255 - v, v / 2])
        });
        let preset = QualityPreset::default();
        let bytes = encode(&img, ImageFormat::WebP, &preset).unwrap();
        let decoded = image::load_from_memory_with_format(&bytes, image::ImageFormat::WebP)
            .unwrap()
            .to_rgb8();
        assert_eq!(decoded.dimensions(), (64, 4));

        let levels = webp_levels(preset.webp_quality);
        assert_eq!(levels, 66);
        let distinct: std::collections::HashSet<u8> =
            decoded.pixels().flat_map(|p| p.0).collect();
        assert!(distinct.len() <= levels as usize);
        assert_ne!(decoded, img);
    }

    #[test]
    fn webp_levels_scale_with_quality() {
        assert_eq!(webp_levels(1), 2);
        assert_eq!(webp_levels(100), 256);
        assert!(webp_levels(30) < webp_levels(80));

        let mut data = vec![0, 100, 255];
        quantize_for_webp(&mut data, 1);
        assert_eq!(data, vec![0, 0, 255]);
    }

    #[test]
    fn jpeg_decodes_with_the_same_dimensions() {
        let img = checker(16, 9);
        let bytes = encode(&img, ImageFormat::Jpeg, &QualityPreset::default()).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory_with_format(&bytes, image::ImageFormat::Jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 9));
    }

    #[test]
    fn data_uri_has_mime_prefix_and_is_deterministic() {
        let img = checker(4, 4);
        let preset = QualityPreset::default();
        for format in [ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::WebP] {
            let first = data_uri(&img, format, &preset).unwrap();
            let second = data_uri(&img, format, &preset).unwrap();
            assert_eq!(first, second);
            assert!(first.starts_with(&format!("data:image/{};base64,", format.subtype())));
        }
    }

    #[test]
    fn data_uri_payload_decodes_to_the_encoded_bytes() {
        let img = checker(3, 2);
        let preset = QualityPreset::default();
        let uri = data_uri(&img, ImageFormat::Png, &preset).unwrap();
        let payload = uri.split_once(',').unwrap().1;
        let bytes = STANDARD.decode(payload).unwrap();
        assert_eq!(bytes, encode(&img, ImageFormat::Png, &preset).unwrap());
    }

    #[test]
    fn empty_buffers_fail_and_are_absorbed() {
        let img = RgbImage::new(0, 5);
        let err = encode(&img, ImageFormat::Png, &QualityPreset::default()).unwrap_err();
        assert!(matches!(err, EncodeError::Empty { width: 0, height: 5 }));
        assert!(encode_or_empty(&img, ImageFormat::Jpeg, &QualityPreset::default()).is_empty());
    }

    #[test]
    fn png_levels_map_onto_compression_types() {
        let mut preset = QualityPreset::default();
        assert!(matches!(preset.png_compression_type(), CompressionType::Best));
        preset.png_compression = 1;
        assert!(matches!(preset.png_compression_type(), CompressionType::Fast));
        preset.png_compression = 6;
        assert!(matches!(preset.png_compression_type(), CompressionType::Default));
    }
}
