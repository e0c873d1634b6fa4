//! Request parameter normalization for the random image generator.
//!
//! Raw query parameters are never rejected: anything missing, malformed or out of
//! range is replaced by the active [`Profile`]'s defaults.

pub mod format;
pub mod profile;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::info;

pub use format::ImageFormat;
pub use profile::{Profile, ProfileName};

pub const MIN_SIZE: u32 = 1;
pub const MAX_SIZE: u32 = 2000;
pub const DEFAULT_SIZE: u32 = 200;
pub const MAX_COLOR_COUNT: i64 = 256;

/// Canonical, validated description of one image request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    /// Accepted `numColors` value. `None`, zero and negative values all mean one
    /// random color per pixel.
    pub palette_size: Option<i64>,
    pub debug: bool,
}

impl Configuration {
    pub fn defaults(profile: &Profile) -> Self {
        Self {
            width: DEFAULT_SIZE,
            height: DEFAULT_SIZE,
            format: profile.default_format,
            palette_size: None,
            debug: false,
        }
    }

    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Number of colors to generate: the palette size when it is positive,
    /// otherwise one per pixel.
    pub fn color_count(&self) -> usize {
        match self.palette_size {
            Some(n) if n > 0 => n as usize,
            _ => self.area(),
        }
    }
}

/// Build a [`Configuration`] from raw request parameters.
///
/// Recognised keys are `width`, `height`, `type`, `debug` and, for profiles with
/// palette support, `numColors`. Everything else is ignored.
pub fn normalize(raw: &HashMap<String, String>, profile: &Profile) -> Configuration {
    let mut config = Configuration::defaults(profile);

    if let Some(height) = raw.get("height").and_then(|v| parse_size(v)) {
        config.height = height;
    }

    if let Some(width) = raw.get("width").and_then(|v| parse_size(v)) {
        config.width = width;
    }

    if let Some(format) = raw.get("type").and_then(|v| ImageFormat::from_param(v)) {
        config.format = format;
    }

    if profile.palette_support {
        if let Some(n) = raw.get("numColors").and_then(|v| parse_numeric(v)) {
            if n <= MAX_COLOR_COUNT {
                config.palette_size = Some(n);
            }
        }
    }

    config.debug = raw.get("debug").map(|v| is_truthy(v)).unwrap_or(false);

    if config.debug {
        info!(profile = %profile.name, ?config, "normalized request parameters");
    }

    config
}

fn parse_size(raw: &str) -> Option<u32> {
    let n = parse_numeric(raw)?;
    if n < MIN_SIZE as i64 || n > MAX_SIZE as i64 {
        return None;
    }
    Some(n as u32)
}

/// Parse a decimal number (optionally signed, fractional or with an exponent) and
/// truncate it toward zero. Hex, `inf` and `nan` are not numbers here.
fn parse_numeric(raw: &str) -> Option<i64> {
    let s = raw.trim_matches(|c: char| c.is_ascii_whitespace());
    if s.is_empty() || !s.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    let allowed = |b: u8| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E');
    if !s.bytes().all(allowed) {
        return None;
    }

    let value: f64 = s.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(value.trunc() as i64)
}

fn is_truthy(raw: &str) -> bool {
    !(raw.is_empty() || raw == "0")
}
