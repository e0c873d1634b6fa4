use std::fmt;

use serde::{Deserialize, Serialize};

/// Output encodings the generator can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFormat {
    Jpeg,
    Png,
    #[serde(rename = "webp")]
    WebP,
}

impl ImageFormat {
    /// Parse a raw `type` request value.
    ///
    /// Matching is exact and case-sensitive; `jpg` is an alias for `jpeg`.
    pub fn from_param(raw: &str) -> Option<Self> {
        match raw {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// MIME subtype, as used in `image/<subtype>`.
    pub fn subtype(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::WebP => "webp",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.subtype())
    }
}
