use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::format::ImageFormat;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileName {
    /// JPEG by default, honours `numColors`.
    #[default]
    Palette,
    /// PNG by default, one random color per pixel only.
    Classic,
}

impl ProfileName {
    pub const ALL: [ProfileName; 2] = [ProfileName::Palette, ProfileName::Classic];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Palette => "palette",
            Self::Classic => "classic",
        }
    }

    pub fn profile(self) -> Profile {
        match self {
            Self::Palette => Profile::PALETTE,
            Self::Classic => Profile::CLASSIC,
        }
    }
}

impl fmt::Display for ProfileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown profile: {0} (expected one of: palette, classic)")]
pub struct UnknownProfile(pub String);

impl FromStr for ProfileName {
    type Err = UnknownProfile;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "palette" => Ok(Self::Palette),
            "classic" => Ok(Self::Classic),
            other => Err(UnknownProfile(other.to_string())),
        }
    }
}

/// A named bundle of request defaults.
///
/// Both historical generator behaviours are expressed as profiles so a single
/// validator/synthesizer pair covers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Profile {
    pub name: ProfileName,
    /// Format used when `type` is missing or unrecognised.
    pub default_format: ImageFormat,
    /// Whether `numColors` is read at all.
    pub palette_support: bool,
}

impl Profile {
    pub const PALETTE: Profile = Profile {
        name: ProfileName::Palette,
        default_format: ImageFormat::Jpeg,
        palette_support: true,
    };

    pub const CLASSIC: Profile = Profile {
        name: ProfileName::Classic,
        default_format: ImageFormat::Png,
        palette_support: false,
    };
}

impl Default for Profile {
    fn default() -> Self {
        ProfileName::default().profile()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_names() {
        assert_eq!("palette".parse::<ProfileName>().unwrap(), ProfileName::Palette);
        assert_eq!(" classic ".parse::<ProfileName>().unwrap(), ProfileName::Classic);
        assert!("fancy".parse::<ProfileName>().is_err());
    }

    #[test]
    fn presets_differ_in_defaults() {
        assert_eq!(Profile::PALETTE.default_format, ImageFormat::Jpeg);
        assert!(Profile::PALETTE.palette_support);
        assert_eq!(Profile::CLASSIC.default_format, ImageFormat::Png);
        assert!(!Profile::CLASSIC.palette_support);
    }

    #[test]
    fn names_round_trip_through_json() {
        for name in ProfileName::ALL {
            let json = serde_json::to_string(&name).unwrap();
            assert_eq!(json, format!("\"{}\"", name.as_str()));
            let back: ProfileName = serde_json::from_str(&json).unwrap();
            assert_eq!(back, name);
        }
    }
}
