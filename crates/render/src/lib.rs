//! Random pixel synthesis and image encoding.

pub mod encode;
pub mod registry;
pub mod synth;

pub use encode::{data_uri, encode, encode_or_empty, EncodeError, QualityPreset};
pub use synth::{synthesize, Color, PixelBuffer};
