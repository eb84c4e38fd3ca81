// ============================================================
// Layer 3 — Image Geometry Domain Types
// ============================================================
// Plain descriptions of the images the system works with:
//
//   Depth         — 1 channel (grayscale) or 3 channels (RGB).
//                   Nothing else is a valid configuration.
//   ResizeMode    — how a source image is fitted to the canvas
//   ImageGeometry — target canvas: width × height × depth
//   ConfigError   — fatal configuration problems, raised before
//                   any training step runs
//
// Reference: Rust Book §6 (Enums), §9 (Error Handling)

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Colour depth of every image fed to (or produced by) the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Depth {
    Grayscale,
    Rgb,
}

impl Depth {
    /// Number of channels a pixel of this depth carries
    pub fn channels(self) -> usize {
        match self {
            Depth::Grayscale => 1,
            Depth::Rgb       => 3,
        }
    }
}

impl TryFrom<usize> for Depth {
    type Error = ConfigError;

    fn try_from(channels: usize) -> Result<Self, Self::Error> {
        match channels {
            1 => Ok(Depth::Grayscale),
            3 => Ok(Depth::Rgb),
            n => Err(ConfigError::UnsupportedDepth(n)),
        }
    }
}

/// How a source image of arbitrary size is mapped onto the fixed canvas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResizeMode {
    /// Scale the larger side to fit, pad the rest with black
    #[default]
    Letterbox,
    /// Scale the smaller side to fit, cut the centred window
    CenterCrop,
}

/// The fixed canvas every training sample is fitted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageGeometry {
    pub width:  u32,
    pub height: u32,
    pub depth:  Depth,
}

impl ImageGeometry {
    /// Build a geometry from raw configuration values.
    /// Fails on a zero-sized canvas or an unsupported depth.
    pub fn new(width: u32, height: u32, depth: usize) -> Result<Self, ConfigError> {
        if width == 0 || height == 0 {
            return Err(ConfigError::EmptyCanvas { width, height });
        }
        Ok(Self { width, height, depth: Depth::try_from(depth)? })
    }

    pub fn channels(&self) -> usize {
        self.depth.channels()
    }

    /// Number of f32 values in one normalised sample
    pub fn values_per_sample(&self) -> usize {
        self.channels() * self.width as usize * self.height as usize
    }
}

/// Configuration errors. All of them abort the run before training starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unsupported image depth {0}: expected 1 (grayscale) or 3 (rgb)")]
    UnsupportedDepth(usize),

    #[error("image canvas must be non-empty, got {width}x{height}")]
    EmptyCanvas { width: u32, height: u32 },

    #[error("{0} must be greater than zero")]
    ZeroSized(&'static str),

    #[error(
        "decoder dense width {width} cannot be unflattened into \
         {channels}x{size}x{size} (= {})", .channels * .size * .size
    )]
    DecoderWidthMismatch { width: usize, channels: usize, size: usize },

    #[error("cannot up-convolve {from} px to {to} px: {to} is not a whole multiple of {from}")]
    UpsampleRatio { from: usize, to: usize },

    #[error("no padding makes a {kernel}x{kernel} up-convolution with stride {stride} land on an exact size")]
    UpsamplePadding { kernel: usize, stride: usize },

    #[error("encoder produces {encoder}-wide latents but the decoder expects {decoder}")]
    RepresentationMismatch { encoder: usize, decoder: usize },

    #[error("decoder parameter '{name}' has shape {found:?}, configuration requires {expected:?}")]
    SharedShapeMismatch { name: String, expected: Vec<usize>, found: Vec<usize> },
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_depths() {
        assert_eq!(Depth::try_from(1), Ok(Depth::Grayscale));
        assert_eq!(Depth::try_from(3), Ok(Depth::Rgb));
        assert_eq!(Depth::Rgb.channels(), 3);
    }

    #[test]
    fn test_rejects_other_depths() {
        for bad in [0, 2, 4] {
            assert_eq!(Depth::try_from(bad), Err(ConfigError::UnsupportedDepth(bad)));
        }
    }

    #[test]
    fn test_geometry_validation() {
        let g = ImageGeometry::new(256, 128, 3).unwrap();
        assert_eq!(g.values_per_sample(), 3 * 256 * 128);

        assert_eq!(
            ImageGeometry::new(0, 128, 1),
            Err(ConfigError::EmptyCanvas { width: 0, height: 128 })
        );
        assert_eq!(ImageGeometry::new(8, 8, 2), Err(ConfigError::UnsupportedDepth(2)));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_values_per_sample_past_u32_range() {
        // 70000² overflows u32
        let g = ImageGeometry::new(70_000, 70_000, 3).unwrap();
        assert_eq!(g.values_per_sample(), 3 * 70_000usize * 70_000usize);
    }

    #[test]
    fn test_default_resize_mode_is_letterbox() {
        assert_eq!(ResizeMode::default(), ResizeMode::Letterbox);
    }
}
