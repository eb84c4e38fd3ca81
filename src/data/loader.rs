// ============================================================
// Layer 4 — Image Loader
// ============================================================
// Expands a file glob into the list of candidate training
// images and decodes individual files with the `image` crate.
//
// The glob is expanded exactly once, when the loader is built.
// Files added to the directory afterwards are not picked up
// until the process restarts.
//
// Decoding converts every file to the configured colour depth:
//   depth 1 → 8-bit luma
//   depth 3 → 8-bit RGB (alpha dropped)
//
// Reference: glob crate documentation
//            image crate documentation (DynamicImage)

use anyhow::{bail, Context, Result};
use image::DynamicImage;
use std::path::{Path, PathBuf};

use crate::domain::image_spec::Depth;

/// The set of files a glob pattern matched.
pub struct ImageLoader {
    pattern: String,
    paths:   Vec<PathBuf>,
}

impl ImageLoader {
    /// Expand `pattern` and keep every regular file it matches.
    /// An invalid pattern or an empty match set is an error.
    pub fn from_glob(pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();

        let entries = glob::glob(&pattern)
            .with_context(|| format!("Invalid image glob '{pattern}'"))?;

        let mut paths = Vec::new();
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => paths.push(path),
                Ok(_)                      => {}
                // Unreadable directory entries are not fatal
                Err(e) => tracing::warn!("Skipping unreadable glob entry: {}", e),
            }
        }

        if paths.is_empty() {
            bail!("No image files match '{pattern}'");
        }

        tracing::info!("Found {} candidate images for '{}'", paths.len(), pattern);
        Ok(Self { pattern, paths })
    }

    pub fn pattern(&self) -> &str { &self.pattern }

    pub fn paths(&self) -> &[PathBuf] { &self.paths }

    pub fn len(&self) -> usize { self.paths.len() }
}

/// Decode one file and convert it to the requested depth.
pub fn decode_image(path: &Path, depth: Depth) -> Result<DynamicImage> {
    let img = image::open(path)
        .with_context(|| format!("Cannot decode '{}'", path.display()))?;

    Ok(match depth {
        Depth::Grayscale => DynamicImage::ImageLuma8(img.to_luma8()),
        Depth::Rgb       => DynamicImage::ImageRgb8(img.to_rgb8()),
    })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use image::{ColorType, RgbImage};
    use tempfile::tempdir;

    #[test]
    fn test_glob_matches_files_only() {
        let dir = tempdir().unwrap();
        for name in ["a.png", "b.png"] {
            RgbImage::new(4, 4).save(dir.path().join(name)).unwrap();
        }
        std::fs::create_dir(dir.path().join("c.png")).unwrap();

        let pattern = format!("{}/*.png", dir.path().display());
        let loader  = ImageLoader::from_glob(pattern).unwrap();
        assert_eq!(loader.len(), 2);
    }

    #[test]
    fn test_empty_match_is_an_error() {
        let dir     = tempdir().unwrap();
        let pattern = format!("{}/*.jpg", dir.path().display());
        assert!(ImageLoader::from_glob(pattern).is_err());
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        assert!(ImageLoader::from_glob("[").is_err());
    }

    #[test]
    fn test_decode_converts_depth() {
        let dir  = tempdir().unwrap();
        let path = dir.path().join("rgb.png");
        RgbImage::from_pixel(3, 2, image::Rgb([10, 200, 30])).save(&path).unwrap();

        let gray = decode_image(&path, Depth::Grayscale).unwrap();
        assert_eq!(gray.color(), ColorType::L8);
        assert_eq!((gray.width(), gray.height()), (3, 2));

        let rgb = decode_image(&path, Depth::Rgb).unwrap();
        assert_eq!(rgb.color(), ColorType::Rgb8);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let dir  = tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();
        assert!(decode_image(&path, Depth::Grayscale).is_err());
    }
}
