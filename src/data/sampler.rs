// ============================================================
// Layer 4 — Random Image Sampler
// ============================================================
// Turns the glob's file list into an endless stream of
// training batches.
//
// For every slot in a batch:
//   1. draw a file uniformly at random (with replacement)
//   2. decode + convert to the configured depth
//   3. letterbox (or crop) onto the canvas
//   4. normalise to [0, 1]
//
// A file that fails to decode or normalise is logged and
// replaced by another random draw, so a batch is never short.
// Only when `max_consecutive_failures` draws in a row fail does
// the sampler give up with an error.
//
// The stream itself never ends: the training loop owns the
// iteration bound. Restarting the process restarts the stream.
//
// Reference: rand crate documentation (StdRng, gen_range)
//            Rust Book §13 (Iterators)

use anyhow::{bail, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::data::{
    dataset::ImageSample,
    loader::{decode_image, ImageLoader},
    preprocessor::Preprocessor,
};
use crate::domain::traits::BatchSource;

pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: usize = 1000;

/// Endless random batches drawn from a fixed set of files.
pub struct ImageSampler {
    loader:                   ImageLoader,
    preprocessor:             Preprocessor,
    batch_size:               usize,
    rng:                      StdRng,
    max_consecutive_failures: usize,
}

impl ImageSampler {
    /// `seed = None` seeds from the operating system.
    pub fn new(
        loader:       ImageLoader,
        preprocessor: Preprocessor,
        batch_size:   usize,
        seed:         Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None    => StdRng::from_entropy(),
        };
        Self {
            loader,
            preprocessor,
            batch_size,
            rng,
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
        }
    }

    /// Pick the index of the next file, uniformly with replacement.
    pub fn draw_index(&mut self) -> usize {
        self.rng.gen_range(0..self.loader.len())
    }

    /// Decode, fit and normalise one file. None means the fitted
    /// canvas came out with the wrong size and the draw is skipped.
    fn load_sample(&self, index: usize) -> Result<Option<ImageSample>> {
        let path     = &self.loader.paths()[index];
        let geometry = self.preprocessor.geometry();

        let decoded = decode_image(path, geometry.depth)?;
        let fitted  = self.preprocessor.fit(&decoded);

        let fits = self.preprocessor.fits_canvas(&fitted);
        debug_assert!(
            fits,
            "'{}' was fitted to {}x{}, expected {}x{}",
            path.display(), fitted.width(), fitted.height(), geometry.width, geometry.height
        );
        if !fits {
            tracing::warn!("Image '{}' does not fill the canvas. Skipping.", path.display());
            return Ok(None);
        }

        let pixels = self.preprocessor.normalize(&fitted)?;
        tracing::debug!("Loaded image {}", path.display());

        Ok(Some(ImageSample { source: path.clone(), geometry, pixels }))
    }
}

impl BatchSource for ImageSampler {
    fn next_batch(&mut self) -> Result<Vec<ImageSample>> {
        let mut batch    = Vec::with_capacity(self.batch_size);
        let mut failures = 0usize;

        while batch.len() < self.batch_size {
            let index = self.draw_index();

            match self.load_sample(index) {
                Ok(Some(sample)) => {
                    failures = 0;
                    batch.push(sample);
                    continue;
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(
                    "Problem loading image {}: {:#}",
                    self.loader.paths()[index].display(),
                    e
                ),
            }

            failures += 1;
            if failures >= self.max_consecutive_failures {
                bail!(
                    "{} consecutive images from '{}' failed to load",
                    failures,
                    self.loader.pattern()
                );
            }
        }

        Ok(batch)
    }
}

impl Iterator for ImageSampler {
    type Item = Result<Vec<ImageSample>>;

    /// Never returns None.
    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_batch())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::image_spec::{ImageGeometry, ResizeMode};
    use image::{GrayImage, Luma, Rgb, RgbImage};
    use std::path::Path;
    use tempfile::tempdir;

    fn write_fixture_jpegs(dir: &Path) {
        GrayImage::from_fn(320, 200, |x, y| Luma([((x + y) % 256) as u8]))
            .save(dir.join("gray_wide.jpg"))
            .unwrap();
        RgbImage::from_fn(120, 300, |x, _| Rgb([x as u8, 80, 160]))
            .save(dir.join("rgb_tall.jpg"))
            .unwrap();
        RgbImage::from_pixel(256, 256, Rgb([255, 255, 255]))
            .save(dir.join("white_square.jpg"))
            .unwrap();
    }

    fn sampler_for(dir: &Path, batch_size: usize) -> ImageSampler {
        let loader = ImageLoader::from_glob(format!("{}/*.jpg", dir.display())).unwrap();
        let pre    = Preprocessor::new(ImageGeometry::new(256, 256, 1).unwrap(), ResizeMode::Letterbox);
        ImageSampler::new(loader, pre, batch_size, Some(7))
    }

    #[test]
    fn test_yields_full_normalised_batches() {
        let dir = tempdir().unwrap();
        write_fixture_jpegs(dir.path());
        let sampler = sampler_for(dir.path(), 1);

        let batches: Vec<_> = sampler.take(10).collect::<Result<_>>().unwrap();
        assert_eq!(batches.len(), 10);
        for batch in &batches {
            assert_eq!(batch.len(), 1);
            let sample = &batch[0];
            assert_eq!((sample.channels(), sample.height(), sample.width()), (1, 256, 256));
            assert_eq!(sample.pixels.len(), 256 * 256);
            assert!(sample.pixels.iter().all(|v| (0.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn test_draws_every_file() {
        let dir = tempdir().unwrap();
        write_fixture_jpegs(dir.path());
        let mut sampler = sampler_for(dir.path(), 1);

        let mut counts = [0usize; 3];
        for _ in 0..10_000 {
            counts[sampler.draw_index()] += 1;
        }
        assert!(counts.iter().all(|&c| c > 0), "{counts:?}");
        // Uniform: each file should land near 3333
        assert!(counts.iter().all(|&c| c > 2500), "{counts:?}");
    }

    #[test]
    fn test_skips_broken_files() {
        let dir = tempdir().unwrap();
        write_fixture_jpegs(dir.path());
        std::fs::write(dir.path().join("broken.jpg"), b"not an image").unwrap();
        let mut sampler = sampler_for(dir.path(), 4);

        for _ in 0..5 {
            let batch = sampler.next_batch().unwrap();
            assert_eq!(batch.len(), 4);
            assert!(batch.iter().all(|s| !s.source.ends_with("broken.jpg")));
        }
    }

    #[test]
    fn test_gives_up_when_nothing_decodes() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"junk").unwrap();
        std::fs::write(dir.path().join("b.jpg"), b"more junk").unwrap();

        let mut sampler = sampler_for(dir.path(), 1);
        sampler.max_consecutive_failures = 5;
        assert!(sampler.next_batch().is_err());
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let dir = tempdir().unwrap();
        write_fixture_jpegs(dir.path());
        let mut a = sampler_for(dir.path(), 1);
        let mut b = sampler_for(dir.path(), 1);

        let seq_a: Vec<usize> = (0..50).map(|_| a.draw_index()).collect();
        let seq_b: Vec<usize> = (0..50).map(|_| b.draw_index()).collect();
        assert_eq!(seq_a, seq_b);
    }
}
