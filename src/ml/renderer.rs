// ============================================================
// Layer 5 — Sample Renderer
// ============================================================
// Shows what the decoder has learned by decoding a RANDOM
// latent vector rather than the encoding of a real image.
//
//   1. encode the current batch           → latent
//   2. lo = min(latent), hi = max(latent)  (over the whole tensor)
//   3. draw a fresh latent uniformly from [lo, hi] per coordinate
//      (every coordinate = lo when the range is empty)
//   4. decode it with the trained decoder parameters
//   5. stretch the first image to [0, 255], flat images → black
//   6. write {output_dir}/test_{step}.jpg
//
// Reference: image crate documentation (ImageBuffer::from_raw)

use anyhow::{anyhow, Context, Result};
use burn::{prelude::*, tensor::TensorData};
use image::{GrayImage, RgbImage};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::ml::{decoder::Decoder, encoder::Encoder};

/// Where a sample went and the latent range it was drawn from
#[derive(Debug, Clone)]
pub struct RenderedSample {
    pub path:       PathBuf,
    pub latent_min: f32,
    pub latent_max: f32,
}

pub struct SampleRenderer {
    output_dir: PathBuf,
    rng:        StdRng,
}

/// The run seed also drives file sampling; offset it so latent draws
/// follow a different stream.
fn latent_seed(seed: u64) -> u64 {
    seed.wrapping_add(1)
}

impl SampleRenderer {
    pub fn new(output_dir: impl Into<PathBuf>, seed: Option<u64>) -> Result<Self> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir)
            .with_context(|| format!("Cannot create sample directory '{}'", output_dir.display()))?;

        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(latent_seed(s)),
            None    => StdRng::from_entropy(),
        };
        Ok(Self { output_dir, rng })
    }

    pub fn sample_path(&self, step: usize) -> PathBuf {
        self.output_dir.join(format!("test_{step}.jpg"))
    }

    pub fn render<B: Backend, D: Decoder<B>>(
        &mut self,
        encoder: &Encoder<B>,
        decoder: &D,
        images:  Tensor<B, 4>,
        step:    usize,
    ) -> Result<RenderedSample> {
        let device = images.device();

        let latent = encoder.forward(images);
        let [batch, latent_width] = latent.dims();
        let values = tensor_values(latent)?;

        let (latent_min, latent_max) = value_range(&values);
        let drawn = resample_latent(&mut self.rng, latent_min, latent_max, batch * latent_width);

        let latent  = Tensor::<B, 2>::from_data(TensorData::new(drawn, [batch, latent_width]), &device);
        let decoded = decoder.decode(latent);

        let [_, channels, height, width] = decoded.dims();
        let first = decoded.slice([0..1]).reshape([channels, height, width]);
        let bytes = to_image_bytes(&tensor_values(first)?, channels, height, width);

        let path = self.sample_path(step);
        write_image(&path, bytes, channels, width as u32, height as u32)?;

        tracing::debug!(
            "Step {step}: wrote '{}' (latent range [{latent_min:.4}, {latent_max:.4}])",
            path.display()
        );
        Ok(RenderedSample { path, latent_min, latent_max })
    }
}

fn tensor_values<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| anyhow!("Cannot read tensor values: {e:?}"))
}

/// (min, max) over the finite values; (0, 0) when there are none
fn value_range(values: &[f32]) -> (f32, f32) {
    let mut finite = values.iter().copied().filter(|v| v.is_finite());
    match finite.next() {
        Some(first) => finite.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))),
        None        => (0.0, 0.0),
    }
}

/// `len` values uniform in [lo, hi); all `lo` when the range is empty.
pub fn resample_latent(rng: &mut impl Rng, lo: f32, hi: f32, len: usize) -> Vec<f32> {
    if hi > lo {
        (0..len).map(|_| rng.gen_range(lo..hi)).collect()
    } else {
        vec![lo; len]
    }
}

/// Channel-major floats → interleaved 8-bit pixels, min/max stretched.
/// A flat (or entirely non-finite) image becomes all zeros.
pub fn to_image_bytes(values: &[f32], channels: usize, height: usize, width: usize) -> Vec<u8> {
    let plane = height * width;
    let (lo, hi) = value_range(values);
    let span = hi - lo;

    let mut bytes = vec![0u8; plane * channels];
    if span <= 0.0 {
        return bytes;
    }
    for c in 0..channels {
        for p in 0..plane {
            let v = values[c * plane + p];
            if v.is_finite() {
                bytes[p * channels + c] = ((v - lo) / span * 255.0).round().clamp(0.0, 255.0) as u8;
            }
        }
    }
    bytes
}

fn write_image(path: &Path, bytes: Vec<u8>, channels: usize, width: u32, height: u32) -> Result<()> {
    let saved = match channels {
        1 => GrayImage::from_raw(width, height, bytes)
            .context("Decoded sample does not fill a grayscale image")?
            .save(path),
        3 => RgbImage::from_raw(width, height, bytes)
            .context("Decoded sample does not fill an RGB image")?
            .save(path),
        n => return Err(anyhow!("Cannot write a {n}-channel sample")),
    };
    saved.with_context(|| format!("Cannot write sample '{}'", path.display()))
}
