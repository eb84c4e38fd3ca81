// ============================================================
// Layer 1 — CLI Arguments
// ============================================================
// One positional argument (the image glob) plus optional
// hyperparameter flags. Defaults reproduce the classic run:
// 256×256 grayscale, latent size 64, Adam at 0.1, 100k steps.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::Args;

use crate::application::train_use_case::TrainConfig;
use crate::domain::image_spec::ResizeMode;

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Glob matching the training images, e.g. "data/*.jpg"
    pub images_glob: String,

    /// Total number of training steps (resumed runs count from the checkpoint)
    #[arg(long, default_value_t = 100_000)]
    pub iterations: usize,

    /// Checkpoint, log metrics and write a sample every N steps
    #[arg(long, default_value_t = 100)]
    pub report_interval: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 0.1)]
    pub lr: f64,

    /// Length of the latent vector
    #[arg(long, default_value_t = 64)]
    pub representation_size: usize,

    #[arg(long, default_value_t = 1)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 256)]
    pub width: u32,

    #[arg(long, default_value_t = 256)]
    pub height: u32,

    /// Colour channels: 1 (grayscale) or 3 (rgb)
    #[arg(long, default_value_t = 1)]
    pub depth: usize,

    /// Crop to fill the canvas instead of letterboxing
    #[arg(long)]
    pub center_crop: bool,

    /// Directory for the checkpoint, train_config.json and metrics.csv
    #[arg(long, default_value = "model")]
    pub checkpoint_dir: String,

    /// Directory for test_{step}.jpg samples
    #[arg(long, default_value = ".")]
    pub sample_dir: String,

    /// Seed for file sampling, latent sampling and parameter init
    #[arg(long)]
    pub seed: Option<u64>,

    /// Standard deviation of the normal parameter initialiser
    #[arg(long, default_value_t = 1.0)]
    pub init_std: f64,

    /// Recorded in train_config.json; not applied by any layer
    #[arg(long, default_value_t = 0.8)]
    pub dropout_rate: f64,
}

/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            image_glob:          a.images_glob,
            checkpoint_dir:      a.checkpoint_dir,
            sample_dir:          a.sample_dir,
            iterations:          a.iterations,
            report_interval:     a.report_interval,
            lr:                  a.lr,
            dropout_rate:        a.dropout_rate,
            representation_size: a.representation_size,
            batch_size:          a.batch_size,
            image_width:         a.width,
            image_height:        a.height,
            image_depth:         a.depth,
            resize_mode:         if a.center_crop { ResizeMode::CenterCrop } else { ResizeMode::Letterbox },
            seed:                a.seed,
            init_std:            a.init_std,
        }
    }
}
