// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates a training run in order:
//
//   Step 1: Validate the configuration     (Layer 3 - domain)
//   Step 2: Expand the image glob          (Layer 4 - data)
//   Step 3: Build the random sampler       (Layer 4 - data)
//   Step 4: Save config, open checkpoints  (Layer 6 - infra)
//   Step 5: Run the training loop          (Layer 5 - ml)
//
// Everything that can be wrong with the configuration is
// reported here, before a single image is decoded or a
// parameter allocated.
//
// Reference: Rust Book §9 (Error Handling)

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::data::{loader::ImageLoader, preprocessor::Preprocessor, sampler::ImageSampler};
use crate::domain::image_spec::{ImageGeometry, ResizeMode};
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsLogger};
use crate::ml::{
    model::AutoencoderConfig,
    renderer::SampleRenderer,
    trainer::{run_training, TrainingSummary},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All knobs of a training run. Saved as train_config.json next
// to the checkpoint so a run can be inspected afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub image_glob:          String,
    pub checkpoint_dir:      String,
    /// Where test_{step}.jpg samples are written
    pub sample_dir:          String,
    /// Absolute step budget, shared across resumed runs
    pub iterations:          usize,
    pub report_interval:     usize,
    pub lr:                  f64,
    /// Logged only; no layer applies dropout
    pub dropout_rate:        f64,
    pub representation_size: usize,
    pub batch_size:          usize,
    pub image_width:         u32,
    pub image_height:        u32,
    pub image_depth:         usize,
    pub resize_mode:         ResizeMode,
    /// None seeds from the operating system
    pub seed:                Option<u64>,
    pub init_std:            f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            image_glob:          String::new(),
            checkpoint_dir:      "model".to_string(),
            sample_dir:          ".".to_string(),
            iterations:          100_000,
            report_interval:     100,
            lr:                  0.1,
            dropout_rate:        0.8,
            representation_size: 64,
            batch_size:          1,
            image_width:         256,
            image_height:        256,
            image_depth:         1,
            resize_mode:         ResizeMode::Letterbox,
            seed:                None,
            init_std:            1.0,
        }
    }
}

impl TrainConfig {
    pub fn geometry(&self) -> Result<ImageGeometry> {
        Ok(ImageGeometry::new(self.image_width, self.image_height, self.image_depth)?)
    }

    /// Network reconstructing images of the configured size and depth
    pub fn model_config(&self) -> AutoencoderConfig {
        AutoencoderConfig::for_images(
            self.image_height as usize,
            self.image_width as usize,
            self.image_depth,
            self.representation_size,
        )
        .with_init_std(self.init_std)
    }

    /// Every fatal configuration problem, checked up front
    pub fn validate(&self) -> Result<()> {
        self.geometry()?;
        self.model_config().validate()?;
        ensure!(self.batch_size > 0, "batch size must be greater than zero");
        ensure!(self.report_interval > 0, "report interval must be greater than zero");
        ensure!(self.lr.is_finite() && self.lr > 0.0, "learning rate must be positive, got {}", self.lr);
        ensure!(self.init_std > 0.0, "init std must be positive, got {}", self.init_std);
        Ok(())
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        let path = dir.join("train_config.json");
        fs::write(&path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<TrainingSummary> {
        let cfg = &self.config;

        // ── Step 1: Validate ──────────────────────────────────────────────────
        cfg.validate().context("Invalid training configuration")?;
        let geometry = cfg.geometry()?;

        // ── Step 2: Expand the glob ───────────────────────────────────────────
        let loader = ImageLoader::from_glob(&cfg.image_glob)?;

        // ── Step 3: Sampler ───────────────────────────────────────────────────
        let preprocessor = Preprocessor::new(geometry, cfg.resize_mode);
        let mut sampler  = ImageSampler::new(loader, preprocessor, cfg.batch_size, cfg.seed);
        tracing::info!(
            "Sampling batches of {} from a {}x{}x{} canvas ({:?})",
            cfg.batch_size, geometry.width, geometry.height, geometry.channels(), cfg.resize_mode,
        );

        // ── Step 4: Persistence ───────────────────────────────────────────────
        let ckpt     = CheckpointManager::new(&cfg.checkpoint_dir)?;
        let metrics  = MetricsLogger::new(&cfg.checkpoint_dir)?;
        let mut renderer = SampleRenderer::new(&cfg.sample_dir, cfg.seed)?;
        cfg.save(ckpt.dir())?;

        // ── Step 5: Train ─────────────────────────────────────────────────────
        let summary = run_training(cfg, &mut sampler, &ckpt, &metrics, &mut renderer)?;
        if let Some(loss) = summary.last_loss {
            tracing::info!("Final loss {:.4} after {} steps", loss, summary.steps_run);
        }
        Ok(summary)
    }
}
