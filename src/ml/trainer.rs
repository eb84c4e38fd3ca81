// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Step-based loop over an endless BatchSource with Adam.
//
//   restore   → fresh parameters, or the latest checkpoint
//               (parameters + Adam state), resuming at step + 1
//   train     → for step in start..iterations:
//                 batch → L1 loss → backward → Adam step
//   report    → every report_interval steps (step 0 included):
//                 checkpoint, sample image, metrics row
//
// `iterations` is an absolute budget: a run restored at step
// 500 with iterations = 1000 performs 499 more steps.
//
// Key Burn insight:
//   - Training uses MyBackend (Autodiff<Wgpu>) for gradients
//   - model.valid() gives the same parameters on the inner
//     backend; sampling runs there, without a graph
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::{ensure, Result};
use burn::{
    data::dataloader::batcher::Batcher,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::batcher::ImageBatcher;
use crate::domain::traits::BatchSource;
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{MetricsLogger, StepMetrics},
};
use crate::ml::{
    decoder::shared_decoder,
    model::AutoencoderConfig,
    renderer::SampleRenderer,
};

type MyBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

/// What a call to the training loop actually did
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSummary {
    /// First step run by this call (0 unless resumed)
    pub start_step:      usize,
    pub steps_run:       usize,
    /// Loss of the final step, None if no step ran
    pub last_loss:       Option<f64>,
    /// Step of the last checkpoint this call wrote
    pub last_saved_step: Option<usize>,
}

pub fn run_training(
    cfg:      &TrainConfig,
    source:   &mut impl BatchSource,
    ckpt:     &CheckpointManager,
    metrics:  &MetricsLogger,
    renderer: &mut SampleRenderer,
) -> Result<TrainingSummary> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    train_loop::<MyBackend>(cfg, &cfg.model_config(), source, ckpt, metrics, renderer, &device)
}

pub fn train_loop<B: AutodiffBackend>(
    cfg:       &TrainConfig,
    model_cfg: &AutoencoderConfig,
    source:    &mut impl BatchSource,
    ckpt:      &CheckpointManager,
    metrics:   &MetricsLogger,
    renderer:  &mut SampleRenderer,
    device:    &B::Device,
) -> Result<TrainingSummary> {
    ensure!(cfg.report_interval > 0, "report interval must be greater than zero");
    model_cfg.validate()?;

    if let Some(seed) = cfg.seed {
        B::seed(seed);
    }

    // ── Build or restore the model ────────────────────────────────────────────
    let fresh     = model_cfg.init::<B>(device)?;
    let mut optim = AdamConfig::new().init();

    let (mut model, start_step) = match ckpt.load_model(fresh.clone(), model_cfg, device)? {
        Some((restored, step)) => {
            optim = ckpt.load_optimizer(optim, device)?;
            (restored, step + 1)
        }
        None => (fresh, 0),
    };
    tracing::info!(
        "Model ready: latent size {}, {} parameter tensors, starting at step {}",
        model_cfg.encoder.representation_size,
        model.parameter_shapes().len(),
        start_step,
    );
    tracing::info!("Dropout rate {} is recorded but not applied", cfg.dropout_rate);

    if start_step > 0 && start_step >= cfg.iterations {
        tracing::info!("Checkpoint already at step {}, nothing to train", start_step - 1);
    }

    let batcher = ImageBatcher::<B>::new(device.clone());
    let mut summary = TrainingSummary {
        start_step,
        steps_run:       0,
        last_loss:       None,
        last_saved_step: None,
    };

    // ── Step loop ─────────────────────────────────────────────────────────────
    for step in start_step..cfg.iterations {
        let samples = source.next_batch()?;
        tracing::info!(
            "Step {step}: loaded {}",
            samples.iter().map(|s| s.source.display().to_string()).collect::<Vec<_>>().join(", "),
        );
        let images = batcher.batch(samples).images;

        let loss = model.forward_loss(images.clone());
        let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
        if !loss_val.is_finite() {
            tracing::warn!("Step {step}: loss is {loss_val}");
        }

        // Backward pass + Adam update of all 16 tensors
        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &model);
        model = optim.step(cfg.lr, model, grads);

        summary.steps_run += 1;
        summary.last_loss  = Some(loss_val);

        if step % cfg.report_interval != 0 {
            continue;
        }

        // ── Report: checkpoint → sample → metrics ─────────────────────────────
        ckpt.save(&model, &optim, model_cfg, step)?;
        summary.last_saved_step = Some(step);

        let valid    = model.valid();
        let decoder  = shared_decoder(&model_cfg.decoder, valid.decoder.clone())?;
        let rendered = renderer.render(&valid.encoder, &decoder, images.inner(), step)?;

        metrics.log(&StepMetrics::new(step, loss_val, rendered.latent_min, rendered.latent_max))?;

        tracing::info!(
            "Step {:>6}/{} | loss={:.4} | latent=[{:.4}, {:.4}] | sample '{}'",
            step, cfg.iterations, loss_val,
            rendered.latent_min, rendered.latent_max,
            rendered.path.display(),
        );
    }

    tracing::info!("Training complete after {} steps", summary.steps_run);
    Ok(summary)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::ImageSample;
    use crate::domain::image_spec::ImageGeometry;
    use crate::ml::model::tiny_config;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::path::{Path, PathBuf};

    type TestBackend = burn::backend::Autodiff<burn::backend::NdArray>;

    /// Uniform noise images, 16×16 grayscale
    struct NoiseSource {
        rng:     StdRng,
        fetched: usize,
    }

    impl NoiseSource {
        fn new(seed: u64) -> Self {
            Self { rng: StdRng::seed_from_u64(seed), fetched: 0 }
        }
    }

    impl BatchSource for NoiseSource {
        fn next_batch(&mut self) -> Result<Vec<ImageSample>> {
            self.fetched += 1;
            let geometry = ImageGeometry::new(16, 16, 1)?;
            let pixels   = (0..geometry.values_per_sample()).map(|_| self.rng.gen::<f32>()).collect();
            Ok(vec![ImageSample { source: PathBuf::from("noise"), geometry, pixels }])
        }
    }

    fn config(dir: &Path, iterations: usize, report_interval: usize) -> TrainConfig {
        TrainConfig {
            image_glob:      "unused".to_string(),
            checkpoint_dir:  dir.join("model").display().to_string(),
            sample_dir:      dir.display().to_string(),
            iterations,
            report_interval,
            lr:              1e-3,
            seed:            Some(7),
            ..TrainConfig::default()
        }
    }

    fn run(cfg: &TrainConfig) -> TrainingSummary {
        run_with(cfg, &mut NoiseSource::new(11))
    }

    fn run_with(cfg: &TrainConfig, source: &mut NoiseSource) -> TrainingSummary {
        let ckpt         = CheckpointManager::new(&cfg.checkpoint_dir).unwrap();
        let metrics      = MetricsLogger::new(&cfg.checkpoint_dir).unwrap();
        let mut renderer = SampleRenderer::new(&cfg.sample_dir, Some(1)).unwrap();

        train_loop::<TestBackend>(
            cfg, &tiny_config(1), source, &ckpt, &metrics, &mut renderer, &Default::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_single_iteration_from_fresh_parameters() {
        let dir     = tempfile::tempdir().unwrap();
        let cfg     = config(dir.path(), 1, 100);
        let summary = run(&cfg);

        assert_eq!(summary.start_step, 0);
        assert_eq!(summary.steps_run, 1);
        assert!(summary.last_loss.unwrap().is_finite());
        assert_eq!(summary.last_saved_step, Some(0));

        // Step 0 is a report step
        let model_dir = dir.path().join("model");
        assert!(model_dir.join("checkpoint.json").is_file());
        assert!(model_dir.join("model.mpk.gz").is_file());
        assert!(model_dir.join("metrics.csv").is_file());
        assert!(dir.path().join("test_0.jpg").is_file());
    }

    #[test]
    fn test_reports_on_interval() {
        let dir     = tempfile::tempdir().unwrap();
        let mut src = NoiseSource::new(11);
        let summary = run_with(&config(dir.path(), 6, 2), &mut src);

        // One batch per step; step 5 is not a report step
        assert_eq!(src.fetched, 6);
        assert_eq!(summary.steps_run, 6);
        assert_eq!(summary.last_saved_step, Some(4));

        for step in [0, 2, 4] {
            assert!(dir.path().join(format!("test_{step}.jpg")).is_file());
        }
        assert!(!dir.path().join("test_1.jpg").exists());
        assert!(!dir.path().join("test_5.jpg").exists());

        let csv = std::fs::read_to_string(dir.path().join("model/metrics.csv")).unwrap();
        assert_eq!(csv.lines().count(), 4);
    }

    #[test]
    fn test_resumes_after_saved_step() {
        let dir = tempfile::tempdir().unwrap();

        let first = run(&config(dir.path(), 3, 1));
        assert_eq!((first.start_step, first.steps_run), (0, 3));

        // Checkpoint holds step 2, so the budget of 5 leaves steps 3 and 4
        let resumed = run(&config(dir.path(), 5, 1));
        assert_eq!((resumed.start_step, resumed.steps_run), (3, 2));

        // Budget already spent
        let idle = run(&config(dir.path(), 5, 1));
        assert_eq!(
            idle,
            TrainingSummary { start_step: 5, steps_run: 0, last_loss: None, last_saved_step: None }
        );
    }

    #[test]
    fn test_rejects_zero_report_interval() {
        let dir          = tempfile::tempdir().unwrap();
        let cfg          = config(dir.path(), 1, 0);
        let ckpt         = CheckpointManager::new(&cfg.checkpoint_dir).unwrap();
        let metrics      = MetricsLogger::new(&cfg.checkpoint_dir).unwrap();
        let mut renderer = SampleRenderer::new(&cfg.sample_dir, None).unwrap();
        let mut source   = NoiseSource::new(0);

        let result = train_loop::<TestBackend>(
            &cfg, &tiny_config(1), &mut source, &ckpt, &metrics, &mut renderer, &Default::default(),
        );
        assert!(result.is_err());
    }
}
