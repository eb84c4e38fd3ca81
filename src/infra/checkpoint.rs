// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Persists everything needed to resume training: the 16
// parameter tensors, the Adam moment estimates and the step.
//
// Files (all overwritten on every save, latest-only):
//   model/
//     model.mpk.gz       ← Autoencoder record, full f32 precision
//     optimizer.mpk.gz   ← Adam state
//     checkpoint.json    ← { "step": N, "model": AutoencoderConfig }
//
// checkpoint.json is written last, so its presence marks a
// complete checkpoint.
//
// Restoring checks, in order:
//   1. the saved AutoencoderConfig describes the same
//      architecture as the current one (init_std is ignored)
//   2. every loaded tensor has the shape the current config
//      would allocate
// Either failure is a typed CheckpointError and aborts the run.
//
// Tensors are stored at full f32 precision
// (NamedMpkGzFileRecorder<FullPrecisionSettings>); a restored
// model is bit-identical to the saved one.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use burn::{
    optim::Optimizer,
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

use crate::ml::{
    model::{Autoencoder, AutoencoderConfig},
    shapes::first_mismatch,
};

const MODEL_FILE:     &str = "model";
const OPTIMIZER_FILE: &str = "optimizer";
const META_FILE:      &str = "checkpoint.json";

type CheckpointRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckpointError {
    #[error("checkpoint in '{dir}' was written for a different architecture")]
    ArchitectureMismatch { dir: PathBuf },

    #[error("checkpoint parameter '{name}' has shape {found:?}, current configuration requires {expected:?}")]
    ShapeMismatch { name: String, expected: Vec<usize>, found: Vec<usize> },
}

/// Contents of checkpoint.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMeta {
    /// Last completed training step
    pub step:  usize,
    pub model: AutoencoderConfig,
}

pub struct CheckpointManager {
    dir:      PathBuf,
    recorder: CheckpointRecorder,
}

impl CheckpointManager {
    /// Create the manager, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir, recorder: CheckpointRecorder::new() })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// True when a complete checkpoint is on disk
    pub fn exists(&self) -> bool {
        self.dir.join(META_FILE).is_file()
    }

    pub fn save<B, O>(
        &self,
        model:  &Autoencoder<B>,
        optim:  &O,
        config: &AutoencoderConfig,
        step:   usize,
    ) -> Result<()>
    where
        B: AutodiffBackend,
        O: Optimizer<Autoencoder<B>, B>,
    {
        let model_path = self.dir.join(MODEL_FILE);
        model
            .clone()
            .save_file(model_path.clone(), &self.recorder)
            .with_context(|| format!("Failed to save parameters to '{}'", model_path.display()))?;

        let optim_path = self.dir.join(OPTIMIZER_FILE);
        self.recorder
            .record(optim.to_record(), optim_path.clone())
            .with_context(|| format!("Failed to save optimizer state to '{}'", optim_path.display()))?;

        let meta = CheckpointMeta { step, model: config.clone() };
        let meta_path = self.dir.join(META_FILE);
        fs::write(&meta_path, serde_json::to_string_pretty(&meta)?)
            .with_context(|| format!("Failed to write '{}'", meta_path.display()))?;

        tracing::info!("Checkpoint saved at step {step} in '{}'", self.dir.display());
        Ok(())
    }

    fn load_meta(&self) -> Result<CheckpointMeta> {
        let path = self.dir.join(META_FILE);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("'{}' is not a valid checkpoint description", path.display()))
    }

    /// Restore parameters into `template`.
    ///
    /// Returns `None` when no checkpoint exists, otherwise the
    /// restored model and the step it was saved at.
    pub fn load_model<B: Backend>(
        &self,
        template: Autoencoder<B>,
        config:   &AutoencoderConfig,
        device:   &B::Device,
    ) -> Result<Option<(Autoencoder<B>, usize)>> {
        if !self.exists() {
            return Ok(None);
        }

        let meta = self.load_meta()?;
        if architecture(&meta.model)? != architecture(config)? {
            return Err(CheckpointError::ArchitectureMismatch { dir: self.dir.clone() }.into());
        }

        let model_path = self.dir.join(MODEL_FILE);
        let model = template
            .load_file(model_path.clone(), &self.recorder, device)
            .with_context(|| format!("Cannot load parameters from '{}'", model_path.display()))?;

        if let Some(m) = first_mismatch(&config.expected_shapes(), &model.parameter_shapes()) {
            return Err(CheckpointError::ShapeMismatch {
                name:     m.name,
                expected: m.expected,
                found:    m.found,
            }
            .into());
        }

        tracing::info!("Restored checkpoint from step {} in '{}'", meta.step, self.dir.display());
        Ok(Some((model, meta.step)))
    }

    /// Restore Adam state. A checkpoint without optimizer state
    /// (or no checkpoint at all) leaves `optim` untouched.
    pub fn load_optimizer<B, O>(&self, optim: O, device: &B::Device) -> Result<O>
    where
        B: AutodiffBackend,
        O: Optimizer<Autoencoder<B>, B>,
    {
        let path = self.dir.join(OPTIMIZER_FILE);
        if !self.exists() || !path.with_extension("mpk.gz").is_file() {
            tracing::warn!("No optimizer state in '{}', starting Adam from scratch", self.dir.display());
            return Ok(optim);
        }

        let record = self
            .recorder
            .load(path.clone(), device)
            .with_context(|| format!("Cannot load optimizer state from '{}'", path.display()))?;
        Ok(optim.load_record(record))
    }
}

/// The parts of a config that determine tensor shapes and wiring
fn architecture(config: &AutoencoderConfig) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(config.clone().with_init_std(0.0))?)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::tiny_config;
    use burn::optim::AdamConfig;

    type TestBackend = burn::backend::Autodiff<burn::backend::NdArray>;

    #[test]
    fn test_missing_checkpoint_is_none() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let cfg  = tiny_config(1);

        let template = cfg.init::<TestBackend>(&Default::default()).unwrap();
        assert!(!ckpt.exists());
        assert!(ckpt.load_model(template, &cfg, &Default::default()).unwrap().is_none());
    }

    #[test]
    fn test_round_trip_restores_identical_tensors() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let ckpt   = CheckpointManager::new(dir.path()).unwrap();
        let cfg    = tiny_config(1);

        let model = cfg.init::<TestBackend>(&device).unwrap();
        let optim = AdamConfig::new().init::<TestBackend, Autoencoder<TestBackend>>();
        ckpt.save(&model, &optim, &cfg, 42).unwrap();
        assert!(ckpt.exists());

        // Different random init, same architecture
        let template       = cfg.init::<TestBackend>(&device).unwrap();
        let (loaded, step) = ckpt.load_model(template, &cfg, &device).unwrap().unwrap();
        assert_eq!(step, 42);

        model.encoder.conv1.weight.val().into_data()
            .assert_eq(&loaded.encoder.conv1.weight.val().into_data(), true);
        model.decoder.upconv8.bias.val().into_data()
            .assert_eq(&loaded.decoder.upconv8.bias.val().into_data(), true);

        let images = Tensor::<TestBackend, 4>::ones([1, 1, 16, 16], &device);
        model.reconstruct(images.clone()).into_data()
            .assert_eq(&loaded.reconstruct(images).into_data(), true);

        let optim = AdamConfig::new().init::<TestBackend, Autoencoder<TestBackend>>();
        assert!(ckpt.load_optimizer(optim, &device).is_ok());
    }

    #[test]
    fn test_init_std_is_not_architecture() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let ckpt   = CheckpointManager::new(dir.path()).unwrap();
        let cfg    = tiny_config(1);

        let model = cfg.init::<TestBackend>(&device).unwrap();
        let optim = AdamConfig::new().init::<TestBackend, Autoencoder<TestBackend>>();
        ckpt.save(&model, &optim, &cfg, 0).unwrap();

        let other    = cfg.clone().with_init_std(2.0);
        let template = other.init::<TestBackend>(&device).unwrap();
        assert!(ckpt.load_model(template, &other, &device).unwrap().is_some());
    }

    #[test]
    fn test_rejects_other_architecture() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let ckpt   = CheckpointManager::new(dir.path()).unwrap();

        let saved = tiny_config(1);
        let model = saved.init::<TestBackend>(&device).unwrap();
        let optim = AdamConfig::new().init::<TestBackend, Autoencoder<TestBackend>>();
        ckpt.save(&model, &optim, &saved, 3).unwrap();

        let current  = tiny_config(3);
        let template = current.init::<TestBackend>(&device).unwrap();
        let err      = ckpt.load_model(template, &current, &device).unwrap_err();
        assert_eq!(
            err.downcast_ref::<CheckpointError>(),
            Some(&CheckpointError::ArchitectureMismatch { dir: dir.path().to_path_buf() })
        );
    }

    #[test]
    fn test_rejects_parameters_of_wrong_shape() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let ckpt   = CheckpointManager::new(dir.path()).unwrap();

        // Metadata claims depth 1, the stored tensors are depth 3
        let claimed = tiny_config(1);
        let actual  = tiny_config(3);
        let model   = actual.init::<TestBackend>(&device).unwrap();
        let optim   = AdamConfig::new().init::<TestBackend, Autoencoder<TestBackend>>();
        ckpt.save(&model, &optim, &claimed, 5).unwrap();

        let template = claimed.init::<TestBackend>(&device).unwrap();
        let err      = ckpt.load_model(template, &claimed, &device).unwrap_err();
        match err.downcast_ref::<CheckpointError>() {
            Some(CheckpointError::ShapeMismatch { name, expected, found }) => {
                assert_eq!(name, "encoder.conv1.weight");
                assert_eq!(expected, &vec![4, 1, 11, 11]);
                assert_eq!(found, &vec![4, 3, 11, 11]);
            }
            other => panic!("expected a shape mismatch, got {other:?}"),
        }
    }
}
