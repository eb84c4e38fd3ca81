// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one CSV row per report interval.
//
// Columns:
//   step:       the training step the row was taken at
//   loss:       L1 loss of that step's batch (sum, not mean)
//   latent_min: smallest latent value of the batch encoding
//   latent_max: largest latent value of the batch encoding
//
// Output file: {checkpoint_dir}/metrics.csv
//
// Example:
//   step,loss,latent_min,latent_max
//   0,5734.218750,0.000000,412.903198
//   100,3120.004883,0.000000,97.118591
//
// A resumed run keeps appending to the same file, so the
// steps continue where the previous run stopped.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

const HEADER: &str = "step,loss,latent_min,latent_max";

/// One row of the metrics CSV
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepMetrics {
    pub step: usize,

    /// Summed absolute reconstruction error of the batch
    pub loss: f64,

    pub latent_min: f32,
    pub latent_max: f32,
}

impl StepMetrics {
    pub fn new(step: usize, loss: f64, latent_min: f32, latent_max: f32) -> Self {
        Self { step, loss, latent_min, latent_max }
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header only if the file doesn't exist yet.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create metrics directory '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "{HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &StepMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(f, "{},{:.6},{:.6},{:.6}", m.step, m.loss, m.latent_min, m.latent_max)?;

        tracing::debug!("Logged step {} metrics: loss={:.4}", m.step, m.loss);
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
