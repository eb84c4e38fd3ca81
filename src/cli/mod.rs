// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses the command line with clap and hands a TrainConfig
// to Layer 2. No training logic lives here.
//
//   conv-autoencoder "images/*.jpg" --iterations 5000 --depth 3
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::TrainArgs;

use crate::application::train_use_case::{TrainConfig, TrainUseCase};
use crate::ml::trainer::TrainingSummary;

#[derive(Parser, Debug)]
#[command(
    name = "conv-autoencoder",
    version,
    about = "Train a convolutional autoencoder on a glob of images."
)]
pub struct Cli {
    #[command(flatten)]
    pub train: TrainArgs,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let config: TrainConfig = self.train.into();
        tracing::info!("Training on images matching '{}'", config.image_glob);

        let summary = TrainUseCase::new(config).execute()?;
        println!("{}", completion_message(&summary));
        Ok(())
    }
}

fn completion_message(summary: &TrainingSummary) -> String {
    let saved = match summary.last_saved_step {
        Some(step) => format!("last checkpoint at step {step}"),
        None       => "no checkpoint written".to_string(),
    };
    format!(
        "Training complete: {} steps from step {}, {saved}.",
        summary.steps_run, summary.start_step
    )
}
