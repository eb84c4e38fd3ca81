// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All network code lives here.
//
//   shapes.rs   — (name, shape) bookkeeping used to validate
//                 restored and shared parameters
//   encoder.rs  — conv/pool/dense stack: image → latent
//   decoder.rs  — dense/up-conv stack: latent → image, the
//                 Decoder trait and its two constructors
//   model.rs    — Autoencoder: both halves as one module,
//                 L1 reconstruction loss
//   renderer.rs — decodes random latents into test_{step}.jpg
//   trainer.rs  — the step loop: Adam, checkpoints, reports
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Masci et al. (2011) Stacked Convolutional Auto-Encoders

pub mod shapes;

/// Convolutional encoder
pub mod encoder;

/// Up-convolutional decoder and weight sharing
pub mod decoder;

/// Encoder + decoder parameter set and loss
pub mod model;

/// Sample images from random latent vectors
pub mod renderer;

/// Step-based training loop with checkpointing
pub mod trainer;
