// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Files written alongside a training run:
//
//   checkpoint.rs — parameters, Adam state and step, restored
//                   with architecture and shape checks
//   metrics.rs    — one CSV row per report interval
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;
