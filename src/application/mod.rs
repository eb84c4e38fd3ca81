// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers for a training run.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No argument parsing or printing here (that's Layer 1)
//   - Only validation and workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

/// The training workflow
pub mod train_use_case;
