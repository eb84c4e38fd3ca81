// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between a file glob and a GPU-ready tensor:
//
//   glob pattern
//       │
//       ▼
//   ImageLoader       → expands the glob, decodes files
//       │
//       ▼
//   Preprocessor      → letterbox / crop, normalise to [0, 1]
//       │
//       ▼
//   ImageSampler      → endless random batches of ImageSample
//       │
//       ▼
//   ImageBatcher      → stacks samples into [N, C, H, W] tensors
//       │
//       ▼
//   training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)
//            Rust Book §13 (Iterators and Closures)

/// Expands the image glob and decodes files with the image crate
pub mod loader;

/// Letterboxes / crops and normalises decoded images
pub mod preprocessor;

/// The normalised sample type
pub mod dataset;

/// Endless random batches over the glob's files
pub mod sampler;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
