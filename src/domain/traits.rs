// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The training loop only needs "something that hands out
// batches of normalised images". The file-backed ImageSampler
// implements it; tests plug in synthetic sources.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

use crate::data::dataset::ImageSample;

// ─── BatchSource ──────────────────────────────────────────────────────────────
/// An endless supply of fixed-size image batches.
///
/// Implementations:
///   - ImageSampler → random files from a glob, letterboxed
///   - (tests) synthetic noise sources
pub trait BatchSource {
    /// Produce the next full batch. A returned batch always holds
    /// exactly the configured number of samples.
    fn next_batch(&mut self) -> Result<Vec<ImageSample>>;
}
