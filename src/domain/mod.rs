// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust types that describe the problem: image geometry,
// colour depth, resize policy, configuration errors, and the
// BatchSource abstraction the trainer pulls from.
//
// Rules for this layer:
//   - NO Burn framework types
//   - NO file I/O
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Canvas geometry, depth, resize mode, configuration errors
pub mod image_spec;

// Core abstractions (traits) that other layers implement
pub mod traits;
