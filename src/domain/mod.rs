// ============================================================
// Layer 3: Domain Layer
// ============================================================
// Plain Rust types and traits shared by every other layer.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain structs, enums, and traits
//
// Everything here is testable without a backend or a device.

// Labelled raw text as read from disk
pub mod sample;

// Explicit train / eval mode passed to the forward call
pub mod mode;

// Per-pass metric accumulation and the epoch summary
pub mod metrics;

// Core abstractions (traits) that other layers implement
pub mod traits;
