// ============================================================
// Layer 3: Core Traits (Abstractions)
// ============================================================
// The framework-free seams of the system. The data layer and
// the ML layer implement these; the application layer only
// talks to the traits.

use anyhow::Result;
use crate::domain::sample::LabeledText;

// ─── TextSource ───────────────────────────────────────────────────────────────
/// Any component that can load labelled text examples.
///
/// Implementations:
///   - TsvLoader → `label<TAB>text` files
pub trait TextSource {
    fn load_all(&self) -> Result<Vec<LabeledText>>;
}

// ─── LrScheduler ──────────────────────────────────────────────────────────────
/// A learning-rate policy advanced once per optimizer step.
///
/// A training pass always takes a scheduler. Use `ConstantLr` when
/// the rate should not change.
pub trait LrScheduler {
    /// Learning rate for the next optimizer step.
    fn current_lr(&self) -> f64;

    /// Advance the policy by one optimizer step.
    fn step(&mut self);
}

impl<S: LrScheduler + ?Sized> LrScheduler for Box<S> {
    fn current_lr(&self) -> f64 {
        (**self).current_lr()
    }

    fn step(&mut self) {
        (**self).step()
    }
}
