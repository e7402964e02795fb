// ============================================================
// Layer 3: Forward Mode
// ============================================================
// The model never stores a train/eval flag. Callers pass the
// mode into every forward call, so a stale mode cannot leak
// from one pass into the next.

use std::fmt;

/// Which regularisation behaviour a forward pass should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Dropout active, gradients tracked by the autodiff backend
    Train,
    /// Dropout disabled, deterministic output
    Eval,
}

impl Mode {
    pub fn is_train(self) -> bool {
        matches!(self, Mode::Train)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Train => f.write_str("train"),
            Mode::Eval  => f.write_str("eval"),
        }
    }
}
