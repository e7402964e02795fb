// ============================================================
// Layer 5: Learning-Rate Schedules
// ============================================================
// Both schedules implement domain::traits::LrScheduler and are
// advanced once per optimizer step by the epoch runner.
//
//   ConstantLr  → the same rate on every step
//   OneCycleLr  → cosine warm-up to max_lr, then cosine
//                 annealing down to max_lr / (div * final_div)
//
// One-cycle phases, with T = total_steps:
//
//   step 0 ............ warmup_end ............ T - 1
//   max_lr/25  ──cos──▶  max_lr  ──cos──▶  max_lr/25/1e4

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::domain::traits::LrScheduler;

/// A fixed learning rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantLr(pub f64);

impl LrScheduler for ConstantLr {
    fn current_lr(&self) -> f64 {
        self.0
    }

    fn step(&mut self) {}
}

#[derive(Debug, Clone)]
pub struct OneCycleLr {
    max_lr:           f64,
    total_steps:      usize,
    pct_start:        f64,
    div_factor:       f64,
    final_div_factor: f64,
    step:             usize,
}

impl OneCycleLr {
    pub fn new(max_lr: f64, total_steps: usize) -> Self {
        Self {
            max_lr,
            total_steps: total_steps.max(1),
            pct_start: 0.3,
            div_factor: 25.0,
            final_div_factor: 1e4,
            step: 0,
        }
    }

    fn initial_lr(&self) -> f64 {
        self.max_lr / self.div_factor
    }

    fn min_lr(&self) -> f64 {
        self.initial_lr() / self.final_div_factor
    }

    fn warmup_end(&self) -> f64 {
        (self.pct_start * self.total_steps as f64 - 1.0).max(0.0)
    }

    fn anneal(start: f64, end: f64, pct: f64) -> f64 {
        end + (start - end) / 2.0 * (1.0 + (PI * pct).cos())
    }
}

impl LrScheduler for OneCycleLr {
    fn current_lr(&self) -> f64 {
        let last       = (self.total_steps - 1) as f64;
        let step       = (self.step as f64).min(last);
        let warmup_end = self.warmup_end();

        if step <= warmup_end {
            if warmup_end == 0.0 {
                return self.max_lr;
            }
            Self::anneal(self.initial_lr(), self.max_lr, step / warmup_end)
        } else {
            let span = last - warmup_end;
            Self::anneal(self.max_lr, self.min_lr(), (step - warmup_end) / span)
        }
    }

    fn step(&mut self) {
        self.step += 1;
    }
}

/// Which schedule a training run uses. Stored in the run config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Schedule {
    Constant,
    #[default]
    OneCycle,
}

impl Schedule {
    /// Build the scheduler for a run of `total_steps` optimizer steps.
    pub fn build(self, lr: f64, total_steps: usize) -> Box<dyn LrScheduler> {
        match self {
            Schedule::Constant => Box::new(ConstantLr(lr)),
            Schedule::OneCycle => Box::new(OneCycleLr::new(lr, total_steps)),
        }
    }
}
