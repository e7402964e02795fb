// ============================================================
// Layer 5: Global Gradient-Norm Clipping
// ============================================================
// Treats every parameter gradient of the model as one long
// vector and rescales all of them together when that vector's
// L2 norm exceeds `max_norm`:
//
//   total = sqrt(Σ_p ‖g_p‖²)
//   coef  = max_norm / (total + 1e-6)
//   g_p  ← g_p * coef        only if coef < 1
//
// Burn's built-in optimizer clipping works per parameter
// tensor; this bounds the whole update instead.
//
// The walk uses Burn's ModuleVisitor: parameter ids come from
// the module, gradient tensors from GradientsParams (they live
// on the inner, non-autodiff backend).

use burn::{
    module::{AutodiffModule, ModuleVisitor, Param},
    optim::GradientsParams,
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use std::marker::PhantomData;

const NORM_EPS: f64 = 1e-6;

/// Global L2 norm of all gradients in `grads` that belong to `model`.
pub fn grad_norm<B, M>(model: &M, grads: &GradientsParams) -> f64
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    let mut visitor = SquaredNormVisitor::<B> {
        grads,
        sum_sq: 0.0,
        _backend: PhantomData,
    };
    model.visit(&mut visitor);
    visitor.sum_sq.sqrt()
}

/// Rescale `grads` in place so their global norm is at most `max_norm`.
///
/// Returns the norm measured before clipping.
pub fn clip_grad_norm<B, M>(model: &M, grads: &mut GradientsParams, max_norm: f64) -> f64
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    let total = grad_norm::<B, M>(model, grads);
    let coef  = max_norm / (total + NORM_EPS);

    if coef < 1.0 {
        let mut visitor = ScaleVisitor::<B> {
            grads,
            scale: coef,
            _backend: PhantomData,
        };
        model.visit(&mut visitor);
    }

    total
}

struct SquaredNormVisitor<'a, B: AutodiffBackend> {
    grads:    &'a GradientsParams,
    sum_sq:   f64,
    _backend: PhantomData<B>,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for SquaredNormVisitor<'_, B> {
    fn visit_float<const D: usize>(&mut self, param: &Param<Tensor<B, D>>) {
        if let Some(grad) = self.grads.get::<B::InnerBackend, D>(param.id) {
            self.sum_sq += grad.powf_scalar(2.0).sum().into_scalar().elem::<f64>();
        }
    }
}

struct ScaleVisitor<'a, B: AutodiffBackend> {
    grads:    &'a mut GradientsParams,
    scale:    f64,
    _backend: PhantomData<B>,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for ScaleVisitor<'_, B> {
    fn visit_float<const D: usize>(&mut self, param: &Param<Tensor<B, D>>) {
        if let Some(grad) = self.grads.remove::<B::InnerBackend, D>(param.id) {
            self.grads.register(param.id, grad.mul_scalar(self.scale));
        }
    }
}
