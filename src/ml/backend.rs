// ============================================================
// Layer 5: Backend Selection
// ============================================================
// Training runs on Autodiff<Inner>; evaluation runs on Inner
// through model.valid(), so no gradient graph is ever built
// during a validation pass.
//
// CPU (NdArray) by default, GPU with `--features wgpu`.

#[cfg(not(feature = "wgpu"))]
pub type InnerBackend = burn::backend::NdArray;

#[cfg(feature = "wgpu")]
pub type InnerBackend = burn::backend::Wgpu;

pub type TrainBackend = burn::backend::Autodiff<InnerBackend>;

pub type Device = <InnerBackend as burn::tensor::backend::Backend>::Device;

/// The compute device every tensor of a run is placed on.
pub fn default_device() -> Device {
    Device::default()
}
