//! Backend selection and device resolution.
//!
//! Exactly one backend is active. When several backend features are enabled
//! the first of `cuda`, `wgpu`, `cpu` wins, so the default `cpu` feature can
//! stay on alongside a GPU backend.

use burn::tensor::backend::Backend;
use cifar_config::GpuSpec;

#[cfg(feature = "cuda")]
pub type GpuBackend<F = f32> = burn::backend::Cuda<F>;

#[cfg(all(feature = "wgpu", not(feature = "cuda")))]
pub type GpuBackend<F = f32> = burn::backend::Wgpu<F>;

#[cfg(all(feature = "cpu", not(any(feature = "cuda", feature = "wgpu"))))]
pub type GpuBackend<F = f32> = burn::backend::NdArray<F>;

#[cfg(not(any(feature = "cuda", feature = "wgpu", feature = "cpu")))]
pub type GpuBackend<F = f32> =
    compile_error!("One of the features 'cuda', 'wgpu' or 'cpu' must be enabled");

pub type TrainingBackend<F = f32> = burn::backend::Autodiff<GpuBackend<F>>;

pub type GpuDevice = <GpuBackend as Backend>::Device;

/// Short name of the active backend, for run summaries.
#[must_use]
pub fn backend_name() -> &'static str {
    if cfg!(feature = "cuda") {
        "cuda"
    } else if cfg!(feature = "wgpu") {
        "wgpu"
    } else {
        "cpu"
    }
}

/// Device handle for a GPU index on the active backend.
#[cfg(feature = "cuda")]
#[must_use]
pub fn device(index: usize) -> GpuDevice {
    burn::backend::cuda::CudaDevice::new(index)
}

#[cfg(all(feature = "wgpu", not(feature = "cuda")))]
#[must_use]
pub fn device(index: usize) -> GpuDevice {
    burn::backend::wgpu::WgpuDevice::DiscreteGpu(index)
}

/// The CPU backend has a single device; every index maps onto it.
#[cfg(all(feature = "cpu", not(any(feature = "cuda", feature = "wgpu"))))]
#[must_use]
pub fn device(_index: usize) -> GpuDevice {
    burn::backend::ndarray::NdArrayDevice::Cpu
}

/// Resolve a GPU spec to the devices a learner should train on.
///
/// A count of zero selects the backend default device. Indices that map to
/// the same device collapse into one entry.
#[must_use]
pub fn resolve_devices(spec: &GpuSpec) -> Vec<GpuDevice> {
    let indices = spec.device_indices();
    if indices.is_empty() {
        return vec![GpuDevice::default()];
    }

    let mut devices: Vec<GpuDevice> = Vec::with_capacity(indices.len());
    for index in indices {
        let device = device(index);
        if !devices.contains(&device) {
            devices.push(device);
        }
    }
    devices
}
