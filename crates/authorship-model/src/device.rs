//! Device selection: CUDA > Metal > CPU fallback.

use candle_core::Device;

/// Select the best available compute device for encoder and head inference.
///
/// Tries CUDA first (when compiled with `cuda` feature), then Metal
/// (when compiled with `metal` feature), then falls back to CPU.
pub fn select_device() -> Device {
    #[cfg(feature = "cuda")]
    {
        match Device::new_cuda(0) {
            Ok(device) => {
                tracing::info!(device = "cuda:0", "Selected compute device");
                return device;
            }
            Err(e) => tracing::warn!(error = %e, "CUDA unavailable, falling back"),
        }
    }

    #[cfg(feature = "metal")]
    {
        match Device::new_metal(0) {
            Ok(device) => {
                tracing::info!(device = "metal:0", "Selected compute device");
                return device;
            }
            Err(e) => tracing::warn!(error = %e, "Metal unavailable, falling back"),
        }
    }

    tracing::debug!(device = "cpu", "Selected compute device");
    Device::Cpu
}
