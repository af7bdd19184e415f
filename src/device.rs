use burn_wgpu::WgpuDevice;
use clap::ValueEnum;

/// Where inference should run.
///
/// Chosen once by the caller and handed to every operation as an explicit
/// device argument.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DevicePreference {
    /// Let wgpu pick the most capable adapter (a GPU when one is present).
    #[default]
    Auto,
    /// Force the wgpu CPU adapter.
    Cpu,
    /// First discrete GPU.
    Gpu,
}

/// Resolves a preference to a concrete wgpu device and logs the choice.
pub fn select_device(preference: DevicePreference) -> WgpuDevice {
    let device = match preference {
        DevicePreference::Auto => WgpuDevice::DefaultDevice,
        DevicePreference::Cpu => WgpuDevice::Cpu,
        DevicePreference::Gpu => WgpuDevice::DiscreteGpu(0),
    };

    match device {
        WgpuDevice::Cpu => log::info!("Running on CPU (device = {:?})", device),
        _ => log::info!("Running on accelerator (device = {:?})", device),
    }

    device
}
