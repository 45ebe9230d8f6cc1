use candle_core::Device;
use tracing::info;

pub fn select_device() -> Device {
    #[cfg(feature = "metal")]
    {
        if let Ok(dev) = Device::new_metal(0) { info!("encoder device: Metal (MPS)"); return dev; }
    }
    info!("encoder device: CPU");
    Device::Cpu
}
