use binding_model_core::config::{BindingConfig, DescriptorHeapSizes, DeviceLimits};
use binding_model_core::device::BindingDevice;
use binding_model_core::platform::headless::Headless;

pub mod binding;
pub mod commit;
pub mod compatibility;
pub mod scenarios;
pub mod set_cache;
pub mod statics;

/// Small heaps, so running out of descriptors is cheap to provoke.
pub const TEST_CONFIG: BindingConfig = BindingConfig {
	persistent_heap: DescriptorHeapSizes::new(1024, 64),
	transient_chunk: DescriptorHeapSizes::new(256, 16),
	max_transient_chunks: 4,
	limits: DeviceLimits::REASONABLE_DEFAULTS,
};

/// the device every integration test runs on
pub fn headless_device() -> anyhow::Result<BindingDevice<Headless>> {
	Ok(BindingDevice::new(Headless::new(), TEST_CONFIG)?)
}
