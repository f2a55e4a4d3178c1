pub mod backing;
pub mod cache;
pub mod commit;
pub mod config;
pub mod descriptor;
pub mod device;
pub mod layout;
pub mod platform;
pub mod set_cache;
pub mod signature;
pub mod variable;

mod static_checks {
	use crate::device::BindingDevice;
	use crate::platform::headless::Headless;
	use crate::set_cache::PipelineLayout;
	use crate::signature::{BindingInstance, ResourceSignature};
	use static_assertions::assert_impl_all;

	assert_impl_all!(BindingDevice<Headless>: Send, Sync, Clone);
	assert_impl_all!(ResourceSignature<Headless>: Send, Sync);
	assert_impl_all!(PipelineLayout<Headless>: Send, Sync);
	assert_impl_all!(BindingInstance<Headless>: Send);
}
