use crate::backing::{GpuDescriptorHeap, TransientDescriptorRing};
use crate::config::BindingConfig;
use crate::descriptor::{DeclarationError, KindClass, SignatureDesc};
use crate::platform::BindingPlatform;
use crate::set_cache::{PipelineLayout, SetCacheError, SignatureSetCache};
use crate::signature::{ResourceSignature, SerializedSignature};
use std::ops::Deref;
use std::sync::Arc;

/// Entry point of the binding model: owns the platform, both descriptor heaps and the signature set cache.
pub struct BindingDevice<P: BindingPlatform>(Arc<BindingDeviceInner<P>>);

impl<P: BindingPlatform> Clone for BindingDevice<P> {
	fn clone(&self) -> Self {
		Self(self.0.clone())
	}
}

impl<P: BindingPlatform> Deref for BindingDevice<P> {
	type Target = Arc<BindingDeviceInner<P>>;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

pub struct BindingDeviceInner<P: BindingPlatform> {
	pub platform: P,
	config: BindingConfig,
	heaps: [Arc<GpuDescriptorHeap<P>>; KindClass::COUNT],
	set_cache: SignatureSetCache<P>,
}

impl<P: BindingPlatform> Deref for BindingDeviceInner<P> {
	type Target = P;

	fn deref(&self) -> &Self::Target {
		&self.platform
	}
}

impl<P: BindingPlatform> BindingDevice<P> {
	/// Creates both descriptor heaps, sized by `config` clamped to what the platform supports.
	pub fn new(platform: P, config: BindingConfig) -> Result<Self, P::AllocationError> {
		let config = config.clamp_to(platform.descriptor_heap_limits());
		let heaps = [
			GpuDescriptorHeap::new(&platform, KindClass::View, &config)?,
			GpuDescriptorHeap::new(&platform, KindClass::Sampler, &config)?,
		];
		Ok(Self(Arc::new(BindingDeviceInner {
			platform,
			config,
			heaps,
			set_cache: SignatureSetCache::new(),
		})))
	}

	#[inline]
	pub fn platform(&self) -> &P {
		&self.platform
	}

	#[inline]
	pub fn config(&self) -> &BindingConfig {
		&self.config
	}

	#[inline]
	pub fn heap(&self, class: KindClass) -> &Arc<GpuDescriptorHeap<P>> {
		&self.heaps[class.index()]
	}

	#[inline]
	pub fn set_cache(&self) -> &SignatureSetCache<P> {
		&self.set_cache
	}

	pub fn create_signature(&self, desc: SignatureDesc) -> Result<Arc<ResourceSignature<P>>, DeclarationError> {
		ResourceSignature::new(self, desc)
	}

	pub fn signature_from_serialized(
		&self,
		serialized: SerializedSignature,
	) -> Result<Arc<ResourceSignature<P>>, DeclarationError> {
		ResourceSignature::from_serialized(self, serialized)
	}

	/// A transient descriptor allocator for one recording context.
	pub fn create_transient_ring(&self) -> TransientDescriptorRing<P> {
		TransientDescriptorRing::new(self.heaps.clone())
	}

	/// The pipeline layout binding `signatures` together, shared with every other request for a compatible set.
	pub fn pipeline_layout(
		&self,
		signatures: &[Arc<ResourceSignature<P>>],
	) -> Result<Arc<PipelineLayout<P>>, SetCacheError<P>> {
		self.set_cache.get_or_create(&self.platform, signatures)
	}
}
