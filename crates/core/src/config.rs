use crate::descriptor::KindClass;
use serde::{Deserialize, Serialize};

/// A descriptor count for each [`KindClass`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct DescriptorHeapSizes {
	pub views: u32,
	pub samplers: u32,
}

impl DescriptorHeapSizes {
	pub const fn new(views: u32, samplers: u32) -> Self {
		Self { views, samplers }
	}

	#[inline]
	pub fn get(&self, class: KindClass) -> u32 {
		match class {
			KindClass::View => self.views,
			KindClass::Sampler => self.samplers,
		}
	}

	pub fn is_within_limit(&self, limit: Self) -> bool {
		let DescriptorHeapSizes { views, samplers } = *self;
		views <= limit.views && samplers <= limit.samplers
	}

	pub fn min(self, other: Self) -> Self {
		Self {
			views: self.views.min(other.views),
			samplers: self.samplers.min(other.samplers),
		}
	}
}

/// Limits of the native binding model that signatures are validated against.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct DeviceLimits {
	/// Register spaces available to one signature. Space 0 holds all regular resources, every runtime-sized array
	/// takes one more.
	pub max_register_spaces: u32,
	/// Maximum number of tables plus inline bindings of one signature.
	pub max_signature_parameters: u32,
}

impl DeviceLimits {
	pub const REASONABLE_DEFAULTS: Self = DeviceLimits {
		max_register_spaces: 8,
		max_signature_parameters: 64,
	};
}

impl Default for DeviceLimits {
	fn default() -> Self {
		Self::REASONABLE_DEFAULTS
	}
}

/// Sizing of the GPU-visible descriptor storage owned by a [`BindingDevice`](crate::device::BindingDevice).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingConfig {
	/// Descriptors reserved for static and mutable tables of all binding instances.
	pub persistent_heap: DescriptorHeapSizes,
	/// Descriptors per transient chunk that dynamic tables are sub-allocated from.
	pub transient_chunk: DescriptorHeapSizes,
	/// Upper bound of transient chunks alive at the same time, per kind class.
	pub max_transient_chunks: u32,
	pub limits: DeviceLimits,
}

impl BindingConfig {
	pub const REASONABLE_DEFAULTS: Self = BindingConfig {
		persistent_heap: DescriptorHeapSizes::new(65_536, 2_048),
		transient_chunk: DescriptorHeapSizes::new(8_192, 512),
		max_transient_chunks: 16,
		limits: DeviceLimits::REASONABLE_DEFAULTS,
	};

	/// Total size of the heap of `class`, persistent region followed by all transient chunks.
	pub fn heap_size(&self, class: KindClass) -> u32 {
		self.persistent_heap.get(class) + self.transient_chunk.get(class) * self.max_transient_chunks
	}

	/// Shrinks the heap sizes until both heaps fit into `limit`, keeping the ratio of persistent to transient
	/// storage.
	pub fn clamp_to(mut self, limit: DescriptorHeapSizes) -> Self {
		for class in KindClass::ALL {
			let total = self.heap_size(class) as u64;
			let max = limit.get(class) as u64;
			if total > max {
				let scale = |v: u32| ((v as u64 * max) / total) as u32;
				match class {
					KindClass::View => {
						self.persistent_heap.views = scale(self.persistent_heap.views);
						self.transient_chunk.views = scale(self.transient_chunk.views);
					}
					KindClass::Sampler => {
						self.persistent_heap.samplers = scale(self.persistent_heap.samplers);
						self.transient_chunk.samplers = scale(self.transient_chunk.samplers);
					}
				}
			}
		}
		self
	}
}

impl Default for BindingConfig {
	fn default() -> Self {
		Self::REASONABLE_DEFAULTS
	}
}
