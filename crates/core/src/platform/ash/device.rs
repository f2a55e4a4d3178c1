use crate::config::DescriptorHeapSizes;
use crate::descriptor::KindClass;
use ash::ext::debug_utils;
use ash::khr::acceleration_structure;
use ash::prelude::VkResult;
use ash::vk::{
	DebugUtilsObjectNameInfoEXT, DescriptorSetLayout, Handle, PhysicalDeviceProperties2,
	PhysicalDeviceVulkan12Properties, ShaderStageFlags,
};
use gpu_allocator::AllocationError;
use gpu_allocator::vulkan::Allocator;
use parking_lot::Mutex;
use std::ffi::CString;
use std::ops::Deref;
use std::sync::Arc;
use thiserror::Error;

pub struct Ash {
	pub create_info: AshCreateInfo,
	pub properties: AshProperties,
	/// Set layouts of both descriptor heaps, owned by the heaps and filled in when they are created.
	pub(super) heap_set_layouts: Mutex<[DescriptorSetLayout; KindClass::COUNT]>,
}

impl Ash {
	pub fn new(create_info: AshCreateInfo) -> Self {
		let properties = AshProperties::query(&create_info);
		Self {
			create_info,
			properties,
			heap_set_layouts: Mutex::new([DescriptorSetLayout::null(); KindClass::COUNT]),
		}
	}

	pub unsafe fn set_debug_object_name(&self, handle: impl Handle, name: &str) -> VkResult<()> {
		unsafe {
			if let (Some(debug_utils), Ok(name)) = (self.extensions.debug_utils.as_ref(), CString::new(name)) {
				debug_utils.set_debug_utils_object_name(
					&DebugUtilsObjectNameInfoEXT::default()
						.object_handle(handle)
						.object_name(&name),
				)?;
			}
			Ok(())
		}
	}
}

impl Deref for Ash {
	type Target = AshCreateInfo;

	fn deref(&self) -> &Self::Target {
		&self.create_info
	}
}

pub struct AshCreateInfo {
	pub instance: ash::Instance,
	pub physical_device: ash::vk::PhysicalDevice,
	pub device: ash::Device,
	pub memory_allocator: Arc<Mutex<Allocator>>,
	/// Every shader stage pipelines may use, the stages of push constants and heap bindings.
	pub shader_stages: ShaderStageFlags,
	pub extensions: AshExtensions,
	pub destroy: Option<AshDestroyFn>,
}

pub type AshDestroyFn = Box<dyn FnOnce(&mut AshCreateInfo) + Send + Sync>;

impl Drop for AshCreateInfo {
	fn drop(&mut self) {
		if let Some(destroy) = self.destroy.take() {
			destroy(self);
		}
	}
}

#[derive(Default)]
#[non_exhaustive]
pub struct AshExtensions {
	pub debug_utils: Option<debug_utils::Device>,
	/// Enables acceleration structure descriptors in the view heap.
	pub acceleration_structure: Option<acceleration_structure::Device>,
}

/// Device limits relevant to the binding model.
#[derive(Copy, Clone, Debug)]
pub struct AshProperties {
	pub heap_limits: DescriptorHeapSizes,
	pub max_push_constants_size: u32,
	pub min_uniform_buffer_offset_alignment: u64,
	pub min_storage_buffer_offset_alignment: u64,
}

impl AshProperties {
	fn query(create_info: &AshCreateInfo) -> Self {
		unsafe {
			let mut vulkan12properties = PhysicalDeviceVulkan12Properties::default();
			let mut properties2 = PhysicalDeviceProperties2::default().push_next(&mut vulkan12properties);
			create_info
				.instance
				.get_physical_device_properties2(create_info.physical_device, &mut properties2);
			let limits = properties2.properties.limits;
			Self {
				heap_limits: DescriptorHeapSizes::new(
					[
						vulkan12properties.max_descriptor_set_update_after_bind_uniform_buffers,
						vulkan12properties.max_descriptor_set_update_after_bind_storage_buffers,
						vulkan12properties.max_descriptor_set_update_after_bind_sampled_images,
						vulkan12properties.max_descriptor_set_update_after_bind_storage_images,
					]
					.into_iter()
					.min()
					.unwrap_or(0),
					vulkan12properties.max_descriptor_set_update_after_bind_samplers,
				),
				max_push_constants_size: limits.max_push_constants_size,
				min_uniform_buffer_offset_alignment: limits.min_uniform_buffer_offset_alignment,
				min_storage_buffer_offset_alignment: limits.min_storage_buffer_offset_alignment,
			}
		}
	}
}

#[derive(Error)]
#[non_exhaustive]
pub enum AshAllocationError {
	#[error("VkResult: {0}")]
	Vk(#[from] ash::vk::Result),
	#[error("gpu-allocator Error: {0}")]
	Allocation(#[from] AllocationError),
}

impl core::fmt::Debug for AshAllocationError {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		core::fmt::Display::fmt(self, f)
	}
}

#[derive(Error)]
#[non_exhaustive]
pub enum AshLayoutError {
	#[error("VkResult: {0}")]
	Vk(#[from] ash::vk::Result),
	#[error("{count} parameters need {size} bytes of push constants, the device supports {max} bytes")]
	TooManyParameters { count: u32, size: u32, max: u32 },
	#[error("Descriptor heaps must be created before any pipeline layout")]
	MissingHeaps,
}

impl core::fmt::Debug for AshLayoutError {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		core::fmt::Display::fmt(self, f)
	}
}
