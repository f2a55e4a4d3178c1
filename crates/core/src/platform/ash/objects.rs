use crate::descriptor::SamplerDesc;
use crate::platform::ash::{Ash, AshAllocationError};
use crate::platform::{
	BufferObject, BufferUsage, BufferViewObject, DeviceObject, ResourceState, ResourceStateCell, TextureViewObject,
	ViewType,
};
use ash::prelude::VkResult;
use ash::vk::{
	AccelerationStructureKHR, BufferDeviceAddressInfo, BufferUsageFlags, BufferViewCreateInfo, ComponentMapping,
	Format, ImageSubresourceRange, ImageViewCreateInfo, ImageViewType, SharingMode,
};
use gpu_allocator::MemoryLocation;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme, Allocator};
use parking_lot::Mutex;
use std::cell::UnsafeCell;
use std::sync::Arc;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering::Relaxed;

/// Wraps gpu-allocator's Allocation to be able to [`Option::take`] it on drop.
///
/// # Safety
/// UnsafeCell: Required to gain mutable access where it is safe to do so, see safety of interface methods.
#[derive(Debug)]
pub struct AshMemoryAllocation(UnsafeCell<Option<Allocation>>);

impl AshMemoryAllocation {
	/// # Safety
	/// You must [`Self::take`] the Allocation and deallocate manually before dropping self
	pub unsafe fn new(allocation: Allocation) -> Self {
		Self(UnsafeCell::new(Some(allocation)))
	}

	/// Get exclusive mutable access to the `AshMemoryAllocation`
	///
	/// # Safety
	/// You must ensure you have exclusive mutable access to the Allocation
	#[allow(clippy::mut_from_ref)]
	pub unsafe fn get_mut(&self) -> Option<&mut Allocation> {
		unsafe { (*self.0.get()).as_mut() }
	}

	pub fn take(&mut self) -> Option<Allocation> {
		self.0.get_mut().take()
	}
}

/// Safety: Allocation is Send and Sync, mutable access is guarded by the unsafe interface
unsafe impl Send for AshMemoryAllocation {}
unsafe impl Sync for AshMemoryAllocation {}

pub struct AshBufferCreateInfo<'a> {
	pub name: &'a str,
	/// Size of the buffer, or of a single slice for [`BufferUsage::Dynamic`] buffers.
	pub size: u64,
	pub usage: BufferUsage,
	/// Additional vulkan usages besides those implied by `usage`.
	pub vk_usage: BufferUsageFlags,
	/// Number of slices a [`BufferUsage::Dynamic`] buffer cycles through, ignored otherwise.
	pub dynamic_slices: u32,
}

/// A buffer with its own memory. Dynamic buffers are split into slices, every
/// [`AshBuffer::map_write_discard`] moves on to the next one, so the GPU can still read the previous contents.
pub struct AshBuffer {
	pub buffer: ash::vk::Buffer,
	name: String,
	usage: BufferUsage,
	slice_size: u64,
	slices: u32,
	current_slice: AtomicU32,
	device_address: u64,
	allocation: AshMemoryAllocation,
	state: ResourceStateCell,
	device: ash::Device,
	allocator: Arc<Mutex<Allocator>>,
}

impl AshBuffer {
	/// Size of the currently visible slice.
	#[inline]
	pub fn size(&self) -> u64 {
		self.slice_size
	}

	/// Offset of the currently visible slice.
	#[inline]
	pub fn offset(&self) -> u64 {
		self.current_slice.load(Relaxed) as u64 * self.slice_size
	}

	#[inline]
	pub fn gpu_address(&self) -> u64 {
		self.device_address + self.offset()
	}

	#[inline]
	pub fn state(&self) -> &ResourceStateCell {
		&self.state
	}

	/// Move on to the next slice and fill it with `data`.
	///
	/// # Safety
	/// Must not be called concurrently on the same buffer, and the GPU must be done reading the slice that becomes
	/// current, which is only guaranteed if there are more slices than frames in flight.
	pub unsafe fn map_write_discard<T: Copy>(&self, data: &[T]) -> Result<(), presser::CopyError> {
		unsafe {
			debug_assert_eq!(self.usage, BufferUsage::Dynamic);
			let slice = (self.current_slice.load(Relaxed) + 1) % self.slices;
			if let Some(allocation) = self.allocation.get_mut() {
				presser::copy_from_slice_to_offset(data, allocation, (slice as u64 * self.slice_size) as usize)?;
			}
			self.current_slice.store(slice, Relaxed);
			Ok(())
		}
	}
}

impl DeviceObject for AshBuffer {
	fn name(&self) -> &str {
		&self.name
	}
}

impl BufferObject for AshBuffer {
	fn usage(&self) -> BufferUsage {
		self.usage
	}
}

impl Drop for AshBuffer {
	fn drop(&mut self) {
		unsafe {
			if let Some(allocation) = self.allocation.take() {
				if let Err(err) = self.allocator.lock().free(allocation) {
					tracing::error!("Failed to free memory of buffer '{}': {}", self.name, err);
				}
			}
			self.device.destroy_buffer(self.buffer, None);
		}
	}
}

/// A view of a buffer, formatted if it has a texel `view`.
pub struct AshBufferView {
	pub view: Option<ash::vk::BufferView>,
	name: String,
	view_type: ViewType,
	buffer: Arc<AshBuffer>,
}

impl DeviceObject for AshBufferView {
	fn name(&self) -> &str {
		&self.name
	}
}

impl BufferViewObject<Ash> for AshBufferView {
	fn view_type(&self) -> ViewType {
		self.view_type
	}

	fn buffer(&self) -> &Arc<AshBuffer> {
		&self.buffer
	}
}

impl Drop for AshBufferView {
	fn drop(&mut self) {
		if let Some(view) = self.view {
			unsafe { self.buffer.device.destroy_buffer_view(view, None) };
		}
	}
}

pub struct AshTextureViewCreateInfo<'a> {
	pub name: &'a str,
	pub image: ash::vk::Image,
	pub image_view_type: ImageViewType,
	pub format: Format,
	pub subresource_range: ImageSubresourceRange,
	pub view_type: ViewType,
	pub sampler: Option<Arc<AshSampler>>,
	/// The layout the image is in right now.
	pub initial_state: ResourceState,
}

/// An image view of an image owned by someone else.
pub struct AshTextureView {
	pub image: ash::vk::Image,
	pub image_view: ash::vk::ImageView,
	pub subresource_range: ImageSubresourceRange,
	name: String,
	view_type: ViewType,
	sampler: Option<Arc<AshSampler>>,
	state: ResourceStateCell,
	device: ash::Device,
}

impl AshTextureView {
	#[inline]
	pub fn state(&self) -> &ResourceStateCell {
		&self.state
	}
}

impl DeviceObject for AshTextureView {
	fn name(&self) -> &str {
		&self.name
	}
}

impl TextureViewObject<Ash> for AshTextureView {
	fn view_type(&self) -> ViewType {
		self.view_type
	}

	fn sampler(&self) -> Option<&Arc<AshSampler>> {
		self.sampler.as_ref()
	}
}

impl Drop for AshTextureView {
	fn drop(&mut self) {
		unsafe { self.device.destroy_image_view(self.image_view, None) };
	}
}

pub struct AshSampler {
	pub sampler: ash::vk::Sampler,
	name: String,
	device: ash::Device,
}

impl DeviceObject for AshSampler {
	fn name(&self) -> &str {
		&self.name
	}
}

impl Drop for AshSampler {
	fn drop(&mut self) {
		unsafe { self.device.destroy_sampler(self.sampler, None) };
	}
}

/// An acceleration structure owned by someone else.
pub struct AshAccelerationStructure {
	pub handle: AccelerationStructureKHR,
	name: String,
	state: ResourceStateCell,
}

impl AshAccelerationStructure {
	/// # Safety
	/// `handle` must stay valid for as long as it is bound anywhere.
	pub unsafe fn new(name: &str, handle: AccelerationStructureKHR) -> Arc<Self> {
		Arc::new(Self {
			handle,
			name: name.to_owned(),
			state: ResourceStateCell::new(ResourceState::RayTracing),
		})
	}

	#[inline]
	pub fn state(&self) -> &ResourceStateCell {
		&self.state
	}
}

impl DeviceObject for AshAccelerationStructure {
	fn name(&self) -> &str {
		&self.name
	}
}

impl Ash {
	pub fn create_buffer(&self, create_info: &AshBufferCreateInfo) -> Result<Arc<AshBuffer>, AshAllocationError> {
		unsafe {
			let (slices, location) = match create_info.usage {
				BufferUsage::Dynamic => (create_info.dynamic_slices.max(1), MemoryLocation::CpuToGpu),
				BufferUsage::Immutable | BufferUsage::Default => (1, MemoryLocation::GpuOnly),
			};
			let alignment = u64::max(
				self.properties.min_uniform_buffer_offset_alignment,
				self.properties.min_storage_buffer_offset_alignment,
			)
			.max(1);
			let slice_size = create_info.size.div_ceil(alignment) * alignment;
			let buffer = self.device.create_buffer(
				&ash::vk::BufferCreateInfo::default()
					.usage(
						create_info.vk_usage
							| BufferUsageFlags::UNIFORM_BUFFER
							| BufferUsageFlags::STORAGE_BUFFER
							| BufferUsageFlags::SHADER_DEVICE_ADDRESS,
					)
					.size(slice_size * slices as u64)
					.sharing_mode(SharingMode::EXCLUSIVE),
				None,
			)?;
			self.set_debug_object_name(buffer, create_info.name)?;
			let requirements = self.device.get_buffer_memory_requirements(buffer);
			let memory_allocation = self.memory_allocator.lock().allocate(&AllocationCreateDesc {
				requirements,
				name: create_info.name,
				location,
				allocation_scheme: AllocationScheme::GpuAllocatorManaged,
				linear: true,
			})?;
			self.device
				.bind_buffer_memory(buffer, memory_allocation.memory(), memory_allocation.offset())?;
			let device_address = self
				.device
				.get_buffer_device_address(&BufferDeviceAddressInfo::default().buffer(buffer));
			Ok(Arc::new(AshBuffer {
				buffer,
				name: create_info.name.to_owned(),
				usage: create_info.usage,
				slice_size,
				slices,
				current_slice: AtomicU32::new(0),
				device_address,
				allocation: AshMemoryAllocation::new(memory_allocation),
				state: ResourceStateCell::new(ResourceState::Common),
				device: self.device.clone(),
				allocator: self.memory_allocator.clone(),
			}))
		}
	}

	/// A view of the whole `buffer`, with a texel view if a `format` is given.
	pub fn create_buffer_view(
		&self,
		buffer: &Arc<AshBuffer>,
		view_type: ViewType,
		format: Option<Format>,
	) -> VkResult<Arc<AshBufferView>> {
		unsafe {
			let view = match format {
				Some(format) => Some(
					self.device.create_buffer_view(
						&BufferViewCreateInfo::default()
							.buffer(buffer.buffer)
							.format(format)
							.offset(0)
							.range(buffer.size()),
						None,
					)?,
				),
				None => None,
			};
			Ok(Arc::new(AshBufferView {
				view,
				name: buffer.name.clone(),
				view_type,
				buffer: buffer.clone(),
			}))
		}
	}

	/// # Safety
	/// The image must outlive the view.
	pub unsafe fn create_texture_view(&self, create_info: AshTextureViewCreateInfo) -> VkResult<Arc<AshTextureView>> {
		unsafe {
			let image_view = self.device.create_image_view(
				&ImageViewCreateInfo::default()
					.image(create_info.image)
					.view_type(create_info.image_view_type)
					.format(create_info.format)
					.components(ComponentMapping::default()) // identity
					.subresource_range(create_info.subresource_range),
				None,
			)?;
			self.set_debug_object_name(image_view, create_info.name)?;
			Ok(Arc::new(AshTextureView {
				image: create_info.image,
				image_view,
				subresource_range: create_info.subresource_range,
				name: create_info.name.to_owned(),
				view_type: create_info.view_type,
				sampler: create_info.sampler,
				state: ResourceStateCell::new(create_info.initial_state),
				device: self.device.clone(),
			}))
		}
	}

	pub fn create_sampler(&self, name: &str, desc: &SamplerDesc) -> VkResult<Arc<AshSampler>> {
		unsafe {
			let sampler = self.create_vk_sampler(desc)?;
			self.set_debug_object_name(sampler, name)?;
			Ok(Arc::new(AshSampler {
				sampler,
				name: name.to_owned(),
				device: self.device.clone(),
			}))
		}
	}

	pub(super) unsafe fn create_vk_sampler(&self, desc: &SamplerDesc) -> VkResult<ash::vk::Sampler> {
		unsafe { self.device.create_sampler(&desc.to_ash_sampler_create_info(), None) }
	}
}
