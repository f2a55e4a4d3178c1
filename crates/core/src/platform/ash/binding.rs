use crate::cache::BoundObject;
use crate::config::DescriptorHeapSizes;
use crate::descriptor::{ImmutableSamplerDescriptor, KindClass, SamplerDesc, ShaderStages, MAX_RESOURCE_SIGNATURES};
use crate::layout::ImmutableSamplerAttribs;
use crate::platform::ash::{
	Ash, AshAccelerationStructure, AshAllocationError, AshBuffer, AshBufferView, AshLayoutError, AshSampler,
	AshTextureView,
};
use crate::platform::{BindingPlatform, BufferViewObject, ResourceState, TextureViewObject, ViewType};
use crate::set_cache::SignatureSet;
use ash::vk::{
	AccelerationStructureKHR, DescriptorBindingFlags, DescriptorBufferInfo, DescriptorImageInfo, DescriptorPool,
	DescriptorPoolCreateFlags, DescriptorPoolCreateInfo, DescriptorPoolSize, DescriptorSet,
	DescriptorSetAllocateInfo, DescriptorSetLayout, DescriptorSetLayoutBinding,
	DescriptorSetLayoutBindingFlagsCreateInfo, DescriptorSetLayoutCreateFlags, DescriptorSetLayoutCreateInfo,
	DescriptorType, ImageLayout, PipelineLayout, PipelineLayoutCreateInfo, PushConstantRange, ShaderStageFlags,
	WriteDescriptorSet, WriteDescriptorSetAccelerationStructureKHR,
};
use smallvec::SmallVec;

/// Descriptor types of the view heap, the binding of each is its index. All bindings share the heap's index space,
/// so a slot holds a descriptor in exactly one of them.
const VIEW_BINDINGS: [DescriptorType; 7] = [
	DescriptorType::UNIFORM_BUFFER,
	DescriptorType::STORAGE_BUFFER,
	DescriptorType::UNIFORM_TEXEL_BUFFER,
	DescriptorType::STORAGE_TEXEL_BUFFER,
	DescriptorType::SAMPLED_IMAGE,
	DescriptorType::STORAGE_IMAGE,
	DescriptorType::ACCELERATION_STRUCTURE_KHR,
];
const SAMPLER_BINDINGS: [DescriptorType; 1] = [DescriptorType::SAMPLER];

/// Every parameter occupies 8 bytes of push constants: a heap offset for tables, a device address for inline
/// buffers.
pub const PUSH_CONSTANT_PARAMETER_SIZE: u32 = 8;

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum AshDescriptor {
	/// Slots are partially bound, null descriptors are simply not written.
	#[default]
	Null,
	UniformBuffer {
		buffer: ash::vk::Buffer,
		offset: u64,
		range: u64,
	},
	StorageBuffer {
		buffer: ash::vk::Buffer,
		offset: u64,
		range: u64,
	},
	UniformTexelBuffer(ash::vk::BufferView),
	StorageTexelBuffer(ash::vk::BufferView),
	SampledImage(ash::vk::ImageView),
	StorageImage(ash::vk::ImageView),
	Sampler(ash::vk::Sampler),
	AccelerationStructure(AccelerationStructureKHR),
}

impl AshDescriptor {
	pub fn descriptor_type(&self) -> Option<DescriptorType> {
		Some(match self {
			AshDescriptor::Null => return None,
			AshDescriptor::UniformBuffer { .. } => DescriptorType::UNIFORM_BUFFER,
			AshDescriptor::StorageBuffer { .. } => DescriptorType::STORAGE_BUFFER,
			AshDescriptor::UniformTexelBuffer(_) => DescriptorType::UNIFORM_TEXEL_BUFFER,
			AshDescriptor::StorageTexelBuffer(_) => DescriptorType::STORAGE_TEXEL_BUFFER,
			AshDescriptor::SampledImage(_) => DescriptorType::SAMPLED_IMAGE,
			AshDescriptor::StorageImage(_) => DescriptorType::STORAGE_IMAGE,
			AshDescriptor::Sampler(_) => DescriptorType::SAMPLER,
			AshDescriptor::AccelerationStructure(_) => DescriptorType::ACCELERATION_STRUCTURE_KHR,
		})
	}
}

fn heap_binding(ty: DescriptorType) -> u32 {
	VIEW_BINDINGS
		.iter()
		.chain(&SAMPLER_BINDINGS)
		.position(|b| *b == ty)
		.map_or(0, |i| (i % VIEW_BINDINGS.len()) as u32)
}

/// One update-after-bind descriptor set with a binding per descriptor type of its class.
pub struct AshDescriptorHeap {
	pub class: KindClass,
	pub set: DescriptorSet,
	pub set_layout: DescriptorSetLayout,
	pub pool: DescriptorPool,
	device: ash::Device,
}

impl Drop for AshDescriptorHeap {
	fn drop(&mut self) {
		unsafe {
			// descriptor sets allocated from pool are freed implicitly
			self.device.destroy_descriptor_pool(self.pool, None);
			self.device.destroy_descriptor_set_layout(self.set_layout, None);
		}
	}
}

/// A pipeline layout with both heaps at sets 0 and 1, followed by a set of immutable samplers for every signature
/// that declares some.
pub struct AshPipelineLayout {
	pub layout: PipelineLayout,
	pub push_constant_stages: ShaderStageFlags,
	pub first_parameters: [u32; MAX_RESOURCE_SIGNATURES],
	pub immutable_sets: SmallVec<[DescriptorSet; 2]>,
	immutable_set_layouts: SmallVec<[DescriptorSetLayout; 2]>,
	immutable_pool: DescriptorPool,
	immutable_samplers: Vec<ash::vk::Sampler>,
	device: ash::Device,
}

impl Drop for AshPipelineLayout {
	fn drop(&mut self) {
		// all handles may be null if creation failed halfway, which vulkan ignores
		unsafe {
			self.device.destroy_pipeline_layout(self.layout, None);
			self.device.destroy_descriptor_pool(self.immutable_pool, None);
			for layout in self.immutable_set_layouts.drain(..) {
				self.device.destroy_descriptor_set_layout(layout, None);
			}
			for sampler in self.immutable_samplers.drain(..) {
				self.device.destroy_sampler(sampler, None);
			}
		}
	}
}

unsafe impl BindingPlatform for Ash {
	type Buffer = AshBuffer;
	type BufferView = AshBufferView;
	type TextureView = AshTextureView;
	type Sampler = AshSampler;
	type AccelerationStructure = AshAccelerationStructure;
	type CpuDescriptor = AshDescriptor;
	type DescriptorHeap = AshDescriptorHeap;
	type PipelineLayout = AshPipelineLayout;
	type AllocationError = AshAllocationError;
	type LayoutCreationError = AshLayoutError;

	fn descriptor_heap_limits(&self) -> DescriptorHeapSizes {
		self.properties.heap_limits
	}

	unsafe fn create_descriptor_heap(
		&self,
		class: KindClass,
		capacity: u32,
	) -> Result<AshDescriptorHeap, AshAllocationError> {
		unsafe {
			let types: &[DescriptorType] = match class {
				KindClass::View if self.extensions.acceleration_structure.is_some() => &VIEW_BINDINGS,
				KindClass::View => &VIEW_BINDINGS[..VIEW_BINDINGS.len() - 1],
				KindClass::Sampler => &SAMPLER_BINDINGS,
			};
			let bindings = types
				.iter()
				.enumerate()
				.map(|(binding, ty)| {
					DescriptorSetLayoutBinding::default()
						.binding(binding as u32)
						.descriptor_type(*ty)
						.descriptor_count(capacity.max(1))
						.stage_flags(self.shader_stages)
				})
				.collect::<SmallVec<[_; 7]>>();
			let binding_flags = SmallVec::<[_; 7]>::from_elem(
				DescriptorBindingFlags::UPDATE_AFTER_BIND
					| DescriptorBindingFlags::UPDATE_UNUSED_WHILE_PENDING
					| DescriptorBindingFlags::PARTIALLY_BOUND,
				bindings.len(),
			);

			let set_layout = self.device.create_descriptor_set_layout(
				&DescriptorSetLayoutCreateInfo::default()
					.flags(DescriptorSetLayoutCreateFlags::UPDATE_AFTER_BIND_POOL)
					.bindings(&bindings)
					.push_next(&mut DescriptorSetLayoutBindingFlagsCreateInfo::default().binding_flags(&binding_flags)),
				None,
			)?;
			let pool_sizes = bindings
				.iter()
				.map(|b| {
					DescriptorPoolSize::default()
						.ty(b.descriptor_type)
						.descriptor_count(b.descriptor_count)
				})
				.collect::<SmallVec<[_; 7]>>();
			let pool = match self.device.create_descriptor_pool(
				&DescriptorPoolCreateInfo::default()
					.flags(DescriptorPoolCreateFlags::UPDATE_AFTER_BIND)
					.pool_sizes(&pool_sizes)
					.max_sets(1),
				None,
			) {
				Ok(pool) => pool,
				Err(err) => {
					self.device.destroy_descriptor_set_layout(set_layout, None);
					return Err(err.into());
				}
			};
			let mut heap = AshDescriptorHeap {
				class,
				set: DescriptorSet::null(),
				set_layout,
				pool,
				device: self.device.clone(),
			};
			let set = self
				.device
				.allocate_descriptor_sets(
					&DescriptorSetAllocateInfo::default()
						.descriptor_pool(pool)
						.set_layouts(&[set_layout]),
				)?
				.into_iter()
				.next()
				.unwrap_or_default();
			self.set_debug_object_name(set, &format!("{:?} descriptor heap", class))?;
			self.heap_set_layouts.lock()[class.index()] = set_layout;
			heap.set = set;
			Ok(heap)
		}
	}

	unsafe fn write_descriptors(&self, heap: &AshDescriptorHeap, offset: u32, descriptors: &[AshDescriptor]) {
		unsafe {
			let mut buffers = SmallVec::<[(u32, DescriptorType, DescriptorBufferInfo); 8]>::new();
			let mut images = SmallVec::<[(u32, DescriptorType, DescriptorImageInfo); 8]>::new();
			let mut texel_buffers = SmallVec::<[(u32, DescriptorType, ash::vk::BufferView); 4]>::new();
			let mut acceleration_structures = SmallVec::<[(u32, AccelerationStructureKHR); 2]>::new();
			for (index, descriptor) in descriptors.iter().enumerate() {
				let slot = offset + index as u32;
				let Some(ty) = descriptor.descriptor_type() else {
					continue;
				};
				match *descriptor {
					AshDescriptor::Null => (),
					AshDescriptor::UniformBuffer { buffer, offset, range }
					| AshDescriptor::StorageBuffer { buffer, offset, range } => buffers.push((
						slot,
						ty,
						DescriptorBufferInfo::default().buffer(buffer).offset(offset).range(range),
					)),
					AshDescriptor::UniformTexelBuffer(view) | AshDescriptor::StorageTexelBuffer(view) => {
						texel_buffers.push((slot, ty, view))
					}
					AshDescriptor::SampledImage(view) => images.push((
						slot,
						ty,
						DescriptorImageInfo::default()
							.image_view(view)
							.image_layout(ImageLayout::SHADER_READ_ONLY_OPTIMAL),
					)),
					AshDescriptor::StorageImage(view) => images.push((
						slot,
						ty,
						DescriptorImageInfo::default()
							.image_view(view)
							.image_layout(ImageLayout::GENERAL),
					)),
					AshDescriptor::Sampler(sampler) => {
						images.push((slot, ty, DescriptorImageInfo::default().sampler(sampler)))
					}
					AshDescriptor::AccelerationStructure(handle) => acceleration_structures.push((slot, handle)),
				}
			}

			let write = |slot: u32, ty: DescriptorType| {
				WriteDescriptorSet::default()
					.dst_set(heap.set)
					.dst_binding(heap_binding(ty))
					.dst_array_element(slot)
					.descriptor_type(ty)
			};
			let writes = buffers
				.iter()
				.map(|(slot, ty, info)| write(*slot, *ty).buffer_info(std::slice::from_ref(info)))
				.chain(
					images
						.iter()
						.map(|(slot, ty, info)| write(*slot, *ty).image_info(std::slice::from_ref(info))),
				)
				.chain(
					texel_buffers
						.iter()
						.map(|(slot, ty, view)| write(*slot, *ty).texel_buffer_view(std::slice::from_ref(view))),
				)
				.collect::<SmallVec<[_; 16]>>();
			if !writes.is_empty() {
				self.device.update_descriptor_sets(&writes, &[]);
			}

			for (slot, handle) in &acceleration_structures {
				let mut info =
					WriteDescriptorSetAccelerationStructureKHR::default().acceleration_structures(std::slice::from_ref(handle));
				let mut as_write = write(*slot, DescriptorType::ACCELERATION_STRUCTURE_KHR).push_next(&mut info);
				as_write.descriptor_count = 1;
				self.device.update_descriptor_sets(&[as_write], &[]);
			}
		}
	}

	fn object_descriptor(&self, object: &BoundObject<Self>) -> AshDescriptor {
		match object {
			BoundObject::Buffer(buffer) => AshDescriptor::UniformBuffer {
				buffer: buffer.buffer,
				offset: buffer.offset(),
				range: buffer.size(),
			},
			BoundObject::BufferView(view) => match (view.view_type(), view.view) {
				(ViewType::ShaderResource, Some(texel)) => AshDescriptor::UniformTexelBuffer(texel),
				(ViewType::UnorderedAccess, Some(texel)) => AshDescriptor::StorageTexelBuffer(texel),
				(_, None) => AshDescriptor::StorageBuffer {
					buffer: view.buffer().buffer,
					offset: view.buffer().offset(),
					range: view.buffer().size(),
				},
			},
			BoundObject::TextureView(view) => match view.view_type() {
				ViewType::ShaderResource => AshDescriptor::SampledImage(view.image_view),
				ViewType::UnorderedAccess => AshDescriptor::StorageImage(view.image_view),
			},
			BoundObject::Sampler(sampler) => AshDescriptor::Sampler(sampler.sampler),
			BoundObject::AccelerationStructure(tlas) => AshDescriptor::AccelerationStructure(tlas.handle),
		}
	}

	fn gpu_address(&self, object: &BoundObject<Self>) -> Option<u64> {
		match object {
			BoundObject::Buffer(buffer) => Some(buffer.gpu_address()),
			BoundObject::BufferView(view) => Some(view.buffer().gpu_address()),
			_ => None,
		}
	}

	fn resource_state(&self, object: &BoundObject<Self>) -> Option<ResourceState> {
		match object {
			BoundObject::Buffer(buffer) => Some(buffer.state().load()),
			BoundObject::BufferView(view) => Some(view.buffer().state().load()),
			BoundObject::TextureView(view) => Some(view.state().load()),
			BoundObject::AccelerationStructure(tlas) => Some(tlas.state().load()),
			BoundObject::Sampler(_) => None,
		}
	}

	unsafe fn create_pipeline_layout(&self, set: &SignatureSet<Self>) -> Result<AshPipelineLayout, AshLayoutError> {
		unsafe {
			let count = set.parameter_count();
			let size = count * PUSH_CONSTANT_PARAMETER_SIZE;
			if size > self.properties.max_push_constants_size {
				return Err(AshLayoutError::TooManyParameters {
					count,
					size,
					max: self.properties.max_push_constants_size,
				});
			}
			let heap_set_layouts = *self.heap_set_layouts.lock();
			if heap_set_layouts.contains(&DescriptorSetLayout::null()) {
				return Err(AshLayoutError::MissingHeaps);
			}

			let mut first_parameters = [0; MAX_RESOURCE_SIGNATURES];
			for (binding_index, first) in first_parameters.iter_mut().enumerate() {
				*first = set.first_parameter(binding_index as u8);
			}
			let mut out = AshPipelineLayout {
				layout: PipelineLayout::null(),
				push_constant_stages: self.shader_stages,
				first_parameters,
				immutable_sets: SmallVec::new(),
				immutable_set_layouts: SmallVec::new(),
				immutable_pool: DescriptorPool::null(),
				immutable_samplers: Vec::new(),
				device: self.device.clone(),
			};

			let mut immutable_count = 0;
			for (_, signature) in set.iter() {
				if signature.immutable_sampler_count() == 0 {
					continue;
				}
				let immutable = immutable_sampler_bindings(
					(0..signature.immutable_sampler_count()).map(|index| signature.immutable_sampler(index)),
				);
				let mut samplers = SmallVec::<[(u32, ShaderStageFlags, Vec<ash::vk::Sampler>); 4]>::new();
				for binding in &immutable {
					let sampler = self.create_vk_sampler(binding.desc)?;
					out.immutable_samplers.push(sampler);
					samplers.push((
						binding.register,
						binding.stages.to_ash_shader_stage_flags(),
						vec![sampler; binding.array_size as usize],
					));
					immutable_count += binding.array_size;
				}
				let bindings = samplers
					.iter()
					.map(|(register, stages, samplers)| {
						DescriptorSetLayoutBinding::default()
							.binding(*register)
							.descriptor_type(DescriptorType::SAMPLER)
							.stage_flags(*stages)
							.immutable_samplers(samplers)
					})
					.collect::<SmallVec<[_; 4]>>();
				out.immutable_set_layouts.push(
					self.device
						.create_descriptor_set_layout(&DescriptorSetLayoutCreateInfo::default().bindings(&bindings), None)?,
				);
			}

			let set_layouts = heap_set_layouts
				.iter()
				.chain(&out.immutable_set_layouts)
				.copied()
				.collect::<SmallVec<[_; 4]>>();
			let push_constant_ranges = [PushConstantRange {
				offset: 0,
				size,
				stage_flags: self.shader_stages,
			}];
			out.layout = self.device.create_pipeline_layout(
				&PipelineLayoutCreateInfo::default()
					.set_layouts(&set_layouts)
					.push_constant_ranges(&push_constant_ranges[..usize::from(size > 0)]),
				None,
			)?;

			if !out.immutable_set_layouts.is_empty() {
				out.immutable_pool = self.device.create_descriptor_pool(
					&DescriptorPoolCreateInfo::default()
						.pool_sizes(&[DescriptorPoolSize::default()
							.ty(DescriptorType::SAMPLER)
							.descriptor_count(immutable_count)])
						.max_sets(out.immutable_set_layouts.len() as u32),
					None,
				)?;
				out.immutable_sets = self
					.device
					.allocate_descriptor_sets(
						&DescriptorSetAllocateInfo::default()
							.descriptor_pool(out.immutable_pool)
							.set_layouts(&out.immutable_set_layouts),
					)?
					.into_iter()
					.collect();
			}
			Ok(out)
		}
	}
}

/// One binding of an immutable sampler set layout.
#[derive(Copy, Clone, Debug, PartialEq)]
struct ImmutableSamplerBinding<'a> {
	register: u32,
	stages: ShaderStages,
	array_size: u32,
	desc: &'a SamplerDesc,
}

/// Declarations merged across ray-tracing stages share a register, they become a single binding visible to the
/// stages of all of them.
fn immutable_sampler_bindings<'a>(
	samplers: impl IntoIterator<Item = (&'a ImmutableSamplerDescriptor, &'a ImmutableSamplerAttribs)>,
) -> SmallVec<[ImmutableSamplerBinding<'a>; 4]> {
	let mut out = SmallVec::<[ImmutableSamplerBinding<'a>; 4]>::new();
	for (desc, attribs) in samplers {
		match out.iter_mut().find(|binding| binding.register == attribs.register) {
			Some(binding) => binding.stages |= desc.stages,
			None => out.push(ImmutableSamplerBinding {
				register: attribs.register,
				stages: desc.stages,
				array_size: attribs.array_size,
				desc: &desc.desc,
			}),
		}
	}
	out
}
