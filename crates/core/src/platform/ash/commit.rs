use crate::cache::BoundObject;
use crate::descriptor::{KindClass, MAX_RESOURCE_SIGNATURES, ResourceKind};
use crate::platform::ash::{Ash, AshDescriptorHeap, AshPipelineLayout, PUSH_CONSTANT_PARAMETER_SIZE};
use crate::platform::{BufferViewObject, CommitPlatform, ResourceState};
use ash::vk::{
	BufferMemoryBarrier2, CommandBuffer, DependencyInfo, DescriptorSet, ImageMemoryBarrier2, MemoryBarrier2,
	PipelineBindPoint, PipelineLayout, QUEUE_FAMILY_IGNORED, ShaderStageFlags, WHOLE_SIZE,
};
use smallvec::SmallVec;

/// A command buffer in the recording state, with the pipeline layout of the pipeline that is or will be bound.
pub struct AshCommandContext {
	pub cmd: CommandBuffer,
	pub bind_point: PipelineBindPoint,
	layout: PipelineLayout,
	push_constant_stages: ShaderStageFlags,
	first_parameters: [u32; MAX_RESOURCE_SIGNATURES],
	immutable_sets: SmallVec<[DescriptorSet; 2]>,
}

impl AshCommandContext {
	pub fn new(cmd: CommandBuffer, bind_point: PipelineBindPoint, layout: &AshPipelineLayout) -> Self {
		Self {
			cmd,
			bind_point,
			layout: layout.layout,
			push_constant_stages: layout.push_constant_stages,
			first_parameters: layout.first_parameters,
			immutable_sets: layout.immutable_sets.clone(),
		}
	}

	fn push_constant_offset(&self, binding_index: u8, parameter: u32) -> u32 {
		(self.first_parameters[binding_index as usize] + parameter) * PUSH_CONSTANT_PARAMETER_SIZE
	}
}

unsafe impl CommitPlatform for Ash {
	type CommandContext = AshCommandContext;

	unsafe fn bind_descriptor_heaps(
		&self,
		ctx: &mut AshCommandContext,
		views: &AshDescriptorHeap,
		samplers: &AshDescriptorHeap,
	) {
		unsafe {
			debug_assert_eq!(views.class, KindClass::View);
			debug_assert_eq!(samplers.class, KindClass::Sampler);
			self.device
				.cmd_bind_descriptor_sets(ctx.cmd, ctx.bind_point, ctx.layout, 0, &[views.set, samplers.set], &[]);
			if !ctx.immutable_sets.is_empty() {
				self.device
					.cmd_bind_descriptor_sets(ctx.cmd, ctx.bind_point, ctx.layout, 2, &ctx.immutable_sets, &[]);
			}
		}
	}

	unsafe fn transition_resource(
		&self,
		ctx: &mut AshCommandContext,
		object: &BoundObject<Self>,
		from: ResourceState,
		to: ResourceState,
	) {
		unsafe {
			let src = from.to_ash_access();
			let dst = to.to_ash_access();
			let buffer_barrier = |buffer: ash::vk::Buffer| {
				BufferMemoryBarrier2::default()
					.src_stage_mask(src.stage_mask)
					.src_access_mask(src.access_mask)
					.dst_stage_mask(dst.stage_mask)
					.dst_access_mask(dst.access_mask)
					.src_queue_family_index(QUEUE_FAMILY_IGNORED)
					.dst_queue_family_index(QUEUE_FAMILY_IGNORED)
					.buffer(buffer)
					.offset(0)
					.size(WHOLE_SIZE)
			};
			match object {
				BoundObject::Buffer(buffer) => {
					self.device.cmd_pipeline_barrier2(
						ctx.cmd,
						&DependencyInfo::default().buffer_memory_barriers(&[buffer_barrier(buffer.buffer)]),
					);
					buffer.state().store(to);
				}
				BoundObject::BufferView(view) => {
					let buffer = view.buffer();
					self.device.cmd_pipeline_barrier2(
						ctx.cmd,
						&DependencyInfo::default().buffer_memory_barriers(&[buffer_barrier(buffer.buffer)]),
					);
					buffer.state().store(to);
				}
				BoundObject::TextureView(view) => {
					self.device.cmd_pipeline_barrier2(
						ctx.cmd,
						&DependencyInfo::default().image_memory_barriers(&[ImageMemoryBarrier2::default()
							.src_stage_mask(src.stage_mask)
							.src_access_mask(src.access_mask)
							.dst_stage_mask(dst.stage_mask)
							.dst_access_mask(dst.access_mask)
							.old_layout(src.image_layout)
							.new_layout(dst.image_layout)
							.src_queue_family_index(QUEUE_FAMILY_IGNORED)
							.dst_queue_family_index(QUEUE_FAMILY_IGNORED)
							.image(view.image)
							.subresource_range(view.subresource_range)]),
					);
					view.state().store(to);
				}
				BoundObject::AccelerationStructure(tlas) => {
					self.device.cmd_pipeline_barrier2(
						ctx.cmd,
						&DependencyInfo::default().memory_barriers(&[MemoryBarrier2::default()
							.src_stage_mask(src.stage_mask)
							.src_access_mask(src.access_mask)
							.dst_stage_mask(dst.stage_mask)
							.dst_access_mask(dst.access_mask)]),
					);
					tlas.state().store(to);
				}
				BoundObject::Sampler(_) => (),
			}
		}
	}

	unsafe fn bind_table(
		&self,
		ctx: &mut AshCommandContext,
		binding_index: u8,
		parameter: u32,
		_class: KindClass,
		heap_offset: u32,
	) {
		unsafe {
			self.device.cmd_push_constants(
				ctx.cmd,
				ctx.layout,
				ctx.push_constant_stages,
				ctx.push_constant_offset(binding_index, parameter),
				bytemuck::bytes_of(&[heap_offset, 0u32]),
			);
		}
	}

	unsafe fn bind_inline(
		&self,
		ctx: &mut AshCommandContext,
		binding_index: u8,
		parameter: u32,
		_kind: ResourceKind,
		gpu_address: u64,
	) {
		unsafe {
			self.device.cmd_push_constants(
				ctx.cmd,
				ctx.layout,
				ctx.push_constant_stages,
				ctx.push_constant_offset(binding_index, parameter),
				bytemuck::bytes_of(&gpu_address),
			);
		}
	}
}
