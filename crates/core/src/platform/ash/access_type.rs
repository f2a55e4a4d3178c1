use crate::platform::ResourceState;
use ash::vk::{AccessFlags2, ImageLayout, PipelineStageFlags2};

pub struct AshAccess {
	pub stage_mask: PipelineStageFlags2,
	pub access_mask: AccessFlags2,
	pub image_layout: ImageLayout,
}

impl AshAccess {
	pub const fn new(stage_mask: PipelineStageFlags2, access_mask: AccessFlags2, image_layout: ImageLayout) -> Self {
		Self {
			stage_mask,
			access_mask,
			image_layout,
		}
	}
}

const SHADERS: PipelineStageFlags2 = PipelineStageFlags2::from_raw(
	PipelineStageFlags2::ALL_GRAPHICS.as_raw()
		| PipelineStageFlags2::COMPUTE_SHADER.as_raw()
		| PipelineStageFlags2::RAY_TRACING_SHADER_KHR.as_raw(),
);

impl ResourceState {
	pub fn to_ash_access(&self) -> AshAccess {
		match self {
			ResourceState::Undefined => {
				AshAccess::new(PipelineStageFlags2::ALL_COMMANDS, AccessFlags2::NONE, ImageLayout::UNDEFINED)
			}
			ResourceState::Common => AshAccess::new(
				PipelineStageFlags2::ALL_COMMANDS,
				AccessFlags2::MEMORY_READ | AccessFlags2::MEMORY_WRITE,
				ImageLayout::GENERAL,
			),
			ResourceState::ConstantBuffer => {
				AshAccess::new(SHADERS, AccessFlags2::UNIFORM_READ, ImageLayout::UNDEFINED)
			}
			ResourceState::ShaderResource => AshAccess::new(
				SHADERS,
				AccessFlags2::SHADER_SAMPLED_READ | AccessFlags2::SHADER_STORAGE_READ,
				ImageLayout::SHADER_READ_ONLY_OPTIMAL,
			),
			ResourceState::UnorderedAccess => AshAccess::new(
				SHADERS,
				AccessFlags2::SHADER_STORAGE_READ | AccessFlags2::SHADER_STORAGE_WRITE,
				ImageLayout::GENERAL,
			),
			ResourceState::RayTracing => AshAccess::new(
				SHADERS,
				AccessFlags2::ACCELERATION_STRUCTURE_READ_KHR,
				ImageLayout::UNDEFINED,
			),
			ResourceState::CopySource => AshAccess::new(
				PipelineStageFlags2::TRANSFER,
				AccessFlags2::TRANSFER_READ,
				ImageLayout::TRANSFER_SRC_OPTIMAL,
			),
			ResourceState::CopyDest => AshAccess::new(
				PipelineStageFlags2::TRANSFER,
				AccessFlags2::TRANSFER_WRITE,
				ImageLayout::TRANSFER_DST_OPTIMAL,
			),
			ResourceState::RenderTarget => AshAccess::new(
				PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
				AccessFlags2::COLOR_ATTACHMENT_READ | AccessFlags2::COLOR_ATTACHMENT_WRITE,
				ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
			),
		}
	}
}
