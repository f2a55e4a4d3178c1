use crate::descriptor::{AddressMode, BorderColor, CompareOp, Filter, SamplerDesc, ShaderStages};
use ash::vk::{LOD_CLAMP_NONE, SamplerCreateInfo, ShaderStageFlags};

impl ShaderStages {
	pub fn to_ash_shader_stage_flags(&self) -> ShaderStageFlags {
		const MAPPING: [(ShaderStages, ShaderStageFlags); ShaderStages::STAGE_COUNT] = [
			(ShaderStages::VERTEX, ShaderStageFlags::VERTEX),
			(ShaderStages::TESSELLATION_CONTROL, ShaderStageFlags::TESSELLATION_CONTROL),
			(ShaderStages::TESSELLATION_EVALUATION, ShaderStageFlags::TESSELLATION_EVALUATION),
			(ShaderStages::GEOMETRY, ShaderStageFlags::GEOMETRY),
			(ShaderStages::FRAGMENT, ShaderStageFlags::FRAGMENT),
			(ShaderStages::COMPUTE, ShaderStageFlags::COMPUTE),
			(ShaderStages::TASK, ShaderStageFlags::TASK_EXT),
			(ShaderStages::MESH, ShaderStageFlags::MESH_EXT),
			(ShaderStages::RAY_GEN, ShaderStageFlags::RAYGEN_KHR),
			(ShaderStages::RAY_MISS, ShaderStageFlags::MISS_KHR),
			(ShaderStages::RAY_CLOSEST_HIT, ShaderStageFlags::CLOSEST_HIT_KHR),
			(ShaderStages::RAY_ANY_HIT, ShaderStageFlags::ANY_HIT_KHR),
			(ShaderStages::RAY_INTERSECTION, ShaderStageFlags::INTERSECTION_KHR),
			(ShaderStages::CALLABLE, ShaderStageFlags::CALLABLE_KHR),
		];
		let mut out = ShaderStageFlags::empty();
		for (stage, flags) in MAPPING {
			if self.contains(stage) {
				out |= flags;
			}
		}
		out
	}
}

impl Filter {
	pub fn to_ash_filter(&self) -> ash::vk::Filter {
		match self {
			Filter::Nearest => ash::vk::Filter::NEAREST,
			Filter::Linear => ash::vk::Filter::LINEAR,
		}
	}

	pub fn to_ash_mipmap_mode(&self) -> ash::vk::SamplerMipmapMode {
		match self {
			Filter::Nearest => ash::vk::SamplerMipmapMode::NEAREST,
			Filter::Linear => ash::vk::SamplerMipmapMode::LINEAR,
		}
	}
}

impl AddressMode {
	pub fn to_ash_address_mode(&self) -> ash::vk::SamplerAddressMode {
		match self {
			AddressMode::ClampToEdge => ash::vk::SamplerAddressMode::CLAMP_TO_EDGE,
			AddressMode::Repeat => ash::vk::SamplerAddressMode::REPEAT,
			AddressMode::MirrorRepeat => ash::vk::SamplerAddressMode::MIRRORED_REPEAT,
			AddressMode::ClampToBorder => ash::vk::SamplerAddressMode::CLAMP_TO_BORDER,
		}
	}
}

impl CompareOp {
	pub fn to_ash_compare_op(&self) -> ash::vk::CompareOp {
		match self {
			CompareOp::Never => ash::vk::CompareOp::NEVER,
			CompareOp::Less => ash::vk::CompareOp::LESS,
			CompareOp::Equal => ash::vk::CompareOp::EQUAL,
			CompareOp::LessOrEqual => ash::vk::CompareOp::LESS_OR_EQUAL,
			CompareOp::Greater => ash::vk::CompareOp::GREATER,
			CompareOp::NotEqual => ash::vk::CompareOp::NOT_EQUAL,
			CompareOp::GreaterOrEqual => ash::vk::CompareOp::GREATER_OR_EQUAL,
			CompareOp::Always => ash::vk::CompareOp::ALWAYS,
		}
	}
}

impl BorderColor {
	pub fn to_ash_border_color(&self) -> ash::vk::BorderColor {
		match self {
			BorderColor::TransparentBlack => ash::vk::BorderColor::FLOAT_TRANSPARENT_BLACK,
			BorderColor::OpaqueBlack => ash::vk::BorderColor::FLOAT_OPAQUE_BLACK,
			BorderColor::OpaqueWhite => ash::vk::BorderColor::FLOAT_OPAQUE_WHITE,
		}
	}
}

impl SamplerDesc {
	pub fn to_ash_sampler_create_info(&self) -> SamplerCreateInfo<'static> {
		SamplerCreateInfo::default()
			.mag_filter(self.mag_filter.to_ash_filter())
			.min_filter(self.min_filter.to_ash_filter())
			.mipmap_mode(self.mip_filter.to_ash_mipmap_mode())
			.address_mode_u(self.address_u.to_ash_address_mode())
			.address_mode_v(self.address_v.to_ash_address_mode())
			.address_mode_w(self.address_w.to_ash_address_mode())
			.mip_lod_bias(self.mip_lod_bias)
			.anisotropy_enable(self.max_anisotropy > 1)
			.max_anisotropy(self.max_anisotropy as f32)
			.compare_enable(self.compare.is_some())
			.compare_op(self.compare.map_or(ash::vk::CompareOp::NEVER, |op| op.to_ash_compare_op()))
			.min_lod(self.min_lod)
			.max_lod(if self.max_lod == f32::MAX { LOD_CLAMP_NONE } else { self.max_lod })
			.border_color(self.border_color.to_ash_border_color())
	}
}
