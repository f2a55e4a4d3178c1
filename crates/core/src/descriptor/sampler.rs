use crate::descriptor::ShaderStages;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Filter {
	Nearest,
	#[default]
	Linear,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum AddressMode {
	#[default]
	Repeat,
	MirrorRepeat,
	ClampToEdge,
	ClampToBorder,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
	Never,
	Less,
	Equal,
	LessOrEqual,
	Greater,
	NotEqual,
	GreaterOrEqual,
	Always,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum BorderColor {
	#[default]
	TransparentBlack,
	OpaqueBlack,
	OpaqueWhite,
}

/// The full parameter block of a sampler.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct SamplerDesc {
	pub min_filter: Filter,
	pub mag_filter: Filter,
	pub mip_filter: Filter,
	pub address_u: AddressMode,
	pub address_v: AddressMode,
	pub address_w: AddressMode,
	pub mip_lod_bias: f32,
	pub max_anisotropy: u32,
	pub compare: Option<CompareOp>,
	pub border_color: BorderColor,
	pub min_lod: f32,
	pub max_lod: f32,
}

impl Default for SamplerDesc {
	fn default() -> Self {
		Self {
			min_filter: Filter::Linear,
			mag_filter: Filter::Linear,
			mip_filter: Filter::Linear,
			address_u: AddressMode::Repeat,
			address_v: AddressMode::Repeat,
			address_w: AddressMode::Repeat,
			mip_lod_bias: 0.,
			max_anisotropy: 1,
			compare: None,
			border_color: BorderColor::TransparentBlack,
			min_lod: 0.,
			max_lod: f32::MAX,
		}
	}
}

impl SamplerDesc {
	pub fn with_filter(mut self, filter: Filter) -> Self {
		self.min_filter = filter;
		self.mag_filter = filter;
		self.mip_filter = filter;
		self
	}

	pub fn with_address_mode(mut self, mode: AddressMode) -> Self {
		self.address_u = mode;
		self.address_v = mode;
		self.address_w = mode;
		self
	}

	#[allow(clippy::type_complexity)]
	fn key(
		&self,
	) -> (
		[Filter; 3],
		[AddressMode; 3],
		u32,
		u32,
		Option<CompareOp>,
		BorderColor,
		u32,
		u32,
	) {
		(
			[self.min_filter, self.mag_filter, self.mip_filter],
			[self.address_u, self.address_v, self.address_w],
			self.mip_lod_bias.to_bits(),
			self.max_anisotropy,
			self.compare,
			self.border_color,
			self.min_lod.to_bits(),
			self.max_lod.to_bits(),
		)
	}
}

// floats are compared bitwise, so that equal descs always hash equally
impl PartialEq for SamplerDesc {
	fn eq(&self, other: &Self) -> bool {
		self.key() == other.key()
	}
}

impl Eq for SamplerDesc {}

impl Hash for SamplerDesc {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.key().hash(state);
	}
}

/// A sampler baked into the native layout.
///
/// It is matched against a sampler resource by name: either the resource's name equals [`Self::name`], or, if the
/// signature uses combined samplers, [`Self::name`] names the texture and the resource is that texture's sampler.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ImmutableSamplerDescriptor {
	pub name: String,
	pub stages: ShaderStages,
	pub desc: SamplerDesc,
}

impl ImmutableSamplerDescriptor {
	pub fn new(name: impl Into<String>, stages: ShaderStages, desc: SamplerDesc) -> Self {
		Self {
			name: name.into(),
			stages,
			desc,
		}
	}

	/// Whether this immutable sampler serves a resource called `resource_name`.
	pub fn matches(&self, resource_name: &str, combined_sampler_suffix: Option<&str>) -> bool {
		if self.name == resource_name {
			return true;
		}
		match combined_sampler_suffix {
			Some(suffix) => resource_name
				.strip_suffix(suffix)
				.is_some_and(|texture| texture == self.name),
			None => false,
		}
	}

	pub fn hash_structure<H: Hasher>(&self, state: &mut H) {
		self.stages.hash(state);
		self.desc.hash(state);
	}
}
