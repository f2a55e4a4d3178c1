use crate::descriptor::ShaderStages;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// What kind of object a resource slot accepts.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
	ConstantBuffer,
	TextureSrv,
	BufferSrv,
	TextureUav,
	BufferUav,
	Sampler,
	AccelerationStructure,
}

impl ResourceKind {
	pub const fn class(self) -> KindClass {
		match self {
			ResourceKind::Sampler => KindClass::Sampler,
			_ => KindClass::View,
		}
	}

	pub const fn range_type(self) -> RangeType {
		match self {
			ResourceKind::ConstantBuffer => RangeType::Cbv,
			ResourceKind::TextureSrv | ResourceKind::BufferSrv | ResourceKind::AccelerationStructure => RangeType::Srv,
			ResourceKind::TextureUav | ResourceKind::BufferUav => RangeType::Uav,
			ResourceKind::Sampler => RangeType::Sampler,
		}
	}

	/// The flags a resource of this kind may carry.
	pub const fn valid_flags(self) -> ResourceFlags {
		match self {
			ResourceKind::ConstantBuffer => ResourceFlags::NO_DYNAMIC_BUFFERS.union(ResourceFlags::RUNTIME_ARRAY),
			ResourceKind::TextureSrv => ResourceFlags::COMBINED_SAMPLER.union(ResourceFlags::RUNTIME_ARRAY),
			ResourceKind::BufferSrv | ResourceKind::BufferUav => ResourceFlags::NO_DYNAMIC_BUFFERS
				.union(ResourceFlags::FORMATTED_BUFFER)
				.union(ResourceFlags::RUNTIME_ARRAY),
			ResourceKind::TextureUav | ResourceKind::Sampler | ResourceKind::AccelerationStructure => {
				ResourceFlags::RUNTIME_ARRAY
			}
		}
	}

	pub const fn name(self) -> &'static str {
		match self {
			ResourceKind::ConstantBuffer => "constant buffer",
			ResourceKind::TextureSrv => "texture SRV",
			ResourceKind::BufferSrv => "buffer SRV",
			ResourceKind::TextureUav => "texture UAV",
			ResourceKind::BufferUav => "buffer UAV",
			ResourceKind::Sampler => "sampler",
			ResourceKind::AccelerationStructure => "acceleration structure",
		}
	}
}

/// Resources of different classes never share a table, as they live in different descriptor heaps.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum KindClass {
	View,
	Sampler,
}

impl KindClass {
	pub const COUNT: usize = 2;
	pub const ALL: [KindClass; Self::COUNT] = [KindClass::View, KindClass::Sampler];

	#[inline]
	pub const fn index(self) -> usize {
		self as usize
	}
}

/// Native descriptor range type, also used as the table index of the self-contained cache layout.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum RangeType {
	Srv,
	Uav,
	Cbv,
	Sampler,
}

impl RangeType {
	pub const COUNT: usize = 4;

	#[inline]
	pub const fn index(self) -> usize {
		self as usize
	}
}

/// How often the object bound to a resource is expected to change.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Variability {
	/// Bound once through the signature and shared by every binding instance.
	Static,
	/// Bound once per binding instance.
	Mutable,
	/// Expected to change between draws.
	Dynamic,
}

impl Variability {
	pub const COUNT: usize = 3;
	pub const ALL: [Variability; Self::COUNT] = [Variability::Static, Variability::Mutable, Variability::Dynamic];

	#[inline]
	pub const fn index(self) -> usize {
		self as usize
	}

	pub const fn mask(self) -> VariabilityMask {
		match self {
			Variability::Static => VariabilityMask::STATIC,
			Variability::Mutable => VariabilityMask::MUTABLE,
			Variability::Dynamic => VariabilityMask::DYNAMIC,
		}
	}

	pub const fn name(self) -> &'static str {
		match self {
			Variability::Static => "static",
			Variability::Mutable => "mutable",
			Variability::Dynamic => "dynamic",
		}
	}
}

bitflags::bitflags! {
	#[repr(transparent)]
	#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
	pub struct VariabilityMask: u8 {
		const STATIC = 1 << 0;
		const MUTABLE = 1 << 1;
		const DYNAMIC = 1 << 2;
	}
}

impl VariabilityMask {
	pub fn contains_variability(self, variability: Variability) -> bool {
		self.contains(variability.mask())
	}
}

bitflags::bitflags! {
	#[repr(transparent)]
	#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
	#[serde(transparent)]
	pub struct ResourceFlags: u8 {
		/// The buffer will never be bound with a per-draw dynamic offset, so it is placed in a table instead of
		/// being bound inline.
		const NO_DYNAMIC_BUFFERS = 1 << 0;
		/// The buffer view is a formatted (typed) buffer view.
		const FORMATTED_BUFFER = 1 << 1;
		/// Runtime-sized array, `array_size` is its upper bound.
		const RUNTIME_ARRAY = 1 << 2;
		/// The texture is sampled through a combined texture sampler.
		const COMBINED_SAMPLER = 1 << 3;
	}
}

/// A single declared resource slot of a signature.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ResourceDescriptor {
	pub name: String,
	pub stages: ShaderStages,
	pub kind: ResourceKind,
	pub array_size: u32,
	pub variability: Variability,
	pub flags: ResourceFlags,
}

impl ResourceDescriptor {
	pub fn new(
		name: impl Into<String>,
		stages: ShaderStages,
		kind: ResourceKind,
		variability: Variability,
	) -> Self {
		Self {
			name: name.into(),
			stages,
			kind,
			array_size: 1,
			variability,
			flags: ResourceFlags::empty(),
		}
	}

	pub fn with_array_size(mut self, array_size: u32) -> Self {
		self.array_size = array_size;
		self
	}

	pub fn with_flags(mut self, flags: ResourceFlags) -> Self {
		self.flags = flags;
		self
	}

	#[inline]
	pub fn is_runtime_array(&self) -> bool {
		self.flags.contains(ResourceFlags::RUNTIME_ARRAY)
	}

	/// Whether this resource is bound as a direct GPU address instead of through a table slot.
	pub fn is_inline_eligible(&self) -> bool {
		let dynamic_offset = !self.flags.contains(ResourceFlags::NO_DYNAMIC_BUFFERS);
		let single = self.array_size == 1 && !self.is_runtime_array();
		match self.kind {
			ResourceKind::ConstantBuffer => dynamic_offset && single,
			ResourceKind::BufferSrv => dynamic_offset && single && !self.flags.contains(ResourceFlags::FORMATTED_BUFFER),
			_ => false,
		}
	}

	/// Equality of everything but the name.
	pub fn structurally_eq(&self, other: &Self) -> bool {
		self.stages == other.stages
			&& self.kind == other.kind
			&& self.array_size == other.array_size
			&& self.variability == other.variability
			&& self.flags == other.flags
	}

	/// Hashes everything but the name.
	pub fn hash_structure<H: Hasher>(&self, state: &mut H) {
		self.stages.hash(state);
		self.kind.hash(state);
		self.array_size.hash(state);
		self.variability.hash(state);
		self.flags.hash(state);
	}

	/// Name with array index, for log messages.
	pub fn print_name(&self, array_index: u32) -> String {
		if self.array_size > 1 {
			format!("{}[{}]", self.name, array_index)
		} else {
			self.name.clone()
		}
	}
}
