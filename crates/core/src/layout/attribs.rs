use serde::{Deserialize, Serialize};

/// The two contexts a resource can be cached in.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum CacheContent {
	/// The signature's private cache of static resources.
	SelfContained,
	/// A binding instance holding static, mutable and dynamic resources.
	Instance,
}

impl CacheContent {
	pub const COUNT: usize = 2;

	#[inline]
	pub const fn index(self) -> usize {
		self as usize
	}
}

/// Position of a resource inside a cache: the table (parameter) index and the offset of its first array element
/// from the table start.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct SlotAssignment {
	table: u32,
	offset: u32,
}

impl SlotAssignment {
	pub const MAX_TABLE: u32 = u16::MAX as u32;
	pub const MAX_OFFSET: u32 = (1 << 24) - 1;

	pub fn new(table: u32, offset: u32) -> Self {
		debug_assert!(
			table <= Self::MAX_TABLE,
			"table index {} exceeds {}",
			table,
			Self::MAX_TABLE
		);
		debug_assert!(
			offset <= Self::MAX_OFFSET,
			"table offset {} exceeds {}",
			offset,
			Self::MAX_OFFSET
		);
		Self { table, offset }
	}

	#[inline]
	pub fn table(&self) -> u32 {
		self.table
	}

	#[inline]
	pub fn offset(&self) -> u32 {
		self.offset
	}
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum BindingKind {
	/// Bound through a slot of a binding table.
	Table,
	/// Bound directly by GPU address, always a single buffer.
	Inline,
}

/// Everything derived from a [`ResourceDescriptor`](crate::descriptor::ResourceDescriptor) by the layout builder.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ResourceAttribs {
	/// Native shader register of the first array element.
	pub register: u32,
	/// Native register space, 0 except for runtime-sized arrays.
	pub space: u32,
	slots: [Option<SlotAssignment>; CacheContent::COUNT],
	/// Index of the sampler resource assigned to this texture when combined samplers are in use.
	pub sampler_index: Option<u32>,
	/// The sampler (or this texture's assigned sampler) is served by an immutable sampler.
	pub immutable_sampler: bool,
	pub binding: BindingKind,
}

impl ResourceAttribs {
	pub fn new(
		register: u32,
		space: u32,
		self_contained: Option<SlotAssignment>,
		instance: Option<SlotAssignment>,
		sampler_index: Option<u32>,
		immutable_sampler: bool,
		binding: BindingKind,
	) -> Self {
		debug_assert!(
			binding == BindingKind::Table || instance.is_some_and(|s| s.offset() == 0),
			"inline bindings always occupy a single slot"
		);
		Self {
			register,
			space,
			slots: [self_contained, instance],
			sampler_index,
			immutable_sampler,
			binding,
		}
	}

	/// The slot of this resource in a cache of the given content, or None if that cache doesn't hold it.
	#[inline]
	pub fn slot(&self, content: CacheContent) -> Option<SlotAssignment> {
		self.slots[content.index()]
	}

	#[inline]
	pub fn is_inline(&self) -> bool {
		self.binding == BindingKind::Inline
	}

	#[inline]
	pub fn is_combined_with_sampler(&self) -> bool {
		self.sampler_index.is_some()
	}

	/// Two resources are compatible if they end up at exactly the same native location.
	pub fn is_compatible_with(&self, other: &Self) -> bool {
		self == other
	}
}

/// Native location of an immutable sampler.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ImmutableSamplerAttribs {
	pub register: u32,
	pub space: u32,
	/// Maximum array size of all sampler resources this immutable sampler serves, 1 if it stands alone.
	pub array_size: u32,
}

impl Default for ImmutableSamplerAttribs {
	fn default() -> Self {
		Self {
			register: 0,
			space: 0,
			array_size: 1,
		}
	}
}
