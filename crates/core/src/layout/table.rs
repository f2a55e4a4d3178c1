use crate::descriptor::{KindClass, RangeType, ResourceKind, ShaderStages, Variability};
use smallvec::SmallVec;
use std::hash::{Hash, Hasher};

/// Static and mutable tables live in persistent storage, dynamic tables are re-allocated for every commit.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum ParameterGroup {
	StaticMutable,
	Dynamic,
}

impl ParameterGroup {
	pub const COUNT: usize = 2;

	#[inline]
	pub const fn index(self) -> usize {
		self as usize
	}

	pub const fn of(variability: Variability) -> Self {
		match variability {
			Variability::Static | Variability::Mutable => ParameterGroup::StaticMutable,
			Variability::Dynamic => ParameterGroup::Dynamic,
		}
	}
}

/// A contiguous run of registers of one type inside a [`BindingTable`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct DescriptorRange {
	pub range_type: RangeType,
	pub register: u32,
	pub space: u32,
	pub count: u32,
	pub offset_in_table: u32,
}

/// Descriptor ranges addressed together as one native binding unit.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BindingTable {
	pub(super) parameter: u32,
	pub(super) group: ParameterGroup,
	pub(super) stages: ShaderStages,
	pub(super) class: KindClass,
	pub(super) ranges: SmallVec<[DescriptorRange; 4]>,
	pub(super) size: u32,
	pub(super) offset_in_group: u32,
}

impl BindingTable {
	/// Index of this table among all parameters of the signature.
	#[inline]
	pub fn parameter(&self) -> u32 {
		self.parameter
	}

	#[inline]
	pub fn group(&self) -> ParameterGroup {
		self.group
	}

	#[inline]
	pub fn stages(&self) -> ShaderStages {
		self.stages
	}

	#[inline]
	pub fn class(&self) -> KindClass {
		self.class
	}

	#[inline]
	pub fn ranges(&self) -> &[DescriptorRange] {
		&self.ranges
	}

	/// Number of slots.
	#[inline]
	pub fn size(&self) -> u32 {
		self.size
	}

	/// Offset of the first slot within the allocation of all tables sharing this table's group and class.
	#[inline]
	pub fn offset_in_group(&self) -> u32 {
		self.offset_in_group
	}

	fn hash_structure<H: Hasher>(&self, state: &mut H) {
		self.parameter.hash(state);
		self.group.hash(state);
		self.stages.hash(state);
		self.class.hash(state);
		self.ranges.hash(state);
	}
}

/// A single buffer bound by GPU address.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct InlineBinding {
	pub parameter: u32,
	pub group: ParameterGroup,
	pub stages: ShaderStages,
	pub kind: ResourceKind,
	pub register: u32,
	pub space: u32,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(super) enum ParameterRef {
	Table(u32),
	Inline(u32),
}

#[derive(Copy, Clone, Debug)]
pub enum Parameter<'a> {
	Table(&'a BindingTable),
	Inline(&'a InlineBinding),
}

impl Parameter<'_> {
	/// Number of cache slots this parameter occupies.
	pub fn size(&self) -> u32 {
		match self {
			Parameter::Table(table) => table.size(),
			Parameter::Inline(_) => 1,
		}
	}
}

/// The finished table layout of a signature, as used by binding instances.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BindingLayout {
	pub(super) tables: Vec<BindingTable>,
	pub(super) inline: Vec<InlineBinding>,
	pub(super) parameters: Vec<ParameterRef>,
	pub(super) group_sizes: [[u32; ParameterGroup::COUNT]; KindClass::COUNT],
}

impl BindingLayout {
	#[inline]
	pub fn parameter_count(&self) -> u32 {
		self.parameters.len() as u32
	}

	pub fn parameter(&self, index: u32) -> Parameter<'_> {
		match self.parameters[index as usize] {
			ParameterRef::Table(t) => Parameter::Table(&self.tables[t as usize]),
			ParameterRef::Inline(i) => Parameter::Inline(&self.inline[i as usize]),
		}
	}

	pub fn parameters(&self) -> impl Iterator<Item = Parameter<'_>> {
		(0..self.parameter_count()).map(|i| self.parameter(i))
	}

	#[inline]
	pub fn tables(&self) -> &[BindingTable] {
		&self.tables
	}

	#[inline]
	pub fn inline_bindings(&self) -> &[InlineBinding] {
		&self.inline
	}

	/// Total slots of all tables of `class` in `group`.
	#[inline]
	pub fn group_size(&self, class: KindClass, group: ParameterGroup) -> u32 {
		self.group_sizes[class.index()][group.index()]
	}

	/// Size of the persistent GPU-visible storage a binding instance needs for `class`.
	#[inline]
	pub fn persistent_size(&self, class: KindClass) -> u32 {
		self.group_size(class, ParameterGroup::StaticMutable)
	}

	/// The slot count of every parameter, in parameter order.
	pub fn cache_table_sizes(&self) -> Vec<u32> {
		self.parameters().map(|p| p.size()).collect()
	}

	pub fn is_empty(&self) -> bool {
		self.parameters.is_empty()
	}

	pub fn hash_structure<H: Hasher>(&self, state: &mut H) {
		self.tables.len().hash(state);
		for table in &self.tables {
			table.hash_structure(state);
		}
		self.inline.hash(state);
	}
}
