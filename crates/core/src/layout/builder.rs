use crate::descriptor::{KindClass, ResourceKind, ShaderStages, Variability, MAX_SIGNATURE_DESCRIPTORS};
use crate::layout::table::ParameterRef;
use crate::layout::{
	BindingKind, BindingLayout, BindingTable, DescriptorRange, InlineBinding, ParameterGroup, SlotAssignment,
};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// A single resource asking for a place in the layout.
#[derive(Copy, Clone, Debug)]
pub struct SlotRequest {
	pub stages: ShaderStages,
	pub variability: Variability,
	pub kind: ResourceKind,
	pub binding: BindingKind,
	pub array_size: u32,
	pub register: u32,
	pub space: u32,
	/// Runtime-sized arrays never share their table.
	pub runtime_array: bool,
}

/// Packs resources into binding tables.
///
/// Resources sharing the same (parameter group, stages, kind class) are appended to the same table in the order
/// they are allocated, the first resource of a combination lazily creates its table. Inline bindings and
/// runtime-sized arrays always get a parameter of their own. Allocation never fails, as long as the summed array
/// sizes stay within [`MAX_SIGNATURE_DESCRIPTORS`], which [`SignatureDesc::validate`] guarantees.
///
/// [`SignatureDesc::validate`]: crate::descriptor::SignatureDesc::validate
#[derive(Debug, Default)]
pub struct BindingLayoutBuilder {
	tables: Vec<BindingTable>,
	inline: Vec<InlineBinding>,
	parameters: Vec<ParameterRef>,
	table_lookup: FxHashMap<(ParameterGroup, ShaderStages, KindClass), u32>,
	last_variability: Option<Variability>,
}

impl BindingLayoutBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn allocate_resource_slot(&mut self, request: SlotRequest) -> SlotAssignment {
		debug_assert!(
			self.last_variability.map_or(true, |last| last <= request.variability),
			"Resources must be allocated sorted by variability"
		);
		debug_assert!(request.array_size > 0);
		self.last_variability = Some(request.variability);

		let group = ParameterGroup::of(request.variability);
		let parameter = self.parameters.len() as u32;

		if request.binding == BindingKind::Inline {
			debug_assert_eq!(request.array_size, 1, "inline bindings can't be arrays");
			let index = self.inline.len() as u32;
			self.inline.push(InlineBinding {
				parameter,
				group,
				stages: request.stages,
				kind: request.kind,
				register: request.register,
				space: request.space,
			});
			self.parameters.push(ParameterRef::Inline(index));
			return SlotAssignment::new(parameter, 0);
		}

		let class = request.kind.class();
		let key = (group, request.stages, class);
		let table_index = match (request.runtime_array, self.table_lookup.get(&key)) {
			(false, Some(&index)) => index,
			_ => {
				let index = self.tables.len() as u32;
				self.tables.push(BindingTable {
					parameter,
					group,
					stages: request.stages,
					class,
					ranges: SmallVec::new(),
					size: 0,
					offset_in_group: 0,
				});
				self.parameters.push(ParameterRef::Table(index));
				if !request.runtime_array {
					self.table_lookup.insert(key, index);
				}
				index
			}
		};

		let table = &mut self.tables[table_index as usize];
		let offset = table.size;
		table.ranges.push(DescriptorRange {
			range_type: request.kind.range_type(),
			register: request.register,
			space: request.space,
			count: request.array_size,
			offset_in_table: offset,
		});
		table.size += request.array_size;
		debug_assert!(table.size <= MAX_SIGNATURE_DESCRIPTORS, "table exceeds {MAX_SIGNATURE_DESCRIPTORS} slots");
		SlotAssignment::new(table.parameter, offset)
	}

	/// Assigns every table its offset within its group allocation.
	pub fn finish(mut self) -> BindingLayout {
		let mut group_sizes = [[0; ParameterGroup::COUNT]; KindClass::COUNT];
		for table in &mut self.tables {
			let size = &mut group_sizes[table.class.index()][table.group.index()];
			table.offset_in_group = *size;
			*size += table.size;
		}
		tracing::trace!(
			tables = self.tables.len(),
			inline = self.inline.len(),
			"finished binding layout"
		);
		BindingLayout {
			tables: self.tables,
			inline: self.inline,
			parameters: self.parameters,
			group_sizes,
		}
	}
}
