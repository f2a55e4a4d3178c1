use crate::backing::DescriptorAllocation;
use crate::cache::BoundObject;
use crate::descriptor::{KindClass, ResourceKind};
use crate::layout::CacheContent;
use crate::platform::{BindingPlatform, CommitPlatform, ResourceState, StateTransitionMode};
use smallvec::SmallVec;
use std::fmt::{Debug, Formatter};
use std::ops::Range;

/// A bound object together with everything needed to hand it to the GPU.
pub struct CachedResource<P: BindingPlatform> {
	pub kind: ResourceKind,
	pub object: BoundObject<P>,
	pub descriptor: P::CpuDescriptor,
	/// Address resolved at bind time, only for inline bindings.
	pub gpu_address: Option<u64>,
	/// An inline binding whose address must be resolved again on every commit.
	pub dynamic_inline: bool,
}

impl<P: BindingPlatform> CachedResource<P> {
	pub fn new(platform: &P, kind: ResourceKind, object: BoundObject<P>) -> Self {
		Self {
			kind,
			descriptor: platform.object_descriptor(&object),
			object,
			gpu_address: None,
			dynamic_inline: false,
		}
	}
}

impl<P: BindingPlatform> Clone for CachedResource<P> {
	fn clone(&self) -> Self {
		Self {
			kind: self.kind,
			object: self.object.clone(),
			descriptor: self.descriptor,
			gpu_address: self.gpu_address,
			dynamic_inline: self.dynamic_inline,
		}
	}
}

impl<P: BindingPlatform> Debug for CachedResource<P> {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("CachedResource")
			.field("kind", &self.kind)
			.field("object", &self.object)
			.field("descriptor", &self.descriptor)
			.finish()
	}
}

#[derive(Clone, Debug, Default)]
struct CacheTable {
	resources: Range<u32>,
	/// Kind class and offset within the persistent allocation, if this table is backed by one.
	heap_space: Option<(KindClass, u32)>,
}

/// Storage of the objects bound to one signature, laid out table by table.
///
/// The cache itself does not enforce binding rules, it stores what it's told and mirrors every change into the
/// persistent descriptor storage of tables that have some.
pub struct ResourceCache<P: BindingPlatform> {
	content: CacheContent,
	tables: Vec<CacheTable>,
	resources: Vec<Option<CachedResource<P>>>,
	heap_space: [Option<DescriptorAllocation<P>>; KindClass::COUNT],
	dynamic_inline_buffers: u32,
}

impl<P: BindingPlatform> ResourceCache<P> {
	pub fn new(content: CacheContent) -> Self {
		Self {
			content,
			tables: Vec::new(),
			resources: Vec::new(),
			heap_space: [None, None],
			dynamic_inline_buffers: 0,
		}
	}

	#[inline]
	pub fn content(&self) -> CacheContent {
		self.content
	}

	/// Lay out empty tables of the given sizes, dropping everything that was stored before.
	pub fn initialize(&mut self, table_sizes: &[u32]) {
		let mut start = 0;
		self.tables = table_sizes
			.iter()
			.map(|&size| {
				let table = CacheTable {
					resources: start..start + size,
					heap_space: None,
				};
				start += size;
				table
			})
			.collect();
		self.resources.clear();
		self.resources.resize_with(start as usize, || None);
		self.heap_space = [None, None];
		self.dynamic_inline_buffers = 0;
	}

	#[inline]
	pub fn table_count(&self) -> u32 {
		self.tables.len() as u32
	}

	#[inline]
	pub fn table(&self, index: u32) -> &[Option<CachedResource<P>>] {
		let range = &self.tables[index as usize].resources;
		&self.resources[range.start as usize..range.end as usize]
	}

	#[inline]
	pub fn resource(&self, table: u32, offset: u32) -> Option<&CachedResource<P>> {
		self.table(table)[offset as usize].as_ref()
	}

	/// Attach the persistent descriptor storage of `class`: `tables` lists each backed table with its offset in
	/// `allocation`.
	pub fn set_descriptor_heap_space(
		&mut self,
		class: KindClass,
		allocation: DescriptorAllocation<P>,
		tables: impl IntoIterator<Item = (u32, u32)>,
	) {
		debug_assert_eq!(allocation.heap().class(), class);
		for (table, offset) in tables {
			let cache_table = &mut self.tables[table as usize];
			debug_assert!(
				offset + (cache_table.resources.end - cache_table.resources.start) <= allocation.len(),
				"table {} doesn't fit into its {:?} heap space",
				table,
				class
			);
			cache_table.heap_space = Some((class, offset));
		}
		self.heap_space[class.index()] = Some(allocation);
	}

	#[inline]
	pub fn descriptor_heap_space(&self, class: KindClass) -> Option<&DescriptorAllocation<P>> {
		self.heap_space[class.index()].as_ref()
	}

	/// Absolute heap offset of the first slot of `table`, if it lives in persistent storage.
	pub fn table_heap_offset(&self, table: u32) -> Option<u32> {
		let (class, offset) = self.tables[table as usize].heap_space?;
		Some(self.heap_space[class.index()].as_ref()?.start() + offset)
	}

	/// Store `value` at `offset` of `table`, returning what was there before.
	pub fn set_resource(
		&mut self,
		platform: &P,
		table: u32,
		offset: u32,
		value: Option<CachedResource<P>>,
	) -> Option<CachedResource<P>> {
		let cache_table = &self.tables[table as usize];
		debug_assert!(offset < cache_table.resources.end - cache_table.resources.start);
		if let Some((class, table_offset)) = cache_table.heap_space {
			if let Some(allocation) = &self.heap_space[class.index()] {
				let descriptor = value.as_ref().map(|v| v.descriptor).unwrap_or_default();
				// Safety: persistent heaps are update-after-bind, the slot belongs to this cache
				unsafe { allocation.write(platform, table_offset + offset, &[descriptor]) };
			}
		}

		if value.as_ref().is_some_and(|v| v.dynamic_inline) {
			self.dynamic_inline_buffers += 1;
		}
		let index = (cache_table.resources.start + offset) as usize;
		let previous = std::mem::replace(&mut self.resources[index], value);
		if previous.as_ref().is_some_and(|v| v.dynamic_inline) {
			self.dynamic_inline_buffers -= 1;
		}
		previous
	}

	/// Number of bound inline buffers with dynamic usage.
	#[inline]
	pub fn dynamic_inline_buffer_count(&self) -> u32 {
		self.dynamic_inline_buffers
	}

	/// Iterate every bound resource.
	pub fn bound_resources(&self) -> impl Iterator<Item = &CachedResource<P>> {
		self.resources.iter().flatten()
	}

	/// Descriptors of `table`, null for empty slots.
	pub fn table_descriptors(&self, table: u32) -> SmallVec<[P::CpuDescriptor; 16]> {
		self.table(table)
			.iter()
			.map(|r| r.as_ref().map(|r| r.descriptor).unwrap_or_default())
			.collect()
	}
}

impl<P: CommitPlatform> ResourceCache<P> {
	/// Bring every bound resource into the state its binding requires, or in [`StateTransitionMode::Verify`] log
	/// those that aren't. Returns the number of resources that were in the wrong state.
	pub fn transition_resource_states(
		&self,
		platform: &P,
		ctx: &mut P::CommandContext,
		mode: StateTransitionMode,
	) -> u32 {
		let mut mismatched = 0;
		for resource in self.bound_resources() {
			let Some(required) = ResourceState::required_by(resource.kind) else {
				continue;
			};
			let Some(current) = platform.resource_state(&resource.object) else {
				continue;
			};
			if current != required {
				mismatched += 1;
			}
			match mode {
				StateTransitionMode::Transition => {
					if current != required || required == ResourceState::UnorderedAccess {
						// Safety: ctx is recording
						unsafe { platform.transition_resource(ctx, &resource.object, current, required) };
					}
				}
				StateTransitionMode::Verify => {
					if current != required {
						tracing::error!(
							object = ?resource.object,
							?current,
							?required,
							"Resource is in the wrong state for its binding as {}",
							resource.kind.name()
						);
					}
				}
			}
		}
		mismatched
	}
}

impl<P: BindingPlatform> Debug for ResourceCache<P> {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ResourceCache")
			.field("content", &self.content)
			.field("tables", &self.tables)
			.field("bound", &self.bound_resources().count())
			.field("heap_space", &self.heap_space)
			.finish()
	}
}
