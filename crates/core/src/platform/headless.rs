//! An in-memory platform without any GPU. Every native command is recorded into a [`HeadlessContext`], so the
//! binding model can be tested deterministically.

use crate::cache::BoundObject;
use crate::config::DescriptorHeapSizes;
use crate::descriptor::{KindClass, ResourceKind};
use crate::platform::{
	BindingPlatform, BufferObject, BufferUsage, BufferViewObject, CommitPlatform, DeviceObject, ResourceState,
	ResourceStateCell, TextureViewObject, ViewType,
};
use crate::set_cache::SignatureSet;
use parking_lot::Mutex;
use std::ops::Range;
use std::sync::atomic::Ordering::Relaxed;
use std::sync::{Arc, Barrier};
use std::sync::atomic::{AtomicU32, AtomicU64};
use thiserror::Error;

/// Null is 0, every object gets a unique non-zero id.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct HeadlessDescriptor(pub u64);

pub struct Headless {
	limits: DescriptorHeapSizes,
	max_layout_parameters: u32,
	next_id: AtomicU64,
	heaps: Mutex<Vec<(KindClass, HeadlessHeap)>>,
	layouts_created: AtomicU32,
	layout_barrier: Option<Arc<Barrier>>,
}

impl Headless {
	pub fn new() -> Self {
		Self::with_limits(DescriptorHeapSizes::new(1_000_000, 2048), 64)
	}

	pub fn with_limits(limits: DescriptorHeapSizes, max_layout_parameters: u32) -> Self {
		Self {
			limits,
			max_layout_parameters,
			next_id: AtomicU64::new(1),
			heaps: Mutex::new(Vec::new()),
			layouts_created: AtomicU32::new(0),
			layout_barrier: None,
		}
	}

	/// Every pipeline layout creation waits on `barrier` before it returns, which lines up layout creations of
	/// concurrent threads.
	pub fn with_layout_barrier(mut self, barrier: Arc<Barrier>) -> Self {
		self.layout_barrier = Some(barrier);
		self
	}

	fn next_id(&self) -> u64 {
		self.next_id.fetch_add(1, Relaxed)
	}

	pub fn create_buffer(&self, name: &str, usage: BufferUsage) -> Arc<HeadlessBuffer> {
		Arc::new(HeadlessBuffer {
			id: self.next_id(),
			name: name.to_string(),
			usage,
			version: AtomicU64::new(0),
			state: ResourceStateCell::default(),
		})
	}

	pub fn create_buffer_view(&self, buffer: &Arc<HeadlessBuffer>, view_type: ViewType) -> Arc<HeadlessBufferView> {
		Arc::new(HeadlessBufferView {
			id: self.next_id(),
			name: format!("{} {:?} view", buffer.name, view_type),
			view_type,
			buffer: buffer.clone(),
		})
	}

	pub fn create_texture_view(&self, name: &str) -> Arc<HeadlessTextureView> {
		self.create_texture_view_with(name, ViewType::ShaderResource, None)
	}

	pub fn create_texture_view_uav(&self, name: &str) -> Arc<HeadlessTextureView> {
		self.create_texture_view_with(name, ViewType::UnorderedAccess, None)
	}

	pub fn create_texture_view_with(
		&self,
		name: &str,
		view_type: ViewType,
		sampler: Option<Arc<HeadlessSampler>>,
	) -> Arc<HeadlessTextureView> {
		Arc::new(HeadlessTextureView {
			id: self.next_id(),
			name: name.to_string(),
			view_type,
			sampler,
			state: ResourceStateCell::default(),
		})
	}

	pub fn create_sampler(&self, name: &str) -> Arc<HeadlessSampler> {
		Arc::new(HeadlessSampler {
			id: self.next_id(),
			name: name.to_string(),
		})
	}

	pub fn create_acceleration_structure(&self, name: &str) -> Arc<HeadlessAccelerationStructure> {
		Arc::new(HeadlessAccelerationStructure {
			id: self.next_id(),
			name: name.to_string(),
			state: ResourceStateCell::default(),
		})
	}

	/// The descriptors stored in `range` of the most recently created heap of `class`.
	pub fn heap_contents(&self, class: KindClass, range: Range<u32>) -> Vec<HeadlessDescriptor> {
		let heaps = self.heaps.lock();
		heaps
			.iter()
			.rev()
			.find(|(c, _)| *c == class)
			.map(|(_, heap)| heap.slots.lock()[range.start as usize..range.end as usize].to_vec())
			.unwrap_or_default()
	}

	/// How many native pipeline layouts were created so far.
	pub fn layouts_created(&self) -> u32 {
		self.layouts_created.load(Relaxed)
	}
}

impl Default for Headless {
	fn default() -> Self {
		Self::new()
	}
}

#[derive(Clone, Debug)]
pub struct HeadlessHeap {
	slots: Arc<Mutex<Vec<HeadlessDescriptor>>>,
}

impl HeadlessHeap {
	pub fn capacity(&self) -> u32 {
		self.slots.lock().len() as u32
	}
}

#[derive(Debug)]
pub struct HeadlessBuffer {
	id: u64,
	name: String,
	usage: BufferUsage,
	version: AtomicU64,
	state: ResourceStateCell,
}

impl HeadlessBuffer {
	/// Simulates rewriting the contents of a dynamic buffer, which moves it to a new GPU address.
	pub fn map_write_discard(&self) {
		self.version.fetch_add(1, Relaxed);
	}

	pub fn gpu_address(&self) -> u64 {
		(self.id << 32) + self.version.load(Relaxed) * 256
	}

	pub fn state(&self) -> ResourceState {
		self.state.load()
	}

	pub fn set_state(&self, state: ResourceState) {
		self.state.store(state)
	}
}

impl DeviceObject for HeadlessBuffer {
	fn name(&self) -> &str {
		&self.name
	}
}

impl BufferObject for HeadlessBuffer {
	fn usage(&self) -> BufferUsage {
		self.usage
	}
}

#[derive(Debug)]
pub struct HeadlessBufferView {
	id: u64,
	name: String,
	view_type: ViewType,
	buffer: Arc<HeadlessBuffer>,
}

impl DeviceObject for HeadlessBufferView {
	fn name(&self) -> &str {
		&self.name
	}
}

impl BufferViewObject<Headless> for HeadlessBufferView {
	fn view_type(&self) -> ViewType {
		self.view_type
	}

	fn buffer(&self) -> &Arc<HeadlessBuffer> {
		&self.buffer
	}
}

#[derive(Debug)]
pub struct HeadlessTextureView {
	id: u64,
	name: String,
	view_type: ViewType,
	sampler: Option<Arc<HeadlessSampler>>,
	state: ResourceStateCell,
}

impl HeadlessTextureView {
	pub fn state(&self) -> ResourceState {
		self.state.load()
	}

	pub fn set_state(&self, state: ResourceState) {
		self.state.store(state)
	}
}

impl DeviceObject for HeadlessTextureView {
	fn name(&self) -> &str {
		&self.name
	}
}

impl TextureViewObject<Headless> for HeadlessTextureView {
	fn view_type(&self) -> ViewType {
		self.view_type
	}

	fn sampler(&self) -> Option<&Arc<HeadlessSampler>> {
		self.sampler.as_ref()
	}
}

#[derive(Debug)]
pub struct HeadlessSampler {
	id: u64,
	name: String,
}

impl DeviceObject for HeadlessSampler {
	fn name(&self) -> &str {
		&self.name
	}
}

#[derive(Debug)]
pub struct HeadlessAccelerationStructure {
	id: u64,
	name: String,
	state: ResourceStateCell,
}

impl DeviceObject for HeadlessAccelerationStructure {
	fn name(&self) -> &str {
		&self.name
	}
}

/// Where each signature's parameters start in the merged layout.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HeadlessPipelineLayout {
	pub signatures: Vec<(u8, u32, u32)>,
	pub parameter_count: u32,
}

#[derive(Error)]
#[non_exhaustive]
pub enum HeadlessError {
	#[error("Requested {class:?} heap of {requested} slots exceeds the limit of {limit}")]
	HeapTooLarge {
		class: KindClass,
		requested: u32,
		limit: u32,
	},
	#[error("Pipeline layout needs {count} parameters, at most {max} are supported")]
	TooManyParameters { count: u32, max: u32 },
}

impl core::fmt::Debug for HeadlessError {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		core::fmt::Display::fmt(self, f)
	}
}

unsafe impl BindingPlatform for Headless {
	type Buffer = HeadlessBuffer;
	type BufferView = HeadlessBufferView;
	type TextureView = HeadlessTextureView;
	type Sampler = HeadlessSampler;
	type AccelerationStructure = HeadlessAccelerationStructure;
	type CpuDescriptor = HeadlessDescriptor;
	type DescriptorHeap = HeadlessHeap;
	type PipelineLayout = HeadlessPipelineLayout;
	type AllocationError = HeadlessError;
	type LayoutCreationError = HeadlessError;

	fn descriptor_heap_limits(&self) -> DescriptorHeapSizes {
		self.limits
	}

	unsafe fn create_descriptor_heap(&self, class: KindClass, capacity: u32) -> Result<HeadlessHeap, HeadlessError> {
		let limit = self.limits.get(class);
		if capacity > limit {
			return Err(HeadlessError::HeapTooLarge {
				class,
				requested: capacity,
				limit,
			});
		}
		let heap = HeadlessHeap {
			slots: Arc::new(Mutex::new(vec![HeadlessDescriptor::default(); capacity as usize])),
		};
		self.heaps.lock().push((class, heap.clone()));
		Ok(heap)
	}

	unsafe fn write_descriptors(&self, heap: &HeadlessHeap, offset: u32, descriptors: &[HeadlessDescriptor]) {
		let mut slots = heap.slots.lock();
		let start = offset as usize;
		slots[start..start + descriptors.len()].copy_from_slice(descriptors);
	}

	fn object_descriptor(&self, object: &BoundObject<Self>) -> HeadlessDescriptor {
		HeadlessDescriptor(match object {
			BoundObject::Buffer(o) => o.id,
			BoundObject::BufferView(o) => o.id,
			BoundObject::TextureView(o) => o.id,
			BoundObject::Sampler(o) => o.id,
			BoundObject::AccelerationStructure(o) => o.id,
		})
	}

	fn gpu_address(&self, object: &BoundObject<Self>) -> Option<u64> {
		match object {
			BoundObject::Buffer(b) => Some(b.gpu_address()),
			BoundObject::BufferView(v) => Some(v.buffer.gpu_address()),
			_ => None,
		}
	}

	fn resource_state(&self, object: &BoundObject<Self>) -> Option<ResourceState> {
		match object {
			BoundObject::Buffer(b) => Some(b.state.load()),
			BoundObject::BufferView(v) => Some(v.buffer.state.load()),
			BoundObject::TextureView(t) => Some(t.state.load()),
			BoundObject::AccelerationStructure(a) => Some(a.state.load()),
			BoundObject::Sampler(_) => None,
		}
	}

	unsafe fn create_pipeline_layout(&self, set: &SignatureSet<Self>) -> Result<HeadlessPipelineLayout, HeadlessError> {
		let parameter_count = set.parameter_count();
		if parameter_count > self.max_layout_parameters {
			return Err(HeadlessError::TooManyParameters {
				count: parameter_count,
				max: self.max_layout_parameters,
			});
		}
		self.layouts_created.fetch_add(1, Relaxed);
		if let Some(barrier) = &self.layout_barrier {
			barrier.wait();
		}
		Ok(HeadlessPipelineLayout {
			signatures: set
				.iter()
				.map(|(index, signature)| (index, set.first_parameter(index), signature.layout().parameter_count()))
				.collect(),
			parameter_count,
		})
	}
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum HeadlessCommand {
	BindHeaps { views: u32, samplers: u32 },
	Transition { object: String, from: ResourceState, to: ResourceState },
	BindTable { parameter: u32, class: KindClass, heap_offset: u32 },
	BindInline { parameter: u32, kind: ResourceKind, gpu_address: u64 },
}

/// Records commands instead of executing them.
#[derive(Clone, Debug, Default)]
pub struct HeadlessContext {
	pub commands: Vec<HeadlessCommand>,
	pub layout: Option<HeadlessPipelineLayout>,
}

impl HeadlessContext {
	pub fn with_layout(layout: &HeadlessPipelineLayout) -> Self {
		Self {
			commands: Vec::new(),
			layout: Some(layout.clone()),
		}
	}

	/// Index of the first parameter of the signature at `binding_index` in the bound layout, 0 without a layout.
	fn first_parameter(&self, binding_index: u8) -> u32 {
		self.layout
			.as_ref()
			.and_then(|layout| layout.signatures.iter().find(|(index, ..)| *index == binding_index))
			.map_or(0, |(_, first, _)| *first)
	}
}

unsafe impl CommitPlatform for Headless {
	type CommandContext = HeadlessContext;

	unsafe fn bind_descriptor_heaps(&self, ctx: &mut HeadlessContext, views: &HeadlessHeap, samplers: &HeadlessHeap) {
		ctx.commands.push(HeadlessCommand::BindHeaps {
			views: views.capacity(),
			samplers: samplers.capacity(),
		});
	}

	unsafe fn transition_resource(
		&self,
		ctx: &mut HeadlessContext,
		object: &BoundObject<Self>,
		from: ResourceState,
		to: ResourceState,
	) {
		match object {
			BoundObject::Buffer(b) => b.state.store(to),
			BoundObject::BufferView(v) => v.buffer.state.store(to),
			BoundObject::TextureView(t) => t.state.store(to),
			BoundObject::AccelerationStructure(a) => a.state.store(to),
			BoundObject::Sampler(_) => (),
		}
		ctx.commands.push(HeadlessCommand::Transition {
			object: object.name().to_string(),
			from,
			to,
		});
	}

	unsafe fn bind_table(
		&self,
		ctx: &mut HeadlessContext,
		binding_index: u8,
		parameter: u32,
		class: KindClass,
		heap_offset: u32,
	) {
		ctx.commands.push(HeadlessCommand::BindTable {
			parameter: ctx.first_parameter(binding_index) + parameter,
			class,
			heap_offset,
		});
	}

	unsafe fn bind_inline(
		&self,
		ctx: &mut HeadlessContext,
		binding_index: u8,
		parameter: u32,
		kind: ResourceKind,
		gpu_address: u64,
	) {
		ctx.commands.push(HeadlessCommand::BindInline {
			parameter: ctx.first_parameter(binding_index) + parameter,
			kind,
			gpu_address,
		});
	}
}
