use crate::cache::BoundObject;
use crate::config::DescriptorHeapSizes;
use crate::descriptor::{KindClass, ResourceKind};
use crate::set_cache::SignatureSet;
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::{FromPrimitive, ToPrimitive};
use std::error::Error;
use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Internal interface between the binding model and a native API, may change at any time!
///
/// The binding model only ever talks to device objects through this trait: it creates the two GPU visible
/// descriptor heaps, turns bound objects into CPU descriptors, copies them into heaps and builds native pipeline
/// layouts out of signature sets.
pub unsafe trait BindingPlatform: Sized + Send + Sync + 'static {
	type Buffer: BufferObject;
	type BufferView: BufferViewObject<Self>;
	type TextureView: TextureViewObject<Self>;
	type Sampler: DeviceObject;
	type AccelerationStructure: DeviceObject;
	/// An opaque CPU descriptor handle, [`Default`] must be the null descriptor.
	type CpuDescriptor: 'static + Copy + Debug + Default + PartialEq + Send + Sync;
	type DescriptorHeap: 'static + Send + Sync;
	type PipelineLayout: 'static + Send + Sync;
	type AllocationError: 'static + Error + Send + Sync;
	type LayoutCreationError: 'static + Error + Send + Sync;

	/// The largest heaps the platform supports, per kind class.
	fn descriptor_heap_limits(&self) -> DescriptorHeapSizes;

	/// Create a GPU visible descriptor heap of `capacity` slots holding descriptors of `class`.
	unsafe fn create_descriptor_heap(
		&self,
		class: KindClass,
		capacity: u32,
	) -> Result<Self::DescriptorHeap, Self::AllocationError>;

	/// Copy `descriptors` into `heap` starting at slot `offset`.
	///
	/// # Safety
	/// The range must be in bounds and not be read by the GPU while being written.
	unsafe fn write_descriptors(&self, heap: &Self::DescriptorHeap, offset: u32, descriptors: &[Self::CpuDescriptor]);

	fn object_descriptor(&self, object: &BoundObject<Self>) -> Self::CpuDescriptor;

	/// The GPU address an inline binding of `object` would reference, if the object is a buffer or buffer view.
	fn gpu_address(&self, object: &BoundObject<Self>) -> Option<u64>;

	/// The state `object` is currently in, None if it is unknown and should not be tracked.
	fn resource_state(&self, object: &BoundObject<Self>) -> Option<ResourceState>;

	unsafe fn create_pipeline_layout(
		&self,
		set: &SignatureSet<Self>,
	) -> Result<Self::PipelineLayout, Self::LayoutCreationError>;
}

pub trait DeviceObject: 'static + Send + Sync {
	fn name(&self) -> &str;
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum BufferUsage {
	Immutable,
	Default,
	/// Contents are rewritten every frame, so is its GPU address.
	Dynamic,
}

pub trait BufferObject: DeviceObject {
	fn usage(&self) -> BufferUsage;
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ViewType {
	ShaderResource,
	UnorderedAccess,
}

pub trait BufferViewObject<P: BindingPlatform>: DeviceObject {
	fn view_type(&self) -> ViewType;

	fn buffer(&self) -> &Arc<P::Buffer>;
}

pub trait TextureViewObject<P: BindingPlatform>: DeviceObject {
	fn view_type(&self) -> ViewType;

	/// The sampler attached to this view, bound alongside it when combined samplers are in use.
	fn sampler(&self) -> Option<&Arc<P::Sampler>>;
}

#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, FromPrimitive, ToPrimitive)]
pub enum ResourceState {
	Undefined,
	Common,
	ConstantBuffer,
	ShaderResource,
	UnorderedAccess,
	RayTracing,
	CopySource,
	CopyDest,
	RenderTarget,
}

impl ResourceState {
	/// The state a resource bound as `kind` must be in while a shader accesses it, None for samplers.
	pub fn required_by(kind: ResourceKind) -> Option<Self> {
		match kind {
			ResourceKind::ConstantBuffer => Some(ResourceState::ConstantBuffer),
			ResourceKind::TextureSrv | ResourceKind::BufferSrv => Some(ResourceState::ShaderResource),
			ResourceKind::TextureUav | ResourceKind::BufferUav => Some(ResourceState::UnorderedAccess),
			ResourceKind::AccelerationStructure => Some(ResourceState::RayTracing),
			ResourceKind::Sampler => None,
		}
	}
}

/// How a commit treats resources that are not in the state their binding requires.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum StateTransitionMode {
	/// Record the required transitions.
	Transition,
	/// Record nothing and log every resource in the wrong state.
	Verify,
}

/// Atomically tracked [`ResourceState`] of a device object.
#[derive(Debug)]
pub struct ResourceStateCell(AtomicU8);

impl ResourceStateCell {
	pub fn new(state: ResourceState) -> Self {
		Self(AtomicU8::new(state.to_u8().unwrap_or_default()))
	}

	pub fn load(&self) -> ResourceState {
		ResourceState::from_u8(self.0.load(Ordering::Relaxed)).unwrap_or(ResourceState::Undefined)
	}

	pub fn store(&self, state: ResourceState) {
		self.0.store(state.to_u8().unwrap_or_default(), Ordering::Relaxed);
	}
}

impl Default for ResourceStateCell {
	fn default() -> Self {
		Self::new(ResourceState::Undefined)
	}
}
