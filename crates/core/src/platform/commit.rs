use crate::cache::BoundObject;
use crate::descriptor::{KindClass, ResourceKind};
use crate::platform::{BindingPlatform, ResourceState};

/// Internal interface for recording the native commands of a commit, may change at any time!
pub unsafe trait CommitPlatform: BindingPlatform {
	/// The command recording context a commit records into, including which pipeline layout is bound.
	type CommandContext;

	/// Make both descriptor heaps visible to the shaders of subsequent draws or dispatches.
	unsafe fn bind_descriptor_heaps(
		&self,
		ctx: &mut Self::CommandContext,
		views: &Self::DescriptorHeap,
		samplers: &Self::DescriptorHeap,
	);

	/// Transition `object` from `from` to `to`. `from == to` requests a plain execution / memory barrier, which
	/// unordered access resources need between consecutive uses.
	unsafe fn transition_resource(
		&self,
		ctx: &mut Self::CommandContext,
		object: &BoundObject<Self>,
		from: ResourceState,
		to: ResourceState,
	);

	/// Point the table at `parameter` of the signature at `binding_index` of the bound pipeline layout to
	/// `heap_offset` in the heap of `class`.
	unsafe fn bind_table(
		&self,
		ctx: &mut Self::CommandContext,
		binding_index: u8,
		parameter: u32,
		class: KindClass,
		heap_offset: u32,
	);

	/// Bind a buffer directly by GPU address.
	unsafe fn bind_inline(
		&self,
		ctx: &mut Self::CommandContext,
		binding_index: u8,
		parameter: u32,
		kind: ResourceKind,
		gpu_address: u64,
	);
}
