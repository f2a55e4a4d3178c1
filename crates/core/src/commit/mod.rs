//! Recording a [`BindingInstance`] into a command context.

use crate::backing::{CapacityError, TransientDescriptorRing};
use crate::descriptor::KindClass;
use crate::layout::{Parameter, ParameterGroup};
use crate::platform::{CommitPlatform, StateTransitionMode};
use crate::signature::BindingInstance;
use std::fmt::{Debug, Formatter};
use std::ops::Range;
use thiserror::Error;

#[derive(Error)]
#[non_exhaustive]
pub enum CommitError {
	#[error("Failed to allocate transient descriptors: {0}")]
	Capacity(#[from] CapacityError),
	#[error("Signature \"{signature}\" was created on a different device than the transient descriptor ring")]
	ForeignRing { signature: String },
}

impl Debug for CommitError {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		std::fmt::Display::fmt(self, f)
	}
}

/// Bind every parameter of `instance` for the next draws or dispatches recorded into `ctx`.
///
/// Persistent tables are bound where they already live in the heap. Dynamic tables are copied into fresh slots
/// from `ring`, which therefore must not be reset before the GPU finished with `ctx`. Inline buffers are bound by
/// address, re-queried for dynamic buffers. Unbound inline buffers are logged and skipped.
#[profiling::function]
pub fn commit<P: CommitPlatform>(
	instance: &BindingInstance<P>,
	ctx: &mut P::CommandContext,
	ring: &mut TransientDescriptorRing<P>,
	mode: StateTransitionMode,
) -> Result<(), CommitError> {
	let signature = instance.signature();
	let device = signature.device();
	let platform = device.platform();
	if KindClass::ALL
		.iter()
		.any(|&class| !std::sync::Arc::ptr_eq(ring.heap(class), device.heap(class)))
	{
		return Err(CommitError::ForeignRing {
			signature: signature.name().to_owned(),
		});
	}

	let cache = instance.cache();
	let layout = signature.layout();
	// nothing is recorded if the transient slots can't be allocated
	let mut dynamic: [Range<u32>; KindClass::COUNT] = [0..0, 0..0];
	for class in KindClass::ALL {
		dynamic[class.index()] = ring.allocate(class, layout.group_size(class, ParameterGroup::Dynamic))?;
	}
	cache.transition_resource_states(platform, ctx, mode);

	let binding_index = signature.binding_index();
	// Safety: ctx is recording and the bound pipeline layout contains this signature at its binding index
	unsafe {
		platform.bind_descriptor_heaps(
			ctx,
			device.heap(KindClass::View).heap(),
			device.heap(KindClass::Sampler).heap(),
		);
		for (parameter, param) in layout.parameters().enumerate() {
			let parameter = parameter as u32;
			match param {
				Parameter::Table(table) => {
					let heap_offset = match table.group() {
						ParameterGroup::StaticMutable => match cache.table_heap_offset(parameter) {
							Some(offset) => offset,
							None => continue,
						},
						ParameterGroup::Dynamic => {
							let offset = dynamic[table.class().index()].start + table.offset_in_group();
							let descriptors = cache.table_descriptors(parameter);
							ring.heap(table.class()).write(platform, offset, &descriptors);
							offset
						}
					};
					platform.bind_table(ctx, binding_index, parameter, table.class(), heap_offset);
				}
				Parameter::Inline(inline) => {
					let Some(resource) = cache.resource(parameter, 0) else {
						tracing::error!(
							signature = signature.name(),
							"No buffer is bound to inline parameter {} ({})",
							parameter,
							inline.kind.name()
						);
						continue;
					};
					let address = match resource.dynamic_inline {
						true => platform.gpu_address(&resource.object),
						false => resource.gpu_address,
					};
					match address {
						Some(address) => platform.bind_inline(ctx, binding_index, parameter, inline.kind, address),
						None => tracing::error!(
							signature = signature.name(),
							"{:?} bound to inline parameter {} has no GPU address",
							resource.object,
							parameter
						),
					}
				}
			}
		}
	}
	Ok(())
}

/// Rebind only the inline buffers with dynamic usage, after their contents were rewritten since the last
/// [`commit`]. Everything else stays bound.
pub fn commit_dynamic_inline_buffers<P: CommitPlatform>(instance: &BindingInstance<P>, ctx: &mut P::CommandContext) {
	let cache = instance.cache();
	if cache.dynamic_inline_buffer_count() == 0 {
		return;
	}
	let signature = instance.signature();
	let platform = signature.device().platform();
	for inline in signature.layout().inline_bindings() {
		let Some(resource) = cache.resource(inline.parameter, 0) else {
			continue;
		};
		if !resource.dynamic_inline {
			continue;
		}
		if let Some(address) = platform.gpu_address(&resource.object) {
			// Safety: ctx is recording with the same pipeline layout as the last full commit
			unsafe { platform.bind_inline(ctx, signature.binding_index(), inline.parameter, inline.kind, address) };
		}
	}
}
