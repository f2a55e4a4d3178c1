use crate::config::DeviceLimits;
use crate::descriptor::{DeclarationError, RangeType, ResourceKind, SignatureDesc, Variability};
use crate::layout::{
	BindingKind, BindingLayout, BindingLayoutBuilder, ImmutableSamplerAttribs, ResourceAttribs, SlotAssignment,
	SlotRequest,
};

/// Everything derived from a [`SignatureDesc`].
#[derive(Debug)]
pub(super) struct SignatureLayout {
	pub attribs: Vec<ResourceAttribs>,
	pub immutable_samplers: Vec<ImmutableSamplerAttribs>,
	pub layout: BindingLayout,
	/// Table sizes of the self-contained cache, one table per [`RangeType`].
	pub static_table_sizes: [u32; RangeType::COUNT],
}

/// Assign registers, cache slots and binding tables to every resource of a validated `desc`.
pub(super) fn build_layout(desc: &SignatureDesc, limits: &DeviceLimits) -> Result<SignatureLayout, DeclarationError> {
	let too_many_descriptors = || DeclarationError::TooManyDescriptors {
		signature: desc.name.clone(),
	};
	let mut registers = [0u32; RangeType::COUNT];
	let immutable_samplers = assign_immutable_samplers(desc, &mut registers).ok_or_else(too_many_descriptors)?;

	let mut next_runtime_space = 1;
	let mut static_table_sizes = [0u32; RangeType::COUNT];
	let mut builder = BindingLayoutBuilder::new();
	let mut attribs = Vec::with_capacity(desc.resources.len());
	for (index, res) in desc.resources.iter().enumerate() {
		let sampler_index = match (res.kind, desc.uses_combined_samplers()) {
			(ResourceKind::TextureSrv, true) => desc.find_assigned_sampler(index).map(|i| i as u32),
			_ => None,
		};

		let immutable = match res.kind {
			ResourceKind::Sampler => desc.find_immutable_sampler(res.stages, &res.name),
			_ => None,
		};
		if let Some(immutable) = immutable {
			// no slot, the native layout has the sampler baked in
			let sampler = immutable_samplers[immutable];
			attribs.push(ResourceAttribs::new(
				sampler.register,
				sampler.space,
				None,
				None,
				None,
				true,
				BindingKind::Table,
			));
			continue;
		}

		let texture_sampler_immutable = sampler_index.is_some_and(|s| {
			let sampler = &desc.resources[s as usize];
			desc.find_immutable_sampler(sampler.stages, &sampler.name).is_some()
		});

		let range_type = res.kind.range_type();
		let (register, space) = if res.is_runtime_array() {
			let space = next_runtime_space;
			next_runtime_space += 1;
			(0, space)
		} else {
			let next = &mut registers[range_type.index()];
			let register = *next;
			*next = next.checked_add(res.array_size).ok_or_else(too_many_descriptors)?;
			(register, 0)
		};

		let binding = if res.is_inline_eligible() {
			BindingKind::Inline
		} else {
			BindingKind::Table
		};

		let self_contained = (res.variability == Variability::Static).then(|| {
			let size = &mut static_table_sizes[range_type.index()];
			let slot = SlotAssignment::new(range_type.index() as u32, *size);
			*size += res.array_size;
			slot
		});

		let instance = builder.allocate_resource_slot(SlotRequest {
			stages: res.stages,
			variability: res.variability,
			kind: res.kind,
			binding,
			array_size: res.array_size,
			register,
			space,
			runtime_array: res.is_runtime_array(),
		});

		attribs.push(ResourceAttribs::new(
			register,
			space,
			self_contained,
			Some(instance),
			sampler_index,
			texture_sampler_immutable,
			binding,
		));
	}

	let layout = builder.finish();
	if layout.parameter_count() > limits.max_signature_parameters {
		return Err(DeclarationError::TooManyParameters {
			signature: desc.name.clone(),
			count: layout.parameter_count(),
			max: limits.max_signature_parameters,
		});
	}

	tracing::debug!(
		signature = desc.name,
		resources = desc.resources.len(),
		parameters = layout.parameter_count(),
		"built signature layout"
	);
	Ok(SignatureLayout {
		attribs,
		immutable_samplers,
		layout,
		static_table_sizes,
	})
}

/// Immutable samplers take the first sampler registers in declaration order. Redundant declarations across
/// ray-tracing stages share the registers of the first one. Returns `None` if the sampler registers overflow.
fn assign_immutable_samplers(
	desc: &SignatureDesc,
	registers: &mut [u32; RangeType::COUNT],
) -> Option<Vec<ImmutableSamplerAttribs>> {
	let suffix = desc.combined_sampler_suffix.as_deref();
	let mut out: Vec<ImmutableSamplerAttribs> = Vec::with_capacity(desc.immutable_samplers.len());
	for (index, sampler) in desc.immutable_samplers.iter().enumerate() {
		let merged = desc.immutable_samplers[..index]
			.iter()
			.position(|other| other.name == sampler.name && other.stages.intersects(sampler.stages));
		if let Some(first) = merged {
			tracing::debug!(
				signature = desc.name,
				sampler = sampler.name,
				"merging redundant immutable sampler declaration"
			);
			let attribs = out[first];
			out.push(attribs);
			continue;
		}

		// declarations merged into this one serve resources too
		let serves = |stages| {
			desc.immutable_samplers[index..]
				.iter()
				.any(|other| other.name == sampler.name && other.stages.intersects(stages))
		};
		let mut served_sizes = desc
			.resources
			.iter()
			.filter(|r| r.kind == ResourceKind::Sampler && serves(r.stages) && sampler.matches(&r.name, suffix))
			.map(|r| r.array_size);
		let array_size = match served_sizes.next() {
			None => 1,
			Some(first) => served_sizes.fold(first, |max, size| {
				if size != first {
					tracing::warn!(
						signature = desc.name,
						sampler = sampler.name,
						"immutable sampler serves sampler arrays of different sizes, using the largest"
					);
				}
				max.max(size)
			}),
		};

		let register = &mut registers[RangeType::Sampler.index()];
		out.push(ImmutableSamplerAttribs {
			register: *register,
			space: 0,
			array_size,
		});
		*register = register.checked_add(array_size)?;
	}
	Some(out)
}
