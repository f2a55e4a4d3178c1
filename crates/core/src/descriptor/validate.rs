use crate::config::DeviceLimits;
use crate::descriptor::{
	ResourceFlags, ResourceKind, ShaderStages, SignatureDesc, Variability, MAX_RESOURCE_SIGNATURES,
};
use crate::layout::SlotAssignment;
use thiserror::Error;

/// Upper bound on the summed array sizes of all resources of one signature, so that every table offset fits a
/// [`SlotAssignment`].
pub const MAX_SIGNATURE_DESCRIPTORS: u32 = SlotAssignment::MAX_OFFSET + 1;

/// A signature or a set of signatures was declared in a way that cannot be mapped onto the binding model.
///
/// Declaration errors are always reported to the caller, and the failed call has no side effects.
#[derive(Error, Clone, Eq, PartialEq)]
#[non_exhaustive]
pub enum DeclarationError {
	#[error("Signature \"{signature}\": binding index {index} must be less than {max}", max = MAX_RESOURCE_SIGNATURES)]
	InvalidBindingIndex { signature: String, index: u8 },
	#[error("Signature \"{signature}\": resource {index} has an empty name")]
	EmptyResourceName { signature: String, index: usize },
	#[error("Signature \"{signature}\": resource \"{name}\" is not visible to any shader stage")]
	EmptyResourceStages { signature: String, name: String },
	#[error("Signature \"{signature}\": resource \"{name}\" has an array size of 0")]
	ZeroArraySize { signature: String, name: String },
	#[error(
		"Signature \"{signature}\": resource \"{name}\" has an array size of {array_size}, at most {max} are supported",
		max = MAX_SIGNATURE_DESCRIPTORS
	)]
	ArrayTooLarge {
		signature: String,
		name: String,
		array_size: u32,
	},
	#[error(
		"Signature \"{signature}\": resources require more than {max} descriptors in total",
		max = MAX_SIGNATURE_DESCRIPTORS
	)]
	TooManyDescriptors { signature: String },
	#[error("Signature \"{signature}\": resource \"{name}\" of kind {kind:?} has invalid flags {flags:?}")]
	InvalidResourceFlags {
		signature: String,
		name: String,
		kind: ResourceKind,
		flags: ResourceFlags,
	},
	#[error("Signature \"{signature}\": resource \"{name}\" is declared multiple times in stages {stages:?}")]
	OverlappingResourceStages {
		signature: String,
		name: String,
		stages: ShaderStages,
	},
	#[error(
		"Signature \"{signature}\": resource \"{name}\" is {variability:?} but follows a {previous:?} resource, \
		 resources must be sorted by variability"
	)]
	UnsortedVariability {
		signature: String,
		name: String,
		variability: Variability,
		previous: Variability,
	},
	#[error(
		"Signature \"{signature}\": texture \"{name}\" is flagged as combined sampler, but the signature has no \
		 combined sampler suffix"
	)]
	CombinedSamplerWithoutSuffix { signature: String, name: String },
	#[error(
		"Signature \"{signature}\": texture \"{texture}\" and its assigned sampler \"{sampler}\" must have the same \
		 stages and variability"
	)]
	CombinedSamplerMismatch {
		signature: String,
		texture: String,
		sampler: String,
	},
	#[error("Signature \"{signature}\": immutable sampler {index} has an empty name")]
	EmptyImmutableSamplerName { signature: String, index: usize },
	#[error("Signature \"{signature}\": immutable sampler \"{name}\" is not visible to any shader stage")]
	EmptyImmutableSamplerStages { signature: String, name: String },
	#[error(
		"Signature \"{signature}\": immutable sampler \"{name}\" is declared multiple times in stages {stages:?} \
		 with different sampler parameters"
	)]
	ConflictingImmutableSamplers {
		signature: String,
		name: String,
		stages: ShaderStages,
	},
	#[error("Signature \"{signature}\": {required} register spaces are required, but only {max} are available")]
	TooManyRegisterSpaces { signature: String, required: u32, max: u32 },
	#[error("Signature \"{signature}\": {count} tables and inline bindings exceed the limit of {max}")]
	TooManyParameters { signature: String, count: u32, max: u32 },
	#[error("Signature name \"{name}\" is used by more than one signature in the same set")]
	DuplicateSignatureName { name: String },
	#[error("Signatures \"{first}\" and \"{second}\" both use binding index {index}")]
	ConflictingBindingIndex { index: u8, first: String, second: String },
	#[error("At most {max} signatures can be bound together, got {count}", max = MAX_RESOURCE_SIGNATURES)]
	TooManySignatures { count: usize },
	#[error(
		"Signature \"{signature}\": stored attributes of resource \"{name}\" do not match the attributes derived \
		 from its description"
	)]
	AttribsMismatch { signature: String, name: String },
	#[error(
		"Signature \"{signature}\": {stored} stored resource attributes and {declared} declared resources do not \
		 match"
	)]
	AttribsCountMismatch {
		signature: String,
		stored: usize,
		declared: usize,
	},
}

impl core::fmt::Debug for DeclarationError {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		core::fmt::Display::fmt(self, f)
	}
}

impl SignatureDesc {
	/// Checks everything about a signature declaration that can be checked without building its layout.
	pub fn validate(&self, limits: &DeviceLimits) -> Result<(), DeclarationError> {
		let signature = || self.name.clone();

		if self.binding_index as usize >= MAX_RESOURCE_SIGNATURES {
			return Err(DeclarationError::InvalidBindingIndex {
				signature: signature(),
				index: self.binding_index,
			});
		}

		let mut runtime_arrays = 0;
		let mut descriptors = 0u32;
		for (index, res) in self.resources.iter().enumerate() {
			if res.name.is_empty() {
				return Err(DeclarationError::EmptyResourceName {
					signature: signature(),
					index,
				});
			}
			if res.stages.is_empty() {
				return Err(DeclarationError::EmptyResourceStages {
					signature: signature(),
					name: res.name.clone(),
				});
			}
			if res.array_size == 0 {
				return Err(DeclarationError::ZeroArraySize {
					signature: signature(),
					name: res.name.clone(),
				});
			}
			if res.array_size > MAX_SIGNATURE_DESCRIPTORS {
				return Err(DeclarationError::ArrayTooLarge {
					signature: signature(),
					name: res.name.clone(),
					array_size: res.array_size,
				});
			}
			descriptors = descriptors
				.checked_add(res.array_size)
				.filter(|&total| total <= MAX_SIGNATURE_DESCRIPTORS)
				.ok_or_else(|| DeclarationError::TooManyDescriptors { signature: signature() })?;
			if !res.kind.valid_flags().contains(res.flags) {
				return Err(DeclarationError::InvalidResourceFlags {
					signature: signature(),
					name: res.name.clone(),
					kind: res.kind,
					flags: res.flags,
				});
			}
			if res.flags.contains(ResourceFlags::COMBINED_SAMPLER) && !self.uses_combined_samplers() {
				return Err(DeclarationError::CombinedSamplerWithoutSuffix {
					signature: signature(),
					name: res.name.clone(),
				});
			}
			if let Some(previous) = index.checked_sub(1).map(|i| &self.resources[i]) {
				if res.variability < previous.variability {
					return Err(DeclarationError::UnsortedVariability {
						signature: signature(),
						name: res.name.clone(),
						variability: res.variability,
						previous: previous.variability,
					});
				}
			}
			if let Some(other) = self.resources[..index]
				.iter()
				.find(|other| other.name == res.name && other.stages.intersects(res.stages))
			{
				return Err(DeclarationError::OverlappingResourceStages {
					signature: signature(),
					name: res.name.clone(),
					stages: other.stages & res.stages,
				});
			}
			if res.is_runtime_array() {
				runtime_arrays += 1;
			}
		}

		if self.uses_combined_samplers() {
			for (index, res) in self.resources.iter().enumerate() {
				if res.kind != ResourceKind::TextureSrv {
					continue;
				}
				if let Some(sampler) = self.find_assigned_sampler(index).map(|i| &self.resources[i]) {
					if sampler.stages != res.stages || sampler.variability != res.variability {
						return Err(DeclarationError::CombinedSamplerMismatch {
							signature: signature(),
							texture: res.name.clone(),
							sampler: sampler.name.clone(),
						});
					}
				}
			}
		}

		for (index, sampler) in self.immutable_samplers.iter().enumerate() {
			if sampler.name.is_empty() {
				return Err(DeclarationError::EmptyImmutableSamplerName {
					signature: signature(),
					index,
				});
			}
			if sampler.stages.is_empty() {
				return Err(DeclarationError::EmptyImmutableSamplerStages {
					signature: signature(),
					name: sampler.name.clone(),
				});
			}
			for other in &self.immutable_samplers[..index] {
				if other.name != sampler.name || !other.stages.intersects(sampler.stages) {
					continue;
				}
				// redundant declarations for the same ray-tracing stage group are merged later
				let mergeable = other.stages.is_ray_tracing_only()
					&& sampler.stages.is_ray_tracing_only()
					&& other.desc == sampler.desc;
				if !mergeable {
					return Err(DeclarationError::ConflictingImmutableSamplers {
						signature: signature(),
						name: sampler.name.clone(),
						stages: other.stages & sampler.stages,
					});
				}
			}
		}

		let required = runtime_arrays + 1;
		if required > limits.max_register_spaces {
			return Err(DeclarationError::TooManyRegisterSpaces {
				signature: signature(),
				required,
				max: limits.max_register_spaces,
			});
		}
		Ok(())
	}
}
