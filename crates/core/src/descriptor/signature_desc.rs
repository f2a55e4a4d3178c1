use crate::descriptor::{ImmutableSamplerDescriptor, ResourceDescriptor, ResourceKind, ShaderStages, Variability};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// The maximum number of signatures that can be bound together, `binding_index` must be below it.
pub const MAX_RESOURCE_SIGNATURES: usize = 8;

/// Declarative description of a resource signature.
///
/// This is the only input needed to (re)build a signature, and together with the derived attribs it is what gets
/// persisted by archives.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct SignatureDesc {
	pub name: String,
	pub resources: Vec<ResourceDescriptor>,
	pub immutable_samplers: Vec<ImmutableSamplerDescriptor>,
	pub binding_index: u8,
	pub combined_sampler_suffix: Option<String>,
}

impl SignatureDesc {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			..Self::default()
		}
	}

	pub fn resource(mut self, resource: ResourceDescriptor) -> Self {
		self.resources.push(resource);
		self
	}

	pub fn immutable_sampler(mut self, sampler: ImmutableSamplerDescriptor) -> Self {
		self.immutable_samplers.push(sampler);
		self
	}

	pub fn binding_index(mut self, binding_index: u8) -> Self {
		self.binding_index = binding_index;
		self
	}

	pub fn combined_sampler_suffix(mut self, suffix: impl Into<String>) -> Self {
		self.combined_sampler_suffix = Some(suffix.into());
		self
	}

	#[inline]
	pub fn uses_combined_samplers(&self) -> bool {
		self.combined_sampler_suffix.is_some()
	}

	pub fn is_empty(&self) -> bool {
		self.resources.is_empty() && self.immutable_samplers.is_empty()
	}

	/// Union of the stages of all resources and immutable samplers.
	pub fn active_stages(&self) -> ShaderStages {
		self.resources
			.iter()
			.map(|r| r.stages)
			.chain(self.immutable_samplers.iter().map(|s| s.stages))
			.fold(ShaderStages::empty(), |a, b| a | b)
	}

	/// The index range of all resources with the given variability. Only meaningful for sorted resources.
	pub fn variability_range(&self, variability: Variability) -> Range<usize> {
		let start = self.resources.partition_point(|r| r.variability < variability);
		let end = self.resources.partition_point(|r| r.variability <= variability);
		start..end
	}

	/// Finds the sampler resource assigned to the texture at `texture_index`, if combined samplers are in use.
	pub fn find_assigned_sampler(&self, texture_index: usize) -> Option<usize> {
		let texture = &self.resources[texture_index];
		debug_assert_eq!(texture.kind, ResourceKind::TextureSrv);
		let suffix = self.combined_sampler_suffix.as_deref()?;
		self.resources.iter().position(|r| {
			r.kind == ResourceKind::Sampler
				&& r.stages.intersects(texture.stages)
				&& r.name.strip_suffix(suffix).is_some_and(|base| base == texture.name)
		})
	}

	/// Finds the immutable sampler that serves a sampler resource called `name` in `stages`.
	pub fn find_immutable_sampler(&self, stages: ShaderStages, name: &str) -> Option<usize> {
		let suffix = self.combined_sampler_suffix.as_deref();
		self.immutable_samplers
			.iter()
			.position(|s| s.stages.intersects(stages) && s.matches(name, suffix))
	}

	/// Finds a resource by name that is visible in any of `stages`.
	pub fn find_resource(&self, stages: ShaderStages, name: &str) -> Option<usize> {
		self.resources
			.iter()
			.position(|r| r.stages.intersects(stages) && r.name == name)
	}
}
