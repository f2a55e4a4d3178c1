use crate::cache::{BoundObject, ResourceCache};
use crate::descriptor::{ResourceDescriptor, ResourceKind, ShaderStages, Variability, VariabilityMask};
use crate::platform::BindingPlatform;
use crate::signature::ResourceSignature;
use crate::variable::{BindFlags, ResourceMapping};

/// The variables of one signature visible to some shader stages with some variabilities.
///
/// Variables only remember the index of their resource, the signature and the cache are passed in on every access.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VariableManager {
	stages: ShaderStages,
	variabilities: VariabilityMask,
	variables: Vec<u32>,
}

impl VariableManager {
	pub fn new<P: BindingPlatform>(
		signature: &ResourceSignature<P>,
		stages: ShaderStages,
		variabilities: VariabilityMask,
	) -> Self {
		let desc = signature.desc();
		let variables = desc
			.resources
			.iter()
			.enumerate()
			.filter(|(index, res)| {
				if !res.stages.intersects(stages) || !variabilities.contains_variability(res.variability) {
					return false;
				}
				if res.kind == ResourceKind::Sampler {
					let attribs = signature.attribs(*index as u32);
					// bound through their texture or baked into the layout
					if attribs.immutable_sampler || signature.is_assigned_sampler(*index as u32) {
						return false;
					}
				}
				true
			})
			.map(|(index, _)| index as u32)
			.collect();
		Self {
			stages,
			variabilities,
			variables,
		}
	}

	#[inline]
	pub fn stages(&self) -> ShaderStages {
		self.stages
	}

	#[inline]
	pub fn variabilities(&self) -> VariabilityMask {
		self.variabilities
	}

	#[inline]
	pub fn variable_count(&self) -> u32 {
		self.variables.len() as u32
	}

	/// Index into the signature's resources of the variable at `variable_index`.
	pub fn resource_index(&self, variable_index: u32) -> Option<u32> {
		self.variables.get(variable_index as usize).copied()
	}

	/// Index of the variable called `name`.
	pub fn find<P: BindingPlatform>(&self, signature: &ResourceSignature<P>, name: &str) -> Option<u32> {
		self.variables
			.iter()
			.position(|&index| signature.resource(index).name == name)
			.map(|i| i as u32)
	}

	pub fn variable<'a, P: BindingPlatform>(
		&self,
		signature: &'a ResourceSignature<P>,
		cache: &'a mut ResourceCache<P>,
		variable_index: u32,
	) -> Option<ShaderVariable<'a, P>> {
		Some(ShaderVariable::new(signature, cache, self.resource_index(variable_index)?))
	}

	/// Bind every variable whose name `mapping` resolves.
	pub fn bind_resources<P: BindingPlatform>(
		&self,
		signature: &ResourceSignature<P>,
		cache: &mut ResourceCache<P>,
		mapping: &ResourceMapping<P>,
		flags: BindFlags,
	) {
		let update = flags.update_flags();
		for &index in &self.variables {
			let res = signature.resource(index);
			let update_flag = match res.variability {
				Variability::Static => BindFlags::UPDATE_STATIC,
				Variability::Mutable => BindFlags::UPDATE_MUTABLE,
				Variability::Dynamic => BindFlags::UPDATE_DYNAMIC,
			};
			if !update.contains(update_flag) {
				continue;
			}

			for array_index in 0..res.array_size {
				let bound = signature.bound_object(cache, index, array_index).is_some();
				if bound && flags.contains(BindFlags::KEEP_EXISTING) {
					continue;
				}
				match mapping.get(&res.name, array_index) {
					Some(object) => {
						signature.bind_resource(cache, index, array_index, Some(object.clone()));
					}
					None => {
						if !bound && flags.contains(BindFlags::VERIFY_ALL_RESOLVED) {
							tracing::error!(
								signature = signature.desc().name,
								"Unable to bind resource to shader variable '{}': no object found in the resource mapping",
								res.print_name(array_index)
							);
						}
					}
				}
			}
		}
	}
}

/// A named resource slot of a signature, bound into one cache.
pub struct ShaderVariable<'a, P: BindingPlatform> {
	signature: &'a ResourceSignature<P>,
	cache: &'a mut ResourceCache<P>,
	index: u32,
}

impl<'a, P: BindingPlatform> ShaderVariable<'a, P> {
	pub(crate) fn new(signature: &'a ResourceSignature<P>, cache: &'a mut ResourceCache<P>, index: u32) -> Self {
		Self {
			signature,
			cache,
			index,
		}
	}

	#[inline]
	pub fn resource_index(&self) -> u32 {
		self.index
	}

	#[inline]
	pub fn desc(&self) -> &ResourceDescriptor {
		self.signature.resource(self.index)
	}

	pub fn name(&self) -> &str {
		&self.desc().name
	}

	pub fn set(&mut self, object: BoundObject<P>) {
		self.set_element(0, object);
	}

	pub fn set_element(&mut self, array_index: u32, object: BoundObject<P>) {
		self.signature
			.bind_resource(self.cache, self.index, array_index, Some(object));
	}

	/// Bind `objects` to consecutive elements starting at `first_element`. The whole call is ignored if it would
	/// run past the end of the array.
	pub fn set_array(&mut self, first_element: u32, objects: &[BoundObject<P>]) {
		let array_size = self.desc().array_size;
		let end = first_element as u64 + objects.len() as u64;
		if end > array_size as u64 {
			tracing::error!(
				signature = self.signature.desc().name,
				"Array range {}..{} is out of bounds for shader variable '{}' of size {}",
				first_element,
				end,
				self.name(),
				array_size
			);
			return;
		}
		for (i, object) in objects.iter().enumerate() {
			self.set_element(first_element + i as u32, object.clone());
		}
	}

	/// Unbinding is only permitted for dynamic variables.
	pub fn unbind(&mut self, array_index: u32) {
		self.signature.bind_resource(self.cache, self.index, array_index, None);
	}

	pub fn get(&self, array_index: u32) -> Option<&BoundObject<P>> {
		self.signature.bound_object(self.cache, self.index, array_index)
	}

	pub fn is_bound(&self, array_index: u32) -> bool {
		self.get(array_index).is_some()
	}
}
