use crate::backing::CapacityError;
use crate::cache::{BoundObject, ResourceCache};
use crate::descriptor::{KindClass, ResourceFlags, ShaderStages, Variability, VariabilityMask};
use crate::layout::{CacheContent, ParameterGroup};
use crate::platform::BindingPlatform;
use crate::signature::ResourceSignature;
use crate::variable::{BindFlags, ResourceMapping, ShaderVariable, VariableManager};
use smallvec::SmallVec;
use std::sync::Arc;

/// The mutable and dynamic resources of one signature, plus copies of its static ones, ready to be committed.
pub struct BindingInstance<P: BindingPlatform> {
	signature: Arc<ResourceSignature<P>>,
	cache: ResourceCache<P>,
	managers: SmallVec<[VariableManager; 4]>,
}

impl<P: BindingPlatform> ResourceSignature<P> {
	/// Create a binding instance with persistent descriptor storage for all its static and mutable tables. With
	/// `init_static` the static resources bound so far are copied into it.
	pub fn create_binding_instance(self: &Arc<Self>, init_static: bool) -> Result<BindingInstance<P>, CapacityError> {
		let layout = self.layout();
		// allocate before building the cache, so running out of heap space fails early
		let mut allocations = [None, None];
		for class in KindClass::ALL {
			let size = layout.persistent_size(class);
			if size > 0 {
				allocations[class.index()] = Some(self.device().heap(class).allocate(size)?);
			}
		}

		let mut cache = ResourceCache::new(CacheContent::Instance);
		cache.initialize(&layout.cache_table_sizes());
		for (class, allocation) in KindClass::ALL.into_iter().zip(allocations) {
			let Some(allocation) = allocation else {
				continue;
			};
			let tables = layout
				.tables()
				.iter()
				.filter(|t| t.class() == class && t.group() == ParameterGroup::StaticMutable)
				.map(|t| (t.parameter(), t.offset_in_group()));
			cache.set_descriptor_heap_space(class, allocation, tables);
		}

		let managers = self
			.active_stages()
			.map(|stage| VariableManager::new(self, stage, VariabilityMask::MUTABLE | VariabilityMask::DYNAMIC))
			.collect();
		let mut instance = BindingInstance {
			signature: self.clone(),
			cache,
			managers,
		};
		if init_static {
			self.initialize_static_resources(&mut instance);
		}
		Ok(instance)
	}

	/// Copy every static resource bound to this signature into `instance`.
	///
	/// Unbound static resources are logged. Copying the object already present is a no-op, a different object is
	/// logged and left alone.
	pub fn initialize_static_resources(&self, instance: &mut BindingInstance<P>) {
		debug_assert!(
			self.is_compatible_with(&instance.signature),
			"instance belongs to an incompatible signature"
		);
		let statics = self.statics();
		let platform = self.device().platform();
		for index in self.desc().variability_range(Variability::Static) {
			let index = index as u32;
			let res = self.resource(index);
			let attribs = self.attribs(index);
			let (Some(src), Some(dst)) = (
				attribs.slot(CacheContent::SelfContained),
				attribs.slot(CacheContent::Instance),
			) else {
				continue;
			};
			for array_index in 0..res.array_size {
				let Some(resource) = statics.cache.resource(src.table(), src.offset() + array_index) else {
					if !res.flags.contains(ResourceFlags::RUNTIME_ARRAY) {
						tracing::error!(
							signature = self.name(),
							"No resource is bound to static shader variable '{}'",
							res.print_name(array_index)
						);
					}
					continue;
				};
				let offset = dst.offset() + array_index;
				match instance.cache.resource(dst.table(), offset) {
					Some(existing) if existing.object.ptr_eq(&resource.object) => (),
					Some(existing) => tracing::error!(
						signature = self.name(),
						"Static shader variable '{}' of the binding instance is already bound to {:?}, not replacing \
						 it with {:?}",
						res.print_name(array_index),
						existing.object,
						resource.object
					),
					None => {
						instance
							.cache
							.set_resource(platform, dst.table(), offset, Some(resource.clone()));
					}
				}
			}
		}
	}
}

impl<P: BindingPlatform> BindingInstance<P> {
	#[inline]
	pub fn signature(&self) -> &Arc<ResourceSignature<P>> {
		&self.signature
	}

	#[inline]
	pub fn cache(&self) -> &ResourceCache<P> {
		&self.cache
	}

	fn manager(&self, stage: ShaderStages) -> Option<&VariableManager> {
		self.managers.iter().find(|m| m.stages() == stage)
	}

	/// Number of mutable and dynamic variables visible to the single shader `stage`.
	pub fn variable_count(&self, stage: ShaderStages) -> u32 {
		self.manager(stage).map_or(0, |m| m.variable_count())
	}

	pub fn variable(&mut self, stage: ShaderStages, name: &str) -> Option<ShaderVariable<'_, P>> {
		let manager = self.managers.iter().find(|m| m.stages() == stage)?;
		let index = manager.find(&self.signature, name)?;
		manager.variable(&self.signature, &mut self.cache, index)
	}

	pub fn variable_by_index(&mut self, stage: ShaderStages, variable_index: u32) -> Option<ShaderVariable<'_, P>> {
		let manager = self.managers.iter().find(|m| m.stages() == stage)?;
		manager.variable(&self.signature, &mut self.cache, variable_index)
	}

	/// Bind resources from `mapping` to the mutable and dynamic variables of all `stages`.
	pub fn bind_resources(&mut self, stages: ShaderStages, mapping: &ResourceMapping<P>, flags: BindFlags) {
		for manager in self.managers.iter().filter(|m| m.stages().intersects(stages)) {
			manager.bind_resources(&self.signature, &mut self.cache, mapping, flags);
		}
	}

	/// Bind `object` directly to element `array_index` of the resource at `index`.
	pub fn set_resource(&mut self, index: u32, array_index: u32, object: Option<BoundObject<P>>) -> bool {
		self.signature.bind_resource(&mut self.cache, index, array_index, object)
	}

	/// Logs every element that has no object bound and returns whether all are bound. Immutable samplers and
	/// elements of runtime-sized arrays are never required.
	pub fn check_resources(&self) -> bool {
		let mut all_bound = true;
		for index in 0..self.signature.resource_count() {
			let res = self.signature.resource(index);
			if res.flags.contains(ResourceFlags::RUNTIME_ARRAY) {
				continue;
			}
			if self.signature.attribs(index).slot(CacheContent::Instance).is_none() {
				continue;
			}
			for array_index in 0..res.array_size {
				if self.signature.bound_object(&self.cache, index, array_index).is_none() {
					tracing::error!(
						signature = self.signature.name(),
						"No resource is bound to {} variable '{}'",
						res.variability.name(),
						res.print_name(array_index)
					);
					all_bound = false;
				}
			}
		}
		all_bound
	}
}
