use crate::cache::BoundObject;
use crate::descriptor::ShaderStages;
use crate::platform::BindingPlatform;
use crate::signature::ResourceSignature;
use crate::variable::{BindFlags, ResourceMapping, ShaderVariable};

impl<P: BindingPlatform> ResourceSignature<P> {
	/// Bind resources from `mapping` to the static variables of all `stages`.
	pub fn bind_static_resources(&self, stages: ShaderStages, mapping: &ResourceMapping<P>, flags: BindFlags) {
		let mut statics = self.statics();
		let statics = &mut *statics;
		for manager in statics.managers.iter().filter(|m| m.stages().intersects(stages)) {
			manager.bind_resources(self, &mut statics.cache, mapping, flags);
		}
	}

	/// Number of static variables visible to the single shader `stage`.
	pub fn static_variable_count(&self, stage: ShaderStages) -> u32 {
		let statics = self.statics();
		statics
			.managers
			.iter()
			.find(|m| m.stages() == stage)
			.map_or(0, |m| m.variable_count())
	}

	pub fn static_variable(&self, stage: ShaderStages, name: &str) -> Option<StaticVariable<'_, P>> {
		let statics = self.statics();
		let manager = statics.managers.iter().find(|m| m.stages() == stage)?;
		let index = manager.find(self, name)?;
		Some(StaticVariable {
			signature: self,
			index: manager.resource_index(index)?,
		})
	}

	pub fn static_variable_by_index(&self, stage: ShaderStages, variable_index: u32) -> Option<StaticVariable<'_, P>> {
		let statics = self.statics();
		let manager = statics.managers.iter().find(|m| m.stages() == stage)?;
		Some(StaticVariable {
			signature: self,
			index: manager.resource_index(variable_index)?,
		})
	}
}

/// A static variable of a signature, binding into the signature's own cache.
#[derive(Copy, Clone)]
pub struct StaticVariable<'a, P: BindingPlatform> {
	signature: &'a ResourceSignature<P>,
	index: u32,
}

impl<P: BindingPlatform> StaticVariable<'_, P> {
	#[inline]
	pub fn resource_index(&self) -> u32 {
		self.index
	}

	pub fn name(&self) -> &str {
		&self.signature.resource(self.index).name
	}

	fn with<R>(&self, f: impl FnOnce(&mut ShaderVariable<'_, P>) -> R) -> R {
		let mut statics = self.signature.statics();
		f(&mut ShaderVariable::new(self.signature, &mut statics.cache, self.index))
	}

	pub fn set(&self, object: BoundObject<P>) {
		self.with(|v| v.set(object))
	}

	pub fn set_element(&self, array_index: u32, object: BoundObject<P>) {
		self.with(|v| v.set_element(array_index, object))
	}

	pub fn set_array(&self, first_element: u32, objects: &[BoundObject<P>]) {
		self.with(|v| v.set_array(first_element, objects))
	}

	pub fn is_bound(&self, array_index: u32) -> bool {
		self.with(|v| v.is_bound(array_index))
	}
}
