use crate::cache::{BoundObject, CachedResource, ResourceCache};
use crate::descriptor::{ResourceKind, Variability};
use crate::platform::{BindingPlatform, BufferUsage};
use crate::signature::ResourceSignature;

impl<P: BindingPlatform> ResourceSignature<P> {
	/// The object bound to element `array_index` of resource `index` in `cache`.
	pub fn bound_object<'c>(
		&self,
		cache: &'c ResourceCache<P>,
		index: u32,
		array_index: u32,
	) -> Option<&'c BoundObject<P>> {
		let slot = self.attribs(index).slot(cache.content())?;
		if array_index >= self.resource(index).array_size {
			return None;
		}
		cache
			.resource(slot.table(), slot.offset() + array_index)
			.map(|r| &r.object)
	}

	/// Bind `object` to element `array_index` of resource `index`, or unbind it with None.
	///
	/// Every rejected bind is logged and leaves the cache untouched. Objects already bound to static or mutable
	/// resources can't be replaced or removed, rebinding the very same object is a no-op. Binding a texture also
	/// binds the sampler it carries into the texture's assigned sampler, unless that one is immutable.
	pub fn bind_resource(
		&self,
		cache: &mut ResourceCache<P>,
		index: u32,
		array_index: u32,
		object: Option<BoundObject<P>>,
	) -> bool {
		self.bind_element(cache, index, array_index, object, true)
	}

	fn bind_element(
		&self,
		cache: &mut ResourceCache<P>,
		index: u32,
		array_index: u32,
		object: Option<BoundObject<P>>,
		direct: bool,
	) -> bool {
		let res = self.resource(index);
		let attribs = *self.attribs(index);
		let signature = self.name();

		if array_index >= res.array_size {
			tracing::error!(
				signature,
				"Array index {} is out of range for shader variable '{}' of size {}",
				array_index,
				res.name,
				res.array_size
			);
			return false;
		}
		let Some(slot) = attribs.slot(cache.content()) else {
			tracing::error!(
				signature,
				"Shader variable '{}' is an immutable sampler or isn't part of this cache and can't be bound",
				res.name
			);
			return false;
		};
		if let Some(object) = &object {
			if !object.matches_kind(res.kind) {
				tracing::error!(
					signature,
					"Failed to bind {:?} to shader variable '{}': Incorrect object type, expected {}",
					object,
					res.print_name(array_index),
					res.kind.name()
				);
				return false;
			}
		}
		if direct && res.kind == ResourceKind::Sampler && self.desc().uses_combined_samplers() {
			tracing::warn!(
				signature,
				"Binding separate sampler '{}' of a signature that uses combined texture samplers",
				res.name
			);
		}

		let offset = slot.offset() + array_index;
		if res.variability != Variability::Dynamic {
			if let Some(existing) = cache.resource(slot.table(), offset) {
				match &object {
					Some(object) if object.ptr_eq(&existing.object) => return true,
					Some(object) => tracing::error!(
						signature,
						"Non-dynamic shader variable '{}' is already bound to {:?}, refusing to bind {:?}. Use dynamic \
						 variability to allow rebinding",
						res.print_name(array_index),
						existing.object,
						object
					),
					None => tracing::error!(
						signature,
						"Non-dynamic shader variable '{}' is bound to {:?} and can't be unbound",
						res.print_name(array_index),
						existing.object
					),
				}
				return false;
			}
		}

		let platform = self.device().platform();
		let sampler = object.as_ref().map(|o| o.texture_sampler().cloned());
		let value = object.map(|object| {
			let mut resource = CachedResource::new(platform, res.kind, object);
			if attribs.is_inline() {
				resource.gpu_address = platform.gpu_address(&resource.object);
				resource.dynamic_inline = resource.object.buffer_usage() == Some(BufferUsage::Dynamic);
			}
			resource
		});
		cache.set_resource(platform, slot.table(), offset, value);

		if let (Some(sampler_index), false) = (attribs.sampler_index, attribs.immutable_sampler) {
			let sampler_array_index = match self.resource(sampler_index).array_size {
				1 => 0,
				_ => array_index,
			};
			match sampler {
				Some(Some(sampler)) => {
					self.bind_element(
						cache,
						sampler_index,
						sampler_array_index,
						Some(BoundObject::Sampler(sampler)),
						false,
					);
				}
				Some(None) => tracing::error!(
					signature,
					"Texture view bound to '{}' has no sampler to bind to its combined sampler '{}'",
					res.print_name(array_index),
					self.resource(sampler_index).name
				),
				None => {
					self.bind_element(cache, sampler_index, sampler_array_index, None, false);
				}
			}
		}
		true
	}
}
