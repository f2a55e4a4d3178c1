use crate::descriptor::ResourceKind;
use crate::platform::{BindingPlatform, BufferObject, BufferUsage, BufferViewObject, DeviceObject, TextureViewObject, ViewType};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// A shared reference to a device object that can be bound to a resource slot.
pub enum BoundObject<P: BindingPlatform> {
	Buffer(Arc<P::Buffer>),
	BufferView(Arc<P::BufferView>),
	TextureView(Arc<P::TextureView>),
	Sampler(Arc<P::Sampler>),
	AccelerationStructure(Arc<P::AccelerationStructure>),
}

impl<P: BindingPlatform> BoundObject<P> {
	pub fn name(&self) -> &str {
		match self {
			BoundObject::Buffer(o) => o.name(),
			BoundObject::BufferView(o) => o.name(),
			BoundObject::TextureView(o) => o.name(),
			BoundObject::Sampler(o) => o.name(),
			BoundObject::AccelerationStructure(o) => o.name(),
		}
	}

	pub fn type_name(&self) -> &'static str {
		match self {
			BoundObject::Buffer(_) => "buffer",
			BoundObject::BufferView(o) => match o.view_type() {
				ViewType::ShaderResource => "buffer SRV",
				ViewType::UnorderedAccess => "buffer UAV",
			},
			BoundObject::TextureView(o) => match o.view_type() {
				ViewType::ShaderResource => "texture SRV",
				ViewType::UnorderedAccess => "texture UAV",
			},
			BoundObject::Sampler(_) => "sampler",
			BoundObject::AccelerationStructure(_) => "acceleration structure",
		}
	}

	/// Whether this object may be bound to a resource of `kind`.
	pub fn matches_kind(&self, kind: ResourceKind) -> bool {
		match (self, kind) {
			(BoundObject::Buffer(_), ResourceKind::ConstantBuffer) => true,
			(BoundObject::BufferView(v), ResourceKind::BufferSrv) => v.view_type() == ViewType::ShaderResource,
			(BoundObject::BufferView(v), ResourceKind::BufferUav) => v.view_type() == ViewType::UnorderedAccess,
			(BoundObject::TextureView(v), ResourceKind::TextureSrv) => v.view_type() == ViewType::ShaderResource,
			(BoundObject::TextureView(v), ResourceKind::TextureUav) => v.view_type() == ViewType::UnorderedAccess,
			(BoundObject::Sampler(_), ResourceKind::Sampler) => true,
			(BoundObject::AccelerationStructure(_), ResourceKind::AccelerationStructure) => true,
			_ => false,
		}
	}

	/// Both reference the same device object.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		match (self, other) {
			(BoundObject::Buffer(a), BoundObject::Buffer(b)) => Arc::ptr_eq(a, b),
			(BoundObject::BufferView(a), BoundObject::BufferView(b)) => Arc::ptr_eq(a, b),
			(BoundObject::TextureView(a), BoundObject::TextureView(b)) => Arc::ptr_eq(a, b),
			(BoundObject::Sampler(a), BoundObject::Sampler(b)) => Arc::ptr_eq(a, b),
			(BoundObject::AccelerationStructure(a), BoundObject::AccelerationStructure(b)) => Arc::ptr_eq(a, b),
			_ => false,
		}
	}

	/// The buffer whose usage decides if an inline binding of this object must be re-resolved every commit.
	pub fn buffer_usage(&self) -> Option<BufferUsage> {
		match self {
			BoundObject::Buffer(b) => Some(b.usage()),
			BoundObject::BufferView(v) => Some(v.buffer().usage()),
			_ => None,
		}
	}

	/// The sampler a texture view carries along.
	pub fn texture_sampler(&self) -> Option<&Arc<P::Sampler>> {
		match self {
			BoundObject::TextureView(v) => v.sampler(),
			_ => None,
		}
	}
}

impl<P: BindingPlatform> Clone for BoundObject<P> {
	fn clone(&self) -> Self {
		match self {
			BoundObject::Buffer(o) => BoundObject::Buffer(o.clone()),
			BoundObject::BufferView(o) => BoundObject::BufferView(o.clone()),
			BoundObject::TextureView(o) => BoundObject::TextureView(o.clone()),
			BoundObject::Sampler(o) => BoundObject::Sampler(o.clone()),
			BoundObject::AccelerationStructure(o) => BoundObject::AccelerationStructure(o.clone()),
		}
	}
}

impl<P: BindingPlatform> Debug for BoundObject<P> {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{} '{}'", self.type_name(), self.name())
	}
}
