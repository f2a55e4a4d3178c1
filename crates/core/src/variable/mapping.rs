use crate::cache::BoundObject;
use crate::platform::BindingPlatform;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

bitflags::bitflags! {
	/// Controls which variables [`ResourceMapping`] driven binding touches.
	#[repr(transparent)]
	#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
	pub struct BindFlags: u8 {
		const UPDATE_STATIC = 1 << 0;
		const UPDATE_MUTABLE = 1 << 1;
		const UPDATE_DYNAMIC = 1 << 2;
		/// Don't touch elements that already have an object bound.
		const KEEP_EXISTING = 1 << 3;
		/// Log an error for every element that stays unbound because the mapping has nothing for it.
		const VERIFY_ALL_RESOLVED = 1 << 4;
	}
}

impl BindFlags {
	pub const UPDATE_ALL: Self = Self::UPDATE_STATIC.union(Self::UPDATE_MUTABLE).union(Self::UPDATE_DYNAMIC);

	/// The update flags, where none at all means all of them.
	pub fn update_flags(self) -> Self {
		let update = self.intersection(Self::UPDATE_ALL);
		if update.is_empty() { Self::UPDATE_ALL } else { update }
	}
}

/// Objects to bind, looked up by variable name.
pub struct ResourceMapping<P: BindingPlatform> {
	objects: FxHashMap<String, SmallVec<[Option<BoundObject<P>>; 1]>>,
}

impl<P: BindingPlatform> ResourceMapping<P> {
	pub fn new() -> Self {
		Self {
			objects: FxHashMap::default(),
		}
	}

	pub fn set(&mut self, name: impl Into<String>, object: BoundObject<P>) -> &mut Self {
		self.set_element(name, 0, object)
	}

	/// Sets a single element of an array, elements in between stay empty.
	pub fn set_element(&mut self, name: impl Into<String>, array_index: u32, object: BoundObject<P>) -> &mut Self {
		let elements = self.objects.entry(name.into()).or_default();
		let index = array_index as usize;
		if elements.len() <= index {
			elements.resize(index + 1, None);
		}
		elements[index] = Some(object);
		self
	}

	pub fn set_array(&mut self, name: impl Into<String>, objects: impl IntoIterator<Item = BoundObject<P>>) -> &mut Self {
		self.objects.insert(name.into(), objects.into_iter().map(Some).collect());
		self
	}

	pub fn get(&self, name: &str, array_index: u32) -> Option<&BoundObject<P>> {
		self.objects.get(name)?.get(array_index as usize)?.as_ref()
	}

	pub fn remove(&mut self, name: &str) -> bool {
		self.objects.remove(name).is_some()
	}

	pub fn len(&self) -> usize {
		self.objects.len()
	}

	pub fn is_empty(&self) -> bool {
		self.objects.is_empty()
	}
}

impl<P: BindingPlatform> Default for ResourceMapping<P> {
	fn default() -> Self {
		Self::new()
	}
}
