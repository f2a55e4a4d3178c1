use crate::cache::ResourceCache;
use crate::descriptor::{
	DeclarationError, ImmutableSamplerDescriptor, RangeType, ResourceDescriptor, ShaderStages, SignatureDesc,
	VariabilityMask,
};
use crate::device::BindingDevice;
use crate::layout::{BindingLayout, CacheContent, ImmutableSamplerAttribs, ResourceAttribs};
use crate::platform::BindingPlatform;
use crate::signature::build::build_layout;
use crate::variable::VariableManager;
use once_cell::sync::OnceCell;
use parking_lot::{Mutex, MutexGuard};
use rustc_hash::FxHasher;
use smallvec::SmallVec;
use std::fmt::{Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// The signature-owned cache of static resources, with a variable manager per active shader stage.
pub(super) struct StaticResources<P: BindingPlatform> {
	pub cache: ResourceCache<P>,
	pub managers: SmallVec<[VariableManager; 4]>,
}

/// An immutable, validated set of resources together with their place in the native binding model.
///
/// Signatures are shared by `Arc` among pipeline layouts and binding instances.
pub struct ResourceSignature<P: BindingPlatform> {
	device: BindingDevice<P>,
	desc: SignatureDesc,
	attribs: Vec<ResourceAttribs>,
	immutable_samplers: Vec<ImmutableSamplerAttribs>,
	layout: BindingLayout,
	static_table_sizes: [u32; RangeType::COUNT],
	hash: u64,
	statics: OnceCell<Mutex<StaticResources<P>>>,
}

impl<P: BindingPlatform> ResourceSignature<P> {
	pub(crate) fn new(device: &BindingDevice<P>, desc: SignatureDesc) -> Result<Arc<Self>, DeclarationError> {
		let limits = &device.config().limits;
		desc.validate(limits)?;
		let built = build_layout(&desc, limits)?;
		let mut signature = Self {
			device: device.clone(),
			desc,
			attribs: built.attribs,
			immutable_samplers: built.immutable_samplers,
			layout: built.layout,
			static_table_sizes: built.static_table_sizes,
			hash: 0,
			statics: OnceCell::new(),
		};
		signature.hash = signature.compute_hash();
		Ok(Arc::new(signature))
	}

	/// Hash of everything but names, 0 for empty signatures.
	fn compute_hash(&self) -> u64 {
		if self.desc.is_empty() {
			return 0;
		}
		let mut state = FxHasher::default();
		self.desc.binding_index.hash(&mut state);
		self.desc.resources.len().hash(&mut state);
		for (res, attribs) in self.desc.resources.iter().zip(&self.attribs) {
			res.hash_structure(&mut state);
			attribs.hash(&mut state);
		}
		self.desc.immutable_samplers.len().hash(&mut state);
		for (sampler, attribs) in self.desc.immutable_samplers.iter().zip(&self.immutable_samplers) {
			sampler.hash_structure(&mut state);
			attribs.hash(&mut state);
		}
		self.layout.hash_structure(&mut state);
		state.finish()
	}

	#[inline]
	pub fn device(&self) -> &BindingDevice<P> {
		&self.device
	}

	#[inline]
	pub fn desc(&self) -> &SignatureDesc {
		&self.desc
	}

	#[inline]
	pub fn name(&self) -> &str {
		&self.desc.name
	}

	#[inline]
	pub fn binding_index(&self) -> u8 {
		self.desc.binding_index
	}

	#[inline]
	pub fn hash(&self) -> u64 {
		self.hash
	}

	#[inline]
	pub fn layout(&self) -> &BindingLayout {
		&self.layout
	}

	#[inline]
	pub fn resource_count(&self) -> u32 {
		self.desc.resources.len() as u32
	}

	#[inline]
	pub fn resource(&self, index: u32) -> &ResourceDescriptor {
		&self.desc.resources[index as usize]
	}

	#[inline]
	pub fn attribs(&self, index: u32) -> &ResourceAttribs {
		&self.attribs[index as usize]
	}

	#[inline]
	pub fn immutable_sampler_count(&self) -> u32 {
		self.desc.immutable_samplers.len() as u32
	}

	pub fn immutable_sampler(&self, index: u32) -> (&ImmutableSamplerDescriptor, &ImmutableSamplerAttribs) {
		(
			&self.desc.immutable_samplers[index as usize],
			&self.immutable_samplers[index as usize],
		)
	}

	/// Table sizes of the self-contained cache, one table per native range type.
	#[inline]
	pub fn static_table_sizes(&self) -> &[u32; RangeType::COUNT] {
		&self.static_table_sizes
	}

	/// Whether the sampler resource at `index` is assigned to some texture through the combined sampler suffix.
	pub fn is_assigned_sampler(&self, index: u32) -> bool {
		self.attribs.iter().any(|a| a.sampler_index == Some(index))
	}

	/// The resource bound through the inline parameter at `parameter`.
	pub fn inline_resource(&self, parameter: u32) -> Option<u32> {
		self.attribs
			.iter()
			.position(|a| a.is_inline() && a.slot(CacheContent::Instance).is_some_and(|s| s.table() == parameter))
			.map(|i| i as u32)
	}

	/// Whether binding instances and pipelines of `self` can be used in place of those of `other`.
	///
	/// Two signatures are compatible if they only differ in names.
	pub fn is_compatible_with(&self, other: &Self) -> bool {
		if std::ptr::eq(self, other) {
			return true;
		}
		self.hash == other.hash
			&& self.desc.binding_index == other.desc.binding_index
			&& self.desc.resources.len() == other.desc.resources.len()
			&& self.desc.immutable_samplers.len() == other.desc.immutable_samplers.len()
			&& self
				.desc
				.resources
				.iter()
				.zip(&other.desc.resources)
				.all(|(a, b)| a.structurally_eq(b))
			&& self
				.attribs
				.iter()
				.zip(&other.attribs)
				.all(|(a, b)| a.is_compatible_with(b))
			&& self
				.desc
				.immutable_samplers
				.iter()
				.zip(&other.desc.immutable_samplers)
				.all(|(a, b)| a.stages == b.stages && a.desc == b.desc)
			&& self.immutable_samplers == other.immutable_samplers
	}

	/// The self-contained cache, built on first use.
	pub(super) fn statics(&self) -> MutexGuard<'_, StaticResources<P>> {
		self.statics
			.get_or_init(|| {
				let mut cache = ResourceCache::new(CacheContent::SelfContained);
				cache.initialize(&self.static_table_sizes);
				let managers = self
					.desc
					.active_stages()
					.single_stages()
					.map(|stage| VariableManager::new(self, stage, VariabilityMask::STATIC))
					.collect();
				Mutex::new(StaticResources { cache, managers })
			})
			.lock()
	}

	/// All active single shader stages, in ascending bit order.
	pub fn active_stages(&self) -> impl Iterator<Item = ShaderStages> {
		self.desc.active_stages().single_stages()
	}
}

impl<P: BindingPlatform> Debug for ResourceSignature<P> {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ResourceSignature")
			.field("name", &self.desc.name)
			.field("binding_index", &self.desc.binding_index)
			.field("resources", &self.desc.resources.len())
			.field("parameters", &self.layout.parameter_count())
			.field("hash", &self.hash)
			.finish()
	}
}
