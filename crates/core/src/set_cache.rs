//! Deduplication of native pipeline layouts by the set of signatures they bind.

use crate::descriptor::{DeclarationError, MAX_RESOURCE_SIGNATURES};
use crate::platform::BindingPlatform;
use crate::signature::ResourceSignature;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHasher};
use smallvec::SmallVec;
use std::fmt::{Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering::Relaxed;
use std::sync::{Arc, Weak};
use thiserror::Error;

/// Up to [`MAX_RESOURCE_SIGNATURES`] signatures, each at its binding index, with their parameters laid out back to
/// back in binding index order.
pub struct SignatureSet<P: BindingPlatform> {
	signatures: [Option<Arc<ResourceSignature<P>>>; MAX_RESOURCE_SIGNATURES],
	first_parameter: [u32; MAX_RESOURCE_SIGNATURES],
	parameter_count: u32,
	hash: u64,
}

impl<P: BindingPlatform> SignatureSet<P> {
	pub fn new(signatures: &[Arc<ResourceSignature<P>>]) -> Result<Self, DeclarationError> {
		if signatures.len() > MAX_RESOURCE_SIGNATURES {
			return Err(DeclarationError::TooManySignatures {
				count: signatures.len(),
			});
		}
		let mut slots: [Option<Arc<ResourceSignature<P>>>; MAX_RESOURCE_SIGNATURES] = Default::default();
		for (i, signature) in signatures.iter().enumerate() {
			if let Some(other) = signatures[..i].iter().find(|other| other.name() == signature.name()) {
				return Err(DeclarationError::DuplicateSignatureName {
					name: other.name().to_owned(),
				});
			}
			let slot = &mut slots[signature.binding_index() as usize];
			if let Some(first) = slot {
				return Err(DeclarationError::ConflictingBindingIndex {
					index: signature.binding_index(),
					first: first.name().to_owned(),
					second: signature.name().to_owned(),
				});
			}
			*slot = Some(signature.clone());
		}

		let mut first_parameter = [0; MAX_RESOURCE_SIGNATURES];
		let mut parameter_count = 0;
		let mut state = FxHasher::default();
		for (index, slot) in slots.iter().enumerate() {
			first_parameter[index] = parameter_count;
			let hash = slot.as_ref().map_or(0, |s| s.hash());
			hash.hash(&mut state);
			if let Some(signature) = slot {
				parameter_count += signature.layout().parameter_count();
			}
		}
		Ok(Self {
			signatures: slots,
			first_parameter,
			parameter_count,
			hash: state.finish(),
		})
	}

	/// Iterate the present signatures with their binding index.
	pub fn iter(&self) -> impl Iterator<Item = (u8, &Arc<ResourceSignature<P>>)> {
		self.signatures
			.iter()
			.enumerate()
			.filter_map(|(index, s)| Some((index as u8, s.as_ref()?)))
	}

	#[inline]
	pub fn signature(&self, binding_index: u8) -> Option<&Arc<ResourceSignature<P>>> {
		self.signatures.get(binding_index as usize)?.as_ref()
	}

	/// Index of the first native parameter of the signature at `binding_index`.
	#[inline]
	pub fn first_parameter(&self, binding_index: u8) -> u32 {
		self.first_parameter[binding_index as usize]
	}

	#[inline]
	pub fn parameter_count(&self) -> u32 {
		self.parameter_count
	}

	#[inline]
	pub fn hash(&self) -> u64 {
		self.hash
	}

	/// Empty signatures are interchangeable with absent ones.
	pub fn is_compatible_with(&self, other: &Self) -> bool {
		self.hash == other.hash
			&& self.signatures.iter().zip(&other.signatures).all(|(a, b)| {
				let a = a.as_ref().filter(|s| !s.desc().is_empty());
				let b = b.as_ref().filter(|s| !s.desc().is_empty());
				match (a, b) {
					(None, None) => true,
					(Some(a), Some(b)) => a.is_compatible_with(b),
					_ => false,
				}
			})
	}
}

impl<P: BindingPlatform> Debug for SignatureSet<P> {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.debug_map().entries(self.iter().map(|(i, s)| (i, s.name()))).finish()
	}
}

/// A native pipeline layout binding a [`SignatureSet`], shared by every request for a compatible set.
pub struct PipelineLayout<P: BindingPlatform> {
	set: SignatureSet<P>,
	native: P::PipelineLayout,
	cache: Weak<SetCacheInner<P>>,
}

impl<P: BindingPlatform> PipelineLayout<P> {
	#[inline]
	pub fn native(&self) -> &P::PipelineLayout {
		&self.native
	}

	#[inline]
	pub fn set(&self) -> &SignatureSet<P> {
		&self.set
	}

	#[inline]
	pub fn first_parameter(&self, binding_index: u8) -> u32 {
		self.set.first_parameter(binding_index)
	}
}

impl<P: BindingPlatform> Drop for PipelineLayout<P> {
	fn drop(&mut self) {
		if let Some(cache) = self.cache.upgrade() {
			cache.remove_dead(self.set.hash());
		}
	}
}

impl<P: BindingPlatform> Debug for PipelineLayout<P> {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PipelineLayout").field("set", &self.set).finish()
	}
}

#[derive(Error)]
#[non_exhaustive]
pub enum SetCacheError<P: BindingPlatform> {
	#[error("Invalid signature set: {0}")]
	Declaration(#[from] DeclarationError),
	#[error("Platform failed to create the pipeline layout: {0}")]
	Platform(P::LayoutCreationError),
}

impl<P: BindingPlatform> Debug for SetCacheError<P> {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		std::fmt::Display::fmt(self, f)
	}
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct SetCacheStats {
	pub hits: u64,
	pub misses: u64,
}

struct SetCacheInner<P: BindingPlatform> {
	layouts: Mutex<FxHashMap<u64, SmallVec<[Weak<PipelineLayout<P>>; 1]>>>,
	hits: AtomicU64,
	misses: AtomicU64,
}

impl<P: BindingPlatform> SetCacheInner<P> {
	fn remove_dead(&self, hash: u64) {
		let mut layouts = self.layouts.lock();
		if let Some(bucket) = layouts.get_mut(&hash) {
			bucket.retain(|weak| weak.strong_count() > 0);
			if bucket.is_empty() {
				layouts.remove(&hash);
			}
		}
	}
}

/// Weakly holds every live [`PipelineLayout`], so compatible signature sets share one native layout.
pub struct SignatureSetCache<P: BindingPlatform> {
	inner: Arc<SetCacheInner<P>>,
}

impl<P: BindingPlatform> SignatureSetCache<P> {
	pub fn new() -> Self {
		Self {
			inner: Arc::new(SetCacheInner {
				layouts: Mutex::new(FxHashMap::default()),
				hits: AtomicU64::new(0),
				misses: AtomicU64::new(0),
			}),
		}
	}

	/// The live layout compatible with `signatures`, or a newly created one.
	#[profiling::function]
	pub fn get_or_create(
		&self,
		platform: &P,
		signatures: &[Arc<ResourceSignature<P>>],
	) -> Result<Arc<PipelineLayout<P>>, SetCacheError<P>> {
		let set = SignatureSet::new(signatures)?;
		// upgraded layouts must be dropped after the lock is released, their drop locks it again
		let mut graveyard = SmallVec::<[Arc<PipelineLayout<P>>; 2]>::new();
		if let Some(layout) = self.find(&set, &mut graveyard) {
			self.inner.hits.fetch_add(1, Relaxed);
			return Ok(layout);
		}
		drop(graveyard);

		// Safety: the set outlives the native layout, both are owned by the PipelineLayout
		let native = unsafe { platform.create_pipeline_layout(&set) }.map_err(SetCacheError::Platform)?;
		let layout = Arc::new(PipelineLayout {
			set,
			native,
			cache: Arc::downgrade(&self.inner),
		});

		let mut graveyard = SmallVec::<[Arc<PipelineLayout<P>>; 2]>::new();
		let result = {
			let mut layouts = self.inner.layouts.lock();
			let bucket = layouts.entry(layout.set.hash()).or_default();
			let existing = Self::find_in(&bucket[..], &layout.set, &mut graveyard);
			match existing {
				// someone else created a compatible layout while we were creating ours
				Some(existing) => {
					self.inner.hits.fetch_add(1, Relaxed);
					graveyard.push(layout);
					existing
				}
				None => {
					self.inner.misses.fetch_add(1, Relaxed);
					bucket.retain(|weak| weak.strong_count() > 0);
					bucket.push(Arc::downgrade(&layout));
					tracing::debug!(set = ?layout.set, "created pipeline layout");
					layout
				}
			}
		};
		drop(graveyard);
		Ok(result)
	}

	fn find(
		&self,
		set: &SignatureSet<P>,
		graveyard: &mut SmallVec<[Arc<PipelineLayout<P>>; 2]>,
	) -> Option<Arc<PipelineLayout<P>>> {
		let layouts = self.inner.layouts.lock();
		Self::find_in(layouts.get(&set.hash())?, set, graveyard)
	}

	fn find_in(
		bucket: &[Weak<PipelineLayout<P>>],
		set: &SignatureSet<P>,
		graveyard: &mut SmallVec<[Arc<PipelineLayout<P>>; 2]>,
	) -> Option<Arc<PipelineLayout<P>>> {
		for weak in bucket {
			let Some(layout) = weak.upgrade() else {
				continue;
			};
			if layout.set.is_compatible_with(set) {
				return Some(layout);
			}
			graveyard.push(layout);
		}
		None
	}

	pub fn stats(&self) -> SetCacheStats {
		SetCacheStats {
			hits: self.inner.hits.load(Relaxed),
			misses: self.inner.misses.load(Relaxed),
		}
	}

	/// Number of live layouts.
	pub fn len(&self) -> usize {
		self.inner
			.layouts
			.lock()
			.values()
			.flatten()
			.filter(|weak| weak.strong_count() > 0)
			.count()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl<P: BindingPlatform> Default for SignatureSetCache<P> {
	fn default() -> Self {
		Self::new()
	}
}
