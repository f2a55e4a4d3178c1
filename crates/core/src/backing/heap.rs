use crate::config::BindingConfig;
use crate::descriptor::KindClass;
use crate::platform::BindingPlatform;
use crossbeam_queue::SegQueue;
use parking_lot::Mutex;
use rangemap::RangeSet;
use std::fmt::{Debug, Formatter};
use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering::Relaxed;
use thiserror::Error;

#[derive(Error, Clone, Eq, PartialEq)]
#[non_exhaustive]
pub enum CapacityError {
	#[error(
		"Persistent {class:?} descriptor heap exhausted: requested {requested} slots, largest free range is {largest_free} of {capacity}"
	)]
	PersistentHeapExhausted {
		class: KindClass,
		requested: u32,
		largest_free: u32,
		capacity: u32,
	},
	#[error("Transient {class:?} allocation of {requested} slots exceeds the chunk size of {chunk_size}")]
	TransientRequestTooLarge {
		class: KindClass,
		requested: u32,
		chunk_size: u32,
	},
	#[error("All {max_chunks} transient {class:?} chunks are in use")]
	TransientChunksExhausted { class: KindClass, max_chunks: u32 },
}

impl Debug for CapacityError {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		std::fmt::Display::fmt(self, f)
	}
}

/// A GPU visible descriptor heap of one [`KindClass`].
///
/// The heap is split into a persistent region at the front, handed out as [`DescriptorAllocation`]s that live as
/// long as the binding instance owning them, and a transient region behind it, split into fixed size chunks which
/// [`TransientDescriptorRing`](crate::backing::TransientDescriptorRing)s borrow for a frame.
pub struct GpuDescriptorHeap<P: BindingPlatform> {
	class: KindClass,
	heap: P::DescriptorHeap,
	persistent_capacity: u32,
	persistent_free: Mutex<RangeSet<u32>>,
	chunks: ChunkPool,
}

impl<P: BindingPlatform> GpuDescriptorHeap<P> {
	pub fn new(platform: &P, class: KindClass, config: &BindingConfig) -> Result<Arc<Self>, P::AllocationError> {
		let persistent_capacity = config.persistent_heap.get(class);
		let capacity = config.heap_size(class);
		// Safety: the heap is owned by self and only written through exclusively owned ranges
		let heap = unsafe { platform.create_descriptor_heap(class, capacity)? };
		let mut persistent_free = RangeSet::new();
		if persistent_capacity > 0 {
			persistent_free.insert(0..persistent_capacity);
		}
		tracing::debug!(?class, capacity, persistent_capacity, "created descriptor heap");
		Ok(Arc::new(Self {
			class,
			heap,
			persistent_capacity,
			persistent_free: Mutex::new(persistent_free),
			chunks: ChunkPool {
				base: persistent_capacity,
				chunk_size: config.transient_chunk.get(class),
				max_chunks: config.max_transient_chunks,
				next_fresh: AtomicU32::new(0),
				recycled: SegQueue::new(),
			},
		}))
	}

	#[inline]
	pub fn class(&self) -> KindClass {
		self.class
	}

	#[inline]
	pub fn heap(&self) -> &P::DescriptorHeap {
		&self.heap
	}

	#[inline]
	pub fn persistent_capacity(&self) -> u32 {
		self.persistent_capacity
	}

	/// Total number of free persistent slots, which may be fragmented.
	pub fn persistent_free(&self) -> u32 {
		self.persistent_free.lock().iter().map(|r| r.end - r.start).sum()
	}

	#[inline]
	pub fn chunk_size(&self) -> u32 {
		self.chunks.chunk_size
	}

	/// Allocate `count` contiguous slots of the persistent region, first fit. Zero sized requests succeed without
	/// taking any space.
	pub fn allocate(self: &Arc<Self>, count: u32) -> Result<DescriptorAllocation<P>, CapacityError> {
		if count == 0 {
			return Ok(DescriptorAllocation {
				heap: self.clone(),
				range: 0..0,
			});
		}

		let mut free = self.persistent_free.lock();
		let start = free.iter().find(|r| r.end - r.start >= count).map(|r| r.start);
		match start {
			Some(start) => {
				let range = start..start + count;
				free.remove(range.clone());
				Ok(DescriptorAllocation {
					heap: self.clone(),
					range,
				})
			}
			None => Err(CapacityError::PersistentHeapExhausted {
				class: self.class,
				requested: count,
				largest_free: free.iter().map(|r| r.end - r.start).max().unwrap_or(0),
				capacity: self.persistent_capacity,
			}),
		}
	}

	/// Copy `descriptors` into the heap at the absolute slot `offset`.
	///
	/// # Safety
	/// The caller must exclusively own the written range and the GPU must not be reading it.
	pub unsafe fn write(&self, platform: &P, offset: u32, descriptors: &[P::CpuDescriptor]) {
		unsafe {
			if !descriptors.is_empty() {
				platform.write_descriptors(&self.heap, offset, descriptors);
			}
		}
	}

	pub(super) fn acquire_chunk(&self) -> Result<Range<u32>, CapacityError> {
		let chunk = self.chunks.acquire().ok_or(CapacityError::TransientChunksExhausted {
			class: self.class,
			max_chunks: self.chunks.max_chunks,
		})?;
		let start = self.chunks.base + chunk * self.chunks.chunk_size;
		tracing::trace!(class = ?self.class, chunk, "acquired transient chunk");
		Ok(start..start + self.chunks.chunk_size)
	}

	pub(super) fn release_chunk(&self, chunk: Range<u32>) {
		debug_assert_eq!(chunk.end - chunk.start, self.chunks.chunk_size);
		self.chunks
			.recycled
			.push((chunk.start - self.chunks.base) / self.chunks.chunk_size);
	}
}

/// Fixed size chunks of the transient region, recycled through a lock free queue.
struct ChunkPool {
	base: u32,
	chunk_size: u32,
	max_chunks: u32,
	next_fresh: AtomicU32,
	recycled: SegQueue<u32>,
}

impl ChunkPool {
	fn acquire(&self) -> Option<u32> {
		if self.chunk_size == 0 {
			return None;
		}
		self.recycled.pop().or_else(|| {
			self.next_fresh
				.fetch_update(Relaxed, Relaxed, |next| (next < self.max_chunks).then_some(next + 1))
				.ok()
		})
	}
}

/// A range of persistent slots, freed on drop.
pub struct DescriptorAllocation<P: BindingPlatform> {
	heap: Arc<GpuDescriptorHeap<P>>,
	range: Range<u32>,
}

impl<P: BindingPlatform> DescriptorAllocation<P> {
	/// Absolute offset of the first slot within the heap.
	#[inline]
	pub fn start(&self) -> u32 {
		self.range.start
	}

	#[inline]
	pub fn len(&self) -> u32 {
		self.range.end - self.range.start
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.range.is_empty()
	}

	#[inline]
	pub fn heap(&self) -> &Arc<GpuDescriptorHeap<P>> {
		&self.heap
	}

	/// Copy `descriptors` to `offset` relative to the start of this allocation.
	///
	/// # Safety
	/// The GPU must not be reading the written slots.
	pub unsafe fn write(&self, platform: &P, offset: u32, descriptors: &[P::CpuDescriptor]) {
		unsafe {
			assert!(
				offset + descriptors.len() as u32 <= self.len(),
				"write of {} descriptors at {} out of bounds of allocation of {}",
				descriptors.len(),
				offset,
				self.len()
			);
			self.heap.write(platform, self.range.start + offset, descriptors);
		}
	}
}

impl<P: BindingPlatform> Debug for DescriptorAllocation<P> {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DescriptorAllocation")
			.field("class", &self.heap.class)
			.field("range", &self.range)
			.finish()
	}
}

impl<P: BindingPlatform> Drop for DescriptorAllocation<P> {
	fn drop(&mut self) {
		if !self.range.is_empty() {
			self.heap.persistent_free.lock().insert(self.range.clone());
		}
	}
}
