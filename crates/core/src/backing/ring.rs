use crate::backing::{CapacityError, GpuDescriptorHeap};
use crate::descriptor::KindClass;
use crate::platform::BindingPlatform;
use smallvec::SmallVec;
use std::ops::Range;
use std::sync::Arc;

/// Per recording context allocator of transient descriptor slots, used for dynamic tables.
///
/// Slots are bumped out of chunks borrowed from the heaps' chunk pools. Chunks stay in use until [`Self::reset`],
/// which must only happen after the GPU finished executing every command referencing them.
pub struct TransientDescriptorRing<P: BindingPlatform> {
	heaps: [Arc<GpuDescriptorHeap<P>>; KindClass::COUNT],
	current: [Option<Range<u32>>; KindClass::COUNT],
	used: [SmallVec<[Range<u32>; 4]>; KindClass::COUNT],
}

impl<P: BindingPlatform> TransientDescriptorRing<P> {
	pub fn new(heaps: [Arc<GpuDescriptorHeap<P>>; KindClass::COUNT]) -> Self {
		Self {
			heaps,
			current: [None, None],
			used: [SmallVec::new(), SmallVec::new()],
		}
	}

	#[inline]
	pub fn heap(&self, class: KindClass) -> &Arc<GpuDescriptorHeap<P>> {
		&self.heaps[class.index()]
	}

	/// Allocate `count` contiguous slots in the heap of `class`, returning their absolute heap range.
	pub fn allocate(&mut self, class: KindClass, count: u32) -> Result<Range<u32>, CapacityError> {
		let heap = &self.heaps[class.index()];
		if count > heap.chunk_size() {
			return Err(CapacityError::TransientRequestTooLarge {
				class,
				requested: count,
				chunk_size: heap.chunk_size(),
			});
		}
		if count == 0 {
			return Ok(0..0);
		}

		let current = &mut self.current[class.index()];
		let fits = current.as_ref().is_some_and(|free| free.end - free.start >= count);
		if !fits {
			let chunk = heap.acquire_chunk()?;
			self.used[class.index()].push(chunk.clone());
			*current = Some(chunk);
		}
		// a chunk was just ensured
		let free = current.get_or_insert(0..0);
		let range = free.start..free.start + count;
		free.start += count;
		Ok(range)
	}

	/// Number of chunks currently borrowed for `class`.
	pub fn chunks_in_use(&self, class: KindClass) -> usize {
		self.used[class.index()].len()
	}

	/// Return every borrowed chunk to its pool.
	///
	/// # Safety
	/// The GPU must have finished executing all commands referencing slots allocated since the last reset.
	pub unsafe fn reset(&mut self) {
		for class in KindClass::ALL {
			let heap = &self.heaps[class.index()];
			for chunk in self.used[class.index()].drain(..) {
				heap.release_chunk(chunk);
			}
			self.current[class.index()] = None;
		}
	}
}

impl<P: BindingPlatform> Drop for TransientDescriptorRing<P> {
	fn drop(&mut self) {
		// Safety: dropping the ring means the owner won't record with it anymore
		unsafe { self.reset() }
	}
}
