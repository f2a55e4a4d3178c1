use serde::{Deserialize, Serialize};

bitflags::bitflags! {
	/// The shader stages a resource or an immutable sampler is visible to.
	#[repr(transparent)]
	#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
	#[serde(transparent)]
	pub struct ShaderStages: u32 {
		const VERTEX = 1 << 0;
		const TESSELLATION_CONTROL = 1 << 1;
		const TESSELLATION_EVALUATION = 1 << 2;
		const GEOMETRY = 1 << 3;
		const FRAGMENT = 1 << 4;
		const COMPUTE = 1 << 5;
		const TASK = 1 << 6;
		const MESH = 1 << 7;
		const RAY_GEN = 1 << 8;
		const RAY_MISS = 1 << 9;
		const RAY_CLOSEST_HIT = 1 << 10;
		const RAY_ANY_HIT = 1 << 11;
		const RAY_INTERSECTION = 1 << 12;
		const CALLABLE = 1 << 13;

		const ALL_GRAPHICS = Self::VERTEX.bits()
			| Self::TESSELLATION_CONTROL.bits()
			| Self::TESSELLATION_EVALUATION.bits()
			| Self::GEOMETRY.bits()
			| Self::FRAGMENT.bits()
			| Self::TASK.bits()
			| Self::MESH.bits();
		const ALL_RAY_TRACING = Self::RAY_GEN.bits()
			| Self::RAY_MISS.bits()
			| Self::RAY_CLOSEST_HIT.bits()
			| Self::RAY_ANY_HIT.bits()
			| Self::RAY_INTERSECTION.bits()
			| Self::CALLABLE.bits();
	}
}

impl ShaderStages {
	/// Number of distinct single-stage bits.
	pub const STAGE_COUNT: usize = 14;

	/// Index of a single stage, used to address per-stage arrays.
	///
	/// Returns None if `self` is not exactly one stage.
	pub fn stage_index(self) -> Option<usize> {
		(self.bits().count_ones() == 1).then(|| self.bits().trailing_zeros() as usize)
	}

	/// Iterates all single stages contained in `self`, lowest bit first.
	pub fn single_stages(self) -> impl Iterator<Item = ShaderStages> {
		let bits = self.bits();
		(0..Self::STAGE_COUNT as u32)
			.filter(move |i| bits & (1 << i) != 0)
			.map(|i| ShaderStages::from_bits_retain(1 << i))
	}

	pub fn is_ray_tracing_only(self) -> bool {
		!self.is_empty() && Self::ALL_RAY_TRACING.contains(self)
	}
}
