//! Objects bound to resource slots, and the caches holding them together with their descriptors.

mod object;
mod resource_cache;

pub use object::*;
pub use resource_cache::*;
