//! The vulkan platform.
//!
//! Both descriptor heaps are single update-after-bind descriptor sets bound at sets 0 and 1, with one binding per
//! descriptor type sharing the heap's index space. Every parameter of a pipeline layout is an 8 byte push constant,
//! holding the heap offset of a table or the device address of an inline buffer.

mod access_type;
mod binding;
mod commit;
mod convert;
mod device;
mod objects;

pub use access_type::*;
pub use binding::*;
pub use commit::*;
pub use device::*;
pub use objects::*;
