//! GPU visible descriptor storage: persistent allocations owned by binding instances and transient chunks
//! borrowed by recording contexts for a frame.

mod heap;
mod ring;

pub use heap::*;
pub use ring::*;
