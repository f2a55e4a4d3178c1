//! Named access to the resources of a signature, and bulk binding from a [`ResourceMapping`].

mod manager;
mod mapping;

pub use manager::*;
pub use mapping::*;
