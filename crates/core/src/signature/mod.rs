//! Resource signatures: a validated [`SignatureDesc`](crate::descriptor::SignatureDesc) with its native layout, the
//! static resources bound to it, and the binding instances created from it.

mod bind;
mod build;
mod instance;
mod resource_signature;
mod serialized;
mod statics;

pub use instance::*;
pub use resource_signature::*;
pub use serialized::*;
pub use statics::*;
