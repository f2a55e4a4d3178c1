//! The declarative, backend independent description of a signature: which resources it exposes to which shader
//! stages, and how often they change.

mod resource;
mod sampler;
mod signature_desc;
mod stages;
mod validate;

pub use resource::*;
pub use sampler::*;
pub use signature_desc::*;
pub use stages::*;
pub use validate::*;
