#[cfg(feature = "ash")]
pub mod ash;
mod binding;
mod commit;
pub mod headless;

pub use binding::*;
pub use commit::*;
