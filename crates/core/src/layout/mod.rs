//! Packing of a signature's resources into binding tables and inline bindings.

mod attribs;
mod builder;
mod table;

pub use attribs::*;
pub use builder::*;
pub use table::{BindingLayout, BindingTable, DescriptorRange, InlineBinding, Parameter, ParameterGroup};
