pub mod definition;
pub mod resolver;

pub use definition::{DependencyExt, DependencySpec, RelationKind};
pub use resolver::resolve;
