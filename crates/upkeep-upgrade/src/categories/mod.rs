//! Built-in file categories.

pub mod ordered;
pub mod relationship;
pub mod resource;

pub use ordered::{OrderEntry, OrderFile, OrderedCollectionCategory};
pub use relationship::{Cardinality, Relationship, RelationshipCategory, RelationshipColumn};
pub use resource::ResourceCategory;
