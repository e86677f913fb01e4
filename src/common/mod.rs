//! Value-semantics building blocks shared by the concept model and the engine contract

pub mod annotation;
pub mod label;
pub mod transitivity;
pub mod value;

pub use annotation::Annotation;
pub use label::{Iid, Label};
pub use transitivity::Transitivity;
pub use value::{Value, ValueType};
