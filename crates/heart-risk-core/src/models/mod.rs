//! Domain models for the heart-risk system.

mod attributes;
mod identity;
mod prediction;
mod recommendation;

pub use attributes::*;
pub use identity::*;
pub use prediction::*;
pub use recommendation::*;
