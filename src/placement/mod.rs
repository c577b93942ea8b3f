pub mod buffer;
pub mod owner;

pub use buffer::{Placement, PlacementBuffer, PlacementPolicy};
pub use owner::{Owner, OWNERS};
