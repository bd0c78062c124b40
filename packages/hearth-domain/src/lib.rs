pub mod identity;
pub mod projection;

pub use projection::{Projection, merge_attributes};
