//! Oriented and axis-aligned bounding boxes.

mod bbox_impl;
mod intersection;

pub use bbox_impl::*;
pub use intersection::*;
