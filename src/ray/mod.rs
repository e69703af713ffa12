//! This module holds the [`Line`], [`Ray`] and [`Segment`] definitions, and their intersection
//! functions for triangles and boxes.
mod intersect_box;
mod ray_impl;

pub use self::intersect_box::*;
pub use self::ray_impl::*;
