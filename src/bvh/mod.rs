//! This module defines a [`Bvh`] over [`Primitive`]s, the [`NodeRef`] handles to its nodes and
//! the iterators which traverse it.
//!
//! [`Primitive`]: crate::Primitive

mod bvh_impl;
mod bvh_node;
mod iter;

pub use self::bvh_impl::*;
pub use self::bvh_node::*;
pub use self::iter::*;
