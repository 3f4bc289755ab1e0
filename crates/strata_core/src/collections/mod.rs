//! # Collections
//!
//! Contiguous containers parameterized over any [`Allocator`].
//!
//! - [`FixedArray`] - capacity fixed at construction, element addresses never move
//! - [`DynArray`] - grows by doubling through [`Allocator::reallocate`]
//! - [`FixedRing`] - power-of-two circular buffer, oldest element evicted when full
//!
//! ## Safety Note
//!
//! Elements live in raw storage obtained from the allocator, so this module
//! requires unsafe code. Only the `[0, len)` prefix is ever treated as
//! initialized.
//!
//! [`Allocator`]: crate::memory::Allocator
//! [`Allocator::reallocate`]: crate::memory::Allocator::reallocate

#![allow(unsafe_code)]

mod dyn_array;
mod fixed_array;
mod ring;

pub use dyn_array::DynArray;
pub use fixed_array::FixedArray;
pub use ring::FixedRing;
