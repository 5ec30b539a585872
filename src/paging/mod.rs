//! Page iteration over Graph collections

pub mod iterator;

pub use iterator::{IterationState, PageIterator};
