//! Range core: boundary points, the range type, node iteration and content
//! mutation.

pub mod boundary;
pub mod contents;
pub mod iterator;
pub mod range;

pub use boundary::{boundary_after, boundary_before, compare_points, BoundaryPoint};
pub use iterator::RangeIterator;
pub use range::{Bookmark, HowToCompare, NodePosition, Range};
