//! Small value types and helpers shared by the iterators, grid and numerics.

pub mod boundary;
pub mod magic;
pub mod timer;

pub use boundary::BoundaryId;
pub use magic::MagicNumber;
pub use timer::Timer;
