//! Stencil coefficients and the scheduler that applies them block by block.

pub mod operator;
pub mod weights;

pub use operator::BlockOperator;
pub use weights::{ConstFd8Laplacian, WeightProvider};
