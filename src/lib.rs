#![cfg_attr(docsrs, feature(doc_cfg))]
//! # halo-stencil
//!
//! halo-stencil applies finite-difference stencils to regular N-dimensional
//! grids that are split into equal cubic blocks, one per rank of a periodic
//! Cartesian process grid. Each block is iterated by a pool of worker
//! threads; data beyond a block's faces arrives in ghost regions exchanged
//! with the neighbouring ranks.
//!
//! ## Features
//! - Index arithmetic with precomputed reciprocals instead of hardware division
//! - Whole-field and face-by-face stepping strategies partitioned across workers
//! - Composed boundary iterators that read transparently into ghost regions
//! - Non-blocking halo exchange over pluggable backends (in-process Rayon, MPI)
//! - A scheduler that overlaps interior computation with halo arrival and
//!   handles faces in the order they complete
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! halo-stencil = "0.3"
//! # Optional features:
//! # features = ["mpi-support", "check-invariants"]
//! ```
//!
//! One round of stencil application:
//!
//! ```
//! use halo_stencil::prelude::*;
//!
//! let config = BlockConfig::new(10, ConstFd8Laplacian::<2>::EXTENT);
//! let input_values = FieldData::from_fn(100, |i| (i % 10) as f64);
//! let mut input = ComposedBlock::<2, _>::with_values(RayonComm::solo(), &config, input_values)?;
//! let result = FieldData::zeros(100);
//! let output = PureBlock::<2>::with_values(10, result.clone())?;
//!
//! let mut op = BlockOperator::new(ConstFd8Laplacian::new([0.1, 0.1])?);
//! input.start_communication()?;
//! op.apply(&mut input, &output)?;
//! input.finish_communication()?;
//! assert_eq!(result.len(), 100);
//! # Ok::<(), halo_stencil::stencil_error::StencilError>(())
//! ```
//!
//! ## Errors
//! Every fallible operation returns [`StencilError`](stencil_error::StencilError).
//! Bounds, neighbour ranges and the halo-exchange order are always checked.

pub mod algs;
pub mod config;
pub mod debug_invariants;
pub mod grid;
pub mod iterators;
pub mod numerics;
pub mod stencil_error;
pub mod utils;

pub use debug_invariants::DebugInvariants;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::communicator::{Communicator, RayonComm, Wait};
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::config::BlockConfig;
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::grid::{
        CartesianTopology, CommPhase, CommunicativeBlock, ComposedBlock, GhostRegion, Iterable,
        PureBlock,
    };
    pub use crate::iterators::{
        BoundaryIterator, ExecutionContext, FieldData, FieldIterator, IndexSpace,
    };
    pub use crate::numerics::{BlockOperator, ConstFd8Laplacian, WeightProvider};
    pub use crate::stencil_error::StencilError;
    pub use crate::utils::BoundaryId;
}
