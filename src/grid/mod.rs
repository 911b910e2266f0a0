//! Blocks, ghost regions and the process grid they are exchanged over.

pub mod block;
pub mod composed_block;
pub mod ghost_region;
pub mod pure_block;
pub mod slab;
pub mod topology;

pub use block::{CommPhase, CommunicativeBlock, Iterable};
pub use composed_block::ComposedBlock;
pub use ghost_region::{GhostRegion, PersistentReceive};
pub use pure_block::PureBlock;
pub use slab::SlabLayout;
pub use topology::{CartesianTopology, balanced_dims};
