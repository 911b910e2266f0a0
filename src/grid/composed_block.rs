//! A block surrounded by ghost regions that are refilled from neighbouring
//! ranks of a periodic Cartesian process grid.
//!
//! One halo round is
//! `start_communication → receive_done_at × 2·D → finish_communication`.
//! Faces may arrive in any order; [`receive_done_at`] reports them in the
//! order they complete.
//!
//! [`receive_done_at`]: CommunicativeBlock::receive_done_at

use crate::algs::communicator::{Communicator, Wait};
use crate::algs::wire;
use crate::config::BlockConfig;
use crate::debug_invariants::DebugInvariants;
use crate::grid::block::{CommPhase, CommunicativeBlock, Iterable};
use crate::grid::ghost_region::GhostRegion;
use crate::grid::slab::SlabLayout;
use crate::grid::topology::CartesianTopology;
use crate::iterators::composed::ComposedFieldIterator;
use crate::iterators::field::{BoundaryIterator, FieldIterator};
use crate::iterators::index_space::IndexSpace;
use crate::iterators::pure::{ValueFieldBoundaryIterator, ValueFieldIterator};
use crate::iterators::stepper::ExecutionContext;
use crate::iterators::value::FieldData;
use crate::stencil_error::StencilError;
use crate::utils::boundary::BoundaryId;
use crate::utils::timer::Timer;

pub struct ComposedBlock<const D: usize, C: Communicator> {
    comm: C,
    topology: CartesianTopology<D>,
    space: IndexSpace<D>,
    extent: usize,
    values: Option<FieldData>,
    ghosts: [[GhostRegion<D>; 2]; D],
    /// Outgoing slab layouts, indexed by face ordinal.
    slabs: Vec<SlabLayout<D>>,
    /// Rank beyond each face, indexed by `[dimension][side]`.
    neighbors: [[usize; 2]; D],
    phase: CommPhase,
    pending_receives: Vec<(BoundaryId, C::RecvHandle)>,
    pending_sends: Vec<(BoundaryId, C::SendHandle)>,
    comm_timer: Timer,
}

impl<const D: usize, C: Communicator> ComposedBlock<D, C> {
    /// Block on a balanced process grid spanning `comm`'s world, with
    /// persistent receives armed.
    pub fn new(comm: C, config: &BlockConfig) -> Result<Self, StencilError> {
        let topology = CartesianTopology::new(comm.rank(), comm.size())?;
        Self::with_topology(comm, topology, config)
    }

    /// Block on an explicit process grid.
    pub fn with_topology(
        comm: C,
        topology: CartesianTopology<D>,
        config: &BlockConfig,
    ) -> Result<Self, StencilError> {
        config.validate()?;
        if topology.rank() != comm.rank() || topology.size() != comm.size() {
            return Err(StencilError::InvalidConfig(format!(
                "topology of rank {}/{} used with communicator of rank {}/{}",
                topology.rank(),
                topology.size(),
                comm.rank(),
                comm.size()
            )));
        }
        let n = config.elements_per_dim;
        let ghosts = (0..D)
            .map(|d| {
                Ok([
                    GhostRegion::new(BoundaryId::new(d, true), n, config.extent)?,
                    GhostRegion::new(BoundaryId::new(d, false), n, config.extent)?,
                ])
            })
            .collect::<Result<Vec<_>, StencilError>>()?
            .try_into()
            .map_err(|_| StencilError::InvalidConfig("ghost table has the wrong shape".into()))?;
        let mut block = Self {
            comm,
            topology,
            space: IndexSpace::cube(n)?,
            extent: config.extent,
            values: None,
            ghosts,
            slabs: Vec::with_capacity(2 * D),
            neighbors: [[0; 2]; D],
            phase: CommPhase::Created,
            pending_receives: Vec::with_capacity(2 * D),
            pending_sends: Vec::with_capacity(2 * D),
            comm_timer: Timer::new(),
        };
        block.prepare_communication()?;
        Ok(block)
    }

    pub fn with_values(comm: C, config: &BlockConfig, values: FieldData) -> Result<Self, StencilError> {
        let mut block = Self::new(comm, config)?;
        block.set_values(values)?;
        Ok(block)
    }

    /// Resolve neighbours, build slab layouts and register one persistent
    /// receive per ghost region.
    fn prepare_communication(&mut self) -> Result<(), StencilError> {
        if self.phase != CommPhase::Created {
            return Err(self.phase.violation("prepare communication"));
        }
        for face in BoundaryId::all(D) {
            let d = face.dimension();
            let peer = self.topology.neighbor(d, face.is_lower_side())?;
            self.neighbors[d][face.side_index()] = peer;
            self.slabs.push(SlabLayout::new(&self.space, face, self.extent)?);
            self.ghosts[d][face.side_index()].initialize_receive(peer)?;
        }
        self.phase = CommPhase::ReceivesArmed;
        log::debug!(
            "rank {} at {:?} of {:?}: halo exchange armed (extent {})",
            self.topology.rank(),
            self.topology.coords(),
            self.topology.dims(),
            self.extent
        );
        Ok(())
    }

    pub fn topology(&self) -> &CartesianTopology<D> {
        &self.topology
    }

    pub fn communicator(&self) -> &C {
        &self.comm
    }

    pub fn extent(&self) -> usize {
        self.extent
    }

    pub fn ghost_region(&self, face: BoundaryId) -> Result<&GhostRegion<D>, StencilError> {
        self.ghosts
            .get(face.dimension())
            .map(|pair| &pair[face.side_index()])
            .ok_or(StencilError::DimensionOutOfRange {
                dim: face.dimension(),
                dims: D,
            })
    }

    /// Rank that owns the data beyond `face`.
    pub fn neighbor(&self, face: BoundaryId) -> Result<usize, StencilError> {
        self.neighbors
            .get(face.dimension())
            .map(|pair| pair[face.side_index()])
            .ok_or(StencilError::DimensionOutOfRange {
                dim: face.dimension(),
                dims: D,
            })
    }

    /// Number of receives posted this round that have not been reported yet.
    pub fn outstanding_receives(&self) -> usize {
        self.pending_receives.len()
    }

    /// Poll the outstanding receives round-robin until one completes.
    fn wait_any(&mut self) -> (BoundaryId, Option<Vec<u8>>) {
        loop {
            let pending = std::mem::take(&mut self.pending_receives);
            let mut done = None;
            for (face, handle) in pending {
                if done.is_some() {
                    self.pending_receives.push((face, handle));
                    continue;
                }
                match handle.test() {
                    Ok(payload) => done = Some((face, payload)),
                    Err(handle) => self.pending_receives.push((face, handle)),
                }
            }
            if let Some(arrived) = done {
                return arrived;
            }
            std::thread::yield_now();
        }
    }
}

impl<const D: usize, C: Communicator> Iterable<D> for ComposedBlock<D, C> {
    fn elements_per_dim(&self) -> usize {
        self.space.size(0)
    }

    fn inner_iterator(
        &self,
        ctx: ExecutionContext,
    ) -> Result<Box<dyn FieldIterator<D>>, StencilError> {
        let values = self.values.clone().ok_or(StencilError::MissingValues)?;
        Ok(Box::new(ValueFieldIterator::over(self.space.clone(), values, ctx)?))
    }

    fn boundary_iterator(
        &self,
        ctx: ExecutionContext,
    ) -> Result<Box<dyn BoundaryIterator<D>>, StencilError> {
        let values = self.values.clone().ok_or(StencilError::MissingValues)?;
        let main = ValueFieldBoundaryIterator::over(self.space.clone(), values, ctx)?;
        let sides = self
            .ghosts
            .iter()
            .map(|[lower, upper]| {
                Ok([
                    Box::new(lower.boundary_iterator(ctx)?) as Box<dyn BoundaryIterator<D>>,
                    Box::new(upper.boundary_iterator(ctx)?) as Box<dyn BoundaryIterator<D>>,
                ])
            })
            .collect::<Result<Vec<_>, StencilError>>()?
            .try_into()
            .map_err(|_| StencilError::InvalidConfig("side table has the wrong shape".into()))?;
        Ok(Box::new(ComposedFieldIterator::new(main, sides)?))
    }

    fn values(&self) -> Option<&FieldData> {
        self.values.as_ref()
    }

    /// Persistent receives stay armed; the next round ships the new values.
    fn set_values(&mut self, values: FieldData) -> Result<(), StencilError> {
        if values.len() != self.space.total() {
            return Err(StencilError::SizeMismatch {
                expected: self.space.total(),
                found: values.len(),
            });
        }
        self.values = Some(values);
        Ok(())
    }
}

impl<const D: usize, C: Communicator> CommunicativeBlock<D> for ComposedBlock<D, C> {
    fn start_communication(&mut self) -> Result<(), StencilError> {
        match self.phase {
            CommPhase::ReceivesArmed | CommPhase::Idle => {}
            phase => return Err(phase.violation("start communication")),
        }
        let Some(values) = self.values.as_ref() else {
            log::debug!(
                "rank {}: no values attached, skipping halo exchange",
                self.topology.rank()
            );
            return Ok(());
        };
        for face in BoundaryId::all(D) {
            let ghost = &self.ghosts[face.dimension()][face.side_index()];
            let handle = ghost.start_receive(&self.comm)?;
            self.pending_receives.push((face, handle));
        }
        for slab in &self.slabs {
            let face = slab.face();
            let peer = self.neighbors[face.dimension()][face.side_index()];
            let payload = slab.pack(values);
            log::trace!(
                "rank {}: send {} slab of {} values to rank {peer} (tag {})",
                self.topology.rank(),
                face,
                payload.len(),
                face.send_tag()
            );
            let handle = self.comm.isend(peer, face.send_tag(), wire::cast_slice(&payload));
            self.pending_sends.push((face, handle));
        }
        self.phase = CommPhase::InFlight;
        Ok(())
    }

    fn receive_done_at(&mut self) -> Result<BoundaryId, StencilError> {
        if self.pending_receives.is_empty() {
            return Err(StencilError::NoOutstandingReceive);
        }
        self.comm_timer.start();
        let (face, payload) = self.wait_any();
        self.comm_timer.stop();
        let ghost = &self.ghosts[face.dimension()][face.side_index()];
        let bytes = payload.ok_or_else(|| StencilError::Transport {
            peer: self.neighbors[face.dimension()][face.side_index()],
            reason: format!("receive for {face} completed without a payload"),
        })?;
        ghost.complete_receive(&bytes)?;
        log::trace!("rank {}: ghost data for {face} arrived", self.topology.rank());
        Ok(face)
    }

    fn finish_communication(&mut self) -> Result<(), StencilError> {
        match self.phase {
            CommPhase::Created => return Err(self.phase.violation("finish communication")),
            CommPhase::ReceivesArmed | CommPhase::Idle => return Ok(()),
            CommPhase::InFlight => {}
        }
        self.comm_timer.start();
        for (_, handle) in self.pending_sends.drain(..) {
            handle.wait();
        }
        self.comm_timer.stop();
        if self.pending_receives.is_empty() {
            self.phase = CommPhase::Idle;
        } else {
            log::warn!(
                "rank {}: sends drained with {} receives still unreported",
                self.topology.rank(),
                self.pending_receives.len()
            );
        }
        Ok(())
    }

    fn communication_time(&self) -> f64 {
        self.comm_timer.total_elapsed()
    }

    fn proc_grid_coord(&self, dim: usize) -> Result<usize, StencilError> {
        self.topology
            .coords()
            .get(dim)
            .copied()
            .ok_or(StencilError::DimensionOutOfRange { dim, dims: D })
    }

    fn proc_grid_size(&self, dim: usize) -> Result<usize, StencilError> {
        self.topology
            .dims()
            .get(dim)
            .copied()
            .ok_or(StencilError::DimensionOutOfRange { dim, dims: D })
    }

    fn phase(&self) -> CommPhase {
        self.phase
    }
}

/// A block dropped mid-round cancels its outstanding receives and drains its
/// sends, so no transport request outlives the buffers it points into.
impl<const D: usize, C: Communicator> Drop for ComposedBlock<D, C> {
    fn drop(&mut self) {
        if self.pending_receives.is_empty() && self.pending_sends.is_empty() {
            return;
        }
        log::warn!(
            "rank {}: block dropped with {} receives and {} sends in flight",
            self.topology.rank(),
            self.pending_receives.len(),
            self.pending_sends.len()
        );
        for (_, handle) in self.pending_receives.drain(..) {
            handle.cancel();
        }
        for (_, handle) in self.pending_sends.drain(..) {
            handle.wait();
        }
    }
}

impl<const D: usize, C: Communicator> DebugInvariants for ComposedBlock<D, C> {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "ComposedBlock");
    }

    fn validate_invariants(&self) -> Result<(), StencilError> {
        self.space.validate_invariants()?;
        for face in BoundaryId::all(D) {
            let ghost = self.ghost_region(face)?;
            ghost.validate_invariants()?;
            if ghost.boundary() != face {
                return Err(StencilError::InvalidConfig(format!(
                    "ghost region for {} stored under {face}",
                    ghost.boundary()
                )));
            }
        }
        if self.phase != CommPhase::Created && self.slabs.len() != 2 * D {
            return Err(StencilError::SizeMismatch {
                expected: 2 * D,
                found: self.slabs.len(),
            });
        }
        if self.phase != CommPhase::InFlight
            && !(self.pending_receives.is_empty() && self.pending_sends.is_empty())
        {
            return Err(self.phase.violation("hold pending requests"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::RayonComm;

    fn solo_block(n: usize, extent: usize) -> ComposedBlock<2, RayonComm> {
        ComposedBlock::new(RayonComm::solo(), &BlockConfig::new(n, extent)).unwrap()
    }

    #[test]
    fn construction_arms_receives() {
        let block = solo_block(3, 1);
        assert_eq!(block.phase(), CommPhase::ReceivesArmed);
        for face in BoundaryId::all(2) {
            assert_eq!(block.neighbor(face).unwrap(), 0);
            assert_eq!(block.ghost_region(face).unwrap().receive().unwrap().source, 0);
        }
        block.validate_invariants().unwrap();
    }

    #[test]
    fn start_without_values_is_a_no_op() {
        let mut block = solo_block(3, 1);
        block.start_communication().unwrap();
        assert_eq!(block.phase(), CommPhase::ReceivesArmed);
        assert!(matches!(block.receive_done_at(), Err(StencilError::NoOutstandingReceive)));
    }

    #[test]
    fn out_of_order_calls_are_rejected() {
        let mut block = solo_block(3, 1);
        block.set_values(FieldData::zeros(9)).unwrap();
        assert!(matches!(block.receive_done_at(), Err(StencilError::NoOutstandingReceive)));
        block.start_communication().unwrap();
        assert!(matches!(
            block.start_communication(),
            Err(StencilError::CommunicationOrder { phase: "in flight", .. })
        ));
        // Drained sends with unreported receives keep the round open.
        block.finish_communication().unwrap();
        assert_eq!(block.phase(), CommPhase::InFlight);
        assert!(block.start_communication().is_err());
        for _ in 0..4 {
            block.receive_done_at().unwrap();
        }
        assert!(matches!(block.receive_done_at(), Err(StencilError::NoOutstandingReceive)));
        block.finish_communication().unwrap();
        block.finish_communication().unwrap();
        assert_eq!(block.phase(), CommPhase::Idle);
        block.validate_invariants().unwrap();
    }

    #[test]
    fn every_face_is_reported_once_per_round() {
        let mut block = solo_block(4, 2);
        block.set_values(FieldData::from_fn(16, |i| i as f64)).unwrap();
        for _ in 0..2 {
            block.start_communication().unwrap();
            let mut faces: Vec<_> = (0..4).map(|_| block.receive_done_at().unwrap()).collect();
            faces.sort_by_key(|f| f.ordinal());
            assert_eq!(faces, BoundaryId::all(2).collect::<Vec<_>>());
            block.finish_communication().unwrap();
        }
        assert!(block.communication_time() >= 0.0);
    }

    #[test]
    fn grid_queries_check_dimension() {
        let block = solo_block(3, 1);
        assert_eq!(block.proc_grid_size(1).unwrap(), 1);
        assert_eq!(block.proc_grid_coord(0).unwrap(), 0);
        assert!(block.proc_grid_coord(2).is_err());
    }

    #[test]
    fn rejects_mismatched_values_and_config() {
        let mut block = solo_block(3, 1);
        assert!(block.set_values(FieldData::zeros(8)).is_err());
        assert!(
            ComposedBlock::<2, _>::new(RayonComm::solo(), &BlockConfig::new(2, 3)).is_err()
        );
    }
}
