//! Faces are handled in the order their ghost data arrives.

mod util;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use halo_stencil::algs::communicator::LocalHandle;
use halo_stencil::prelude::*;
use util::{geometry, max_deviation, round, sine_field};

/// Wraps a [`RayonComm`] so that receives under one tag report "not ready"
/// for a number of polls, and counts receives that were cancelled.
struct HoldBack {
    inner: RayonComm,
    held_tag: u16,
    polls: usize,
    cancelled: Arc<AtomicUsize>,
}

impl HoldBack {
    fn new(inner: RayonComm, held: BoundaryId, polls: usize) -> Self {
        Self {
            inner,
            held_tag: held.receive_tag(),
            polls,
            cancelled: Arc::new(AtomicUsize::new(0)),
        }
    }
}

struct HeldHandle {
    inner: LocalHandle,
    remaining: usize,
    cancelled: Arc<AtomicUsize>,
}

impl Wait for HeldHandle {
    fn wait(self) -> Option<Vec<u8>> {
        self.inner.wait()
    }

    fn test(self) -> Result<Option<Vec<u8>>, Self> {
        if self.remaining > 0 {
            return Err(Self {
                remaining: self.remaining - 1,
                ..self
            });
        }
        let Self { inner, cancelled, .. } = self;
        inner.test().map_err(|inner| Self {
            inner,
            remaining: 0,
            cancelled,
        })
    }

    fn cancel(self) {
        self.cancelled.fetch_add(1, Ordering::SeqCst);
    }
}

impl Communicator for HoldBack {
    type SendHandle = ();
    type RecvHandle = HeldHandle;

    fn rank(&self) -> usize {
        self.inner.rank()
    }

    fn size(&self) -> usize {
        self.inner.size()
    }

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle {
        self.inner.isend(peer, tag, buf)
    }

    fn irecv(&self, peer: usize, tag: u16, len: usize) -> Self::RecvHandle {
        HeldHandle {
            inner: self.inner.irecv(peer, tag, len),
            remaining: if tag == self.held_tag { self.polls } else { 0 },
            cancelled: Arc::clone(&self.cancelled),
        }
    }
}

fn held_block(held: BoundaryId, values: FieldData) -> ComposedBlock<2, HoldBack> {
    let comm = HoldBack::new(RayonComm::solo(), held, 50);
    ComposedBlock::with_values(comm, &BlockConfig::new(10, 4), values).unwrap()
}

#[test]
fn a_late_face_is_reported_last() {
    let late = BoundaryId::new(0, true);
    let mut block = held_block(late, FieldData::zeros(100));
    block.start_communication().unwrap();
    let order: Vec<BoundaryId> = (0..4).map(|_| block.receive_done_at().unwrap()).collect();
    block.finish_communication().unwrap();

    assert_eq!(order[3], late);
    let mut early = order[..3].to_vec();
    early.sort_by_key(|f| f.ordinal());
    assert_eq!(
        early,
        vec![BoundaryId::new(0, false), BoundaryId::new(1, true), BoundaryId::new(1, false)]
    );
    assert_eq!(block.phase(), CommPhase::Idle);
}

#[test]
fn late_faces_still_give_the_laplacian() {
    let n = 10;
    let config = BlockConfig::new(n, 4);
    let mut reference = ComposedBlock::<2, _>::new(RayonComm::solo(), &config).unwrap();
    let (h, origin) = geometry(&reference);
    let f = sine_field::<2>(n, h, origin);
    reference.set_values(f.clone()).unwrap();
    let expected = FieldData::zeros(f.len());
    let mut op = BlockOperator::new(ConstFd8Laplacian::new([h, h]).unwrap());
    round(&mut op, &mut reference, &PureBlock::with_values(n, expected.clone()).unwrap());

    for late in BoundaryId::all(2) {
        let mut input = held_block(late, f.clone());
        let got = FieldData::zeros(f.len());
        round(&mut op, &mut input, &PureBlock::with_values(n, got.clone()).unwrap());
        assert!(max_deviation(&got, &expected, 1.0) < 1e-9, "late face {late}");
        assert!(max_deviation(&got, &f, -4.0 * std::f64::consts::PI.powi(2)) < 0.002);
    }
}

#[test]
fn dropping_a_block_mid_round_cancels_its_receives() {
    let held = BoundaryId::new(1, false);
    let comm = HoldBack::new(RayonComm::solo(), held, 50);
    let cancelled = Arc::clone(&comm.cancelled);
    let mut block =
        ComposedBlock::<2, _>::with_values(comm, &BlockConfig::new(4, 1), FieldData::zeros(16))
            .unwrap();
    block.start_communication().unwrap();
    block.receive_done_at().unwrap();
    assert_eq!(block.outstanding_receives(), 3);
    drop(block);
    assert_eq!(cancelled.load(Ordering::SeqCst), 3);
}

#[test]
fn finished_rounds_leave_nothing_to_cancel() {
    let comm = HoldBack::new(RayonComm::solo(), BoundaryId::new(0, false), 5);
    let cancelled = Arc::clone(&comm.cancelled);
    let mut block =
        ComposedBlock::<2, _>::with_values(comm, &BlockConfig::new(4, 1), FieldData::zeros(16))
            .unwrap();
    block.start_communication().unwrap();
    for _ in 0..4 {
        block.receive_done_at().unwrap();
    }
    block.finish_communication().unwrap();
    drop(block);
    assert_eq!(cancelled.load(Ordering::SeqCst), 0);
}
