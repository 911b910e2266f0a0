//! Thin façade over intra-process (Rayon) or inter-process (MPI) message passing.
//!
//! Messages are contiguous byte slices. Every call is non-blocking and hands
//! back a handle; the halo exchange polls receive handles with
//! [`Wait::test`] to learn which face arrived first and drains send handles
//! with [`Wait::wait`].

use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;

/// Non-blocking point-to-point messaging between the ranks of one world.
pub trait Communicator {
    /// Handle returned by `isend`.
    type SendHandle: Wait;
    /// Handle returned by `irecv`.
    type RecvHandle: Wait;

    fn rank(&self) -> usize;
    fn size(&self) -> usize;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle;
    /// Post a receive of at most `len` bytes from `peer` under `tag`.
    fn irecv(&self, peer: usize, tag: u16, len: usize) -> Self::RecvHandle;
}

/// Anything that can be waited on.
pub trait Wait: Sized {
    /// Wait for completion and return the received data (if any).
    fn wait(self) -> Option<Vec<u8>>;

    /// Complete without blocking if possible; hand the handle back otherwise.
    fn test(self) -> Result<Option<Vec<u8>>, Self>;

    /// Give up on a request that will not be waited for and release what it
    /// holds. Handles that own no transport resources just drop.
    fn cancel(self) {}
}

impl Wait for () {
    fn wait(self) -> Option<Vec<u8>> {
        None
    }

    fn test(self) -> Result<Option<Vec<u8>>, Self> {
        Ok(None)
    }
}

// --- RayonComm: intra-process / multi-thread ---
type Key = (usize, usize, u16); // (src, dst, tag)
type Mailbox = DashMap<Key, VecDeque<Bytes>>;

/// One rank of an in-process world. Ranks of the same world share a mailbox
/// of FIFO queues, so messages between one pair under one tag arrive in the
/// order they were sent.
#[derive(Clone, Debug)]
pub struct RayonComm {
    rank: usize,
    size: usize,
    mailbox: Arc<Mailbox>,
}

impl RayonComm {
    /// All ranks of a fresh world of `size` ranks.
    pub fn world(size: usize) -> Vec<Self> {
        let mailbox = Arc::new(Mailbox::new());
        (0..size)
            .map(|rank| Self {
                rank,
                size,
                mailbox: Arc::clone(&mailbox),
            })
            .collect()
    }

    /// A world with a single rank that is its own neighbour everywhere.
    pub fn solo() -> Self {
        Self {
            rank: 0,
            size: 1,
            mailbox: Arc::new(Mailbox::new()),
        }
    }
}

pub struct LocalHandle {
    mailbox: Arc<Mailbox>,
    key: Key,
    len: usize,
}

impl LocalHandle {
    fn try_take(&self) -> Option<Vec<u8>> {
        let mut queue = self.mailbox.get_mut(&self.key)?;
        let bytes = queue.pop_front()?;
        let n = self.len.min(bytes.len());
        Some(bytes[..n].to_vec())
    }
}

impl Wait for LocalHandle {
    fn wait(self) -> Option<Vec<u8>> {
        loop {
            if let Some(data) = self.try_take() {
                return Some(data);
            }
            std::thread::yield_now();
        }
    }

    fn test(self) -> Result<Option<Vec<u8>>, Self> {
        match self.try_take() {
            Some(data) => Ok(Some(data)),
            None => Err(self),
        }
    }
}

impl Communicator for RayonComm {
    type SendHandle = ();
    type RecvHandle = LocalHandle;

    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle {
        let key = (self.rank, peer, tag);
        self.mailbox
            .entry(key)
            .or_default()
            .push_back(Bytes::copy_from_slice(buf));
    }

    fn irecv(&self, peer: usize, tag: u16, len: usize) -> Self::RecvHandle {
        LocalHandle {
            mailbox: Arc::clone(&self.mailbox),
            key: (peer, self.rank, tag),
            len,
        }
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::{Communicator, Wait};
    use crate::stencil_error::StencilError;
    use mpi::environment::Universe;
    use mpi::request::{Request, StaticScope};
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::Communicator as _;
    use mpi::traits::*;

    /// `MPI_COMM_WORLD` of an initialized MPI environment. Finalizes MPI on drop.
    pub struct MpiComm {
        world: SimpleCommunicator,
        rank: usize,
        size: usize,
        _universe: Universe,
    }

    impl MpiComm {
        pub fn new() -> Result<Self, StencilError> {
            let universe = mpi::initialize().ok_or_else(|| StencilError::Transport {
                peer: 0,
                reason: "MPI was already initialized".into(),
            })?;
            let world = universe.world();
            let rank = world.rank() as usize;
            let size = world.size() as usize;
            Ok(Self {
                world,
                rank,
                size,
                _universe: universe,
            })
        }
    }

    /// In-flight request over a heap buffer that outlives the call that
    /// posted it. The buffer is reclaimed once the request completes.
    pub struct MpiHandle {
        request: Request<'static, [u8], StaticScope>,
        buf: *mut [u8],
    }

    impl MpiHandle {
        fn reclaim(buf: *mut [u8]) -> Vec<u8> {
            // SAFETY: `buf` came from `Box::into_raw` and the request that
            // borrowed it has completed.
            unsafe { Box::from_raw(buf) }.into_vec()
        }
    }

    impl Wait for MpiHandle {
        fn wait(self) -> Option<Vec<u8>> {
            self.request.wait();
            Some(Self::reclaim(self.buf))
        }

        fn test(self) -> Result<Option<Vec<u8>>, Self> {
            let buf = self.buf;
            match self.request.test() {
                Ok(_) => Ok(Some(Self::reclaim(buf))),
                Err(request) => Err(Self { request, buf }),
            }
        }

        /// `MPI_Cancel`, then complete the request so its buffer can be freed.
        fn cancel(self) {
            self.request.cancel();
            self.request.wait();
            drop(Self::reclaim(self.buf));
        }
    }

    impl Communicator for MpiComm {
        type SendHandle = MpiHandle;
        type RecvHandle = MpiHandle;

        fn rank(&self) -> usize {
            self.rank
        }

        fn size(&self) -> usize {
            self.size
        }

        fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> MpiHandle {
            let buf: *mut [u8] = Box::into_raw(buf.to_vec().into_boxed_slice());
            // SAFETY: the allocation is leaked until `reclaim`.
            let data: &'static [u8] = unsafe { &*buf };
            let request = self
                .world
                .process_at_rank(peer as i32)
                .immediate_send_with_tag(StaticScope, data, i32::from(tag));
            MpiHandle { request, buf }
        }

        fn irecv(&self, peer: usize, tag: u16, len: usize) -> MpiHandle {
            let buf: *mut [u8] = Box::into_raw(vec![0u8; len].into_boxed_slice());
            // SAFETY: as above; nothing else touches the buffer while the
            // request is in flight.
            let data: &'static mut [u8] = unsafe { &mut *buf };
            let request = self
                .world
                .process_at_rank(peer as i32)
                .immediate_receive_into_with_tag(StaticScope, data, i32::from(tag));
            MpiHandle { request, buf }
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::{MpiComm, MpiHandle};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rayon_roundtrip_two_ranks() {
        let mut world = RayonComm::world(2);
        let comm1 = world.pop().unwrap();
        let comm0 = world.pop().unwrap();
        assert_eq!((comm0.rank(), comm1.rank()), (0, 1));
        assert_eq!(comm1.size(), 2);

        let recv = comm1.irecv(0, 7, 4);
        let recv = recv.test().expect_err("nothing sent yet");
        comm0.isend(1, 7, &[1, 2, 3, 4]).wait();
        assert_eq!(recv.wait(), Some(vec![1, 2, 3, 4]));
    }

    #[test]
    fn same_pair_and_tag_is_fifo() {
        let comm = RayonComm::solo();
        comm.isend(0, 3, &[1]);
        comm.isend(0, 3, &[2]);
        assert_eq!(comm.irecv(0, 3, 1).test().ok(), Some(Some(vec![1])));
        assert_eq!(comm.irecv(0, 3, 1).test().ok(), Some(Some(vec![2])));
        assert!(comm.irecv(0, 3, 1).test().is_err());
    }

    #[test]
    fn tags_and_worlds_are_isolated() {
        let a = RayonComm::solo();
        let b = RayonComm::solo();
        a.isend(0, 1, &[9]);
        assert!(b.irecv(0, 1, 1).test().is_err());
        assert!(a.irecv(0, 2, 1).test().is_err());
        assert_eq!(a.irecv(0, 1, 1).wait(), Some(vec![9]));
    }

    #[test]
    fn receives_complete_across_threads() {
        let world = RayonComm::world(2);
        std::thread::scope(|s| {
            for comm in &world {
                s.spawn(move || {
                    let peer = 1 - comm.rank();
                    let recv = comm.irecv(peer, 0, 8);
                    comm.isend(peer, 0, &(comm.rank() as u64).to_le_bytes());
                    let got = recv.wait().unwrap();
                    assert_eq!(u64::from_le_bytes(got.try_into().unwrap()), peer as u64);
                });
            }
        });
    }
}
