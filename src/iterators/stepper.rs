//! Stepping strategies: which linear indices one iteration instance visits.
//!
//! Every strategy owns a contiguous share of its index range, derived from the
//! [`ExecutionContext`] it was built with. Shares are computed the same way
//! everywhere: `len / n` items per worker, the first `len % n` workers taking
//! one extra. Workers never share an index.

use crate::iterators::index_space::IndexSpace;
use crate::stencil_error::StencilError;
use crate::utils::boundary::BoundaryId;

/// Which worker of how many is driving an iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ExecutionContext {
    thread_id: usize,
    num_threads: usize,
}

impl ExecutionContext {
    /// One worker owning everything.
    pub const SERIAL: Self = Self {
        thread_id: 0,
        num_threads: 1,
    };

    pub fn new(thread_id: usize, num_threads: usize) -> Result<Self, StencilError> {
        if num_threads == 0 || thread_id >= num_threads {
            return Err(StencilError::InvalidConfig(format!(
                "thread {thread_id} of {num_threads} is not a valid execution context"
            )));
        }
        Ok(Self {
            thread_id,
            num_threads,
        })
    }

    #[inline]
    pub fn thread_id(&self) -> usize {
        self.thread_id
    }

    #[inline]
    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// `(first, count)` of this worker's share of `len` items.
    pub fn partition(&self, len: usize) -> (usize, usize) {
        let chunk = len / self.num_threads;
        let remainder = len % self.num_threads;
        let count = chunk + usize::from(self.thread_id < remainder);
        let first = chunk * self.thread_id + self.thread_id.min(remainder);
        (first, count)
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::SERIAL
    }
}

/// Inclusive `[min, max]` of an empty share. Every index fails `min <= i <= max`.
const EMPTY_LIMITS: (usize, usize) = (1, 0);

/// Cursor over a set of linear indices of one field.
pub trait SteppingStrategy<const D: usize>: Send {
    fn index_space(&self) -> &IndexSpace<D>;

    /// Linear index of the cursor.
    fn index(&self) -> usize;

    /// Inclusive bounds of this worker's share; `min > max` when it is empty.
    fn limits(&self) -> (usize, usize);

    /// Move to the first index of this worker's share.
    fn first(&mut self);

    /// Advance by one visited index.
    ///
    /// # Errors
    /// `NotInField` when the cursor already left its share.
    fn next(&mut self) -> Result<(), StencilError>;

    fn is_in_field(&self) -> bool {
        let (min, max) = self.limits();
        let i = self.index();
        min <= i && i <= max
    }

    /// Coordinate of the cursor along `dim`.
    ///
    /// # Errors
    /// `DimensionOutOfRange` for `dim >= D`.
    fn current_index(&self, dim: usize) -> Result<usize, StencilError> {
        self.index_space().coordinate(self.index(), dim)
    }

    fn linear_neighbor_index(&self, dim: usize, offset: isize) -> Result<usize, StencilError> {
        self.index_space().linear_neighbor(self.index(), dim, offset)
    }

    fn neighbor_in_field(&self, dim: usize, offset: isize) -> Result<bool, StencilError> {
        self.index_space().neighbor_in_field(self.index(), dim, offset)
    }

    /// Error describing the cursor when it is outside its share.
    fn not_in_field(&self) -> StencilError {
        let (min, max) = self.limits();
        StencilError::NotInField {
            index: self.index(),
            min,
            max,
        }
    }
}

/// A stepping strategy that can be pointed at one face of its field.
pub trait BoundaryStepping<const D: usize>: SteppingStrategy<D> {
    /// Walk `boundary` from now on, re-deriving this worker's share from
    /// scratch, and move to its first index.
    fn set_boundary_to_iterate(&mut self, boundary: BoundaryId) -> Result<(), StencilError>;

    fn boundary(&self) -> BoundaryId;
}

fn limits_of(first: usize, count: usize, map: impl Fn(usize) -> usize) -> (usize, usize) {
    if count == 0 {
        EMPTY_LIMITS
    } else {
        (map(first), map(first + count - 1))
    }
}

/// Visits a contiguous slice of `0..total` in ascending order.
#[derive(Clone, Debug)]
pub struct WholeFieldStepper<const D: usize> {
    space: IndexSpace<D>,
    min: usize,
    max: usize,
    index: usize,
}

impl<const D: usize> WholeFieldStepper<D> {
    pub fn new(space: IndexSpace<D>, ctx: ExecutionContext) -> Self {
        let (first, count) = ctx.partition(space.total());
        let (min, max) = limits_of(first, count, |s| s);
        Self {
            space,
            min,
            max,
            index: min,
        }
    }
}

impl<const D: usize> SteppingStrategy<D> for WholeFieldStepper<D> {
    fn index_space(&self) -> &IndexSpace<D> {
        &self.space
    }

    #[inline]
    fn index(&self) -> usize {
        self.index
    }

    fn limits(&self) -> (usize, usize) {
        (self.min, self.max)
    }

    fn first(&mut self) {
        self.index = self.min;
    }

    #[inline]
    fn next(&mut self) -> Result<(), StencilError> {
        if !self.is_in_field() {
            return Err(self.not_in_field());
        }
        self.index += 1;
        Ok(())
    }
}

/// Visits the indices of one face: coordinate 0 (lower) or `size - 1` (upper)
/// along the face's dimension.
///
/// Within a face, indices are visited in ascending order. Runs of `stride[d]`
/// consecutive indices are separated by a jump over the rest of dimension `d`.
#[derive(Clone, Debug)]
pub struct BoundaryStepper<const D: usize> {
    space: IndexSpace<D>,
    ctx: ExecutionContext,
    boundary: BoundaryId,
    min: usize,
    max: usize,
    index: usize,
}

impl<const D: usize> BoundaryStepper<D> {
    /// A stepper over the default face `(0, lower)`.
    pub fn new(space: IndexSpace<D>, ctx: ExecutionContext) -> Self {
        let mut stepper = Self {
            space,
            ctx,
            boundary: BoundaryId::default(),
            min: EMPTY_LIMITS.0,
            max: EMPTY_LIMITS.1,
            index: EMPTY_LIMITS.0,
        };
        stepper.derive_limits();
        stepper
    }

    pub fn context(&self) -> ExecutionContext {
        self.ctx
    }

    fn derive_limits(&mut self) {
        let d = self.boundary.dimension();
        let size = self.space.size(d);
        let stride = self.space.stride(d);
        let next_stride = self.space.stride(d + 1);
        let face_len = if size == 0 { 0 } else { self.space.total() / size };
        let (first, count) = self.ctx.partition(face_len);
        let base = if self.boundary.is_lower_side() {
            0
        } else {
            stride * size.saturating_sub(1)
        };
        (self.min, self.max) =
            limits_of(first, count, |s| base + s % stride + (s / stride) * next_stride);
        self.index = self.min;
    }
}

impl<const D: usize> SteppingStrategy<D> for BoundaryStepper<D> {
    fn index_space(&self) -> &IndexSpace<D> {
        &self.space
    }

    #[inline]
    fn index(&self) -> usize {
        self.index
    }

    fn limits(&self) -> (usize, usize) {
        (self.min, self.max)
    }

    fn first(&mut self) {
        self.index = self.min;
    }

    #[inline]
    fn next(&mut self) -> Result<(), StencilError> {
        if !self.is_in_field() {
            return Err(self.not_in_field());
        }
        let d = self.boundary.dimension();
        let stride = self.space.stride(d);
        if (self.index + 1) % stride != 0 {
            self.index += 1;
        } else {
            self.index += self.space.stride(d + 1) - (stride - 1);
        }
        Ok(())
    }
}

impl<const D: usize> BoundaryStepping<D> for BoundaryStepper<D> {
    fn set_boundary_to_iterate(&mut self, boundary: BoundaryId) -> Result<(), StencilError> {
        self.space.check_dim(boundary.dimension())?;
        self.boundary = boundary;
        self.derive_limits();
        Ok(())
    }

    fn boundary(&self) -> BoundaryId {
        self.boundary
    }
}
