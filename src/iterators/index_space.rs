//! Size/stride tables and linear-index ↔ coordinate mapping.
//!
//! A field with extents `s_0..s_{D-1}` is stored with dimension 0 fastest:
//! `stride[0] = 1`, `stride[d] = stride[d-1] * s[d-1]`, and the total size is
//! `stride[D]`. Every linear index `i` in `[0, total)` decomposes uniquely into
//! `c_d = (i / stride[d]) mod s[d]`.
//!
//! Coordinate recovery uses [`MagicNumber`] reciprocals, so sizes, strides and
//! the total must fit in 32 bits; larger fields are rejected by
//! [`IndexSpace::new`].

use crate::debug_invariants::DebugInvariants;
use crate::stencil_error::StencilError;
use crate::utils::magic::MagicNumber;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexSpace<const D: usize> {
    sizes: [usize; D],
    strides: [usize; D],
    total: usize,
    stride_magic: [MagicNumber; D],
    size_magic: [MagicNumber; D],
}

impl<const D: usize> IndexSpace<D> {
    /// Build the tables for a field with the given extents.
    ///
    /// # Errors
    /// `InvalidConfig` when `D == 0`, `IndexOverflow` when an extent, a stride
    /// or the total size does not fit in 32 bits.
    pub fn new(sizes: [usize; D]) -> Result<Self, StencilError> {
        if D == 0 {
            return Err(StencilError::InvalidConfig(
                "fields must have at least one dimension".into(),
            ));
        }
        let mut strides = [0usize; D];
        let mut stride_magic = [MagicNumber::new(1); D];
        let mut size_magic = [MagicNumber::new(1); D];
        let mut stride: u64 = 1;
        for d in 0..D {
            let size = sizes[d] as u64;
            if size > u64::from(u32::MAX) || stride > u64::from(u32::MAX) {
                return Err(StencilError::IndexOverflow(size.max(stride)));
            }
            strides[d] = stride as usize;
            stride_magic[d] = MagicNumber::new(stride as u32);
            size_magic[d] = MagicNumber::new(size as u32);
            stride = stride.saturating_mul(size);
        }
        if stride > u64::from(u32::MAX) {
            return Err(StencilError::IndexOverflow(stride));
        }
        let space = Self {
            sizes,
            strides,
            total: stride as usize,
            stride_magic,
            size_magic,
        };
        #[cfg(any(debug_assertions, feature = "check-invariants"))]
        space.debug_assert_invariants();
        Ok(space)
    }

    /// A D-dimensional cube with `n` elements along every dimension.
    pub fn cube(n: usize) -> Result<Self, StencilError> {
        Self::new([n; D])
    }

    #[inline]
    pub fn sizes(&self) -> &[usize; D] {
        &self.sizes
    }

    /// # Panics
    /// When `dim >= D`. Use [`check_dim`](Self::check_dim) first for
    /// caller-supplied dimensions.
    #[inline]
    pub fn size(&self, dim: usize) -> usize {
        self.sizes[dim]
    }

    /// Stride of `dim`; `stride(D)` is the total size.
    ///
    /// # Panics
    /// When `dim > D`.
    #[inline]
    pub fn stride(&self, dim: usize) -> usize {
        if dim == D { self.total } else { self.strides[dim] }
    }

    #[inline]
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn check_dim(&self, dim: usize) -> Result<(), StencilError> {
        if dim < D {
            Ok(())
        } else {
            Err(StencilError::DimensionOutOfRange { dim, dims: D })
        }
    }

    /// `⌊index / stride[dim]⌋ mod size[dim]` without a hardware division.
    ///
    /// # Errors
    /// `DimensionOutOfRange` for `dim >= D`.
    #[inline]
    pub fn coordinate(&self, index: usize, dim: usize) -> Result<usize, StencilError> {
        self.check_dim(dim)?;
        Ok(self.coordinate_unchecked(index, dim))
    }

    /// [`coordinate`](Self::coordinate) for a `dim` already known to be `< D`.
    #[inline]
    fn coordinate_unchecked(&self, index: usize, dim: usize) -> usize {
        debug_assert!(dim < D);
        let along = self.stride_magic[dim].divide(index as u64);
        let wraps = self.size_magic[dim].divide(along);
        (along - self.sizes[dim] as u64 * wraps) as usize
    }

    /// All coordinates of `index`.
    pub fn coordinates(&self, index: usize) -> [usize; D] {
        std::array::from_fn(|d| self.coordinate_unchecked(index, d))
    }

    /// Linear index of a coordinate tuple (no range check).
    pub fn linear_index(&self, coords: &[usize; D]) -> usize {
        coords
            .iter()
            .zip(self.strides.iter())
            .map(|(c, s)| c * s)
            .sum()
    }

    /// True iff moving `offset` steps along `dim` from `index` stays inside.
    ///
    /// # Errors
    /// `DimensionOutOfRange` for `dim >= D`.
    #[inline]
    pub fn neighbor_in_field(
        &self,
        index: usize,
        dim: usize,
        offset: isize,
    ) -> Result<bool, StencilError> {
        self.check_dim(dim)?;
        Ok(self.neighbor_in_field_unchecked(index, dim, offset))
    }

    #[inline]
    fn neighbor_in_field_unchecked(&self, index: usize, dim: usize, offset: isize) -> bool {
        let target = self.coordinate_unchecked(index, dim) as isize + offset;
        target >= 0 && (target as usize) < self.sizes[dim]
    }

    /// `index + offset * stride[dim]`.
    ///
    /// # Errors
    /// `DimensionOutOfRange` for `dim >= D`, `NeighborOutOfRange` when the
    /// target leaves the field along `dim`.
    #[inline]
    pub fn linear_neighbor(
        &self,
        index: usize,
        dim: usize,
        offset: isize,
    ) -> Result<usize, StencilError> {
        self.check_dim(dim)?;
        if !self.neighbor_in_field_unchecked(index, dim, offset) {
            return Err(StencilError::NeighborOutOfRange {
                dim,
                offset,
                coordinate: self.coordinate_unchecked(index, dim),
                size: self.sizes[dim],
            });
        }
        Ok((index as isize + offset * self.strides[dim] as isize) as usize)
    }
}

impl<const D: usize> DebugInvariants for IndexSpace<D> {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "IndexSpace");
    }

    fn validate_invariants(&self) -> Result<(), StencilError> {
        let mut expected = 1usize;
        for d in 0..D {
            if self.strides[d] != expected {
                return Err(StencilError::InvalidConfig(format!(
                    "stride[{d}] = {} but the product of lower extents is {expected}",
                    self.strides[d]
                )));
            }
            expected *= self.sizes[d];
        }
        if expected != self.total {
            return Err(StencilError::SizeMismatch {
                expected,
                found: self.total,
            });
        }
        Ok(())
    }
}
