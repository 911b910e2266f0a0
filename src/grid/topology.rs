//! Periodic Cartesian process grid.
//!
//! Ranks are laid out row-major (last dimension fastest) and every rank has
//! exactly two neighbours per dimension, wrapping around at the grid edges.
//! With a single rank along a dimension, a rank is its own neighbour there.

use crate::stencil_error::StencilError;

/// Factor `size` ranks into `D` grid extents that are as close to each other
/// as possible, in non-increasing order.
///
/// # Errors
/// `InvalidConfig` when `size == 0` or `D == 0`.
pub fn balanced_dims<const D: usize>(size: usize) -> Result<[usize; D], StencilError> {
    if size == 0 || D == 0 {
        return Err(StencilError::InvalidConfig(format!(
            "cannot factor {size} ranks into {D} dimensions"
        )));
    }
    let mut factors = Vec::new();
    let mut rest = size;
    let mut p = 2;
    while p * p <= rest {
        while rest % p == 0 {
            factors.push(p);
            rest /= p;
        }
        p += 1;
    }
    if rest > 1 {
        factors.push(rest);
    }
    let mut dims = [1usize; D];
    for &f in factors.iter().rev() {
        if let Some(smallest) = dims.iter_mut().min() {
            *smallest *= f;
        }
    }
    dims.sort_unstable_by(|a, b| b.cmp(a));
    Ok(dims)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CartesianTopology<const D: usize> {
    dims: [usize; D],
    coords: [usize; D],
    rank: usize,
    size: usize,
}

impl<const D: usize> CartesianTopology<D> {
    /// Balanced grid of `size` ranks, seen from `rank`.
    pub fn new(rank: usize, size: usize) -> Result<Self, StencilError> {
        Self::with_dims(rank, balanced_dims::<D>(size)?)
    }

    /// Grid with explicit extents; the world size is their product.
    pub fn with_dims(rank: usize, dims: [usize; D]) -> Result<Self, StencilError> {
        if dims.iter().any(|&n| n == 0) {
            return Err(StencilError::InvalidConfig(format!(
                "process grid {dims:?} has an empty dimension"
            )));
        }
        let size = dims.iter().product();
        if rank >= size {
            return Err(StencilError::InvalidConfig(format!(
                "rank {rank} outside a process grid of {size} ranks"
            )));
        }
        let mut topo = Self {
            dims,
            coords: [0; D],
            rank,
            size,
        };
        topo.coords = topo.coordinates_of(rank);
        Ok(topo)
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn dims(&self) -> &[usize; D] {
        &self.dims
    }

    pub fn coords(&self) -> &[usize; D] {
        &self.coords
    }

    pub fn coordinates_of(&self, rank: usize) -> [usize; D] {
        let mut coords = [0; D];
        let mut rest = rank;
        for d in (0..D).rev() {
            coords[d] = rest % self.dims[d];
            rest /= self.dims[d];
        }
        coords
    }

    /// Rank at `coords`, each taken modulo its grid extent.
    pub fn rank_of(&self, coords: &[usize; D]) -> usize {
        coords
            .iter()
            .zip(self.dims.iter())
            .fold(0, |rank, (&c, &n)| rank * n + c % n)
    }

    fn displaced(&self, dim: usize, disp: isize) -> usize {
        let n = self.dims[dim] as isize;
        let mut coords = self.coords;
        coords[dim] = (coords[dim] as isize + disp).rem_euclid(n) as usize;
        self.rank_of(&coords)
    }

    /// `(source, destination)` of a shift by `disp` along `dim`: the rank
    /// `disp` steps down and the rank `disp` steps up.
    pub fn shift(&self, dim: usize, disp: isize) -> Result<(usize, usize), StencilError> {
        if dim >= D {
            return Err(StencilError::DimensionOutOfRange { dim, dims: D });
        }
        Ok((self.displaced(dim, -disp), self.displaced(dim, disp)))
    }

    /// The adjacent rank beyond the lower or upper face of `dim`.
    pub fn neighbor(&self, dim: usize, lower: bool) -> Result<usize, StencilError> {
        let (down, up) = self.shift(dim, 1)?;
        Ok(if lower { down } else { up })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_dims_are_non_increasing_and_balanced() {
        assert_eq!(balanced_dims::<2>(4).unwrap(), [2, 2]);
        assert_eq!(balanced_dims::<2>(12).unwrap(), [4, 3]);
        assert_eq!(balanced_dims::<2>(8).unwrap(), [4, 2]);
        assert_eq!(balanced_dims::<3>(8).unwrap(), [2, 2, 2]);
        assert_eq!(balanced_dims::<3>(7).unwrap(), [7, 1, 1]);
        assert_eq!(balanced_dims::<2>(1).unwrap(), [1, 1]);
        assert!(balanced_dims::<2>(0).is_err());
    }

    #[test]
    fn ranks_are_row_major() {
        let topo = CartesianTopology::with_dims(0, [2, 3]).unwrap();
        assert_eq!(topo.coordinates_of(1), [0, 1]);
        assert_eq!(topo.coordinates_of(3), [1, 0]);
        for r in 0..6 {
            assert_eq!(topo.rank_of(&topo.coordinates_of(r)), r);
        }
    }

    #[test]
    fn shifts_wrap_periodically() {
        let topo = CartesianTopology::with_dims(3, [2, 3]).unwrap();
        assert_eq!(topo.coords(), &[1, 0]);
        assert_eq!(topo.shift(1, 1).unwrap(), (5, 4));
        assert_eq!(topo.shift(0, 1).unwrap(), (0, 0));
        assert_eq!(topo.neighbor(1, true).unwrap(), 5);
        assert_eq!(topo.neighbor(1, false).unwrap(), 4);
        assert!(topo.shift(2, 1).is_err());
    }

    #[test]
    fn single_rank_neighbours_itself() {
        let topo = CartesianTopology::<3>::new(0, 1).unwrap();
        for d in 0..3 {
            assert_eq!(topo.shift(d, 1).unwrap(), (0, 0));
        }
    }

    #[test]
    fn rejects_rank_outside_grid() {
        assert!(CartesianTopology::<2>::new(4, 4).is_err());
        assert!(CartesianTopology::with_dims(0, [0, 2]).is_err());
    }
}
