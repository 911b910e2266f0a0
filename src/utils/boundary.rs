//! Identifiers for the 2·D faces of a D-dimensional box.

use std::fmt;

/// One face of a box: the dimension whose coordinate is constant on it, and
/// whether that coordinate takes its minimum (lower side) or maximum.
///
/// Faces are enumerated in the order `(0,lower), (0,upper), (1,lower), ...`
/// by [`advance`](Self::advance) and [`BoundaryId::all`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct BoundaryId {
    dimension: usize,
    lower: bool,
}

impl Default for BoundaryId {
    fn default() -> Self {
        Self {
            dimension: 0,
            lower: true,
        }
    }
}

impl BoundaryId {
    pub fn new(dimension: usize, lower: bool) -> Self {
        Self { dimension, lower }
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn is_lower_side(&self) -> bool {
        self.lower
    }

    /// 0 for the lower side, 1 for the upper side.
    #[inline]
    pub fn side_index(&self) -> usize {
        usize::from(!self.lower)
    }

    /// Same dimension, other side.
    pub fn opposite(&self) -> Self {
        Self {
            dimension: self.dimension,
            lower: !self.lower,
        }
    }

    /// Step to the next face in enumeration order.
    pub fn advance(&mut self) {
        self.lower = !self.lower;
        if self.lower {
            self.dimension += 1;
        }
    }

    /// Point back at `(0, lower)`.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn set_dimension(&mut self, dimension: usize) {
        self.dimension = dimension;
    }

    pub fn set_is_lower_side(&mut self, lower: bool) {
        self.lower = lower;
    }

    /// Position of this face in enumeration order (`2·dimension + side`).
    #[inline]
    pub fn ordinal(&self) -> usize {
        2 * self.dimension + self.side_index()
    }

    /// Inverse of [`ordinal`](Self::ordinal).
    pub fn from_ordinal(ordinal: usize) -> Self {
        Self {
            dimension: ordinal / 2,
            lower: ordinal % 2 == 0,
        }
    }

    /// Message tag under which the ghost region beyond this face receives.
    ///
    /// A ghost region on the lower side is filled by the lower neighbour's
    /// upper slab and vice versa, so sender and receiver derive the same tag
    /// (`2·dimension + is_lower_side`) without negotiation.
    #[inline]
    pub fn receive_tag(&self) -> u16 {
        (2 * self.dimension + usize::from(self.lower)) as u16
    }

    /// Tag under which the slab adjacent to this face is sent to the neighbour
    /// beyond it. Equals the neighbour's [`receive_tag`](Self::receive_tag)
    /// for the opposite face.
    #[inline]
    pub fn send_tag(&self) -> u16 {
        self.opposite().receive_tag()
    }

    /// All faces of a `dims`-dimensional box in enumeration order.
    pub fn all(dims: usize) -> impl Iterator<Item = BoundaryId> {
        (0..2 * dims).map(BoundaryId::from_ordinal)
    }
}

impl fmt::Display for BoundaryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = if self.lower { "lower" } else { "upper" };
        write!(f, "({}, {side})", self.dimension)
    }
}
