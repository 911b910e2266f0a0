//! Structural self-checks.
//!
//! Index tables check that strides are the running product of the extents and
//! that the total matches. Ghost regions check that their buffer fills their
//! index space and that the registered receive listens under the face's tag.
//! Blocks check that every ghost sits under its own face, that slabs exist
//! once receives are armed, and that requests are pending only while a round
//! is in flight.
//!
//! `validate_invariants` is always available. `debug_assert_invariants`
//! panics on a violation in debug builds and under the `check-invariants`
//! feature, and compiles to nothing otherwise.

use crate::stencil_error::StencilError;

pub trait DebugInvariants {
    /// Panic on the first violation when invariant checking is compiled in.
    fn debug_assert_invariants(&self);
    /// First violation found, if any.
    fn validate_invariants(&self) -> Result<(), StencilError>;
}

/// `debug_invariants!(check, "Context")` panics with
/// `[invariants] Context: <error>` when `check` is an `Err` and invariant
/// checking is compiled in.
#[macro_export]
macro_rules! debug_invariants {
    ($expr:expr, $($ctx:tt)*) => {
        #[cfg(any(debug_assertions, feature = "check-invariants"))]
        if let Err(e) = $expr {
            panic!(concat!("[invariants] ", $($ctx)*, ": {}"), e);
        }
    };
}
