//! Division by invariant integers using multiplication.
//!
//! Coordinate recovery (`index / stride mod size`) sits in the innermost loop
//! of every stencil pass. The divisors are fixed once a field is built, so we
//! precompute a multiplier, an add indicator and a shift per divisor
//! (Granlund–Montgomery; the construction follows Warren, *Hacker's Delight*,
//! 2nd ed., fig. 10-1) and replace the hardware division with a multiply and
//! two shifts.

/// Precomputed reciprocal of one 32-bit divisor.
///
/// For every `x < 2^32`:
/// `x / d == ((x * m) >> 32 + (add ? x : 0)) >> shift`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MagicNumber {
    m: u32,
    add: bool,
    shift: u32,
}

impl MagicNumber {
    /// Compute the magic number for `divisor`.
    ///
    /// A divisor of 0 has no reciprocal. Degenerate zero-sized fields still
    /// build their tables, so 0 maps to a saturating approximation instead of
    /// panicking; no index is ever divided by it.
    pub fn new(divisor: u32) -> Self {
        if divisor == 0 {
            return Self {
                m: u32::MAX,
                add: false,
                shift: 0,
            };
        }
        let d = divisor;
        let nc = u32::MAX - d.wrapping_neg() % d;
        let mut p: u32 = 31;
        let mut q1 = 0x8000_0000u32 / nc;
        let mut r1 = 0x8000_0000u32.wrapping_sub(q1.wrapping_mul(nc));
        let mut q2 = 0x7FFF_FFFFu32 / d;
        let mut r2 = 0x7FFF_FFFFu32.wrapping_sub(q2.wrapping_mul(d));
        let mut add = false;
        loop {
            p += 1;
            if r1 >= nc - r1 {
                q1 = q1.wrapping_mul(2).wrapping_add(1);
                r1 = r1.wrapping_mul(2).wrapping_sub(nc);
            } else {
                q1 = q1.wrapping_mul(2);
                r1 = r1.wrapping_mul(2);
            }
            if r2 + 1 >= d - r2 {
                if q2 >= 0x7FFF_FFFF {
                    add = true;
                }
                q2 = q2.wrapping_mul(2).wrapping_add(1);
                r2 = r2.wrapping_mul(2).wrapping_add(1).wrapping_sub(d);
            } else {
                if q2 >= 0x8000_0000 {
                    add = true;
                }
                q2 = q2.wrapping_mul(2);
                r2 = r2.wrapping_mul(2).wrapping_add(1);
            }
            let delta = d - 1 - r2;
            if !(p < 64 && (q1 < delta || (q1 == delta && r1 == 0))) {
                break;
            }
        }
        Self {
            m: q2.wrapping_add(1),
            add,
            shift: p - 32,
        }
    }

    /// `x / divisor` for any `x` representable in 32 bits.
    #[inline(always)]
    pub fn divide(&self, x: u64) -> u64 {
        debug_assert!(x <= u64::from(u32::MAX));
        let hi = (x * u64::from(self.m)) >> 32;
        let t = if self.add { hi + x } else { hi };
        t >> self.shift
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    fn check(x: u32, d: u32) {
        let magic = MagicNumber::new(d);
        assert_eq!(
            magic.divide(u64::from(x)),
            u64::from(x / d),
            "x={x} d={d} magic={magic:?}"
        );
    }

    #[test]
    fn matches_native_division_on_random_pairs() {
        let mut rng = SmallRng::seed_from_u64(0x5EED);
        for _ in 0..10_000 {
            let x: u32 = rng.gen_range(0..=u32::MAX);
            let d: u32 = rng.gen_range(1..=u32::MAX);
            check(x, d);
        }
    }

    #[test]
    fn matches_native_division_for_small_divisors() {
        let mut rng = SmallRng::seed_from_u64(7);
        for d in 1..=64u32 {
            for _ in 0..200 {
                let x: u32 = rng.gen_range(0..=u32::MAX);
                check(x, d);
            }
            check(0, d);
            check(u32::MAX, d);
        }
    }

    #[test]
    fn extreme_divisors() {
        for &x in &[0u32, 1, 2, 7, 0x7FFF_FFFF, 0x8000_0000, u32::MAX - 1, u32::MAX] {
            check(x, 1);
            check(x, 2);
            check(x, u32::MAX);
            check(x, u32::MAX - 1);
            check(x, 0x8000_0000);
        }
    }

    #[test]
    fn zero_divisor_saturates_instead_of_panicking() {
        let magic = MagicNumber::new(0);
        assert!(magic.divide(10) < 10);
    }
}
