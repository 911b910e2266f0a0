//! Flat `f64` buffers shared between blocks, iterators and worker threads.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use static_assertions::assert_eq_size;

assert_eq_size!(f64, AtomicU64);

/// Reference-counted buffer of `f64` values.
///
/// Clones share storage. Values are stored as their bit patterns in relaxed
/// atomics, so worker threads may write disjoint indices through their own
/// clones while the owner keeps a handle for reading results.
#[derive(Clone)]
pub struct FieldData(Arc<[AtomicU64]>);

impl FieldData {
    pub fn zeros(len: usize) -> Self {
        Self((0..len).map(|_| AtomicU64::new(0f64.to_bits())).collect())
    }

    pub fn from_slice(values: &[f64]) -> Self {
        Self(values.iter().map(|v| AtomicU64::new(v.to_bits())).collect())
    }

    /// Buffer of `len` values produced by `f(index)`.
    pub fn from_fn(len: usize, f: impl Fn(usize) -> f64) -> Self {
        Self((0..len).map(|i| AtomicU64::new(f(i).to_bits())).collect())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// # Panics
    /// When `index >= len()`.
    #[inline]
    pub fn get(&self, index: usize) -> f64 {
        f64::from_bits(self.0[index].load(Ordering::Relaxed))
    }

    /// # Panics
    /// When `index >= len()`.
    #[inline]
    pub fn set(&self, index: usize, value: f64) {
        self.0[index].store(value.to_bits(), Ordering::Relaxed);
    }

    pub fn fill(&self, value: f64) {
        let bits = value.to_bits();
        for cell in self.0.iter() {
            cell.store(bits, Ordering::Relaxed);
        }
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.0
            .iter()
            .map(|c| f64::from_bits(c.load(Ordering::Relaxed)))
            .collect()
    }

    /// True when both handles share the same storage.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<Vec<f64>> for FieldData {
    fn from(values: Vec<f64>) -> Self {
        Self::from_slice(&values)
    }
}

impl fmt::Debug for FieldData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.to_vec()).finish()
    }
}

/// Maps linear indices to stored values. No checks beyond slice indexing.
pub trait ValueType: Send {
    fn value(&self, index: usize) -> f64;
    fn set_value(&mut self, index: usize, value: f64);
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// [`ValueType`] over a [`FieldData`] handle.
#[derive(Clone, Debug)]
pub struct ValueArray {
    data: FieldData,
}

impl ValueArray {
    pub fn new(data: FieldData) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &FieldData {
        &self.data
    }
}

impl ValueType for ValueArray {
    #[inline]
    fn value(&self, index: usize) -> f64 {
        self.data.get(index)
    }

    #[inline]
    fn set_value(&mut self, index: usize, value: f64) {
        self.data.set(index, value);
    }

    #[inline]
    fn len(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_through_one_handle_are_seen_by_clones() {
        let data = FieldData::zeros(4);
        let mut values = ValueArray::new(data.clone());
        values.set_value(2, 1.5);
        assert_eq!(data.get(2), 1.5);
        assert_eq!(data.to_vec(), vec![0.0, 0.0, 1.5, 0.0]);
        assert!(values.data().ptr_eq(&data));
    }

    #[test]
    fn disjoint_writes_from_worker_threads() {
        let data = FieldData::zeros(1000);
        std::thread::scope(|s| {
            for t in 0..4 {
                let data = data.clone();
                s.spawn(move || {
                    for i in (t..1000).step_by(4) {
                        data.set(i, i as f64);
                    }
                });
            }
        });
        assert!((0..1000).all(|i| data.get(i) == i as f64));
    }

    #[test]
    fn special_values_survive_bit_casting() {
        let data = FieldData::from_slice(&[-0.0, f64::INFINITY, f64::MIN_POSITIVE]);
        assert!(data.get(0).is_sign_negative());
        assert_eq!(data.get(1), f64::INFINITY);
        assert_eq!(data.get(2), f64::MIN_POSITIVE);
    }

    #[test]
    #[should_panic]
    fn reading_past_the_end_panics() {
        let values = ValueArray::new(FieldData::zeros(2));
        let _ = values.value(2);
    }
}
