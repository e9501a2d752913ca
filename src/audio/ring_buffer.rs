//! Circular Context Buffer: a bounded ring of the most recently captured
//! samples at the capture rate, used to supply pre-roll when the
//! Segmenter detects speech onset. Exposes only a chronological
//! snapshot, never raw index arithmetic, so the Segmenter can't
//! accidentally depend on ring layout.

use std::collections::VecDeque;

use parking_lot::Mutex;

pub struct RingBuffer {
    inner: Mutex<VecDeque<f32>>,
    capacity: usize,
}

impl RingBuffer {
    /// `capacity` is `capture_rate * buffer_duration_s`, in samples.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Pushes new samples in order; oldest samples fall off once the
    /// ring reaches capacity. Single-writer (the Audio Source).
    pub fn push(&self, samples: &[f32]) {
        let mut buf = self.inner.lock();
        buf.extend(samples.iter().copied());
        let overflow = buf.len().saturating_sub(self.capacity);
        if overflow > 0 {
            buf.drain(0..overflow);
        }
    }

    /// Returns a contiguous copy of the current contents in
    /// chronological order (oldest first).
    pub fn snapshot(&self) -> Vec<f32> {
        let buf = self.inner.lock();
        buf.iter().copied().collect()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_is_chronological() {
        let rb = RingBuffer::new(5);
        rb.push(&[1.0, 2.0, 3.0]);
        rb.push(&[4.0, 5.0]);
        assert_eq!(rb.snapshot(), vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn oldest_samples_fall_off_at_capacity() {
        let rb = RingBuffer::new(3);
        rb.push(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(rb.snapshot(), vec![3.0, 4.0, 5.0]);
        assert_eq!(rb.len(), 3);
    }

    #[test]
    fn never_exceeds_capacity_across_many_pushes() {
        let rb = RingBuffer::new(10);
        for i in 0..100 {
            rb.push(&[i as f32]);
            assert!(rb.len() <= 10);
        }
        assert_eq!(rb.snapshot(), (90..100).map(|i| i as f32).collect::<Vec<_>>());
    }
}
