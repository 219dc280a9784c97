// THEORY:
// The `HistoryBuffer` is the memory primitive every analyzer is built on. Each
// analyzer observes one signal over time (EAR samples, blink timestamps, head
// positions, fingertip centroids, analytics points) and only ever cares about
// the most recent N observations.
//
// Key architectural principles:
// 1.  **Structural Bound**: Capacity is fixed at construction and enforced on
//     every `push`. The buffer can never hold more than `capacity` items, so no
//     caller needs a separate trimming pass.
// 2.  **Strict FIFO**: When full, the oldest element is evicted before the new
//     one is inserted. Iteration always runs oldest -> newest.
// 3.  **Fail Fast**: A zero-capacity buffer is a programming error, not a
//     runtime condition, and is rejected at construction.

use serde::{Serialize, Serializer};
use std::collections::VecDeque;

/// A fixed-capacity FIFO window over the most recent observations of one signal.
#[derive(Debug, Clone)]
pub struct HistoryBuffer<T> {
    /// The retained observations, oldest at the front.
    items: VecDeque<T>,
    /// The maximum number of observations retained.
    capacity: usize,
}

impl<T> HistoryBuffer<T> {
    /// Creates an empty buffer.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "HistoryBuffer capacity must be greater than zero");
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends an observation, returning the evicted oldest one if the buffer was full.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() == self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.items.len() == self.capacity
    }

    /// Iterates oldest -> newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.items.iter()
    }

    /// Iterates over the last `n` observations, oldest -> newest.
    pub fn recent(&self, n: usize) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        let skip = self.items.len().saturating_sub(n);
        self.items.iter().skip(skip)
    }

    /// The newest observation.
    pub fn latest(&self) -> Option<&T> {
        self.items.back()
    }

    /// The oldest retained observation.
    pub fn oldest(&self) -> Option<&T> {
        self.items.front()
    }

    /// Contiguous oldest -> newest view of the contents.
    pub fn as_slice(&mut self) -> &[T] {
        self.items.make_contiguous()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<T: Clone> HistoryBuffer<T> {
    /// Copies the contents out, oldest -> newest.
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}

impl<T: Serialize> Serialize for HistoryBuffer<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.items.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_when_full() {
        let mut buffer = HistoryBuffer::new(3);
        assert_eq!(buffer.push(1), None);
        assert_eq!(buffer.push(2), None);
        assert_eq!(buffer.push(3), None);
        assert_eq!(buffer.push(4), Some(1));
        assert_eq!(buffer.to_vec(), vec![2, 3, 4]);
        assert_eq!(buffer.len(), 3);
        assert!(buffer.is_full());
    }

    #[test]
    fn recent_returns_tail_in_order() {
        let mut buffer = HistoryBuffer::new(10);
        for i in 0..8 {
            buffer.push(i);
        }
        let tail: Vec<_> = buffer.recent(3).copied().collect();
        assert_eq!(tail, vec![5, 6, 7]);
        let everything: Vec<_> = buffer.recent(100).copied().collect();
        assert_eq!(everything.len(), 8);
        assert_eq!(buffer.oldest(), Some(&0));
        assert_eq!(buffer.latest(), Some(&7));
    }

    #[test]
    fn as_slice_is_oldest_first_after_wraparound() {
        let mut buffer = HistoryBuffer::new(4);
        for i in 0..11 {
            buffer.push(i);
        }
        assert_eq!(buffer.as_slice(), &[7, 8, 9, 10]);
    }

    #[test]
    fn serializes_as_plain_sequence() {
        let mut buffer = HistoryBuffer::new(2);
        buffer.push("a");
        buffer.push("b");
        buffer.push("c");
        assert_eq!(serde_json::to_string(&buffer).unwrap(), r#"["b","c"]"#);
    }

    #[test]
    #[should_panic(expected = "capacity must be greater than zero")]
    fn zero_capacity_is_rejected() {
        let _ = HistoryBuffer::<u8>::new(0);
    }
}
