use std::collections::VecDeque;
use std::fmt;

/// Bounded FIFO: pushing into a full queue evicts the oldest item.
/// Items are kept oldest first.
pub struct CircularQueue<T> {
    deque: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> Clone for CircularQueue<T> {
    fn clone(&self) -> Self {
        Self {
            deque: self.deque.clone(),
            capacity: self.capacity,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for CircularQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.deque.fmt(f)
    }
}

impl<T> CircularQueue<T> {
    #[inline]
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            deque: VecDeque::with_capacity(cap),
            capacity: cap,
        }
    }

    /// Appends `item`, returning whatever fell off the front.
    /// A zero-capacity queue hands the item straight back.
    #[inline]
    pub fn push(&mut self, item: T) -> Option<T> {
        if self.capacity == 0 {
            return Some(item);
        }

        let evicted = if self.is_full() {
            self.deque.pop_front()
        } else {
            None
        };

        self.deque.push_back(item);

        evicted
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.deque.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.deque.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.deque.len() >= self.capacity
    }

    #[inline]
    pub fn clear(&mut self) {
        self.deque.clear()
    }

    #[inline]
    pub fn newest(&self) -> Option<&T> {
        self.deque.back()
    }

    /// Contiguous view, oldest first.
    #[inline]
    pub fn as_slice(&mut self) -> &[T] {
        self.deque.make_contiguous()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_first() {
        let mut q = CircularQueue::with_capacity(3);
        assert_eq!(q.push(0), None);
        assert_eq!(q.push(1), None);
        assert_eq!(q.push(2), None);
        assert!(q.is_full());
        assert_eq!(q.push(3), Some(0));
        assert_eq!(q.as_slice(), &[1, 2, 3]);
        assert_eq!(q.newest(), Some(&3));
    }

    #[test]
    fn wrapped_storage_stays_ordered() {
        let mut q = CircularQueue::with_capacity(4);
        for i in 0..11 {
            q.push(i);
            assert!(q.len() <= 4);
        }
        assert_eq!(q.as_slice(), &[7, 8, 9, 10]);
    }

    #[test]
    fn zero_capacity_keeps_nothing() {
        let mut q = CircularQueue::with_capacity(0);
        assert_eq!(q.push('a'), Some('a'));
        assert!(q.is_empty());
    }
}
