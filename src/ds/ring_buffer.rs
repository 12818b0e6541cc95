use std::ops::Index;

/// A fixed-capacity ring buffer that overwrites its oldest element once full
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    buffer: Vec<T>,
    capacity: usize,
    i: usize,
}

impl<T> RingBuffer<T> {
    /// Constructs an empty `RingBuffer` holding at most `capacity` elements
    ///
    /// **Panics** if `capacity` is zero
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "RingBuffer capacity must be positive");
        Self {
            buffer: Vec::with_capacity(capacity),
            capacity,
            i: 0,
        }
    }

    /// Returns the number of stored elements
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Returns true once `capacity` elements have been pushed
    pub fn is_full(&self) -> bool {
        self.buffer.len() == self.capacity
    }

    /// Insert an element into the buffer, overwriting the oldest element
    pub fn push(&mut self, item: T) {
        if self.is_full() {
            self.buffer[self.i] = item;
        } else {
            self.buffer.push(item);
        }
        self.i = (self.i + 1) % self.capacity;
    }

    /// Get a slice view of the internal buffer, in storage order
    pub fn view(&self) -> &[T] {
        &self.buffer
    }
}

impl<T> Index<usize> for RingBuffer<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        &self.buffer[index]
    }
}
