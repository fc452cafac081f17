//! Fixed-capacity byte window for the sliding block scan.
//!
//! The window is loaded with a whole chunk after each aligned read and then
//! advanced one byte at a time. Contents are exposed as at most two slices so
//! the strong digest can be computed without rotating the buffer.

use checksums::{Strong, StrongHasher};

#[derive(Clone, Debug)]
pub(crate) struct Window {
    buffer: Vec<u8>,
    head: usize,
    len: usize,
}

impl Window {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: vec![0_u8; capacity.max(1)],
            head: 0,
            len: 0,
        }
    }

    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    #[cfg(test)]
    pub(crate) fn is_full(&self) -> bool {
        self.len == self.buffer.len()
    }

    /// Replaces the contents with `chunk`, which must fit the capacity.
    pub(crate) fn load(&mut self, chunk: &[u8]) {
        let n = chunk.len().min(self.buffer.len());
        self.buffer[..n].copy_from_slice(&chunk[..n]);
        self.head = 0;
        self.len = n;
    }

    /// Appends a byte, returning the byte that left the window when full.
    pub(crate) fn push_back(&mut self, byte: u8) -> Option<u8> {
        let capacity = self.buffer.len();
        if self.len < capacity {
            self.buffer[(self.head + self.len) % capacity] = byte;
            self.len += 1;
            None
        } else {
            let outgoing = self.buffer[self.head];
            self.buffer[self.head] = byte;
            self.head = (self.head + 1) % capacity;
            Some(outgoing)
        }
    }

    /// Contents in order, split where the buffer wraps.
    pub(crate) fn as_slices(&self) -> (&[u8], &[u8]) {
        let end = self.head + self.len;
        if end <= self.buffer.len() {
            (&self.buffer[self.head..end], &[])
        } else {
            let wrapped = end - self.buffer.len();
            (&self.buffer[self.head..], &self.buffer[..wrapped])
        }
    }

    pub(crate) fn strong(&self) -> Strong {
        let (first, second) = self.as_slices();
        let mut hasher = StrongHasher::new();
        hasher.update(first);
        hasher.update(second);
        hasher.finalize()
    }
}

#[cfg(test)]
mod tests {
    use checksums::strong_checksum;

    use super::*;

    fn contents(window: &Window) -> Vec<u8> {
        let (a, b) = window.as_slices();
        [a, b].concat()
    }

    #[test]
    fn load_then_slide_keeps_fifo_order() {
        let mut window = Window::with_capacity(4);
        window.load(b"hell");
        assert!(window.is_full());
        let mut outgoing = Vec::new();
        for &byte in b"o world" {
            outgoing.extend(window.push_back(byte));
        }
        assert_eq!(contents(&window), b"orld");
        assert_eq!(outgoing, b"hello w");
    }

    #[test]
    fn short_load_is_not_full() {
        let mut window = Window::with_capacity(8);
        window.load(b"abc");
        assert_eq!(window.len(), 3);
        assert!(!window.is_full());
        assert_eq!(window.push_back(b'd'), None);
        assert_eq!(contents(&window), b"abcd");
    }

    #[test]
    fn strong_digest_spans_wrap_point() {
        let mut window = Window::with_capacity(3);
        window.load(b"123");
        window.push_back(b'4');
        window.push_back(b'5');
        let (first, second) = window.as_slices();
        assert_eq!(first, b"3");
        assert_eq!(second, b"45");
        assert_eq!(window.strong(), strong_checksum(b"345"));
    }

    #[test]
    fn reload_resets_head() {
        let mut window = Window::with_capacity(3);
        window.load(b"abc");
        window.push_back(b'd');
        window.load(b"xy");
        assert_eq!(contents(&window), b"xy");
    }
}
