use super::error::RollingError;

/// Weak rolling checksum over a fixed-size window.
///
/// State is two accumulators, `a` (byte sum) and `b` (position-weighted sum),
/// kept as 64-bit integers so that no intermediate step of a BLOCK_SIZE window
/// can overflow. The identity handed out by [`value`](Self::value) is the low
/// 32 bits of `(b << 16) | a`. The upper bits of `a` overlap `b` in that
/// packing; the weak value is only ever a pre-filter confirmed by the strong
/// digest, and the same packing is what the legacy record format stores.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RollingChecksum {
    a: i64,
    b: i64,
    len: usize,
}

impl RollingChecksum {
    /// Creates a new rolling checksum with zeroed state.
    ///
    /// # Examples
    ///
    /// ```
    /// use checksums::RollingChecksum;
    ///
    /// let checksum = RollingChecksum::new();
    /// assert!(checksum.is_empty());
    /// assert_eq!(checksum.value(), 0);
    /// ```
    #[must_use]
    pub const fn new() -> Self {
        Self { a: 0, b: 0, len: 0 }
    }

    /// Zeroes both accumulators before scanning a new window from scratch.
    pub const fn reset(&mut self) {
        self.a = 0;
        self.b = 0;
        self.len = 0;
    }

    /// Returns the number of bytes in the current window.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no bytes have been observed since the last reset.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends `chunk` to the window.
    ///
    /// For a fresh checksum this is exactly `a += x`, `b += (len - i) * x` for
    /// each byte `x` at offset `i`. Later chunks additionally weight the bytes
    /// already in the window by the chunk length, so feeding a window in pieces
    /// yields the same value as feeding it at once.
    ///
    /// # Examples
    ///
    /// ```
    /// use checksums::RollingChecksum;
    ///
    /// let mut pieces = RollingChecksum::new();
    /// pieces.update(b"content ");
    /// pieces.update(b"addressed");
    ///
    /// let mut whole = RollingChecksum::new();
    /// whole.update(b"content addressed");
    /// assert_eq!(pieces.value(), whole.value());
    /// ```
    #[inline]
    pub fn update(&mut self, chunk: &[u8]) {
        let n = chunk.len() as i64;
        self.b = self.b.wrapping_add(n.wrapping_mul(self.a));
        for (i, &byte) in chunk.iter().enumerate() {
            let x = i64::from(byte);
            self.a = self.a.wrapping_add(x);
            self.b = self.b.wrapping_add((n - i as i64).wrapping_mul(x));
        }
        self.len += chunk.len();
    }

    /// Slides the window forward by one byte: `removed` leaves at the front and
    /// `added` enters at the back.
    ///
    /// The update order matters: `a` is adjusted first and the new `a` feeds
    /// into `b`.
    ///
    /// # Errors
    ///
    /// Returns [`RollingError::EmptyWindow`] if no bytes have been fed yet.
    #[inline]
    pub fn roll(&mut self, removed: u8, added: u8) -> Result<(), RollingError> {
        if self.len == 0 {
            return Err(RollingError::EmptyWindow);
        }

        let removed = i64::from(removed);
        let added = i64::from(added);
        let window = self.len as i64;

        self.a = self.a.wrapping_sub(removed - added);
        self.b = self.b.wrapping_sub(removed.wrapping_mul(window).wrapping_sub(self.a));
        Ok(())
    }

    /// Returns the weak identity of the current window.
    #[inline]
    #[must_use]
    pub const fn value(&self) -> u32 {
        ((self.b << 16) | self.a) as u32
    }
}

/// Computes the weak checksum of `data` in one shot.
#[must_use]
pub fn weak_checksum(data: &[u8]) -> u32 {
    let mut checksum = RollingChecksum::new();
    checksum.update(data);
    checksum.value()
}
