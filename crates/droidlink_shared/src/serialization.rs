//! # Frame Serialization
//!
//! Allocation-free byte writer and reader for fixed-size datagrams.
//!
//! ## Design
//!
//! - The writer owns a zeroed `[u8; N]`, so unwritten bytes are padding
//! - Every multi-byte value is little-endian
//! - Writes report overflow with `false`, reads with `None`

/// Writes fields into a fixed-size, zero-padded frame.
///
/// `N` is the total datagram size. Bytes past the last write stay zero.
pub struct FrameWriter<const N: usize> {
    buffer: [u8; N],
    position: usize,
}

impl<const N: usize> FrameWriter<N> {
    /// Creates a writer over a zeroed frame.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffer: [0u8; N],
            position: 0,
        }
    }

    /// Returns the number of bytes written so far.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.position
    }

    /// Returns true if nothing has been written.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.position == 0
    }

    /// Returns the written prefix.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer[..self.position]
    }

    /// Writes a single byte.
    #[inline]
    pub fn write_u8(&mut self, value: u8) -> bool {
        self.write_bytes(&[value])
    }

    /// Writes an i16 in little-endian format.
    #[inline]
    pub fn write_i16(&mut self, value: i16) -> bool {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes a f32 in little-endian format.
    #[inline]
    pub fn write_f32(&mut self, value: f32) -> bool {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes raw bytes.
    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) -> bool {
        let Some(end) = self.position.checked_add(bytes.len()) else {
            return false;
        };
        if end > N {
            return false;
        }
        self.buffer[self.position..end].copy_from_slice(bytes);
        self.position = end;
        true
    }

    /// Consumes the writer and returns the full padded frame.
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> [u8; N] {
        self.buffer
    }
}

impl<const N: usize> Default for FrameWriter<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads fields from a received datagram.
pub struct FrameReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> FrameReader<'a> {
    /// Creates a reader positioned at the start of `buffer`.
    #[must_use]
    pub const fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, position: 0 }
    }

    /// Current byte offset.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Returns the number of bytes remaining.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    /// Reads a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[b]| b)
    }

    /// Reads an i16 in little-endian format.
    #[inline]
    pub fn read_i16(&mut self) -> Option<i16> {
        self.take::<2>().map(i16::from_le_bytes)
    }

    /// Reads a f32 in little-endian format.
    #[inline]
    pub fn read_f32(&mut self) -> Option<f32> {
        self.take::<4>().map(f32::from_le_bytes)
    }

    fn take<const K: usize>(&mut self) -> Option<[u8; K]> {
        let end = self.position.checked_add(K)?;
        let slice = self.buffer.get(self.position..end)?;
        let mut out = [0u8; K];
        out.copy_from_slice(slice);
        self.position = end;
        Some(out)
    }
}
