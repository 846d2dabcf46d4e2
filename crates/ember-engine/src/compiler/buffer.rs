// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Growable code buffer.
//!
//! Records are addressed by byte offset only. Growth moves the storage, so
//! no reference into the buffer survives a call to [`CodeBuffer::reserve`].

use tracing::debug;

use crate::Result;

/// Byte buffer holding the instruction records of one code unit.
#[derive(Debug, Default)]
pub struct CodeBuffer {
    bytes: Vec<u8>,
}

impl CodeBuffer {
    /// Creates a buffer with `capacity` bytes preallocated.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let mut bytes = Vec::new();
        bytes.try_reserve_exact(capacity)?;
        Ok(Self { bytes })
    }

    /// Appends `n` zeroed bytes and returns the offset of the first one.
    pub fn reserve(&mut self, n: usize) -> Result<usize> {
        let start = self.bytes.len();
        let needed = start + n;

        if needed > self.bytes.capacity() {
            let capacity = self.bytes.capacity();
            let grown = if capacity < 1024 {
                capacity * 2
            } else {
                capacity + capacity / 2
            };
            let size = grown.max(needed);

            let mut fresh = Vec::new();
            fresh.try_reserve_exact(size)?;
            fresh.extend_from_slice(&self.bytes);
            self.bytes = fresh;

            debug!(from = capacity, to = size, "grow code buffer");
        }

        self.bytes.resize(needed, 0);
        Ok(start)
    }

    /// Offset one past the last written byte.
    pub fn end(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if nothing has been emitted.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Allocated capacity.
    pub fn capacity(&self) -> usize {
        self.bytes.capacity()
    }

    /// Writes a byte at `offset`.
    pub fn write_u8(&mut self, offset: usize, value: u8) {
        self.bytes[offset] = value;
    }

    /// Writes a little-endian `u32` at `offset`.
    pub fn write_u32(&mut self, offset: usize, value: u32) {
        self.bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// Writes a little-endian `i32` at `offset`.
    pub fn write_i32(&mut self, offset: usize, value: i32) {
        self.bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// Reads a little-endian `u32` at `offset`.
    pub fn read_u32(&self, offset: usize) -> u32 {
        let mut word = [0u8; 4];
        word.copy_from_slice(&self.bytes[offset..offset + 4]);
        u32::from_le_bytes(word)
    }

    /// Reads a little-endian `i32` at `offset`.
    pub fn read_i32(&self, offset: usize) -> i32 {
        self.read_u32(offset) as i32
    }

    /// Adds `delta` to the `i32` at `offset`.
    pub fn add_i32(&mut self, offset: usize, delta: i32) {
        let value = self.read_i32(offset).wrapping_add(delta);
        self.write_i32(offset, value);
    }

    /// Emitted bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the buffer, returning the emitted bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_returns_offsets() {
        let mut buf = CodeBuffer::with_capacity(8).unwrap();
        assert_eq!(buf.reserve(4).unwrap(), 0);
        assert_eq!(buf.reserve(8).unwrap(), 4);
        assert_eq!(buf.end(), 12);
        assert!(buf.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_growth_doubles_small_buffers() {
        let mut buf = CodeBuffer::with_capacity(128).unwrap();
        buf.reserve(128).unwrap();
        buf.reserve(4).unwrap();
        assert_eq!(buf.capacity(), 256);
    }

    #[test]
    fn test_growth_by_half_above_threshold() {
        let mut buf = CodeBuffer::with_capacity(2048).unwrap();
        buf.reserve(2048).unwrap();
        buf.reserve(1).unwrap();
        assert_eq!(buf.capacity(), 3072);
    }

    #[test]
    fn test_growth_covers_large_requests() {
        let mut buf = CodeBuffer::with_capacity(16).unwrap();
        buf.reserve(100).unwrap();
        assert!(buf.capacity() >= 100);
    }

    #[test]
    fn test_contents_survive_growth() {
        let mut buf = CodeBuffer::with_capacity(4).unwrap();
        let at = buf.reserve(4).unwrap();
        buf.write_u32(at, 0xdead_beef);
        buf.reserve(64).unwrap();
        assert_eq!(buf.read_u32(at), 0xdead_beef);
    }

    #[test]
    fn test_add_i32() {
        let mut buf = CodeBuffer::with_capacity(4).unwrap();
        buf.reserve(4).unwrap();
        buf.write_i32(0, 4);
        buf.add_i32(0, -12);
        assert_eq!(buf.read_i32(0), -8);
    }
}
