mod local;

use std::ops::Range;
use std::sync::Arc;

use byteorder::{ByteOrder, LittleEndian};

/// Immutable, randomly addressable archive bytes.
///
/// Cloning is cheap: clones share the same underlying buffer.
#[derive(Debug, Clone)]
pub struct ByteSource {
    data: Arc<[u8]>,
}

impl ByteSource {
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self { data: data.into() }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Borrow `range`, or `None` if any part of it lies outside the buffer.
    pub fn get(&self, range: Range<usize>) -> Option<&[u8]> {
        self.data.get(range)
    }

    /// Copy `range` out as an independent byte sequence.
    pub fn slice(&self, range: Range<usize>) -> Option<Vec<u8>> {
        self.get(range).map(<[u8]>::to_vec)
    }

    pub fn read_u16(&self, offset: usize) -> Option<u16> {
        self.get(offset..offset.checked_add(2)?)
            .map(LittleEndian::read_u16)
    }

    pub fn read_u32(&self, offset: usize) -> Option<u32> {
        self.get(offset..offset.checked_add(4)?)
            .map(LittleEndian::read_u32)
    }

    pub fn read_u64(&self, offset: usize) -> Option<u64> {
        self.get(offset..offset.checked_add(8)?)
            .map(LittleEndian::read_u64)
    }

    /// The 4-byte record signature at `offset`.
    pub fn signature_at(&self, offset: usize) -> Option<u32> {
        self.read_u32(offset)
    }
}

impl From<Vec<u8>> for ByteSource {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl From<&[u8]> for ByteSource {
    fn from(data: &[u8]) -> Self {
        Self::new(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_little_endian_reads() {
        let source = ByteSource::from(vec![0x50, 0x4b, 0x03, 0x04, 0xff, 0x01, 0, 0, 0, 0, 0, 0]);

        assert_eq!(source.signature_at(0), Some(0x04034b50));
        assert_eq!(source.read_u16(4), Some(0x01ff));
        assert_eq!(source.read_u64(4), Some(0x01ff));
    }

    #[test]
    fn test_reads_past_end_are_none() {
        let source = ByteSource::from(&b"PK\x05"[..]);

        assert_eq!(source.signature_at(0), None);
        assert_eq!(source.read_u16(2), None);
        assert_eq!(source.read_u16(usize::MAX), None);
        assert_eq!(source.slice(1..4), None);
        assert_eq!(source.slice(1..3), Some(b"K\x05".to_vec()));
    }
}
