//! Tuple: an owned row of bytes plus its record id.

use crate::types::Rid;

/// A materialized tuple.
///
/// The byte layout is fixed-width and interpreted by a
/// [`crate::catalog::Schema`]: INTEGER columns are 4 bytes little-endian,
/// VARCHAR columns occupy their declared length and are zero-padded on
/// the right. A tuple read out of a heap carries the RID it was found at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tuple {
    data: Vec<u8>,
    rid: Rid,
}

impl Tuple {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            rid: Rid::default(),
        }
    }

    pub fn from_slice(data: &[u8]) -> Self {
        Self::new(data.to_vec())
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn rid(&self) -> Rid {
        self.rid
    }

    pub fn set_rid(&mut self, rid: Rid) {
        self.rid = rid;
    }

    /// Decode the 4-byte little-endian integer starting at `offset`.
    ///
    /// Panics if the tuple is shorter than the schema that produced the
    /// offset claims; that is a programming error, not a data error.
    pub fn i32_at(&self, offset: usize) -> i32 {
        let bytes: [u8; 4] = self.data[offset..offset + 4]
            .try_into()
            .expect("tuple shorter than its schema");
        i32::from_le_bytes(bytes)
    }

    /// Decode the fixed-width VARCHAR field at `offset`; the first NUL
    /// (or the declared length) terminates the string.
    pub fn str_at(&self, offset: usize, length: usize) -> String {
        let field = &self.data[offset..offset + length];
        let end = field.iter().position(|&b| b == 0).unwrap_or(length);
        String::from_utf8_lossy(&field[..end]).into_owned()
    }
}
