//! Cell implementation for TON blockchain
//!
//! A cell is a fundamental data structure in TON that can store up to 1023 bits
//! of data and maintain up to 4 references to other cells. Cells are immutable:
//! depth and representation hash are computed once, when the cell is created.

use crate::tvm::boc;
use crate::tvm::error::{CellError, CellResult};
use crate::tvm::slice::CellSlice;
use sha2::{Digest, Sha256};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Maximum number of bits a cell can store
pub const MAX_CELL_BITS: usize = 1023;

/// Maximum number of references a cell can have
pub const MAX_CELL_REFS: usize = 4;

/// Representation hash of a cell
pub type CellHash = [u8; 32];

/// Shared handle to a finalized cell
pub type ArcCell = Arc<Cell>;

/// Represents a finalized cell in the TON blockchain
#[derive(Clone)]
pub struct Cell {
    /// Cell data, `ceil(bit_len / 8)` bytes including the completion tag
    data: Vec<u8>,
    /// Number of bits in the cell (not necessarily a multiple of 8)
    bit_len: usize,
    /// References to other cells
    references: Vec<ArcCell>,
    depth: u16,
    hash: CellHash,
}

impl Cell {
    /// Creates a finalized cell from raw data and already finalized children.
    ///
    /// Only the first `ceil(bit_len / 8)` bytes of `data` are kept. Bits past
    /// `bit_len` are cleared and the completion tag is set for unaligned lengths,
    /// so the stored bytes are always canonical.
    pub fn new(mut data: Vec<u8>, bit_len: usize, references: Vec<ArcCell>) -> CellResult<Self> {
        if bit_len > MAX_CELL_BITS || references.len() > MAX_CELL_REFS {
            return Err(CellError::InvalidCell {
                bit_len,
                ref_count: references.len(),
            });
        }

        let byte_len = bit_len.div_ceil(8);
        if data.len() < byte_len {
            return Err(CellError::InvalidBuilderData {
                bytes: data.len(),
                bits: bit_len,
            });
        }
        data.truncate(byte_len);

        let rem = bit_len % 8;
        if let Some(last) = data.last_mut().filter(|_| rem != 0) {
            *last &= 0xFF << (8 - rem);
            *last |= 0x80 >> rem;
        }

        let (depth, hash) = finalize(&data, bit_len, &references)?;

        Ok(Self {
            data,
            bit_len,
            references,
            depth,
            hash,
        })
    }

    /// Creates an empty cell (no data, no references)
    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            bit_len: 0,
            references: Vec::new(),
            depth: 0,
            hash: representation_hash(&[], 0, &[]),
        }
    }

    /// Parses a single-root Bag of Cells
    pub fn deserialize(bytes: &[u8]) -> CellResult<ArcCell> {
        boc::deserialize_boc(bytes)
    }

    /// Parses a base64-encoded Bag of Cells
    pub fn from_base64(encoded: &str) -> CellResult<ArcCell> {
        boc::base64_to_boc(encoded)
    }

    /// Serializes this cell and all its descendants into a Bag of Cells
    pub fn serialize(&self) -> CellResult<Vec<u8>> {
        boc::serialize_boc(self)
    }

    /// Serializes this cell into a base64-encoded Bag of Cells
    pub fn to_base64(&self) -> CellResult<String> {
        boc::boc_to_base64(self)
    }

    /// Returns the cell's data, padded with the completion tag
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns the number of bits in the cell
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Returns the cell's references
    pub fn references(&self) -> &[ArcCell] {
        &self.references
    }

    /// Returns the number of references
    pub fn reference_count(&self) -> usize {
        self.references.len()
    }

    /// Gets a reference by index
    pub fn reference(&self, index: usize) -> Option<&ArcCell> {
        self.references.get(index)
    }

    pub fn depth(&self) -> u16 {
        self.depth
    }

    /// Returns the representation hash of the cell
    pub fn hash(&self) -> &CellHash {
        &self.hash
    }

    /// Creates a reader positioned at the start of this cell
    pub fn as_slice(&self) -> CellSlice<'_> {
        CellSlice::new(self)
    }

    /// Computes the cell's descriptors (2 bytes)
    pub fn descriptors(&self) -> [u8; 2] {
        descriptors(self.bit_len, self.references.len())
    }

    /// Size of this cell inside a BoC with the given reference width
    pub(crate) fn serialized_size(&self, ref_size: usize) -> usize {
        2 + self.data.len() + self.references.len() * ref_size
    }
}

/// First byte: number of references (ordinary cell, level 0).
/// Second byte: `floor(b / 8) + ceil(b / 8)`.
pub(crate) fn descriptors(bit_len: usize, ref_count: usize) -> [u8; 2] {
    let d1 = ref_count as u8;
    let d2 = (((bit_len >> 2) & 0xFE) | usize::from(bit_len % 8 != 0)) as u8;
    [d1, d2]
}

fn finalize(data: &[u8], bit_len: usize, references: &[ArcCell]) -> CellResult<(u16, CellHash)> {
    let depth = match references.iter().map(|r| r.depth).max() {
        None => 0,
        Some(max) => max.checked_add(1).ok_or(CellError::DepthOverflow)?,
    };
    Ok((depth, representation_hash(data, bit_len, references)))
}

fn representation_hash(data: &[u8], bit_len: usize, references: &[ArcCell]) -> CellHash {
    let mut hasher = Sha256::new();

    hasher.update(descriptors(bit_len, references.len()));
    hasher.update(data);

    for reference in references {
        hasher.update(reference.depth.to_be_bytes());
    }
    for reference in references {
        hasher.update(reference.hash);
    }

    hasher.finalize().into()
}

impl Default for Cell {
    fn default() -> Self {
        Self::empty()
    }
}

// Children that are uniquely owned are unlinked onto a heap stack, so dropping
// a long reference chain does not recurse once per level.
impl Drop for Cell {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.references);
        while let Some(reference) = stack.pop() {
            if let Some(mut cell) = Arc::into_inner(reference) {
                stack.append(&mut cell.references);
            }
        }
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for Cell {}

impl Hash for Cell {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("bit_len", &self.bit_len)
            .field("data", &hex::encode(&self.data))
            .field("references", &self.references.len())
            .field("depth", &self.depth)
            .field("hash", &hex::encode(self.hash))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY_CELL_HASH: &str =
        "96a296d224f285c67bee93c30f8a309157f0daa35dc5b87e410b78630a09cfc7";

    #[test]
    fn test_empty_cell() {
        let cell = Cell::empty();
        assert_eq!(cell.bit_len(), 0);
        assert_eq!(cell.reference_count(), 0);
        assert_eq!(cell.depth(), 0);
        assert_eq!(hex::encode(cell.hash()), EMPTY_CELL_HASH);
        assert_eq!(Cell::new(vec![], 0, vec![]).unwrap(), cell);
    }

    #[test]
    fn test_cell_with_data() {
        let cell = Cell::new(vec![0x0F], 8, vec![]).unwrap();
        assert_eq!(cell.bit_len(), 8);
        assert_eq!(cell.data(), &[0x0F]);
    }

    #[test]
    fn test_cell_hash() {
        let cell = Cell::new(vec![0x00, 0x00, 0x00, 0x0F], 32, vec![]).unwrap();
        assert_eq!(
            hex::encode(cell.hash()),
            "57b520dbcb9d135863fc33963cde9f6db2ded1430d88056810a2c9434a3860f9"
        );
    }

    #[test]
    fn test_descriptors() {
        assert_eq!(descriptors(0, 0), [0, 0]);
        assert_eq!(descriptors(8, 1), [1, 2]);
        assert_eq!(descriptors(7, 2), [2, 1]);
        assert_eq!(descriptors(267, 0), [0, 67]);
        assert_eq!(descriptors(MAX_CELL_BITS, MAX_CELL_REFS), [4, 255]);
    }

    #[test]
    fn test_padding_is_canonical() {
        // junk bits after bit_len are cleared and the completion tag is set
        let cell = Cell::new(vec![0xFF, 0xFF, 0xAA], 12, vec![]).unwrap();
        assert_eq!(cell.data(), &[0xFF, 0xF8]);

        let same = Cell::new(vec![0xFF, 0xF0], 12, vec![]).unwrap();
        assert_eq!(cell.hash(), same.hash());
    }

    #[test]
    fn test_depth() {
        let leaf = Arc::new(Cell::empty());
        let middle = Arc::new(Cell::new(vec![], 0, vec![leaf.clone()]).unwrap());
        let root = Cell::new(vec![], 0, vec![leaf, middle]).unwrap();
        assert_eq!(root.depth(), 2);
    }

    #[test]
    fn test_invalid_cell() {
        let data = vec![0u8; 128];
        assert_eq!(
            Cell::new(data, MAX_CELL_BITS + 1, vec![]),
            Err(CellError::InvalidCell {
                bit_len: MAX_CELL_BITS + 1,
                ref_count: 0,
            })
        );

        let refs = vec![Arc::new(Cell::empty()); MAX_CELL_REFS + 1];
        assert!(matches!(
            Cell::new(vec![], 0, refs),
            Err(CellError::InvalidCell { ref_count: 5, .. })
        ));

        assert_eq!(
            Cell::new(vec![0xFF], 9, vec![]),
            Err(CellError::InvalidBuilderData { bytes: 1, bits: 9 })
        );
    }

    #[test]
    fn test_reference_order_matters() {
        let a = Arc::new(Cell::new(vec![0xAA], 8, vec![]).unwrap());
        let b = Arc::new(Cell::new(vec![0xBB], 8, vec![]).unwrap());
        let ab = Cell::new(vec![], 0, vec![a.clone(), b.clone()]).unwrap();
        let ba = Cell::new(vec![], 0, vec![b, a]).unwrap();
        assert_ne!(ab.hash(), ba.hash());
    }
}
