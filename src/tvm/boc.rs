//! Bag of Cells (BoC) serialization and deserialization
//!
//! BoC is a serialization format that encodes a cell tree into a byte array.
//! The decoder accepts any ordinary single-root BoC with 1 to 4 byte cell
//! indices. The encoder always produces the compact generic form with 2-byte
//! indices and offsets, no index table, no cached hashes and no CRC.

use crate::tvm::cell::{ArcCell, Cell, CellHash, MAX_CELL_REFS};
use crate::tvm::error::{CellError, CellResult};
use base64::Engine;
use base64::alphabet;
use base64::engine::DecodePaddingMode;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use std::collections::HashMap;
use std::sync::Arc;

/// BoC magic number for the generic format
pub const BOC_GENERIC_MAGIC: u32 = 0xb5ee9c72;

/// Width of cell indices and of the payload size written by the encoder
const ENCODE_REF_SIZE: usize = 2;
const ENCODE_OFFSET_SIZE: usize = 2;

// flags byte
const FLAG_INDEX_INCLUDED: u8 = 0x80;
const FLAG_HAS_CRC: u8 = 0x40;
const FLAG_HAS_CACHE_BITS: u8 = 0x20;
const REF_SIZE_MASK: u8 = 0x07;

// first cell descriptor
const D1_REF_COUNT_MASK: u8 = 0x07;
const D1_EXOTIC: u8 = 0x08;
const D1_STORE_HASHES: u8 = 0x10;
const D1_LEVEL_SHIFT: u8 = 5;

/// Depth (2 bytes) and hash (32 bytes) stored inline when `storeHashes` is set
const STORED_HASH_SIZE: usize = 2 + 32;

/// Base64 decoder for BoC payloads: standard alphabet, optional padding,
/// trailing bits tolerated
const BOC_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Cursor over the raw BoC bytes
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn read_bytes(&mut self, len: usize) -> CellResult<&'a [u8]> {
        let end = self.pos.checked_add(len).ok_or(CellError::UnexpectedEof)?;
        let bytes = self
            .data
            .get(self.pos..end)
            .ok_or(CellError::UnexpectedEof)?;
        self.pos = end;
        Ok(bytes)
    }

    fn read_u8(&mut self) -> CellResult<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    /// Reads a big-endian unsigned integer of `size` bytes (at most 8)
    fn read_uint(&mut self, size: usize) -> CellResult<usize> {
        let bytes = self.read_bytes(size)?;
        Ok(bytes
            .iter()
            .fold(0usize, |acc, &byte| (acc << 8) | usize::from(byte)))
    }

    fn skip(&mut self, len: usize) -> CellResult<()> {
        self.read_bytes(len).map(|_| ())
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

/// Cell as read from the stream, before its children are resolved
struct RawCell<'a> {
    data: &'a [u8],
    bit_len: usize,
    references: Vec<usize>,
}

/// Deserializes a Bag of Cells (BoC) into its root cell
pub fn deserialize_boc(data: &[u8]) -> CellResult<ArcCell> {
    let mut reader = Reader::new(data);

    let magic = reader.read_bytes(4)?;
    let magic = u32::from_be_bytes([magic[0], magic[1], magic[2], magic[3]]);
    if magic != BOC_GENERIC_MAGIC {
        return Err(CellError::UnknownMagic(magic));
    }

    let flags = reader.read_u8()?;
    let index_included = flags & FLAG_INDEX_INCLUDED != 0;
    let ref_size = flags & REF_SIZE_MASK;
    if !(1..=4).contains(&ref_size) {
        return Err(CellError::InvalidRefSize(ref_size));
    }
    let ref_size = usize::from(ref_size);

    let offset_size = reader.read_u8()?;
    if !(1..=8).contains(&offset_size) {
        return Err(CellError::InvalidOffsetSize(offset_size));
    }
    let offset_size = usize::from(offset_size);

    let cell_count = reader.read_uint(ref_size)?;
    let root_count = reader.read_uint(ref_size)?;
    if root_count != 1 {
        return Err(CellError::UnsupportedRootCount(root_count));
    }
    if root_count > cell_count {
        return Err(CellError::RootCountExceedsCellCount {
            root_count,
            cell_count,
        });
    }
    let absent_count = reader.read_uint(ref_size)?;
    if absent_count != 0 {
        return Err(CellError::AbsentCellsUnsupported);
    }
    let _total_size = reader.read_uint(offset_size)?;
    let root_index = reader.read_uint(ref_size)?;

    log::debug!(
        "BoC header: {} cells, root {}, ref size {}, offset size {}, index {}, crc {}, cache bits {}",
        cell_count,
        root_index,
        ref_size,
        offset_size,
        index_included,
        flags & FLAG_HAS_CRC != 0,
        flags & FLAG_HAS_CACHE_BITS != 0,
    );

    if index_included {
        let index_len = cell_count
            .checked_mul(offset_size)
            .ok_or(CellError::UnexpectedEof)?;
        reader.skip(index_len)?;
    }

    // every cell takes at least its two descriptor bytes
    let mut raw_cells = Vec::with_capacity(cell_count.min(reader.remaining() / 2));
    for index in 0..cell_count {
        raw_cells.push(read_cell(&mut reader, index, cell_count, ref_size)?);
    }

    // children always follow their parents, so build from the end
    let mut cells: Vec<Option<ArcCell>> = vec![None; cell_count];
    for (index, raw) in raw_cells.into_iter().enumerate().rev() {
        let references = raw
            .references
            .iter()
            .map(|&child| {
                cells
                    .get(child)
                    .and_then(Option::clone)
                    .ok_or(CellError::ChildCellNotFound(child))
            })
            .collect::<CellResult<Vec<_>>>()?;

        let cell = Cell::new(raw.data.to_vec(), raw.bit_len, references)?;
        cells[index] = Some(Arc::new(cell));
    }

    cells
        .get(root_index)
        .and_then(Option::clone)
        .ok_or(CellError::RootCellNotFound(root_index))
}

fn read_cell<'a>(
    reader: &mut Reader<'a>,
    index: usize,
    cell_count: usize,
    ref_size: usize,
) -> CellResult<RawCell<'a>> {
    let d1 = reader.read_u8()?;
    let d2 = reader.read_u8()?;

    let ref_count = d1 & D1_REF_COUNT_MASK;
    let store_hashes = d1 & D1_STORE_HASHES != 0;
    let level = d1 >> D1_LEVEL_SHIFT;
    if level != 0 {
        return Err(CellError::NonZeroLevelUnsupported(level));
    }
    if d1 & D1_EXOTIC != 0 {
        return Err(CellError::ExoticCellsUnsupported);
    }
    if ref_count == 7 && store_hashes {
        return Err(CellError::AbsentCellsUnsupported);
    }
    if usize::from(ref_count) > MAX_CELL_REFS {
        return Err(CellError::InvalidRefCount(ref_count));
    }

    if store_hashes {
        reader.skip(STORED_HASH_SIZE)?;
    }

    let aligned = d2 & 1 == 0;
    let byte_len = usize::from(d2 >> 1) + usize::from(d2 & 1);
    let data = reader.read_bytes(byte_len)?;

    let references = (0..ref_count)
        .map(|_| {
            let child = reader.read_uint(ref_size)?;
            if child > cell_count || child <= index {
                return Err(CellError::InvalidChildIndex {
                    index: child,
                    parent: index,
                });
            }
            Ok(child)
        })
        .collect::<CellResult<Vec<_>>>()?;

    let bit_len = compute_bit_len(data, aligned);
    log::trace!(
        "BoC cell {}: {} bits, refs {:?}",
        index,
        bit_len,
        references
    );

    Ok(RawCell {
        data,
        bit_len,
        references,
    })
}

/// Recovers the bit length of a cell from its padded data.
///
/// Unaligned data ends with a completion tag: the lowest set bit of the last
/// non-zero byte. Trailing zero bytes are not part of the cell.
fn compute_bit_len(data: &[u8], aligned: bool) -> usize {
    let mut bit_len = data.len() * 8;
    if aligned {
        return bit_len;
    }

    for &byte in data.iter().rev() {
        if byte == 0 {
            bit_len -= 8;
        } else {
            bit_len -= byte.trailing_zeros() as usize + 1;
            break;
        }
    }
    bit_len
}

/// Traversal state for [`serialize_boc`]
struct SerializationContext<'a> {
    /// Cells in post-order: children before parents, root last
    cells: Vec<&'a Cell>,
    indices: HashMap<CellHash, usize>,
}

impl<'a> SerializationContext<'a> {
    /// Collects all distinct cells reachable from `root`
    fn collect(root: &'a Cell) -> Self {
        let mut cells = Vec::new();
        let mut indices = HashMap::new();

        // (cell, index of the next child to visit)
        let mut stack: Vec<(&'a Cell, usize)> = vec![(root, 0)];
        while let Some((cell, next)) = stack.last_mut() {
            let cell: &'a Cell = *cell;
            match cell.reference(*next) {
                Some(child) => {
                    *next += 1;
                    if !indices.contains_key(child.hash()) {
                        stack.push((child.as_ref(), 0));
                    }
                }
                None => {
                    stack.pop();
                    if !indices.contains_key(cell.hash()) {
                        indices.insert(*cell.hash(), cells.len());
                        cells.push(cell);
                    }
                }
            }
        }

        Self { cells, indices }
    }

    /// Position of a cell in the written stream (root is 0)
    fn stream_index(&self, cell: &Cell) -> CellResult<usize> {
        let index = self
            .indices
            .get(cell.hash())
            .ok_or(CellError::ChildCellNotFound(self.cells.len()))?;
        Ok(self.cells.len() - index - 1)
    }
}

/// Serializes a cell and its references into a Bag of Cells (BoC)
pub fn serialize_boc(root: &Cell) -> CellResult<Vec<u8>> {
    let context = SerializationContext::collect(root);

    let cell_count = context.cells.len();
    let data_size: usize = context
        .cells
        .iter()
        .map(|cell| cell.serialized_size(ENCODE_REF_SIZE))
        .sum();
    if cell_count > usize::from(u16::MAX) || data_size > usize::from(u16::MAX) {
        return Err(CellError::BocTooLarge {
            cell_count,
            data_size,
        });
    }

    log::debug!(
        "Serializing BoC: {} cells, {} bytes of cell data",
        cell_count,
        data_size
    );

    let header_size = 4 + 1 + 1 + 4 * ENCODE_REF_SIZE + ENCODE_OFFSET_SIZE;
    let mut result = Vec::with_capacity(header_size + data_size);

    result.extend_from_slice(&BOC_GENERIC_MAGIC.to_be_bytes());
    result.push(ENCODE_REF_SIZE as u8);
    result.push(ENCODE_OFFSET_SIZE as u8);
    write_uint(&mut result, cell_count, ENCODE_REF_SIZE);
    write_uint(&mut result, 1, ENCODE_REF_SIZE); // roots
    write_uint(&mut result, 0, ENCODE_REF_SIZE); // absent
    write_uint(&mut result, data_size, ENCODE_OFFSET_SIZE);
    write_uint(&mut result, 0, ENCODE_REF_SIZE); // root index

    for cell in context.cells.iter().rev() {
        result.extend_from_slice(&cell.descriptors());
        result.extend_from_slice(cell.data());
        for reference in cell.references() {
            let index = context.stream_index(reference)?;
            write_uint(&mut result, index, ENCODE_REF_SIZE);
        }
    }

    Ok(result)
}

fn write_uint(buf: &mut Vec<u8>, value: usize, size: usize) {
    let bytes = value.to_be_bytes();
    buf.extend_from_slice(&bytes[bytes.len() - size..]);
}

/// Decodes base64 BoC text. Surrounding whitespace is ignored, the URL-safe
/// alphabet is accepted and padding is optional.
fn decode_base64(encoded: &str) -> CellResult<Vec<u8>> {
    let normalized = encoded.trim().replace('-', "+").replace('_', "/");
    Ok(BOC_BASE64.decode(normalized)?)
}

/// Converts a base64 string to a BoC
pub fn base64_to_boc(encoded: &str) -> CellResult<ArcCell> {
    let bytes = decode_base64(encoded)?;
    deserialize_boc(&bytes)
}

/// Converts a BoC to base64
pub fn boc_to_base64(cell: &Cell) -> CellResult<String> {
    let bytes = serialize_boc(cell)?;
    Ok(STANDARD.encode(bytes))
}

/// Converts a hex string to a BoC
pub fn hex_to_boc(hex: &str) -> CellResult<ArcCell> {
    let hex: String = hex.split_whitespace().collect();
    let bytes = hex::decode(hex)?;
    deserialize_boc(&bytes)
}

/// Converts a BoC to a hex string
pub fn boc_to_hex(cell: &Cell) -> CellResult<String> {
    let bytes = serialize_boc(cell)?;
    Ok(hex::encode(bytes))
}
