//! Builder for constructing cells
//!
//! `CellBuilder` accumulates bits and references and turns them into an
//! immutable, hashed [`Cell`] with [`CellBuilder::into_cell`]. Every typed
//! appender goes through [`CellBuilder::append_raw`], the only place where
//! bits are spliced together.
//!
//! # Examples
//!
//! ```rust
//! use ton_cell_codec::tvm::{Address, CellBuilder};
//!
//! let mut builder = CellBuilder::new();
//! builder
//!     .append_u32(0x12345678)?
//!     .append_bit_one()?
//!     .append_address(&Address::new(0, [0u8; 32]))?;
//!
//! let cell = builder.into_cell()?;
//! assert_eq!(cell.bit_len(), 32 + 1 + 267);
//! # Ok::<(), ton_cell_codec::tvm::CellError>(())
//! ```

use crate::tvm::address::Address;
use crate::tvm::cell::{ArcCell, Cell, MAX_CELL_BITS, MAX_CELL_REFS};
use crate::tvm::error::{CellError, CellResult};
use crate::tvm::slice::CellSlice;
use std::sync::Arc;

/// Mutable bit and reference accumulator
#[derive(Debug, Clone, Default)]
pub struct CellBuilder {
    /// Bits past `bit_len` in the last byte are always zero
    data: Vec<u8>,
    bit_len: usize,
    references: Vec<ArcCell>,
}

impl CellBuilder {
    /// Creates a new empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder pre-filled with the first `bits` bits of `data`
    pub fn from_raw(data: &[u8], bits: usize) -> CellResult<Self> {
        let mut builder = Self::new();
        builder.append_raw(data, bits)?;
        Ok(builder)
    }

    /// Returns the number of bits used
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Returns the number of available bits
    pub fn available_bits(&self) -> usize {
        MAX_CELL_BITS - self.bit_len
    }

    /// Returns the number of references
    pub fn ref_count(&self) -> usize {
        self.references.len()
    }

    /// Returns the number of available references
    pub fn available_refs(&self) -> usize {
        MAX_CELL_REFS - self.references.len()
    }

    /// Appends the first `bits` bits of `data` (MSB first)
    pub fn append_raw(&mut self, data: &[u8], bits: usize) -> CellResult<&mut Self> {
        if data.len() * 8 < bits {
            return Err(CellError::InvalidBuilderData {
                bytes: data.len(),
                bits,
            });
        }
        self.ensure_bits(bits)?;
        if bits == 0 {
            return Ok(self);
        }

        let data = &data[..bits.div_ceil(8)];
        let shift = self.bit_len % 8;

        if shift == 0 {
            // Aligned: plain concatenation, the tail is masked below
            self.data.extend_from_slice(data);
        } else {
            // Unaligned: shift every byte through a 16-bit window seeded with
            // the current partial byte
            let mut acc = u16::from(self.data.pop().unwrap_or_default()) << 8;
            for &byte in data {
                acc |= u16::from(byte) << (8 - shift);
                self.data.push((acc >> 8) as u8);
                acc <<= 8;
            }
            self.data.push((acc >> 8) as u8);
        }

        self.bit_len += bits;
        self.data.truncate(self.bit_len.div_ceil(8));

        let rem = self.bit_len % 8;
        if let Some(last) = self.data.last_mut().filter(|_| rem != 0) {
            *last &= 0xFF << (8 - rem);
        }

        Ok(self)
    }

    /// Inserts the first `bits` bits of `data` before the current content
    pub fn prepend_raw(&mut self, data: &[u8], bits: usize) -> CellResult<&mut Self> {
        let mut builder = Self::from_raw(data, bits)?;
        builder.append_raw(&self.data, self.bit_len)?;
        builder.references = std::mem::take(&mut self.references);
        *self = builder;
        Ok(self)
    }

    /// Appends whole bytes
    pub fn append_bytes(&mut self, data: &[u8]) -> CellResult<&mut Self> {
        self.append_raw(data, data.len() * 8)
    }

    pub fn append_bit_zero(&mut self) -> CellResult<&mut Self> {
        self.append_raw(&[0x00], 1)
    }

    pub fn append_bit_one(&mut self) -> CellResult<&mut Self> {
        self.append_raw(&[0xFF], 1)
    }

    /// Appends a single bit
    pub fn append_bit_bool(&mut self, bit: bool) -> CellResult<&mut Self> {
        if bit {
            self.append_bit_one()
        } else {
            self.append_bit_zero()
        }
    }

    pub fn append_u8(&mut self, value: u8) -> CellResult<&mut Self> {
        self.append_raw(&[value], 8)
    }

    pub fn append_i8(&mut self, value: i8) -> CellResult<&mut Self> {
        self.append_raw(&value.to_be_bytes(), 8)
    }

    /// Appends a u32 value (32 bits, big-endian)
    pub fn append_u32(&mut self, value: u32) -> CellResult<&mut Self> {
        self.append_raw(&value.to_be_bytes(), 32)
    }

    /// Appends a u64 value (64 bits, big-endian)
    pub fn append_u64(&mut self, value: u64) -> CellResult<&mut Self> {
        self.append_raw(&value.to_be_bytes(), 64)
    }

    /// Appends a VarUInteger 16 (coins): 4-bit byte length, then the minimal
    /// big-endian representation of `value`
    pub fn append_u128(&mut self, value: u128) -> CellResult<&mut Self> {
        let bytes = value.to_be_bytes();
        let len = 16 - (value.leading_zeros() / 8) as usize;
        if len > 15 {
            return Err(CellError::VarUintOverflow(value));
        }
        self.ensure_bits(4 + len * 8)?;

        self.append_bits(len as u8, 4)?;
        self.append_raw(&bytes[16 - len..], len * 8)
    }

    /// Appends the low `bits` (1..=7) bits of `value`
    pub fn append_bits(&mut self, value: u8, bits: usize) -> CellResult<&mut Self> {
        if !(1..=7).contains(&bits) {
            return Err(CellError::InvalidBitCount(bits));
        }
        self.append_raw(&[value << (8 - bits)], bits)
    }

    /// Appends a reference to another cell
    pub fn append_reference_cell(&mut self, cell: ArcCell) -> CellResult<&mut Self> {
        self.ensure_refs(1)?;
        self.references.push(cell);
        Ok(self)
    }

    /// Appends bits and references of another builder
    pub fn append_builder(&mut self, other: &CellBuilder) -> CellResult<&mut Self> {
        self.ensure_refs(other.references.len())?;
        self.append_raw(&other.data, other.bit_len)?;
        self.references.extend(other.references.iter().cloned());
        Ok(self)
    }

    /// Appends the unread bits and references of a slice
    pub fn append_cell_slice(&mut self, slice: &CellSlice<'_>) -> CellResult<&mut Self> {
        let mut slice = *slice;
        let bits = slice.remaining_bits();
        self.ensure_refs(slice.remaining_refs())?;
        self.ensure_bits(bits)?;

        let data = slice.get_next_bits(bits)?;
        self.append_raw(&data, bits)?;
        while slice.remaining_refs() > 0 {
            let reference = slice.get_next_reference()?;
            self.references.push(reference.clone());
        }
        Ok(self)
    }

    /// Appends a standard internal address
    pub fn append_address(&mut self, address: &Address) -> CellResult<&mut Self> {
        // addr_std$10 anycast:(Maybe Anycast) workchain_id:int8 address:bits256
        self.ensure_bits(Address::BIT_LEN)?;
        self.append_bits(0b10, 2)?;
        self.append_bit_zero()?;
        self.append_i8(address.workchain)?;
        self.append_raw(&address.hash_part, 256)
    }

    /// Finalizes the accumulated content into a cell and resets the builder
    pub fn into_cell(&mut self) -> CellResult<ArcCell> {
        let Self {
            mut data,
            bit_len,
            references,
        } = std::mem::take(self);

        // completion tag right after the last meaningful bit
        let rem = bit_len % 8;
        if let Some(last) = data.last_mut().filter(|_| rem != 0) {
            *last |= 0x80 >> rem;
        }

        Cell::new(data, bit_len, references).map(Arc::new)
    }

    fn ensure_bits(&self, bits: usize) -> CellResult<()> {
        if bits > self.available_bits() {
            return Err(CellError::CellDataOverflow {
                bit_len: self.bit_len,
                bits,
            });
        }
        Ok(())
    }

    fn ensure_refs(&self, refs: usize) -> CellResult<()> {
        if refs > self.available_refs() {
            return Err(CellError::CellRefsOverflow);
        }
        Ok(())
    }
}
