//! Slice implementation for reading data from cells
//!
//! A `CellSlice` borrows a finalized [`Cell`] and reads it sequentially,
//! tracking the current position in both bits and references.

use crate::tvm::address::Address;
use crate::tvm::cell::{ArcCell, Cell};
use crate::tvm::error::{CellError, CellResult};

/// A bounds-checked reader over a cell
#[derive(Debug, Clone, Copy)]
pub struct CellSlice<'a> {
    cell: &'a Cell,
    data_offset: usize,
    refs_offset: usize,
}

impl<'a> CellSlice<'a> {
    /// Creates a new slice positioned at the start of the cell
    pub fn new(cell: &'a Cell) -> Self {
        Self {
            cell,
            data_offset: 0,
            refs_offset: 0,
        }
    }

    /// Gets the underlying cell
    pub fn cell(&self) -> &'a Cell {
        self.cell
    }

    /// Gets the current bit position
    pub fn data_offset(&self) -> usize {
        self.data_offset
    }

    /// Returns the number of remaining bits
    pub fn remaining_bits(&self) -> usize {
        self.cell.bit_len() - self.data_offset
    }

    /// Returns the number of remaining references
    pub fn remaining_refs(&self) -> usize {
        self.cell.reference_count() - self.refs_offset
    }

    /// Checks if there are no remaining bits and references
    pub fn is_empty(&self) -> bool {
        self.remaining_bits() == 0 && self.remaining_refs() == 0
    }

    /// Loads `bits` bits, MSB first, into `ceil(bits / 8)` bytes.
    ///
    /// Unused low bits of the last byte are zero.
    pub fn get_next_bits(&mut self, bits: usize) -> CellResult<Vec<u8>> {
        self.ensure_bits(bits)?;

        let data = self.cell.data();
        let start = self.data_offset / 8;
        let shift = self.data_offset % 8;
        let byte_len = bits.div_ceil(8);

        let mut result = if shift == 0 {
            data[start..start + byte_len].to_vec()
        } else {
            (start..start + byte_len)
                .map(|i| {
                    let hi = u16::from(data[i]);
                    let lo = u16::from(data.get(i + 1).copied().unwrap_or(0));
                    (((hi << 8) | lo) << shift >> 8) as u8
                })
                .collect()
        };

        let rem = bits % 8;
        if let Some(last) = result.last_mut().filter(|_| rem != 0) {
            *last &= 0xFF << (8 - rem);
        }

        self.data_offset += bits;
        Ok(result)
    }

    /// Loads `n` whole bytes
    pub fn get_next_bytes(&mut self, n: usize) -> CellResult<Vec<u8>> {
        self.get_next_bits(n * 8)
    }

    /// Loads a single bit
    pub fn get_next_bit(&mut self) -> CellResult<bool> {
        let bits = self.get_next_bits(1)?;
        Ok(bits[0] & 0x80 != 0)
    }

    /// Loads an unsigned integer of `bits` (1..=7) bits
    pub fn get_next_small_uint(&mut self, bits: usize) -> CellResult<u8> {
        if !(1..=7).contains(&bits) {
            return Err(CellError::InvalidBitCount(bits));
        }
        let bytes = self.get_next_bits(bits)?;
        Ok(bytes[0] >> (8 - bits))
    }

    pub fn get_next_u8(&mut self) -> CellResult<u8> {
        Ok(self.get_next_array::<1>()?[0])
    }

    pub fn get_next_i8(&mut self) -> CellResult<i8> {
        Ok(self.get_next_u8()? as i8)
    }

    /// Loads a u32 value (32 bits, big-endian)
    pub fn get_next_u32(&mut self) -> CellResult<u32> {
        self.get_next_array().map(u32::from_be_bytes)
    }

    /// Loads a u64 value (64 bits, big-endian)
    pub fn get_next_u64(&mut self) -> CellResult<u64> {
        self.get_next_array().map(u64::from_be_bytes)
    }

    /// Loads a VarUInteger 16 (4-bit byte length followed by the value)
    pub fn get_next_u128(&mut self) -> CellResult<u128> {
        let mut lookahead = *self;
        let len = lookahead.get_next_small_uint(4)? as usize;
        let bytes = lookahead.get_next_bytes(len)?;
        *self = lookahead;

        Ok(bytes
            .iter()
            .fold(0u128, |acc, &byte| (acc << 8) | u128::from(byte)))
    }

    /// Loads a standard internal address (`addr_std$10` without anycast)
    pub fn get_next_address(&mut self) -> CellResult<Address> {
        self.ensure_bits(Address::BIT_LEN)?;

        let mut lookahead = *self;
        let tag = lookahead.get_next_small_uint(2)?;
        let has_anycast = lookahead.get_next_bit()?;
        if tag != 0b10 || has_anycast {
            return Err(CellError::InvalidAddressTag(tag));
        }

        let workchain = lookahead.get_next_i8()?;
        let hash_part = lookahead.get_next_array::<32>()?;
        *self = lookahead;
        Ok(Address::new(workchain, hash_part))
    }

    /// Loads the next reference
    pub fn get_next_reference(&mut self) -> CellResult<&'a ArcCell> {
        let reference = self
            .cell
            .reference(self.refs_offset)
            .ok_or(CellError::CellRefsUnderflow)?;
        self.refs_offset += 1;
        Ok(reference)
    }

    /// Skips a number of bits
    pub fn skip_bits(&mut self, bits: usize) -> CellResult<()> {
        self.ensure_bits(bits)?;
        self.data_offset += bits;
        Ok(())
    }

    fn get_next_array<const N: usize>(&mut self) -> CellResult<[u8; N]> {
        let bytes = self.get_next_bytes(N)?;
        let mut result = [0u8; N];
        result.copy_from_slice(&bytes);
        Ok(result)
    }

    fn ensure_bits(&self, bits: usize) -> CellResult<()> {
        let remaining = self.remaining_bits();
        if bits > remaining {
            return Err(CellError::CellDataUnderflow {
                requested: bits,
                remaining,
            });
        }
        Ok(())
    }
}

impl<'a> From<&'a Cell> for CellSlice<'a> {
    fn from(cell: &'a Cell) -> Self {
        Self::new(cell)
    }
}
