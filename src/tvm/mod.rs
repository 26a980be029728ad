//! TVM (TON Virtual Machine) data structures
//!
//! This module provides the cell model shared by TON and Everscale:
//! - Cell: immutable, hashed tree node with up to 1023 bits and 4 references
//! - CellBuilder: bit accumulator producing cells
//! - CellSlice: bounds-checked reader over a cell
//! - BoC: Bag of Cells serialization format for encoding cells into byte arrays
//! - Address: standard internal address as stored in cells

pub mod address;
pub mod boc;
pub mod builder;
pub mod cell;
pub mod error;
pub mod serde;
pub mod slice;

pub use address::Address;
pub use boc::{
    BOC_GENERIC_MAGIC, base64_to_boc, boc_to_base64, boc_to_hex, deserialize_boc, hex_to_boc,
    serialize_boc,
};
pub use builder::CellBuilder;
pub use cell::{ArcCell, Cell, CellHash, MAX_CELL_BITS, MAX_CELL_REFS};
pub use error::{CellError, CellResult};
pub use slice::CellSlice;
