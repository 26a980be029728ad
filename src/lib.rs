//! TON cell model and Bag of Cells codec
//!
//! See the [`tvm`] module for cells, builders, slices and BoC encoding.

pub mod tvm;
pub mod utils;
