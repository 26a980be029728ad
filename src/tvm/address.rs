//! TON internal address as stored inside cells
//!
//! Only the binary `addr_std` layout is handled here; textual formats belong to
//! the chain-specific code.

/// Represents a standard internal TON address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    /// Workchain ID (-1 for masterchain, 0 for basechain)
    pub workchain: i8,
    /// 32-byte hash part of the address
    pub hash_part: [u8; 32],
}

impl Address {
    /// Bits taken by `addr_std$10 anycast:nothing workchain_id:int8 address:bits256`
    pub const BIT_LEN: usize = 2 + 1 + 8 + 256;

    /// Creates a new address from workchain and hash part
    pub fn new(workchain: i8, hash_part: [u8; 32]) -> Self {
        Self {
            workchain,
            hash_part,
        }
    }
}
