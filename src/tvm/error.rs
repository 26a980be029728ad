use thiserror::Error;

pub type CellResult<T> = Result<T, CellError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CellError {
    // BoC format errors
    #[error("Unknown BoC magic: 0x{0:08x}")]
    UnknownMagic(u32),
    #[error("Invalid BoC ref size: {0}")]
    InvalidRefSize(u8),
    #[error("Invalid BoC offset size: {0}")]
    InvalidOffsetSize(u8),
    #[error("Unsupported root count: {0}")]
    UnsupportedRootCount(usize),
    #[error("Root count {root_count} is greater than cell count {cell_count}")]
    RootCountExceedsCellCount { root_count: usize, cell_count: usize },
    #[error("Absent cells are not supported")]
    AbsentCellsUnsupported,
    #[error("Non-zero level is not supported (level: {0})")]
    NonZeroLevelUnsupported(u8),
    #[error("Exotic cells are not supported")]
    ExoticCellsUnsupported,
    #[error("Invalid ref count: {0}")]
    InvalidRefCount(u8),
    #[error("Invalid child index {index} for cell {parent}")]
    InvalidChildIndex { index: usize, parent: usize },
    #[error("Unexpected end of data")]
    UnexpectedEof,
    #[error("Root cell not found (index: {0})")]
    RootCellNotFound(usize),
    #[error("Child cell not found (index: {0})")]
    ChildCellNotFound(usize),
    #[error("Invalid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error("Invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("BoC is too large for 16-bit indices ({cell_count} cells, {data_size} bytes)")]
    BocTooLarge { cell_count: usize, data_size: usize },

    // Builder errors
    #[error("Not enough data for {bits} bits: {bytes} bytes supplied")]
    InvalidBuilderData { bytes: usize, bits: usize },
    #[error("Cell data overflow: {bit_len} + {bits} bits exceeds the cell capacity")]
    CellDataOverflow { bit_len: usize, bits: usize },
    #[error("Cell references overflow")]
    CellRefsOverflow,
    #[error("Invalid bit count: {0}")]
    InvalidBitCount(usize),
    #[error("Value {0} does not fit into VarUInteger 16")]
    VarUintOverflow(u128),

    // Finalization errors
    #[error("Invalid cell: {bit_len} bits, {ref_count} references")]
    InvalidCell { bit_len: usize, ref_count: usize },
    #[error("Cell depth overflow")]
    DepthOverflow,

    // Slice errors
    #[error("Cell data underflow: requested {requested} bits, {remaining} remaining")]
    CellDataUnderflow { requested: usize, remaining: usize },
    #[error("Cell references underflow")]
    CellRefsUnderflow,
    #[error("Invalid address tag: 0b{0:02b}")]
    InvalidAddressTag(u8),
}
