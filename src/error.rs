//! Error kinds for both the writer and the reader, per the corruption/overflow/
//! lookup-miss taxonomy of the format this crate implements. Lookup misses are
//! not represented here: they are ordinary return values (a negative insertion
//! point, an empty list, or `None`), never an `Err`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DictionaryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad magic number for {alphabet} index: expected {expected:#010x}, found {found:#010x}")]
    BadMagic {
        alphabet: &'static str,
        expected: u32,
        found: u32,
    },

    #[error("unsupported format version {found}")]
    UnsupportedVersion { found: u32 },

    #[error("truncated {section} section")]
    Truncated { section: &'static str },

    #[error("reference out of bounds: offset {offset}, region length {len}")]
    OutOfBounds { offset: usize, len: usize },

    #[error("no code table entry covers character {char:?}")]
    Encoding { char: char },

    #[error("entry has too many kanji elements (max 15)")]
    TooManyKanji,

    #[error("entry has too many reading elements (max 15)")]
    TooManyReadings,

    #[error("entry has too many senses (max 255)")]
    TooManySenses,

    #[error("encoded word exceeds 511 bytes")]
    WordTooLong,

    #[error("a sense's part-of-speech set has more than 8 elements")]
    TooManyPosInSet,

    #[error("an entry-reference list has more than 255 elements")]
    TooManyListElements,

    #[error("byte pool exceeds its field width")]
    PoolOverflow,

    #[error("two distinct priority rank-sets encoded to the same code {0:#06x}")]
    PriorityCollision(u16),

    #[error("installation directory not found")]
    DirectoryNotFound,

    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}

pub type Result<T> = std::result::Result<T, DictionaryError>;
