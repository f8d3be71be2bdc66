//! Enums shared between the writer and reader halves of the `toranomaki` crate.
//! Not generated: the variant list is small and fixed, so it is declared directly
//! rather than via a `build.rs` reading an entities file.

mod language;
mod pos;

pub use language::Language;
pub use pos::{parse_edict, PartOfSpeech, PosParseError};
