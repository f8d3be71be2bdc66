//! A compact binary dictionary format for the JMdict Japanese/English
//! dictionary: a character-sequence encoder, two word indexes (Japanese and
//! Latin) supporting ordered prefix lookup, a deduplicated pool of
//! entry-reference lists, and packed entry records — plus the writer and
//! memory-mapped reader built on top of them.
//!
//! Ingesting JMdict's upstream XML is out of scope for this crate; callers
//! hand the writer a `Vec<Entry>` built however they like (see [`ingest`] for
//! a minimal line-delimited-JSON stand-in used by the CLI and tests).

pub mod cache;
pub mod config;
pub mod encoder;
pub mod entry_list;
pub mod entry_pool;
pub mod error;
pub mod ingest;
pub mod model;
pub mod priority;
pub mod reader;
pub mod word_table;
pub mod writer;

pub use error::{DictionaryError, Result};
pub use model::{Alphabet, Entry, Sense};
pub use reader::{Reader, SearchResult};
pub use writer::{write_to_file, DictionarySource};
