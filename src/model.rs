//! The in-memory data model. These types are what the writer (C5) consumes and
//! the reader (C6) produces; the wire representation in §4.4 is private to
//! [`crate::entry_pool`].

use toranomaki_enums::{Language, PartOfSpeech};

/// Which word index a string belongs to. Not a Unicode script: Japanese words
/// (Kanji and kana) share one index, glosses in any target language share the
/// other.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Alphabet {
    Japanese,
    Latin,
}

impl Alphabet {
    pub fn magic(self) -> u32 {
        match self {
            Alphabet::Japanese => 0x4A4D_4A31, // "JMJ1"
            Alphabet::Latin => 0x4A4D_4C31,    // "JML1"
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Alphabet::Japanese => "Japanese",
            Alphabet::Latin => "Latin",
        }
    }
}

/// An immutable dictionary record. `priorities` has exactly
/// `kanji.len() + readings.len()` elements, one per writing, in that order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub id: u32,
    pub kanji: Vec<String>,
    pub readings: Vec<String>,
    pub priorities: Vec<u16>,
    pub senses: Vec<Sense>,
}

impl Entry {
    /// All Japanese writings (Kanji first, then readings) paired with their
    /// priority code, in on-disk order.
    pub fn writings(&self) -> impl Iterator<Item = (&str, u16)> {
        self.kanji
            .iter()
            .chain(self.readings.iter())
            .map(String::as_str)
            .zip(self.priorities.iter().copied())
    }
}

/// A single translation group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sense {
    pub language: Language,
    pub gloss: String,
    pub pos: Vec<PartOfSpeech>,
}
