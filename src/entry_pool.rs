//! C4: the entry record pool. Each entry is serialized as a self-describing,
//! fixed-preamble record (§4.4) that can be decoded at random access.

use std::collections::HashMap;

use toranomaki_enums::{Language, PartOfSpeech};

use crate::error::{DictionaryError, Result};
use crate::model::{Entry, Sense};

const MAX_KANJI_OR_READINGS: usize = 15;
const MAX_SENSES: usize = 255;
const MAX_POS_PER_SET: usize = 8;

/// Deduplicated table of POS sets: up to 8 enumerator ids packed one byte
/// each, little-endian, zero-terminated (§4.4).
#[derive(Default)]
pub struct PosSetTable {
    codes: Vec<u64>,
    index: HashMap<u64, u32>,
}

impl PosSetTable {
    pub fn intern(&mut self, pos: &[PartOfSpeech]) -> Result<u32> {
        let code = encode_pos_set(pos)?;
        if let Some(&idx) = self.index.get(&code) {
            return Ok(idx);
        }
        let idx = self.codes.len() as u32;
        self.codes.push(code);
        self.index.insert(code, idx);
        Ok(idx)
    }

    pub fn codes(&self) -> &[u64] {
        &self.codes
    }
}

fn encode_pos_set(pos: &[PartOfSpeech]) -> Result<u64> {
    if pos.len() > MAX_POS_PER_SET {
        return Err(DictionaryError::TooManyPosInSet);
    }
    let mut code: u64 = 0;
    for (i, &p) in pos.iter().enumerate() {
        code |= (p.id() as u64) << (i * 8);
    }
    Ok(code)
}

pub fn decode_pos_set(code: u64) -> Vec<PartOfSpeech> {
    (0..MAX_POS_PER_SET)
        .map(|i| ((code >> (i * 8)) & 0xFF) as u8)
        .take_while(|&byte| byte != 0)
        .filter_map(PartOfSpeech::from_id)
        .collect()
}

/// Encode one entry's record. `japanese_ref`/`latin_ref` resolve a writing or
/// gloss to its packed word-table reference.
pub fn encode_entry(
    entry: &Entry,
    japanese_ref: impl Fn(&str) -> Result<u32>,
    latin_ref: impl Fn(&str) -> Result<u32>,
    pos_sets: &mut PosSetTable,
) -> Result<Vec<u8>> {
    if entry.kanji.len() > MAX_KANJI_OR_READINGS {
        return Err(DictionaryError::TooManyKanji);
    }
    if entry.readings.len() > MAX_KANJI_OR_READINGS {
        return Err(DictionaryError::TooManyReadings);
    }
    if entry.senses.len() > MAX_SENSES {
        return Err(DictionaryError::TooManySenses);
    }
    debug_assert_eq!(entry.priorities.len(), entry.kanji.len() + entry.readings.len());

    let mut bytes = Vec::with_capacity(
        6 + 6 * (entry.kanji.len() + entry.readings.len()) + 6 * entry.senses.len(),
    );
    bytes.push(((entry.kanji.len() as u8) << 4) | (entry.readings.len() as u8));
    bytes.push(entry.senses.len() as u8);
    bytes.extend_from_slice(&entry.id.to_le_bytes());

    for (writing, priority) in entry.writings() {
        let word_ref = japanese_ref(writing)?;
        bytes.extend_from_slice(&word_ref.to_le_bytes());
        bytes.extend_from_slice(&priority.to_le_bytes());
    }

    for sense in &entry.senses {
        let word_ref = latin_ref(&sense.gloss)?;
        bytes.extend_from_slice(&word_ref.to_le_bytes());
        let pos_set_index = pos_sets.intern(&sense.pos)?;
        let attribute = (sense.language.index() as u16 & 0x7) | ((pos_set_index as u16) << 3);
        bytes.extend_from_slice(&attribute.to_le_bytes());
    }

    Ok(bytes)
}

/// Decode one entry's record starting at `bytes[0]`. Returns the entry and
/// the number of bytes consumed.
pub fn decode_entry(
    bytes: &[u8],
    japanese_word_at: impl Fn(u32) -> Result<String>,
    latin_word_at: impl Fn(u32) -> Result<String>,
    pos_sets: &[u64],
) -> Result<(Entry, usize)> {
    if bytes.len() < 6 {
        return Err(DictionaryError::Truncated { section: "entry record preamble" });
    }
    let kanji_count = (bytes[0] >> 4) as usize;
    let reading_count = (bytes[0] & 0x0F) as usize;
    let sense_count = bytes[1] as usize;
    let id = u32::from_le_bytes(bytes[2..6].try_into().unwrap());

    let writing_count = kanji_count + reading_count;
    let writings_bytes = writing_count * 6;
    let senses_bytes = sense_count * 6;
    let total = 6 + writings_bytes + senses_bytes;
    if bytes.len() < total {
        return Err(DictionaryError::Truncated { section: "entry record" });
    }

    // Pull references into temporary buffers first: decoding words mutates
    // the shared byte-pool cursor state of the word table, so all references
    // must be read out before any decode happens.
    let mut writing_refs: Vec<(u32, u16)> = Vec::with_capacity(writing_count);
    let mut cursor = 6;
    for _ in 0..writing_count {
        let word_ref = u32::from_le_bytes(bytes[cursor..cursor + 4].try_into().unwrap());
        let priority = u16::from_le_bytes(bytes[cursor + 4..cursor + 6].try_into().unwrap());
        writing_refs.push((word_ref, priority));
        cursor += 6;
    }

    let mut sense_refs: Vec<(u32, u16)> = Vec::with_capacity(sense_count);
    for _ in 0..sense_count {
        let word_ref = u32::from_le_bytes(bytes[cursor..cursor + 4].try_into().unwrap());
        let attribute = u16::from_le_bytes(bytes[cursor + 4..cursor + 6].try_into().unwrap());
        sense_refs.push((word_ref, attribute));
        cursor += 6;
    }

    let mut kanji = Vec::with_capacity(kanji_count);
    let mut readings = Vec::with_capacity(reading_count);
    let mut priorities = Vec::with_capacity(writing_count);
    for (i, &(word_ref, priority)) in writing_refs.iter().enumerate() {
        let text = japanese_word_at(word_ref)?;
        if i < kanji_count {
            kanji.push(text);
        } else {
            readings.push(text);
        }
        priorities.push(priority);
    }

    let mut senses = Vec::with_capacity(sense_count);
    for &(word_ref, attribute) in &sense_refs {
        let gloss = latin_word_at(word_ref)?;
        let language_index = (attribute & 0x7) as u8;
        let language = Language::from_index(language_index)
            .ok_or(DictionaryError::OutOfBounds { offset: language_index as usize, len: 8 })?;
        let pos_set_index = (attribute >> 3) as usize;
        let pos_code = *pos_sets
            .get(pos_set_index)
            .ok_or(DictionaryError::OutOfBounds { offset: pos_set_index, len: pos_sets.len() })?;
        senses.push(Sense { language, gloss, pos: decode_pos_set(pos_code) });
    }

    Ok((Entry { id, kanji, readings, priorities, senses }, total))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pos_set_round_trips() {
        let set = vec![PartOfSpeech::IchidanVerb, PartOfSpeech::TransitiveVerb];
        let code = encode_pos_set(&set).unwrap();
        assert_eq!(decode_pos_set(code), set);
    }

    #[test]
    fn pos_set_of_eight_fits_nine_rejected() {
        let eight = vec![PartOfSpeech::CommonNoun; 8];
        assert!(encode_pos_set(&eight).is_ok());
        let nine = vec![PartOfSpeech::CommonNoun; 9];
        assert!(encode_pos_set(&nine).is_err());
    }

    #[test]
    fn entry_round_trips() {
        let entry = Entry {
            id: 42,
            kanji: vec!["日本".into()],
            readings: vec!["にほん".into()],
            priorities: vec![0, 0],
            senses: vec![Sense {
                language: Language::English,
                gloss: "Japan".into(),
                pos: vec![PartOfSpeech::ProperNoun],
            }],
        };
        let mut pos_sets = PosSetTable::default();
        let bytes = encode_entry(
            &entry,
            |_w| Ok(0x1234),
            |_g| Ok(0x5678),
            &mut pos_sets,
        )
        .unwrap();
        let (decoded, consumed) = decode_entry(
            &bytes,
            |r| {
                assert_eq!(r, 0x1234);
                Ok("日本".to_string())
            },
            |r| {
                assert_eq!(r, 0x5678);
                Ok("Japan".to_string())
            },
            pos_sets.codes(),
        )
        .unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded, entry);
    }
}
