//! C1: the character-sequence encoder. Trains a variable-length substitution
//! code from a corpus of strings (§4.1) and encodes/decodes strings to/from
//! bytes through it. One instantiation trains over UTF-16 code units
//! (Japanese), the other over UTF-8 bytes (Latin); the machinery is identical
//! up to the choice of "unit".

use std::collections::HashMap;
use std::hash::Hash;

use crate::error::{DictionaryError, Result};

const MAX_SLOTS: usize = 32_768;
const SINGLE_BYTE_SLOTS: usize = 128;
const MAX_SEQUENCE_LEN: usize = 4;

/// The unit of text the encoder trains over, and how it maps to/from a `str`
/// and to/from the raw bytes persisted in the encoding-table pool (§6).
pub trait UnitCodec {
    type Unit: Copy + Eq + Ord + Hash;

    fn to_units(s: &str) -> Vec<Self::Unit>;
    fn from_units(units: &[Self::Unit]) -> Result<String>;
    fn unit_to_bytes(unit: Self::Unit, out: &mut Vec<u8>);
    fn bytes_to_units(bytes: &[u8]) -> Vec<Self::Unit>;
    fn unit_to_char(unit: Self::Unit) -> char;
}

pub enum Japanese {}

impl UnitCodec for Japanese {
    type Unit = u16;

    fn to_units(s: &str) -> Vec<u16> {
        s.encode_utf16().collect()
    }

    fn from_units(units: &[u16]) -> Result<String> {
        String::from_utf16(units).map_err(|_| DictionaryError::Encoding {
            char: units.first().map(|&u| u as u8 as char).unwrap_or('\u{FFFD}'),
        })
    }

    fn unit_to_bytes(unit: u16, out: &mut Vec<u8>) {
        out.extend_from_slice(&unit.to_le_bytes());
    }

    fn bytes_to_units(bytes: &[u8]) -> Vec<u16> {
        bytes
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect()
    }

    fn unit_to_char(unit: u16) -> char {
        char::from_u32(unit as u32).unwrap_or('\u{FFFD}')
    }
}

pub enum Latin {}

impl UnitCodec for Latin {
    type Unit = u8;

    fn to_units(s: &str) -> Vec<u8> {
        s.as_bytes().to_vec()
    }

    fn from_units(units: &[u8]) -> Result<String> {
        String::from_utf8(units.to_vec()).map_err(|_| DictionaryError::Encoding {
            char: units.first().map(|&b| b as char).unwrap_or('\u{FFFD}'),
        })
    }

    fn unit_to_bytes(unit: u8, out: &mut Vec<u8>) {
        out.push(unit);
    }

    fn bytes_to_units(bytes: &[u8]) -> Vec<u8> {
        bytes.to_vec()
    }

    fn unit_to_char(unit: u8) -> char {
        unit as char
    }
}

/// A trained code table plus the machinery to encode/decode through it.
pub struct CharSequenceEncoder<C: UnitCodec> {
    table: Vec<Vec<C::Unit>>,
    lookup: HashMap<Vec<C::Unit>, u16>,
}

impl<C: UnitCodec> CharSequenceEncoder<C> {
    pub fn train<S: AsRef<str>>(corpus: &[S]) -> Self {
        let words: Vec<Vec<C::Unit>> = corpus.iter().map(|s| C::to_units(s.as_ref())).collect();

        let mut frequency: HashMap<Vec<C::Unit>, u64> = HashMap::new();
        for units in &words {
            for length in 1..=MAX_SEQUENCE_LEN {
                if units.len() < length {
                    continue;
                }
                for window in units.windows(length) {
                    *frequency.entry(window.to_vec()).or_insert(0) += 1;
                }
            }
        }

        let mut ranked: Vec<(Vec<C::Unit>, u64)> = frequency.into_iter().collect();
        ranked.sort_by(|(seq_a, freq_a), (seq_b, freq_b)| {
            let benefit_a = freq_a * seq_a.len() as u64;
            let benefit_b = freq_b * seq_b.len() as u64;
            benefit_b.cmp(&benefit_a).then_with(|| seq_a.cmp(seq_b))
        });

        let mut table: Vec<Vec<C::Unit>> = Vec::new();
        let mut lookup: HashMap<Vec<C::Unit>, u16> = HashMap::new();

        // step 2: first 128 slots get the highest-benefit sequences outright.
        for (seq, _) in ranked.iter().take(SINGLE_BYTE_SLOTS) {
            Self::assign(&mut table, &mut lookup, seq);
        }

        // step 3: continue filling, skipping sequences decomposable from two
        // already-assigned codes.
        for (seq, _) in ranked.iter().skip(SINGLE_BYTE_SLOTS) {
            if table.len() >= MAX_SLOTS {
                break;
            }
            if lookup.contains_key(seq) {
                continue;
            }
            if seq.len() >= 2 && is_decomposable(seq, &lookup) {
                continue;
            }
            Self::assign(&mut table, &mut lookup, seq);
        }

        // step 4: any single character seen in training still without a code
        // gets the next free two-byte slot.
        for (seq, _) in ranked.iter().filter(|(seq, _)| seq.len() == 1) {
            if table.len() >= MAX_SLOTS {
                break;
            }
            if !lookup.contains_key(seq) {
                Self::assign(&mut table, &mut lookup, seq);
            }
        }

        Self { table, lookup }
    }

    fn assign(
        table: &mut Vec<Vec<C::Unit>>,
        lookup: &mut HashMap<Vec<C::Unit>, u16>,
        seq: &[C::Unit],
    ) {
        if table.len() >= MAX_SLOTS {
            return;
        }
        let code = table.len() as u16;
        table.push(seq.to_vec());
        lookup.insert(seq.to_vec(), code);
    }

    pub fn slot_count(&self) -> u16 {
        self.table.len() as u16
    }

    /// Greedy longest-match encode, left to right.
    pub fn encode(&self, s: &str) -> Result<Vec<u8>> {
        let units = C::to_units(s);
        let mut out = Vec::new();
        let mut i = 0;
        while i < units.len() {
            let max_len = MAX_SEQUENCE_LEN.min(units.len() - i);
            let found = (1..=max_len)
                .rev()
                .find_map(|len| self.lookup.get(&units[i..i + len]).map(|&code| (code, len)));
            let (code, len) = found.ok_or(DictionaryError::Encoding {
                char: C::unit_to_char(units[i]),
            })?;
            push_code(code, &mut out);
            i += len;
        }
        Ok(out)
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<String> {
        let mut units: Vec<C::Unit> = Vec::new();
        let mut i = 0;
        while i < bytes.len() {
            let first = bytes[i];
            let code = if first & 0x80 == 0 {
                i += 1;
                first as u16
            } else {
                let second = *bytes
                    .get(i + 1)
                    .ok_or(DictionaryError::Truncated { section: "encoded word" })?;
                i += 2;
                ((first & 0x7F) as u16) | ((second as u16) << 7)
            };
            let seq = self
                .table
                .get(code as usize)
                .ok_or(DictionaryError::OutOfBounds {
                    offset: code as usize,
                    len: self.table.len(),
                })?;
            units.extend_from_slice(seq);
        }
        C::from_units(&units)
    }

    /// Serialize the code table into its on-disk form: the packed
    /// `(pool_start << 8) | length` array and the concatenated sequence pool.
    pub fn serialize_table(&self) -> (Vec<u8>, Vec<u8>) {
        let mut packed = Vec::with_capacity(self.table.len() * 4);
        let mut pool = Vec::new();
        for seq in &self.table {
            let mut seq_bytes = Vec::new();
            for &unit in seq {
                C::unit_to_bytes(unit, &mut seq_bytes);
            }
            let start = pool.len() as u32;
            let len = seq_bytes.len() as u32;
            pool.extend_from_slice(&seq_bytes);
            let packed_value = (start << 8) | (len & 0xFF);
            packed.extend_from_slice(&packed_value.to_le_bytes());
        }
        (packed, pool)
    }

    pub fn deserialize_table(packed: &[u8], pool: &[u8]) -> Result<Self> {
        if packed.len() % 4 != 0 {
            return Err(DictionaryError::Truncated { section: "encoding table" });
        }
        let slot_count = packed.len() / 4;
        let mut table = Vec::with_capacity(slot_count);
        let mut lookup = HashMap::with_capacity(slot_count);
        for i in 0..slot_count {
            let raw = u32::from_le_bytes(packed[i * 4..i * 4 + 4].try_into().unwrap());
            let start = (raw >> 8) as usize;
            let len = (raw & 0xFF) as usize;
            let seq_bytes = pool
                .get(start..start + len)
                .ok_or(DictionaryError::OutOfBounds { offset: start, len: pool.len() })?;
            let seq = C::bytes_to_units(seq_bytes);
            table.push(seq.clone());
            lookup.insert(seq, i as u16);
        }
        Ok(Self { table, lookup })
    }
}

fn is_decomposable<U: Clone + Eq + Hash>(seq: &[U], lookup: &HashMap<Vec<U>, u16>) -> bool {
    (1..seq.len()).any(|split| {
        let (prefix, suffix) = seq.split_at(split);
        lookup.contains_key(prefix) && lookup.contains_key(suffix)
    })
}

fn push_code(code: u16, out: &mut Vec<u8>) {
    if code < SINGLE_BYTE_SLOTS as u16 {
        out.push(code as u8);
    } else {
        let first = 0x80 | ((code & 0x7F) as u8);
        let second = (code >> 7) as u8;
        out.push(first);
        out.push(second);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_training_corpus() {
        let corpus = vec!["日本語", "日本", "日", "東京", "東京都"];
        let encoder = CharSequenceEncoder::<Japanese>::train(&corpus);
        for word in &corpus {
            let encoded = encoder.encode(word).unwrap();
            let decoded = encoder.decode(&encoded).unwrap();
            assert_eq!(&decoded, word);
        }
    }

    #[test]
    fn round_trips_latin_corpus() {
        let corpus = vec!["Japan", "Japanese", "sun", "day", "sunday"];
        let encoder = CharSequenceEncoder::<Latin>::train(&corpus);
        for word in &corpus {
            let encoded = encoder.encode(word).unwrap();
            let decoded = encoder.decode(&encoded).unwrap();
            assert_eq!(&decoded, word);
        }
    }

    #[test]
    fn table_round_trips_through_serialization() {
        let corpus = vec!["日本語", "日本", "東京"];
        let encoder = CharSequenceEncoder::<Japanese>::train(&corpus);
        let (packed, pool) = encoder.serialize_table();
        let restored = CharSequenceEncoder::<Japanese>::deserialize_table(&packed, &pool).unwrap();
        for word in &corpus {
            let encoded = encoder.encode(word).unwrap();
            assert_eq!(restored.decode(&encoded).unwrap(), *word);
        }
    }

    #[test]
    fn first_128_slots_are_single_byte() {
        let corpus = vec!["aaaaaaaaaa", "bbbbbbbbbb", "ab", "ba"];
        let encoder = CharSequenceEncoder::<Latin>::train(&corpus);
        assert!(encoder.slot_count() as usize >= SINGLE_BYTE_SLOTS.min(encoder.table.len()));
    }
}
