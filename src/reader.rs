//! C6: the dictionary reader. Memory-maps the file built by [`crate::writer`],
//! binary-searches the word tables, resolves entry-reference lists, and
//! materializes entries through bounded LRU caches (§4.6).

use std::path::Path;
use std::sync::Mutex;

use memmap2::Mmap;
use tracing::{debug, info};

use crate::cache::Cache;
use crate::encoder::{CharSequenceEncoder, Japanese, Latin, UnitCodec};
use crate::entry_list;
use crate::entry_pool;
use crate::error::{DictionaryError, Result};
use crate::model::{Alphabet, Entry};
use crate::word_table::{aabbcc_cmp, binary_search_by, starts_with_ci};

const WORD_CACHE_CAPACITY: usize = 3_000;
const ENTRY_CACHE_CAPACITY: usize = 3_000;
const BISECTION_CACHE_CAPACITY: usize = 256;

const MAGIC_VERSION_MASK: u32 = 0xFF;
const MAGIC_BASE_MASK: u32 = !MAGIC_VERSION_MASK;

struct AlphabetIndex<C: UnitCodec> {
    encoder: CharSequenceEncoder<C>,
    word_count: usize,
    word_refs_offset: usize,
    pool_offset: usize,
    list_refs_offset: usize,
}

impl<C: UnitCodec> AlphabetIndex<C> {
    fn packed_word_ref(&self, mmap: &[u8], index: usize) -> Result<u32> {
        let start = self.word_refs_offset + index * 4;
        let bytes = mmap
            .get(start..start + 4)
            .ok_or(DictionaryError::OutOfBounds { offset: start, len: mmap.len() })?;
        Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn packed_list_ref(&self, mmap: &[u8], index: usize) -> Result<u32> {
        let start = self.list_refs_offset + index * 4;
        let bytes = mmap
            .get(start..start + 4)
            .ok_or(DictionaryError::OutOfBounds { offset: start, len: mmap.len() })?;
        Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn decode_packed(&self, mmap: &[u8], packed: u32) -> Result<String> {
        let offset = (packed >> 9) as usize;
        let length = (packed & 0x1FF) as usize;
        let start = self.pool_offset + offset;
        let bytes = mmap
            .get(start..start + length)
            .ok_or(DictionaryError::OutOfBounds { offset: start, len: mmap.len() })?;
        self.encoder.decode(bytes)
    }
}

/// A read-only handle onto a dictionary file. All query methods take `&self`
/// and serialize internally on the caches' own locks, matching §5's "callers
/// either hold this lock or instantiate one reader per thread" model by
/// making the lock implicit and per-cache rather than one coarse mutex.
pub struct Reader {
    mmap: Mmap,
    japanese: AlphabetIndex<Japanese>,
    latin: AlphabetIndex<Latin>,
    entry_list_pool_offset: usize,
    entry_pool_offset: usize,
    pos_sets: Vec<u64>,
    word_cache_japanese: Mutex<Cache<usize, String>>,
    word_cache_latin: Mutex<Cache<usize, String>>,
    bisect_cache_japanese: Mutex<Cache<usize, u32>>,
    bisect_cache_latin: Mutex<Cache<usize, u32>>,
    entry_cache: Mutex<Cache<u32, Entry>>,
}

/// One match produced while scanning a prefix, carried through to ranking in
/// [`Reader::search_best`].
struct PrefixMatch {
    word: String,
    entry_offsets: Vec<u32>,
}

/// The outcome of [`Reader::search_best`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub entry: Entry,
    pub word: String,
    pub match_length: usize,
    pub is_full: bool,
    pub is_derived: bool,
    pub doc_offset: usize,
}

impl Reader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        let bytes = &mmap[..];

        let mut cursor = 0usize;
        let (japanese_encoder, japanese_word_count, japanese_pool_length) =
            parse_alphabet_header::<Japanese>(bytes, &mut cursor, Alphabet::Japanese)?;
        let (latin_encoder, latin_word_count, latin_pool_length) =
            parse_alphabet_header::<Latin>(bytes, &mut cursor, Alphabet::Latin)?;

        let entry_list_pool_length = read_u32(bytes, &mut cursor)? as usize;
        let entry_pool_length = read_u32(bytes, &mut cursor)? as usize;
        let pos_set_count = read_u32(bytes, &mut cursor)? as usize;
        let mut pos_sets = Vec::with_capacity(pos_set_count);
        for _ in 0..pos_set_count {
            let raw = bytes
                .get(cursor..cursor + 8)
                .ok_or(DictionaryError::Truncated { section: "POS-set table" })?;
            pos_sets.push(u64::from_le_bytes(raw.try_into().unwrap()));
            cursor += 8;
        }

        let japanese_word_refs_offset = cursor;
        let japanese_pool_offset = japanese_word_refs_offset + japanese_word_count * 4;
        let japanese_list_refs_offset = japanese_pool_offset + japanese_pool_length;
        cursor = japanese_list_refs_offset + japanese_word_count * 4;
        if cursor > bytes.len() {
            return Err(DictionaryError::Truncated { section: "Japanese word table" });
        }

        let latin_word_refs_offset = cursor;
        let latin_pool_offset = latin_word_refs_offset + latin_word_count * 4;
        let latin_list_refs_offset = latin_pool_offset + latin_pool_length;
        cursor = latin_list_refs_offset + latin_word_count * 4;
        if cursor > bytes.len() {
            return Err(DictionaryError::Truncated { section: "Latin word table" });
        }

        let entry_list_pool_offset = cursor;
        cursor += entry_list_pool_length;
        if cursor > bytes.len() {
            return Err(DictionaryError::Truncated { section: "entry-list pool" });
        }
        let entry_pool_offset = cursor;
        if entry_pool_offset + entry_pool_length > bytes.len() {
            return Err(DictionaryError::Truncated { section: "entry record pool" });
        }

        info!(
            path = %path.display(),
            japanese_words = japanese_word_count,
            latin_words = latin_word_count,
            pos_sets = pos_sets.len(),
            "opened dictionary"
        );

        Ok(Self {
            mmap,
            japanese: AlphabetIndex {
                encoder: japanese_encoder,
                word_count: japanese_word_count,
                word_refs_offset: japanese_word_refs_offset,
                pool_offset: japanese_pool_offset,
                list_refs_offset: japanese_list_refs_offset,
            },
            latin: AlphabetIndex {
                encoder: latin_encoder,
                word_count: latin_word_count,
                word_refs_offset: latin_word_refs_offset,
                pool_offset: latin_pool_offset,
                list_refs_offset: latin_list_refs_offset,
            },
            entry_list_pool_offset,
            entry_pool_offset,
            pos_sets,
            word_cache_japanese: Mutex::new(Cache::new(WORD_CACHE_CAPACITY)),
            word_cache_latin: Mutex::new(Cache::new(WORD_CACHE_CAPACITY)),
            bisect_cache_japanese: Mutex::new(Cache::new(BISECTION_CACHE_CAPACITY)),
            bisect_cache_latin: Mutex::new(Cache::new(BISECTION_CACHE_CAPACITY)),
            entry_cache: Mutex::new(Cache::new(ENTRY_CACHE_CAPACITY)),
        })
    }

    pub fn word_count(&self, alphabet: Alphabet) -> usize {
        match alphabet {
            Alphabet::Japanese => self.japanese.word_count,
            Alphabet::Latin => self.latin.word_count,
        }
    }

    fn packed_word_ref_cached(&self, alphabet: Alphabet, index: usize) -> Result<u32> {
        let cache = match alphabet {
            Alphabet::Japanese => &self.bisect_cache_japanese,
            Alphabet::Latin => &self.bisect_cache_latin,
        };
        if let Some(packed) = cache.lock().unwrap().get(&index) {
            return Ok(packed);
        }
        let packed = match alphabet {
            Alphabet::Japanese => self.japanese.packed_word_ref(&self.mmap, index)?,
            Alphabet::Latin => self.latin.packed_word_ref(&self.mmap, index)?,
        };
        cache.lock().unwrap().insert(index, packed);
        Ok(packed)
    }

    /// `getWordAt`.
    pub fn word_at(&self, alphabet: Alphabet, index: usize) -> Result<String> {
        let cache = match alphabet {
            Alphabet::Japanese => &self.word_cache_japanese,
            Alphabet::Latin => &self.word_cache_latin,
        };
        if let Some(word) = cache.lock().unwrap().get(&index) {
            return Ok(word);
        }
        let packed = self.packed_word_ref_cached(alphabet, index)?;
        let word = self.word_at_packed(alphabet, packed)?;
        cache.lock().unwrap().insert(index, word.clone());
        Ok(word)
    }

    /// `word_at_packed`: decode directly from an already-known packed
    /// reference, bypassing the by-index cache.
    pub fn word_at_packed(&self, alphabet: Alphabet, packed: u32) -> Result<String> {
        match alphabet {
            Alphabet::Japanese => self.japanese.decode_packed(&self.mmap, packed),
            Alphabet::Latin => self.latin.decode_packed(&self.mmap, packed),
        }
    }

    /// `getWordIndex`.
    pub fn word_index(&self, alphabet: Alphabet, word: &str) -> isize {
        let count = self.word_count(alphabet);
        binary_search_by(count, |i| self.word_at(alphabet, i).unwrap_or_default(), word)
    }

    fn entry_offsets_for_word_index(&self, alphabet: Alphabet, index: usize) -> Result<Vec<u32>> {
        let packed = match alphabet {
            Alphabet::Japanese => self.japanese.packed_list_ref(&self.mmap, index)?,
            Alphabet::Latin => self.latin.packed_list_ref(&self.mmap, index)?,
        };
        let list_pool_length = self.entry_pool_offset - self.entry_list_pool_offset;
        let pool_bytes = &self.mmap[self.entry_list_pool_offset..self.entry_list_pool_offset + list_pool_length];
        entry_list::decode_list(pool_bytes, packed)
    }

    /// `getEntryAt`.
    pub fn entry_at(&self, offset: u32) -> Result<Entry> {
        if let Some(entry) = self.entry_cache.lock().unwrap().get(&offset) {
            debug!(offset, "entry cache hit");
            return Ok(entry);
        }
        let start = self.entry_pool_offset + offset as usize;
        let bytes = self
            .mmap
            .get(start..)
            .ok_or(DictionaryError::OutOfBounds { offset: start, len: self.mmap.len() })?;
        let (entry, _consumed) = entry_pool::decode_entry(
            bytes,
            |word_ref| self.word_at_packed(Alphabet::Japanese, word_ref),
            |word_ref| self.word_at_packed(Alphabet::Latin, word_ref),
            &self.pos_sets,
        )?;
        self.entry_cache.lock().unwrap().insert(offset, entry.clone());
        Ok(entry)
    }

    /// `getEntriesUsingAll`: entries containing every one of `words` (in
    /// `alphabet`). Returns an empty list if any word is absent.
    pub fn entries_using_all(&self, alphabet: Alphabet, words: &[&str]) -> Result<Vec<Entry>> {
        let mut offset_sets: Vec<Vec<u32>> = Vec::with_capacity(words.len());
        for &word in words {
            let index = self.word_index(alphabet, word);
            if index < 0 {
                return Ok(Vec::new());
            }
            offset_sets.push(self.entry_offsets_for_word_index(alphabet, index as usize)?);
        }
        let Some((first, rest)) = offset_sets.split_first() else {
            return Ok(Vec::new());
        };
        let mut intersection: Vec<u32> = first.clone();
        for set in rest {
            intersection.retain(|offset| set.contains(offset));
        }
        intersection.into_iter().map(|offset| self.entry_at(offset)).collect()
    }

    /// `getEntriesUsingPrefix`: scans the sorted word array forward from the
    /// insertion point of `prefix`, shortening by one character and retrying
    /// if nothing matched, using the same comparator for both ordering and
    /// scan-termination (per spec.md §9's case-sensitivity caveat).
    fn matches_for_prefix(&self, alphabet: Alphabet, prefix: &str) -> Result<(String, Vec<PrefixMatch>)> {
        let mut candidate = prefix;
        loop {
            let matches = self.scan_prefix(alphabet, candidate)?;
            if !matches.is_empty() || candidate.is_empty() {
                return Ok((candidate.to_string(), matches));
            }
            let shortened_len = candidate.char_indices().last().map(|(i, _)| i).unwrap_or(0);
            candidate = &candidate[..shortened_len];
        }
    }

    fn scan_prefix(&self, alphabet: Alphabet, prefix: &str) -> Result<Vec<PrefixMatch>> {
        if prefix.is_empty() {
            return Ok(Vec::new());
        }
        let count = self.word_count(alphabet);
        let insertion = self.word_index(alphabet, prefix);
        let mut index = if insertion >= 0 { insertion as usize } else { !insertion as usize };
        let mut matches = Vec::new();
        while index < count {
            let word = self.word_at(alphabet, index)?;
            if !starts_with_ci(&word, prefix) {
                break;
            }
            let entry_offsets = self.entry_offsets_for_word_index(alphabet, index)?;
            matches.push(PrefixMatch { word, entry_offsets });
            index += 1;
        }
        Ok(matches)
    }

    pub fn entries_using_prefix(&self, alphabet: Alphabet, prefix: &str) -> Result<Vec<Entry>> {
        let (_matched_prefix, matches) = self.matches_for_prefix(alphabet, prefix)?;
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for m in matches {
            for offset in m.entry_offsets {
                if seen.insert(offset) {
                    out.push(self.entry_at(offset)?);
                }
            }
        }
        Ok(out)
    }

    /// `searchBest`. Classifies the query's first character to pick an
    /// alphabet, then ranks every candidate among the (possibly shortened)
    /// prefix matches. `is_derived` is always `false`: recognizing
    /// algorithmically-derived inflections is outside this crate (§1's
    /// "language-independent text analysis" non-goal).
    pub fn search_best(&self, query: &str, doc_offset: usize) -> Result<Option<SearchResult>> {
        let Some(first) = query.chars().next() else {
            return Ok(None);
        };
        let alphabet = if is_japanese_char(first) { Alphabet::Japanese } else { Alphabet::Latin };
        let (matched_prefix, matches) = self.matches_for_prefix(alphabet, query)?;
        if matched_prefix.is_empty() {
            return Ok(None);
        }

        let mut best: Option<(Entry, &PrefixMatch, bool, u32)> = None;
        for m in &matches {
            let is_full = aabbcc_cmp(&m.word, &matched_prefix) == std::cmp::Ordering::Equal;
            for &offset in &m.entry_offsets {
                let entry = self.entry_at(offset)?;
                let rank = rank_key(is_full, matched_prefix.chars().count(), m.word.chars().count());
                let replace = match &best {
                    None => true,
                    Some((_, _, _, best_rank)) => rank < *best_rank,
                };
                if replace {
                    best = Some((entry, m, is_full, rank));
                }
            }
        }

        Ok(best.map(|(entry, m, is_full, _)| SearchResult {
            entry,
            word: m.word.clone(),
            match_length: matched_prefix.chars().count(),
            is_full,
            is_derived: false,
            doc_offset,
        }))
    }
}

/// Lower is better: full match first, then longer matched prefix, then
/// shorter stored word (per §4.6's ranking rules; derived-ness is constant
/// here so it drops out of the key).
fn rank_key(is_full: bool, match_length: usize, word_length: usize) -> u32 {
    let full_rank = if is_full { 0 } else { 1 };
    let length_rank = (u16::MAX as u32).saturating_sub(match_length as u32);
    (full_rank << 24) | (length_rank << 8) | (word_length as u32 & 0xFF)
}

fn is_japanese_char(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{309F}' // hiragana
        | '\u{30A0}'..='\u{30FF}' // katakana
        | '\u{4E00}'..='\u{9FFF}' // CJK unified ideographs
        | '\u{3400}'..='\u{4DBF}' // CJK extension A
    )
}

/// Parses one alphabet's header (magic through encoding-table text) and
/// advances `cursor` past it. Returns the reconstructed encoder, word count,
/// and word byte-pool length (the two counts needed to locate the mmap body
/// sections that follow the fixed header).
fn parse_alphabet_header<C: UnitCodec>(
    bytes: &[u8],
    cursor: &mut usize,
    alphabet: Alphabet,
) -> Result<(CharSequenceEncoder<C>, usize, usize)> {
    let found_magic = read_u32(bytes, cursor)?;
    let expected_magic = alphabet.magic();
    // The low byte of the magic number is a version counter (§6); a mismatch
    // there is a version problem, not a corrupt-file one.
    if found_magic & MAGIC_BASE_MASK != expected_magic & MAGIC_BASE_MASK {
        return Err(DictionaryError::BadMagic { alphabet: alphabet.name(), expected: expected_magic, found: found_magic });
    }
    if found_magic & MAGIC_VERSION_MASK != expected_magic & MAGIC_VERSION_MASK {
        return Err(DictionaryError::UnsupportedVersion { found: found_magic & MAGIC_VERSION_MASK });
    }
    let word_count = read_u32(bytes, cursor)? as usize;
    let pool_length = read_u32(bytes, cursor)? as usize;
    let table_byte_length = read_u32(bytes, cursor)? as usize;
    let slot_count = {
        let slice = bytes
            .get(*cursor..*cursor + 2)
            .ok_or(DictionaryError::Truncated { section: "encoding-table slot count" })?;
        *cursor += 2;
        u16::from_le_bytes(slice.try_into().unwrap()) as usize
    };
    let table_packed_len = slot_count * 4;
    let table_packed = bytes
        .get(*cursor..*cursor + table_packed_len)
        .ok_or(DictionaryError::Truncated { section: "encoding table" })?;
    *cursor += table_packed_len;
    let table_pool = bytes
        .get(*cursor..*cursor + table_byte_length)
        .ok_or(DictionaryError::Truncated { section: "encoding table text" })?;
    *cursor += table_byte_length;

    let encoder = CharSequenceEncoder::<C>::deserialize_table(table_packed, table_pool)?;
    Ok((encoder, word_count, pool_length))
}

fn read_u32(bytes: &[u8], cursor: &mut usize) -> Result<u32> {
    let slice = bytes
        .get(*cursor..*cursor + 4)
        .ok_or(DictionaryError::Truncated { section: "header" })?;
    *cursor += 4;
    Ok(u32::from_le_bytes(slice.try_into().unwrap()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sense;
    use crate::writer;
    use toranomaki_enums::{Language, PartOfSpeech};

    fn fixture() -> Vec<Entry> {
        vec![
            Entry {
                id: 1,
                kanji: vec!["日本".into()],
                readings: vec!["にほん".into()],
                priorities: vec![0, 0],
                senses: vec![Sense { language: Language::English, gloss: "Japan".into(), pos: vec![PartOfSpeech::ProperNoun] }],
            },
            Entry {
                id: 2,
                kanji: vec!["日".into()],
                readings: vec!["ひ".into()],
                priorities: vec![0, 0],
                senses: vec![
                    Sense { language: Language::English, gloss: "sun".into(), pos: vec![PartOfSpeech::CommonNoun] },
                    Sense { language: Language::English, gloss: "day".into(), pos: vec![PartOfSpeech::CommonNoun] },
                ],
            },
        ]
    }

    fn open_fixture() -> (tempfile::TempDir, Reader) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("JMdict.dat");
        writer::write_to_file(&path, &fixture(), false).unwrap();
        let reader = Reader::open(&path).unwrap();
        (dir, reader)
    }

    #[test]
    fn every_japanese_word_round_trips_through_its_index() {
        let (_dir, reader) = open_fixture();
        for word in ["日本", "にほん", "日", "ひ"] {
            let idx = reader.word_index(Alphabet::Japanese, word);
            assert!(idx >= 0, "expected {word} to be found");
            assert_eq!(reader.word_at(Alphabet::Japanese, idx as usize).unwrap(), word);
        }
    }

    #[test]
    fn entries_using_all_finds_the_owning_entry() {
        let (_dir, reader) = open_fixture();
        let entries = reader.entries_using_all(Alphabet::Japanese, &["日本"]).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, 1);
    }

    #[test]
    fn entries_using_prefix_orders_by_priority_then_id() {
        let (_dir, reader) = open_fixture();
        let entries = reader.entries_using_prefix(Alphabet::Japanese, "日").unwrap();
        let ids: Vec<u32> = entries.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn missing_word_returns_negative_insertion_point() {
        let (_dir, reader) = open_fixture();
        let idx = reader.word_index(Alphabet::Latin, "Zzzz");
        assert!(idx < 0);
        let insertion_point = !idx;
        assert!((0..=reader.word_count(Alphabet::Latin) as isize).contains(&insertion_point));
    }

    #[test]
    fn search_best_picks_the_longer_prefix_match() {
        let (_dir, reader) = open_fixture();
        let result = reader.search_best("日本語", 0).unwrap().unwrap();
        assert!(result.word.starts_with("日本") || result.word == "日");
        assert_eq!(result.doc_offset, 0);
    }

    #[test]
    fn search_best_on_empty_query_returns_none() {
        let (_dir, reader) = open_fixture();
        assert!(reader.search_best("", 0).unwrap().is_none());
    }

    #[test]
    fn mismatched_version_byte_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("JMdict.dat");
        writer::write_to_file(&path, &fixture(), false).unwrap();
        let mut bytes = std::fs::read(&path).unwrap();
        bytes[0] ^= 0xFF; // low byte of the first alphabet's magic number
        std::fs::write(&path, &bytes).unwrap();
        assert!(matches!(Reader::open(&path), Err(DictionaryError::UnsupportedVersion { .. })));
    }

    #[test]
    fn truncated_word_table_is_rejected_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("JMdict.dat");
        writer::write_to_file(&path, &fixture(), false).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        // Cut the file off partway through the body, well past both alphabet
        // headers but before the sections they describe are complete.
        let truncated = &bytes[..bytes.len() / 2];
        std::fs::write(&path, truncated).unwrap();
        assert!(matches!(Reader::open(&path), Err(DictionaryError::Truncated { .. })));
    }
}
