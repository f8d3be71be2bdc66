//! C5: the dictionary writer. Single pass, no back-patching, per §4.5's seven
//! write-order steps.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::encoder::{Japanese, Latin};
use crate::entry_list::{self, EntryListPool};
use crate::entry_pool::{self, PosSetTable};
use crate::error::{DictionaryError, Result};
use crate::model::Entry;
use crate::priority;
use crate::reader::Reader;
use crate::word_table::WordTable;

/// Source of entries handed to the writer. Stands in for the out-of-scope
/// XML-ingest collaborator: anything that can produce an immutable entry list
/// can drive a build.
pub trait DictionarySource {
    fn entries(&self) -> Result<Vec<Entry>>;
}

impl DictionarySource for Vec<Entry> {
    fn entries(&self) -> Result<Vec<Entry>> {
        Ok(self.clone())
    }
}

/// Build the in-memory file image for `entries` (§4.5 steps 1-6; step 7's
/// byte layout is produced here too, since nothing in this format requires a
/// second pass once every section's length is known).
pub fn build(entries: &[Entry]) -> Result<Vec<u8>> {
    info!(count = entries.len(), "building dictionary from entries");
    priority::verify_no_collisions()?;

    // Steps 1 & 3 (Japanese half): collect every kanji/reading string.
    let mut japanese_words: Vec<String> = Vec::new();
    for entry in entries {
        japanese_words.extend(entry.kanji.iter().cloned());
        japanese_words.extend(entry.readings.iter().cloned());
    }
    let japanese_table = WordTable::<Japanese>::build(japanese_words)?;
    debug!(
        words = japanese_table.words.len(),
        pool_bytes = japanese_table.pool.len(),
        slots = japanese_table.encoder.slot_count(),
        "trained Japanese word table"
    );

    // Steps 2 & 3 (Latin half): collect every gloss string.
    let mut latin_words: Vec<String> = Vec::new();
    for entry in entries {
        for sense in &entry.senses {
            latin_words.push(sense.gloss.clone());
        }
    }
    let latin_table = WordTable::<Latin>::build(latin_words)?;
    debug!(
        words = latin_table.words.len(),
        pool_bytes = latin_table.pool.len(),
        slots = latin_table.encoder.slot_count(),
        "trained Latin word table"
    );

    let japanese_packed_by_word: HashMap<&str, u32> = japanese_table
        .words
        .iter()
        .map(String::as_str)
        .zip(japanese_table.packed.iter().copied())
        .collect();
    let latin_packed_by_word: HashMap<&str, u32> = latin_table
        .words
        .iter()
        .map(String::as_str)
        .zip(latin_table.packed.iter().copied())
        .collect();

    // Step 4: per-word entry-id lists, sorted by priority ascending then id.
    let japanese_lists = build_japanese_lists(entries, &japanese_table);
    let latin_lists = build_latin_lists(entries, &latin_table);

    let japanese_list_pool = entry_list::build(&japanese_lists)?;
    let latin_list_pool = entry_list::build(&latin_lists)?;
    info!(
        japanese_lists = japanese_lists.len(),
        latin_lists = latin_lists.len(),
        "built entry-list pools"
    );

    // Steps 5 & 6: enumerate POS sets while walking entries to compute
    // offsets; no bytes are written to the output yet, only accumulated.
    let mut pos_sets = PosSetTable::default();
    let mut entry_pool_bytes: Vec<u8> = Vec::new();
    let mut offset_of_entry: HashMap<u32, u32> = HashMap::with_capacity(entries.len());
    for entry in entries {
        let offset = entry_pool_bytes.len() as u32;
        offset_of_entry.insert(entry.id, offset);
        let bytes = entry_pool::encode_entry(
            entry,
            |word| {
                japanese_packed_by_word
                    .get(word)
                    .copied()
                    .ok_or(DictionaryError::InvalidArgument("unknown Japanese word"))
            },
            |word| {
                latin_packed_by_word
                    .get(word)
                    .copied()
                    .ok_or(DictionaryError::InvalidArgument("unknown Latin word"))
            },
            &mut pos_sets,
        )?;
        entry_pool_bytes.extend_from_slice(&bytes);
    }
    info!(
        entries = entries.len(),
        pos_sets = pos_sets.codes().len(),
        entry_pool_bytes = entry_pool_bytes.len(),
        "encoded entry record pool"
    );

    // Both alphabets' word→list references point into one combined
    // entry-list pool (§6 names it once, singular); Latin's element offsets
    // are shifted past the Japanese elements that precede them in the pool.
    let japanese_element_count = japanese_list_pool.id_pool.len() as u32;
    let shifted_latin_word_refs: Vec<u32> = latin_list_pool
        .word_refs
        .iter()
        .map(|&packed| {
            let elem_offset = (packed >> 8) + japanese_element_count;
            let count = packed & 0xFF;
            (elem_offset << 8) | count
        })
        .collect();

    let japanese_list_bytes = entry_list::render_pool_bytes(&japanese_list_pool.id_pool, &offset_of_entry)?;
    let latin_list_bytes = entry_list::render_pool_bytes(&latin_list_pool.id_pool, &offset_of_entry)?;
    let combined_list_pool_bytes = japanese_list_bytes.len() + latin_list_bytes.len();

    // Step 7: assemble the final byte layout per §6.
    let mut out = Vec::new();
    write_alphabet_header(&mut out, &japanese_table, crate::model::Alphabet::Japanese);
    write_alphabet_header(&mut out, &latin_table, crate::model::Alphabet::Latin);

    out.extend_from_slice(&(combined_list_pool_bytes as u32).to_le_bytes());
    out.extend_from_slice(&(entry_pool_bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(&(pos_sets.codes().len() as u32).to_le_bytes());
    for &code in pos_sets.codes() {
        out.extend_from_slice(&code.to_le_bytes());
    }

    write_alphabet_body(&mut out, &japanese_table, &japanese_list_pool.word_refs);
    write_alphabet_body(&mut out, &latin_table, &shifted_latin_word_refs);

    out.extend_from_slice(&japanese_list_bytes);
    out.extend_from_slice(&latin_list_bytes);
    out.extend_from_slice(&entry_pool_bytes);

    Ok(out)
}

fn build_japanese_lists<C>(entries: &[Entry], table: &WordTable<C>) -> Vec<Vec<u32>>
where
    C: crate::encoder::UnitCodec,
{
    let mut by_word: HashMap<&str, Vec<(u32, u32)>> = HashMap::new();
    for entry in entries {
        for (writing, priority_code) in entry.writings() {
            by_word
                .entry(writing)
                .or_default()
                .push((priority::sort_rank(priority_code), entry.id));
        }
    }
    table
        .words
        .iter()
        .map(|word| {
            let mut list = by_word.get(word.as_str()).cloned().unwrap_or_default();
            list.sort_by_key(|&(rank, id)| (rank, id));
            list.dedup();
            list.into_iter().map(|(_, id)| id).collect()
        })
        .collect()
}

fn build_latin_lists<C>(entries: &[Entry], table: &WordTable<C>) -> Vec<Vec<u32>>
where
    C: crate::encoder::UnitCodec,
{
    let mut by_word: HashMap<&str, Vec<u32>> = HashMap::new();
    for entry in entries {
        for sense in &entry.senses {
            by_word.entry(sense.gloss.as_str()).or_default().push(entry.id);
        }
    }
    table
        .words
        .iter()
        .map(|word| {
            let mut list = by_word.get(word.as_str()).cloned().unwrap_or_default();
            list.sort_unstable();
            list.dedup();
            list
        })
        .collect()
}

fn write_alphabet_header<C: crate::encoder::UnitCodec>(
    out: &mut Vec<u8>,
    table: &WordTable<C>,
    alphabet: crate::model::Alphabet,
) {
    let (table_packed, table_pool) = table.encoder.serialize_table();
    out.extend_from_slice(&alphabet.magic().to_le_bytes());
    out.extend_from_slice(&(table.words.len() as u32).to_le_bytes());
    out.extend_from_slice(&(table.pool.len() as u32).to_le_bytes());
    out.extend_from_slice(&(table_pool.len() as u32).to_le_bytes());
    out.extend_from_slice(&(table.encoder.slot_count()).to_le_bytes());
    out.extend_from_slice(&table_packed);
    out.extend_from_slice(&table_pool);
}

fn write_alphabet_body<C: crate::encoder::UnitCodec>(
    out: &mut Vec<u8>,
    table: &WordTable<C>,
    list_refs: &[u32],
) {
    for &packed in &table.packed {
        out.extend_from_slice(&packed.to_le_bytes());
    }
    out.extend_from_slice(&table.pool);
    for &list_ref in list_refs {
        out.extend_from_slice(&list_ref.to_le_bytes());
    }
}

/// Build and write `path`. When `verify` is set, re-opens the file through
/// [`Reader`] and checks every word round-trips (§4.5's verification mode).
pub fn write_to_file<S: DictionarySource>(path: &Path, source: &S, verify: bool) -> Result<()> {
    let entries = source.entries()?;
    let bytes = build(&entries)?;
    let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
    file.write_all(&bytes)?;
    file.flush()?;
    info!(path = %path.display(), bytes = bytes.len(), "wrote dictionary file");

    if verify {
        verify_roundtrip(path)?;
    }
    Ok(())
}

fn verify_roundtrip(path: &Path) -> Result<()> {
    let reader = Reader::open(path)?;
    for alphabet in [crate::model::Alphabet::Japanese, crate::model::Alphabet::Latin] {
        for index in 0..reader.word_count(alphabet) {
            let word = reader.word_at(alphabet, index)?;
            let found = reader.word_index(alphabet, &word);
            if found < 0 {
                warn!(%word, "verification: word not found by its own index");
                return Err(DictionaryError::OutOfBounds { offset: index, len: reader.word_count(alphabet) });
            }
            let roundtripped = reader.word_at(alphabet, found as usize)?;
            if roundtripped != word {
                warn!(%word, %roundtripped, "verification mismatch");
                return Err(DictionaryError::OutOfBounds { offset: index, len: reader.word_count(alphabet) });
            }
        }
    }
    info!("verification passed: every word round-trips");
    Ok(())
}
