//! C2: the sorted word table. Comparator, prefix/suffix byte-sharing dedup,
//! and the write-side builder. The read-side view lives in [`crate::reader`]
//! since it is a thin layer over the memory-mapped file, but it shares the
//! comparator and binary-search routine defined here (per the §9 note that
//! ordering and scan-termination must use the *same* comparator).

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::encoder::{CharSequenceEncoder, UnitCodec};
use crate::error::{DictionaryError, Result};

/// Compare two words upper-cased first, then lower-cased, then raw code
/// points, then length — so that case variants of the same word sort
/// adjacently (§4.2).
pub fn aabbcc_cmp(a: &str, b: &str) -> Ordering {
    upper(a)
        .cmp(&upper(b))
        .then_with(|| lower(a).cmp(&lower(b)))
        .then_with(|| a.cmp(b))
        .then_with(|| a.chars().count().cmp(&b.chars().count()))
}

fn upper(s: &str) -> String {
    s.chars().flat_map(char::to_uppercase).collect()
}

fn lower(s: &str) -> String {
    s.chars().flat_map(char::to_lowercase).collect()
}

/// Prefix check using the same case folding as [`aabbcc_cmp`]. Using a
/// case-sensitive `starts_with` here would reproduce the source bug noted in
/// spec §9 where scan-termination disagreed with the ordering comparator.
pub fn starts_with_ci(word: &str, prefix: &str) -> bool {
    upper(word).starts_with(&upper(prefix))
}

/// Binary search over `count` words accessed through `get`, ordered by
/// [`aabbcc_cmp`]. Returns the index on an exact match, or the bitwise-NOT of
/// the insertion point otherwise — the same convention `Vec::binary_search`
/// uses, spelled out explicitly because callers persist the sign bit.
pub fn binary_search_by<F: FnMut(usize) -> String>(count: usize, mut get: F, target: &str) -> isize {
    if count == 0 {
        return !0;
    }
    let mut lo: isize = 0;
    let mut hi: isize = count as isize - 1;
    while lo <= hi {
        let mid = lo + (hi - lo) / 2;
        let word = get(mid as usize);
        match aabbcc_cmp(&word, target) {
            Ordering::Equal => return mid,
            Ordering::Less => lo = mid + 1,
            Ordering::Greater => hi = mid - 1,
        }
    }
    !lo
}

/// Collapse `items` by byte-containment adjacency under `keys` (which may be
/// `items` itself for prefix-sharing, or each item's reversed bytes for
/// suffix-sharing). Returns the indices of `items` chosen as storage roots
/// (in first-seen order) and, per original item, which root it resolved to.
fn collapse_by_adjacency(keys: &[Vec<u8>]) -> (Vec<usize>, Vec<usize>) {
    let n = keys.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| keys[a].cmp(&keys[b]));

    let mut next: Vec<Option<usize>> = vec![None; n];
    for i in 0..n.saturating_sub(1) {
        let (cur, nxt) = (order[i], order[i + 1]);
        if keys[nxt].len() > keys[cur].len() && keys[nxt].starts_with(&keys[cur]) {
            next[i] = Some(i + 1);
        }
    }
    let root_pos = resolve_chains(&next);

    let mut root_item_indices: Vec<usize> = Vec::new();
    let mut pos_to_root: HashMap<usize, usize> = HashMap::new();
    for &pos in &root_pos {
        pos_to_root.entry(pos).or_insert_with(|| {
            let idx = root_item_indices.len();
            root_item_indices.push(order[pos]);
            idx
        });
    }

    let mut mapping = vec![0usize; n];
    for i in 0..n {
        mapping[order[i]] = pos_to_root[&root_pos[i]];
    }
    (root_item_indices, mapping)
}

/// Each chain link only ever points from position `i` to `i + 1`, so no
/// cycles are possible; an explicit stack avoids deep recursion on long runs
/// of shared prefixes/suffixes.
fn resolve_chains(next: &[Option<usize>]) -> Vec<usize> {
    let n = next.len();
    let mut root = vec![usize::MAX; n];
    for start in 0..n {
        if root[start] != usize::MAX {
            continue;
        }
        let mut path = Vec::new();
        let mut cur = start;
        loop {
            if root[cur] != usize::MAX {
                break;
            }
            path.push(cur);
            match next[cur] {
                Some(j) => cur = j,
                None => break,
            }
        }
        let final_root = if root[cur] != usize::MAX { root[cur] } else { cur };
        for p in path {
            root[p] = final_root;
        }
    }
    root
}

/// Write-side word table: distinct words, sorted, encoded, byte-shared, and
/// assigned packed `(offset << 9) | length` references.
pub struct WordTable<C: UnitCodec> {
    pub words: Vec<String>,
    pub packed: Vec<u32>,
    pub pool: Vec<u8>,
    pub encoder: CharSequenceEncoder<C>,
}

impl<C: UnitCodec> WordTable<C> {
    pub fn build(mut words: Vec<String>) -> Result<Self> {
        words.sort_unstable();
        words.dedup();
        words.sort_by(|a, b| aabbcc_cmp(a, b));

        let encoder = CharSequenceEncoder::<C>::train(&words);
        let encoded: Vec<Vec<u8>> = words
            .iter()
            .map(|w| encoder.encode(w))
            .collect::<Result<_>>()?;

        // prefix-sharing: offset within parent is always 0.
        let (prefix_roots, prefix_mapping) = collapse_by_adjacency(&encoded);
        let prefix_root_bytes: Vec<Vec<u8>> =
            prefix_roots.iter().map(|&i| encoded[i].clone()).collect();

        // suffix-sharing over the remaining fragments.
        let reversed: Vec<Vec<u8>> = prefix_root_bytes
            .iter()
            .map(|b| b.iter().rev().copied().collect())
            .collect();
        let (suffix_roots, suffix_mapping) = collapse_by_adjacency(&reversed);
        let suffix_root_bytes: Vec<Vec<u8>> = suffix_roots
            .iter()
            .map(|&i| prefix_root_bytes[i].clone())
            .collect();

        let mut pool = Vec::new();
        let mut pool_offset_of_root = Vec::with_capacity(suffix_root_bytes.len());
        for bytes in &suffix_root_bytes {
            pool_offset_of_root.push(pool.len() as u32);
            pool.extend_from_slice(bytes);
        }

        let mut packed = Vec::with_capacity(words.len());
        for (i, word_bytes) in encoded.iter().enumerate() {
            let prefix_root_idx = prefix_mapping[i];
            let suffix_root_idx = suffix_mapping[prefix_root_idx];
            // `word_bytes` sits at the head of its prefix-root (offset 0
            // there), and that prefix-root sits at the tail of the final
            // suffix-root, so its offset within the suffix-root is the
            // length difference between the two roots, not between the
            // suffix-root and the word itself.
            let root_len = suffix_root_bytes[suffix_root_idx].len() as u32;
            let prefix_root_len = prefix_root_bytes[prefix_root_idx].len() as u32;
            let offset_in_root = root_len - prefix_root_len;
            let final_offset = pool_offset_of_root[suffix_root_idx] + offset_in_root;
            let length = word_bytes.len() as u32;
            if length >= 512 {
                return Err(DictionaryError::WordTooLong);
            }
            if (final_offset as usize) + length as usize > pool.len() {
                return Err(DictionaryError::PoolOverflow);
            }
            packed.push((final_offset << 9) | length);
        }

        Ok(Self { words, packed, pool, encoder })
    }

    pub fn offset_of(&self, word: &str) -> isize {
        binary_search_by(self.words.len(), |i| self.words[i].clone(), word)
    }

    pub fn word_at(&self, index: usize) -> Result<String> {
        self.word_at_packed(self.packed[index])
    }

    pub fn word_at_packed(&self, packed: u32) -> Result<String> {
        let offset = (packed >> 9) as usize;
        let length = (packed & 0x1FF) as usize;
        let bytes = self
            .pool
            .get(offset..offset + length)
            .ok_or(DictionaryError::OutOfBounds { offset, len: self.pool.len() })?;
        self.encoder.decode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::Latin;

    #[test]
    fn comparator_groups_case_variants() {
        let mut words = vec!["banana", "Apple", "apple", "Banana", "apply"];
        words.sort_by(|a, b| aabbcc_cmp(a, b));
        assert_eq!(words, ["Apple", "apple", "apply", "Banana", "banana"]);
    }

    #[test]
    fn every_word_round_trips_through_its_packed_reference() {
        let words: Vec<String> = ["day", "Japan", "Japanese", "sun", "sunday", "sunny"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let table = WordTable::<Latin>::build(words.clone()).unwrap();
        for word in &words {
            let idx = table.offset_of(word);
            assert!(idx >= 0, "expected {word} to be found");
            assert_eq!(&table.word_at(idx as usize).unwrap(), word);
        }
    }

    #[test]
    fn prefix_and_suffix_sharing_collapses_the_pool() {
        // Each word encodes to more than one byte (the Latin codec trains one
        // code per distinct input character, so reusing "t"/"e"/"s" etc.
        // across these words keeps their per-word encodings multi-byte) and
        // shares real byte-level prefixes/suffixes with its neighbors:
        // "test" is a byte-prefix of "testing", and "contest" ends in the
        // same bytes as "test".
        let words: Vec<String> = ["test", "testing", "contest", "tester"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let table = WordTable::<Latin>::build(words.clone()).unwrap();

        let unshared_length: usize = words
            .iter()
            .map(|w| table.encoder.encode(w).unwrap().len())
            .sum();
        assert!(
            table.pool.len() < unshared_length,
            "expected sharing to shrink the pool below {unshared_length}, got {}",
            table.pool.len()
        );

        for word in &words {
            let idx = table.offset_of(word);
            assert!(idx >= 0, "expected {word} to be found");
            assert_eq!(&table.word_at(idx as usize).unwrap(), word);
        }
    }

    #[test]
    fn missing_word_returns_negative_insertion_point() {
        let words: Vec<String> = ["apple", "banana"].iter().map(|s| s.to_string()).collect();
        let table = WordTable::<Latin>::build(words).unwrap();
        let idx = table.offset_of("Zzzz");
        assert!(idx < 0);
        let insertion_point = !idx;
        assert!((0..=table.words.len() as isize).contains(&insertion_point));
    }
}
