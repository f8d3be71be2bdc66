//! Minimal line-delimited-JSON entry reader. Stands in for the out-of-scope
//! JMdict XML ingest collaborator (spec §1): just enough to hand the writer a
//! `Vec<Entry>` for a demonstration build or a test fixture.

use std::io::BufRead;
use std::path::Path;

use serde::Deserialize;

use crate::error::{DictionaryError, Result};
use crate::model::{Entry, Sense};
use toranomaki_enums::{Language, PartOfSpeech};

#[derive(Deserialize)]
struct RawEntry {
    id: u32,
    #[serde(default)]
    kanji: Vec<String>,
    readings: Vec<String>,
    #[serde(default)]
    priorities: Vec<u16>,
    senses: Vec<RawSense>,
}

#[derive(Deserialize)]
struct RawSense {
    #[serde(default = "default_language")]
    language: String,
    gloss: String,
    #[serde(default)]
    pos: Vec<String>,
}

fn default_language() -> String {
    "eng".to_string()
}

/// Reads one JSON object per line into an [`Entry`]. POS tags may be given
/// either as EDICT codes (`"v1"`) or full EDICT descriptions (parsed through
/// [`toranomaki_enums::parse_edict`]).
pub fn read_entries_jsonl(path: &Path) -> Result<Vec<Entry>> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    let mut entries = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let raw: RawEntry = serde_json::from_str(&line)
            .map_err(|_| DictionaryError::InvalidArgument("malformed entry JSON line"))?;
        entries.push(convert_entry(raw)?);
    }
    Ok(entries)
}

fn convert_entry(raw: RawEntry) -> Result<Entry> {
    let writing_count = raw.kanji.len() + raw.readings.len();
    let priorities = if raw.priorities.is_empty() {
        vec![0; writing_count]
    } else {
        raw.priorities
    };
    if priorities.len() != writing_count {
        return Err(DictionaryError::InvalidArgument("priorities length must match kanji+readings"));
    }

    let senses = raw
        .senses
        .into_iter()
        .map(convert_sense)
        .collect::<Result<Vec<_>>>()?;

    Ok(Entry { id: raw.id, kanji: raw.kanji, readings: raw.readings, priorities, senses })
}

fn convert_sense(raw: RawSense) -> Result<Sense> {
    let language = Language::from_code(&raw.language)
        .ok_or(DictionaryError::InvalidArgument("unrecognized gloss language code"))?;
    let pos = raw
        .pos
        .iter()
        .map(|tag| {
            PartOfSpeech::from_code(tag)
                .or_else(|| toranomaki_enums::parse_edict(tag).ok())
                .ok_or(DictionaryError::InvalidArgument("unrecognized part-of-speech tag"))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Sense { language, gloss: raw.gloss, pos })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_one_entry_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entries.jsonl");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"{{"id":1,"kanji":["日本"],"readings":["にほん"],"senses":[{{"gloss":"Japan","pos":["n-pr"]}}]}}"#
        )
        .unwrap();
        let entries = read_entries_jsonl(&path).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, 1);
        assert_eq!(entries[0].senses[0].pos, vec![PartOfSpeech::ProperNoun]);
    }

    #[test]
    fn rejects_priority_length_mismatch() {
        let raw = RawEntry {
            id: 1,
            kanji: vec!["日".into()],
            readings: vec!["ひ".into()],
            priorities: vec![0],
            senses: vec![],
        };
        assert!(convert_entry(raw).is_err());
    }
}
