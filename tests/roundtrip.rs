//! End-to-end build -> write -> mmap -> read cycle against a real temp file,
//! covering the concrete scenarios of spec.md §8.

use toranomaki::model::{Alphabet, Entry, Sense};
use toranomaki::reader::Reader;
use toranomaki::writer;
use toranomaki_enums::{Language, PartOfSpeech};

fn fixture_entries() -> Vec<Entry> {
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
        Entry {
            id: 3,
            kanji: vec!["食べる".into()],
            readings: vec!["たべる".into()],
            priorities: vec![0, 0],
            senses: vec![Sense {
                language: Language::English,
                gloss: "to eat".into(),
                pos: vec![PartOfSpeech::IchidanVerb, PartOfSpeech::TransitiveVerb],
            }],
        },
        Entry {
            id: 4,
            kanji: vec!["行く".into()],
            readings: vec!["いく".into()],
            priorities: vec![0, 0],
            senses: vec![Sense { language: Language::English, gloss: "to go".into(), pos: vec![PartOfSpeech::GodanKuVerb] }],
        },
        Entry {
            id: 5,
            kanji: vec!["行く".into()],
            readings: vec!["いく".into()],
            priorities: vec![0, 0],
            senses: vec![Sense {
                language: Language::English,
                gloss: "to proceed".into(),
                pos: vec![PartOfSpeech::GodanKuVerb],
            }],
        },
    ]
}

fn open_fixture() -> (tempfile::TempDir, Reader) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("JMdict.dat");
    writer::write_to_file(&path, &fixture_entries(), true).unwrap();
    let reader = Reader::open(&path).unwrap();
    (dir, reader)
}

#[test]
fn scenario_1_prefix_search_orders_by_priority_then_id() {
    let (_dir, reader) = open_fixture();
    let by_kanji = reader.entries_using_all(Alphabet::Japanese, &["日本"]).unwrap();
    assert_eq!(by_kanji.len(), 1);
    assert_eq!(by_kanji[0].id, 1);

    let by_prefix = reader.entries_using_prefix(Alphabet::Japanese, "日").unwrap();
    let ids: Vec<u32> = by_prefix.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![2, 1]);
}

#[test]
fn scenario_2_latin_word_round_trips() {
    let (_dir, reader) = open_fixture();
    let idx = reader.word_index(Alphabet::Latin, "Japan");
    assert!(idx >= 0);
    assert_eq!(reader.word_at(Alphabet::Latin, idx as usize).unwrap(), "Japan");
}

#[test]
fn scenario_3_missing_word_negative_insertion_point() {
    let (_dir, reader) = open_fixture();
    let idx = reader.word_index(Alphabet::Latin, "Zzzz");
    assert!(idx < 0);
    let insertion_point = !idx;
    assert!((0..=reader.word_count(Alphabet::Latin) as isize).contains(&insertion_point));
}

#[test]
fn scenario_4_multi_pos_sense_round_trips() {
    let (_dir, reader) = open_fixture();
    let entries = reader.entries_using_all(Alphabet::Japanese, &["食べる"]).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].senses[0].pos, vec![PartOfSpeech::IchidanVerb, PartOfSpeech::TransitiveVerb]);
}

#[test]
fn scenario_5_shared_word_dedups_entry_list_storage() {
    let (_dir, reader) = open_fixture();
    let entries = reader.entries_using_all(Alphabet::Japanese, &["行く"]).unwrap();
    let ids: Vec<u32> = entries.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![4, 5]);
}

#[test]
fn scenario_6_search_best_prefers_the_longer_full_match() {
    let (_dir, reader) = open_fixture();
    let result = reader.search_best("日本語を学ぶ", 0).unwrap().unwrap();
    assert!(result.word.starts_with("日本"));
    assert!(result.match_length >= 2);
    assert!(result.is_full);
}

#[test]
fn every_entry_round_trips_with_identical_fields() {
    let fixtures = fixture_entries();
    let (_dir, reader) = open_fixture();
    for original in &fixtures {
        let matches = reader.entries_using_all(Alphabet::Japanese, &[&original.kanji[0]]).unwrap();
        let found = matches.iter().find(|e| e.id == original.id).unwrap();
        assert_eq!(found.kanji, original.kanji);
        assert_eq!(found.readings, original.readings);
        assert_eq!(found.priorities, original.priorities);
        assert_eq!(found.senses.len(), original.senses.len());
        for (a, b) in found.senses.iter().zip(&original.senses) {
            assert_eq!(a.language, b.language);
            assert_eq!(a.gloss, b.gloss);
            assert_eq!(a.pos, b.pos);
        }
    }
}

#[test]
fn empty_query_returns_no_search_result() {
    let (_dir, reader) = open_fixture();
    assert!(reader.search_best("", 0).unwrap().is_none());
}
