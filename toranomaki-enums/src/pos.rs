//! Part-of-speech tags, with the numeric id used by the binary format (§4.4/§4.7
//! of the format the core crate implements) and the regex used only at ingest
//! to recognize an EDICT-style description.

use once_cell::sync::Lazy;
use regex::Regex;

macro_rules! pos_enum {
    ($( $variant:ident = ($id:expr, $code:expr, $label:expr) ),+ $(,)?) => {
        /// A grammatical classification such as verb-godan-bu, adjective-i, noun-suffix.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum PartOfSpeech {
            $( $variant, )+
        }

        impl PartOfSpeech {
            /// Enumerator id in `1..N`, `N < 128`. Stable across releases: this id is
            /// what gets packed into POS-set codes on disk.
            pub fn id(self) -> u8 {
                match self {
                    $( Self::$variant => $id, )+
                }
            }

            pub fn from_id(id: u8) -> Option<Self> {
                match id {
                    $( $id => Some(Self::$variant), )+
                    _ => None,
                }
            }

            /// Short EDICT tag, e.g. `"adj-f"`.
            pub fn code(self) -> &'static str {
                match self {
                    $( Self::$variant => $code, )+
                }
            }

            pub fn label(self) -> &'static str {
                match self {
                    $( Self::$variant => $label, )+
                }
            }

            pub fn from_code(code: &str) -> Option<Self> {
                match code {
                    $( $code => Some(Self::$variant), )+
                    _ => None,
                }
            }

            pub fn all() -> &'static [PartOfSpeech] {
                &[ $( Self::$variant, )+ ]
            }
        }
    };
}

pos_enum! {
    NounOrVerbActingPrenominally = (1, "adj-f", "noun or verb acting prenominally"),
    Adjective = (2, "adj-i", "adjective (keiyoushi)"),
    YoiAdjective = (3, "adj-ix", "adjective (keiyoushi) - yoi/ii class"),
    AdjectivalNoun = (4, "adj-na", "adjectival nouns or quasi-adjectives (keiyodoshi)"),
    NoAdjective = (5, "adj-no", "nouns which may take the genitive case particle 'no'"),
    PreNounAdjectival = (6, "adj-pn", "pre-noun adjectival (rentaishi)"),
    TaruAdjective = (7, "adj-t", "'taru' adjective"),
    Adverb = (8, "adv", "adverb (fukushi)"),
    AdverbTakingToParticle = (9, "adv-to", "adverb taking the 'to' particle"),
    Auxiliary = (10, "aux", "auxiliary"),
    AuxiliaryAdjective = (11, "aux-adj", "auxiliary adjective"),
    AuxiliaryVerb = (12, "aux-v", "auxiliary verb"),
    Conjunction = (13, "conj", "conjunction"),
    Copula = (14, "cop", "copula"),
    Counter = (15, "ctr", "counter"),
    Expression = (16, "exp", "expressions (phrases, clauses, etc.)"),
    Interjection = (17, "int", "interjection (kandoushi)"),
    CommonNoun = (18, "n", "noun (common) (futsuumeishi)"),
    AdverbialNoun = (19, "n-adv", "adverbial noun (fukushitekimeishi)"),
    ProperNoun = (20, "n-pr", "proper noun"),
    NounPrefix = (21, "n-pref", "noun, used as a prefix"),
    NounSuffix = (22, "n-suf", "noun, used as a suffix"),
    TemporalNoun = (23, "n-t", "noun (temporal) (jisoumeishi)"),
    Numeric = (24, "num", "numeric"),
    Pronoun = (25, "pn", "pronoun"),
    Prefix = (26, "pref", "prefix"),
    Particle = (27, "prt", "particle"),
    Suffix = (28, "suf", "suffix"),
    Unclassified = (29, "unc", "unclassified"),
    UnspecifiedVerb = (30, "v-unspec", "verb unspecified"),
    IchidanVerb = (31, "v1", "Ichidan verb"),
    IchidanKureruVerb = (32, "v1-s", "Ichidan verb - kureru special class"),
    GodanAruVerb = (33, "v5aru", "Godan verb - -aru special class"),
    GodanBuVerb = (34, "v5b", "Godan verb with 'bu' ending"),
    GodanGuVerb = (35, "v5g", "Godan verb with 'gu' ending"),
    GodanKuVerb = (36, "v5k", "Godan verb with 'ku' ending"),
    GodanIkuVerb = (37, "v5k-s", "Godan verb - Iku/Yuku special class"),
    GodanMuVerb = (38, "v5m", "Godan verb with 'mu' ending"),
    GodanNuVerb = (39, "v5n", "Godan verb with 'nu' ending"),
    GodanRuVerb = (40, "v5r", "Godan verb with 'ru' ending"),
    IrregularGodanRuVerb = (41, "v5r-i", "Godan verb with 'ru' ending (irregular verb)"),
    GodanSuVerb = (42, "v5s", "Godan verb with 'su' ending"),
    GodanTsuVerb = (43, "v5t", "Godan verb with 'tsu' ending"),
    GodanUVerb = (44, "v5u", "Godan verb with 'u' ending"),
    IrregularGodanUVerb = (45, "v5u-s", "Godan verb with 'u' ending (special class)"),
    IntransitiveVerb = (46, "vi", "intransitive verb"),
    KuruVerb = (47, "vk", "Kuru verb - special class"),
    IrregularGodanNuVerb = (48, "vn", "irregular nu verb"),
    IrregularGodanRuVerbWithPlainRiForm = (49, "vr", "irregular ru verb, plain form ends with -ri"),
    SuruVerb = (50, "vs", "noun or participle which takes the aux. verb suru"),
    SuruPrecursorVerb = (51, "vs-c", "su verb - precursor to the modern suru"),
    IncludedSuruVerb = (52, "vs-i", "suru verb - included"),
    SpecialSuruVerb = (53, "vs-s", "suru verb - special class"),
    TransitiveVerb = (54, "vt", "transitive verb"),
    IchidanZuruVerb = (55, "vz", "Ichidan verb - zuru verb (alternative form of -jiru verbs)"),
}

static CODE_PATTERNS: Lazy<Vec<(PartOfSpeech, Regex)>> = Lazy::new(|| {
    PartOfSpeech::all()
        .iter()
        .map(|&pos| {
            let pattern = format!(r"(?i)^{}$", regex::escape(pos.code()));
            (pos, Regex::new(&pattern).expect("static POS pattern"))
        })
        .collect()
});

#[derive(Debug, thiserror::Error)]
pub enum PosParseError {
    #[error("no part-of-speech tag matches EDICT description {0:?}")]
    NoMatch(String),
    #[error("EDICT description {0:?} matches more than one part-of-speech tag")]
    Ambiguous(String),
}

/// Find the single enumeration value whose regex matches `description`.
/// Ambiguous or missing match is fatal during ingest.
pub fn parse_edict(description: &str) -> Result<PartOfSpeech, PosParseError> {
    let mut matched = CODE_PATTERNS
        .iter()
        .filter(|(_, re)| re.is_match(description))
        .map(|(pos, _)| *pos);
    let first = matched
        .next()
        .ok_or_else(|| PosParseError::NoMatch(description.to_string()))?;
    if matched.next().is_some() {
        return Err(PosParseError::Ambiguous(description.to_string()));
    }
    Ok(first)
}
