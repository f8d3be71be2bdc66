//! Target language of a gloss. Limited to eight entries because the entry
//! record's attribute word (§4.4) reserves only 3 bits for the language index.

macro_rules! language_enum {
    ($( $variant:ident = ($index:expr, $code:expr, $label:expr) ),+ $(,)?) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Language {
            $( $variant, )+
        }

        impl Language {
            pub fn index(self) -> u8 {
                match self {
                    $( Self::$variant => $index, )+
                }
            }

            pub fn from_index(index: u8) -> Option<Self> {
                match index {
                    $( $index => Some(Self::$variant), )+
                    _ => None,
                }
            }

            pub fn code(self) -> &'static str {
                match self {
                    $( Self::$variant => $code, )+
                }
            }

            pub fn from_code(code: &str) -> Option<Self> {
                match code {
                    $( $code => Some(Self::$variant), )+
                    _ => None,
                }
            }

            pub fn label(self) -> &'static str {
                match self {
                    $( Self::$variant => $label, )+
                }
            }

            pub fn all() -> &'static [Language] {
                &[ $( Self::$variant, )+ ]
            }
        }
    };
}

language_enum! {
    English = (0, "eng", "English"),
    Dutch = (1, "dut", "Dutch"),
    French = (2, "fre", "French"),
    German = (3, "ger", "German"),
    Hungarian = (4, "hun", "Hungarian"),
    Russian = (5, "rus", "Russian"),
    Spanish = (6, "spa", "Spanish"),
    Swedish = (7, "swe", "Swedish"),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_fits_in_three_bits() {
        for &lang in Language::all() {
            assert!(lang.index() < 8);
        }
    }

    #[test]
    fn round_trips_through_index_and_code() {
        for &lang in Language::all() {
            assert_eq!(Language::from_index(lang.index()), Some(lang));
            assert_eq!(Language::from_code(lang.code()), Some(lang));
        }
    }
}
