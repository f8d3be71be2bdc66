//! C7: priority codec. Five sources, each with `(max_rank, bit_shift, mask)`
//! per §4.7.

use std::collections::HashMap;

use crate::error::{DictionaryError, Result};

struct PriorityField {
    max_rank: u16,
    shift: u32,
    mask: u16,
}

const NEWS: PriorityField = PriorityField { max_rank: 2, shift: 6, mask: 3 };
const ICHI: PriorityField = PriorityField { max_rank: 2, shift: 4, mask: 3 };
const SPEC: PriorityField = PriorityField { max_rank: 2, shift: 2, mask: 3 };
const GAI: PriorityField = PriorityField { max_rank: 2, shift: 0, mask: 3 };
const NF: PriorityField = PriorityField { max_rank: 49, shift: 8, mask: 65535 };

/// Per-source ranks contributing to a priority code. `None` means the
/// corresponding EDICT marker (`news`, `ichi1`/`ichi2`, `spec1`/`spec2`,
/// `gai1`/`gai2`, `nfXX`) was absent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PrioritySources {
    pub news: Option<u16>,
    pub ichi: Option<u16>,
    pub spec: Option<u16>,
    pub gai: Option<u16>,
    pub nf: Option<u16>,
}

/// Encode a rank-set into its 16-bit packed code. Absent ranks contribute 0,
/// which keeps the "no priority at all" case equal to the documented sentinel
/// 0; this also matches the invariant that identical rank-sets always yield
/// identical codes.
pub fn encode(sources: PrioritySources) -> Result<u16> {
    let mut code: u16 = 0;
    code |= encode_field(&NEWS, sources.news)?;
    code |= encode_field(&ICHI, sources.ichi)?;
    code |= encode_field(&SPEC, sources.spec)?;
    code |= encode_field(&GAI, sources.gai)?;
    code |= encode_field(&NF, sources.nf)?;
    Ok(code)
}

fn encode_field(field: &PriorityField, rank: Option<u16>) -> Result<u16> {
    let raw = match rank {
        None => 0,
        Some(rank) if rank >= 1 && rank <= field.max_rank => rank,
        Some(_) => return Err(DictionaryError::InvalidArgument("priority rank out of range")),
    };
    Ok((raw & field.mask) << field.shift)
}

pub fn decode(code: u16) -> PrioritySources {
    PrioritySources {
        news: decode_field(&NEWS, code),
        ichi: decode_field(&ICHI, code),
        spec: decode_field(&SPEC, code),
        gai: decode_field(&GAI, code),
        nf: decode_field(&NF, code),
    }
}

fn decode_field(field: &PriorityField, code: u16) -> Option<u16> {
    let raw = (code >> field.shift) & field.mask;
    if raw == 0 || raw == field.max_rank + 1 {
        None
    } else {
        Some(raw)
    }
}

/// A derived total order over priority codes for sorting entry-reference
/// lists (§4.3): lower is more prominent. `nf` (frequency bucket, smaller is
/// more frequent) dominates when present, since it is the finest-grained
/// signal; otherwise the best of the binary markers wins; total absence
/// sorts last.
pub fn sort_rank(code: u16) -> u32 {
    let sources = decode(code);
    if let Some(nf) = sources.nf {
        return nf as u32;
    }
    let best_binary = [sources.news, sources.ichi, sources.spec, sources.gai]
        .into_iter()
        .flatten()
        .min();
    match best_binary {
        Some(rank) => 50 + rank as u32,
        None => u32::MAX,
    }
}

/// Exhaustively checks the bit-packing's injectivity over every valid
/// rank-set (§4.7: "distinct rank-sets must not collide (the writer verifies
/// this)"). The fields are disjoint bit ranges, so this always succeeds in
/// practice; it is run once per build rather than trusted blindly, the same
/// way the reader re-validates a magic number it could also just assume.
pub fn verify_no_collisions() -> Result<()> {
    let mut seen: HashMap<u16, PrioritySources> = HashMap::new();
    let binary_ranks = [None, Some(1), Some(2)];
    let mut nf_ranks: Vec<Option<u16>> = vec![None];
    nf_ranks.extend((1..=NF.max_rank).map(Some));

    for &news in &binary_ranks {
        for &ichi in &binary_ranks {
            for &spec in &binary_ranks {
                for &gai in &binary_ranks {
                    for &nf in &nf_ranks {
                        let sources = PrioritySources { news, ichi, spec, gai, nf };
                        let code = encode(sources)?;
                        if let Some(previous) = seen.insert(code, sources) {
                            if previous != sources {
                                return Err(DictionaryError::PriorityCollision(code));
                            }
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_priority_encodes_to_zero() {
        assert_eq!(encode(PrioritySources::default()).unwrap(), 0);
    }

    #[test]
    fn round_trips_every_field() {
        let sources = PrioritySources {
            news: Some(1),
            ichi: Some(2),
            spec: Some(1),
            gai: Some(2),
            nf: Some(17),
        };
        let code = encode(sources).unwrap();
        assert_eq!(decode(code), sources);
    }

    #[test]
    fn distinct_rank_sets_do_not_collide() {
        let mut seen = std::collections::HashSet::new();
        for news in [None, Some(1), Some(2)] {
            for nf in [None, Some(1), Some(25), Some(49)] {
                let code = encode(PrioritySources { news, nf, ..Default::default() }).unwrap();
                assert!(seen.insert(code), "collision for news={news:?} nf={nf:?}");
                assert_eq!(decode(code).news, news);
                assert_eq!(decode(code).nf, nf);
            }
        }
    }

    #[test]
    fn writer_verification_is_exhaustively_injective() {
        assert!(verify_no_collisions().is_ok());
    }

    #[test]
    fn sort_rank_prefers_more_frequent() {
        let frequent = encode(PrioritySources { nf: Some(1), ..Default::default() }).unwrap();
        let rare = encode(PrioritySources { nf: Some(48), ..Default::default() }).unwrap();
        let none = encode(PrioritySources::default()).unwrap();
        assert!(sort_rank(frequent) < sort_rank(rare));
        assert!(sort_rank(rare) < sort_rank(none));
    }
}
