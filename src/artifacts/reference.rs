// Reference numbers and business identifiers

use rand::seq::SliceRandom;
use rand::Rng;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub const FALLBACK_MIN_LEN: usize = 4;
pub const FALLBACK_MAX_LEN: usize = 9;

/// Uppercase alphanumerics, each drawn uniformly from the alphabet.
pub fn random_chars(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .filter_map(|_| ALPHABET.choose(&mut rng))
        .map(|b| *b as char)
        .collect()
}

/// Client-side reference used when the backend does not return one: `PREFIX-XXXX..` (4-9 chars).
pub fn fallback_reference(prefix: &str) -> String {
    let len = rand::thread_rng().gen_range(FALLBACK_MIN_LEN..=FALLBACK_MAX_LEN);
    format!("{}-{}", prefix, random_chars(len))
}

/// Identifier for a repeatable item that people read aloud, e.g. `TM-4K9Q2Z`.
pub fn business_id(prefix: &str) -> String {
    format!("{}-{}", prefix, random_chars(6))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suffix<'a>(value: &'a str, prefix: &str) -> &'a str {
        value
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('-'))
            .unwrap_or_else(|| panic!("{} does not start with {}-", value, prefix))
    }

    #[test]
    fn fallback_reference_has_prefix_and_bounded_suffix() {
        for _ in 0..200 {
            let r = fallback_reference("DRV");
            let tail = suffix(&r, "DRV");
            assert!(
                (FALLBACK_MIN_LEN..=FALLBACK_MAX_LEN).contains(&tail.len()),
                "suffix length out of range: {}",
                r
            );
            assert!(
                tail.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()),
                "unexpected characters: {}",
                r
            );
        }
    }

    #[test]
    fn business_ids_are_six_chars_and_distinct() {
        let a = business_id("TM");
        let b = business_id("TM");
        assert_eq!(suffix(&a, "TM").len(), 6);
        assert_ne!(a, b);
    }

    #[test]
    fn random_chars_has_requested_length() {
        assert_eq!(random_chars(40).len(), 40);
        assert_eq!(random_chars(0), "");
    }

    #[test]
    fn random_chars_covers_the_whole_alphabet() {
        // 36 symbols over 20k draws; a missing symbol means a broken distribution.
        let sample = random_chars(20_000);
        for c in ALPHABET.iter().map(|b| *b as char) {
            assert!(sample.contains(c), "symbol {} never drawn", c);
        }
    }

    #[test]
    fn fallback_lengths_reach_both_bounds() {
        let lens: std::collections::BTreeSet<usize> = (0..2_000)
            .map(|_| suffix(&fallback_reference("MIL"), "MIL").len())
            .collect();
        assert!(lens.contains(&FALLBACK_MIN_LEN));
        assert!(lens.contains(&FALLBACK_MAX_LEN));
    }
}
