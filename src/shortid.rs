//! Short upload identifiers
//!
//! Folds a content hash down to a handful of base-62 characters. The IDs
//! are what end up in upload URLs, so the alphabet ordering is load-bearing:
//! changing it would break every link minted by an older deployment.

/// Base-62 alphabet. Historical ordering, do not reorder.
const CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzZYXWVUTSRQPONMLKJIHGFEDCBA1234567890";

const VOWELS: &[u8] = b"aeiou";
const CONSONANTS: &[u8] = b"bdfghklmnpqrstvwxyz";

/// Squash an arbitrary-length hash into `len` base-62 characters by
/// XOR-folding the input into `len` bytes and mapping each byte onto the
/// alphabet. Deterministic for a given input and independent of host
/// endianness.
pub fn make(hash: &[u8], len: usize) -> String {
    let mut folded = vec![0u8; len];
    for (i, b) in hash.iter().enumerate() {
        folded[i % len] ^= b;
    }
    let out: Vec<u8> = folded
        .iter()
        .map(|&b| CHARS[b as usize % CHARS.len()])
        .collect();
    // CHARS is pure ASCII
    String::from_utf8(out).expect("base-62 alphabet is ASCII")
}

/// Like [`make`], but alternates consonants and vowels so the result is
/// pronounceable. Kept as a utility; the server mints plain base-62 IDs.
pub fn memorable(hash: &[u8], len: usize) -> String {
    let mut folded = vec![0u8; len];
    for (i, b) in hash.iter().enumerate() {
        folded[i % len] ^= b;
    }
    let out: Vec<u8> = folded
        .iter()
        .enumerate()
        .map(|(i, &b)| {
            if i % 2 == 0 {
                CONSONANTS[b as usize % CONSONANTS.len()]
            } else {
                VOWELS[b as usize % VOWELS.len()]
            }
        })
        .collect();
    String::from_utf8(out).expect("alphabets are ASCII")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_is_deterministic() {
        let hash = [0x13u8, 0x37, 0xca, 0xfe, 0x00, 0x41];
        assert_eq!(make(&hash, 4), make(&hash, 4));
        assert_eq!(make(&hash, 64), make(&hash, 64));
    }

    #[test]
    fn test_make_length_and_alphabet() {
        let hash: Vec<u8> = (0..=255u8).collect();
        for len in [1usize, 4, 7, 64] {
            let id = make(&hash, len);
            assert_eq!(id.len(), len);
            assert!(id.bytes().all(|b| CHARS.contains(&b)));
        }
    }

    #[test]
    fn test_make_folds_long_input() {
        // Inputs longer than `len` must still contribute: two hashes that
        // differ only past the fold width produce different IDs.
        let mut a = vec![0u8; 64];
        let mut b = vec![0u8; 64];
        a[60] = 0xff;
        b[60] = 0x0f;
        assert_ne!(make(&a, 4), make(&b, 4));
    }

    #[test]
    fn test_make_single_char() {
        let id = make(&[0u8], 1);
        assert_eq!(id, "a"); // 0 mod 62 -> first alphabet entry
    }

    #[test]
    fn test_memorable_alternates() {
        let hash = [0xdeu8, 0xad, 0xbe, 0xef, 0x12, 0x34];
        let id = memorable(&hash, 6);
        assert_eq!(id.len(), 6);
        for (i, b) in id.bytes().enumerate() {
            if i % 2 == 0 {
                assert!(CONSONANTS.contains(&b), "index {i} should be a consonant");
            } else {
                assert!(VOWELS.contains(&b), "index {i} should be a vowel");
            }
        }
    }
}
