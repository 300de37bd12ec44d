//! MinHash signatures and Jaccard similarity estimation over word-shingles.
//!
//! Signatures are fixed-length (100 positions) so any two signatures can be
//! compared position-by-position without knowing the underlying shingle sets.

use once_cell::sync::Lazy;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

const NUM_HASHES: usize = 100;
const SHINGLE_SIZE: usize = 3;
/// A prime greater than 2^32, used as the modulus for every hash function.
const PRIME: u64 = 4_294_967_311;
/// Build-time seed so signatures are reproducible across processes.
const SEED: u64 = 0x5D1B_2C3A_9E47_F001;

pub type Signature = [u32; NUM_HASHES];

struct HashCoeffs {
    a: [u64; NUM_HASHES],
    b: [u64; NUM_HASHES],
}

static COEFFS: Lazy<HashCoeffs> = Lazy::new(|| {
    let mut a = [0u64; NUM_HASHES];
    let mut b = [0u64; NUM_HASHES];
    let mut state = SEED;
    for i in 0..NUM_HASHES {
        state = splitmix64(state);
        a[i] = (state % (PRIME - 1)) + 1;
        state = splitmix64(state);
        b[i] = state % PRIME;
    }
    HashCoeffs { a, b }
});

/// A small, fast, fixed-seed PRNG step used only to derive the (a_i, b_i)
/// coefficient table deterministically at startup.
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn stable_hash32(s: &str) -> u32 {
    let mut hasher = DefaultHasher::new();
    s.hash(&mut hasher);
    (hasher.finish() & 0xFFFF_FFFF) as u32
}

/// Lowercase, strip non-alphanumerics (keeping spaces), tokenize on
/// whitespace, and form k=3 word-shingles. Fewer than 3 tokens yields the
/// token set itself.
fn shingles(text: &str) -> Vec<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();
    let tokens: Vec<&str> = cleaned.split_whitespace().collect();

    if tokens.len() < SHINGLE_SIZE {
        return tokens.iter().map(|t| t.to_string()).collect();
    }

    tokens
        .windows(SHINGLE_SIZE)
        .map(|w| w.join(" "))
        .collect()
}

/// Compute the MinHash signature for a text. An empty shingle set yields an
/// all-`u32::MAX` signature.
pub fn signature(text: &str) -> Signature {
    let shingle_set = shingles(text);
    let mut sig = [u32::MAX; NUM_HASHES];

    if shingle_set.is_empty() {
        return sig;
    }

    for shingle in &shingle_set {
        let h = stable_hash32(shingle) as u64;
        for i in 0..NUM_HASHES {
            let hi = ((COEFFS.a[i].wrapping_mul(h)).wrapping_add(COEFFS.b[i]) % PRIME) as u32;
            if hi < sig[i] {
                sig[i] = hi;
            }
        }
    }

    sig
}

/// Jaccard estimate between two equal-length signatures: the fraction of
/// positions where they agree.
pub fn similarity(a: &Signature, b: &Signature) -> f64 {
    let agree = a.iter().zip(b.iter()).filter(|(x, y)| x == y).count();
    agree as f64 / NUM_HASHES as f64
}

/// Convenience: signature + similarity for two raw texts.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    similarity(&signature(a), &signature(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_similarity_is_one_for_nonempty_text() {
        let sig = signature("Mathematik für Grundschüler");
        assert_eq!(similarity(&sig, &sig), 1.0);
    }

    #[test]
    fn is_deterministic() {
        let a = signature("Photosynthese in Pflanzen");
        let b = signature("Photosynthese in Pflanzen");
        assert_eq!(a, b);
    }

    #[test]
    fn is_symmetric() {
        let a = signature("Der schnelle braune Fuchs springt");
        let b = signature("Ein langsamer grauer Hase läuft");
        assert_eq!(similarity(&a, &b), similarity(&b, &a));
    }

    #[test]
    fn partial_word_overlap_scores_between_zero_and_one() {
        let sim = text_similarity(
            "Die Mitochondrien sind die Kraftwerke der Zelle",
            "Die Mitochondrien sind wichtig fuer die Zelle",
        );
        assert!(sim > 0.0 && sim < 1.0, "expected partial overlap, got {sim}");
    }

    #[test]
    fn unrelated_text_scores_low() {
        let sim = text_similarity(
            "Photosynthese in Pflanzenzellen erklaert",
            "Roemisches Reich und seine Herrscher",
        );
        assert!(sim < 0.5, "unrelated texts scored {sim}");
    }

    #[test]
    fn empty_text_yields_all_max_signature() {
        let sig = signature("");
        assert!(sig.iter().all(|&x| x == u32::MAX));
    }

    #[test]
    fn short_text_under_shingle_size_still_produces_a_signature() {
        let sig = signature("Islam");
        assert!(sig.iter().any(|&x| x != u32::MAX));
    }
}
