//! tf-idf weighted SimHash fingerprinting over a document's term frequencies.

use std::collections::HashMap;

use xxhash_rust::xxh3::xxh3_64;

pub const WIDTH: u32 = 64;
pub const SIMILARITY_THRESHOLD: f64 = 0.80;

/// Compute the 64-bit fingerprint for a document given its term frequencies,
/// total term count, and the host's accumulated document-frequency table.
pub fn fingerprint(
    term_frequencies: &HashMap<String, u64>,
    total_terms: u64,
    document_frequencies: &HashMap<String, u64>,
    max_documents: f64,
) -> u64 {
    let mut acc = [0.0f64; WIDTH as usize];

    for (token, &frequency) in term_frequencies {
        if frequency == 0 {
            continue;
        }
        let tf = frequency as f64 / total_terms as f64;
        let df = *document_frequencies.get(token).unwrap_or(&0) as f64;
        let mut idf = (max_documents / (1.0 + df)).log10();
        if idf <= 0.0 {
            // Token saturated the training window; keep a minimal nonzero weight.
            idf = 0.001;
        }
        let weight = tf * idf;

        let hash = xxh3_64(token.as_bytes());
        for (i, slot) in acc.iter_mut().enumerate() {
            let bit = (hash >> i) & 1;
            if bit == 1 {
                *slot += weight;
            } else {
                *slot -= weight;
            }
        }
    }

    let mut fp: u64 = 0;
    for (i, &v) in acc.iter().enumerate() {
        if v >= 0.0 {
            fp |= 1 << i;
        }
    }
    fp
}

/// Hamming-agreement ratio between two fingerprints (XNOR popcount / width).
pub fn similarity(a: u64, b: u64) -> f64 {
    let disagreement = (a ^ b).count_ones();
    (WIDTH - disagreement) as f64 / WIDTH as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_similarity_is_one() {
        assert_eq!(similarity(0xdead_beef, 0xdead_beef), 1.0);
    }

    #[test]
    fn similarity_is_symmetric() {
        let a = 0x1234_5678_9abc_def0;
        let b = 0x0fed_cba9_8765_4321;
        assert_eq!(similarity(a, b), similarity(b, a));
    }

    #[test]
    fn identical_term_frequencies_produce_identical_fingerprints() {
        let mut tf = HashMap::new();
        tf.insert("crawl".to_string(), 3u64);
        tf.insert("university".to_string(), 2u64);
        let df = HashMap::new();
        let fp1 = fingerprint(&tf, 5, &df, 20.0);
        let fp2 = fingerprint(&tf, 5, &df, 20.0);
        assert_eq!(fp1, fp2);
        assert_eq!(similarity(fp1, fp2), 1.0);
    }
}
