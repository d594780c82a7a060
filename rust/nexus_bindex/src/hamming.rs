//! Hamming distance over fixed-width byte codes.

/// Number of differing bits between two equal-length codes.
///
/// Compares eight bytes at a time with XOR + popcount, then finishes the tail
/// byte by byte. Callers guarantee equal lengths; extra bytes in the longer
/// slice are ignored.
#[inline]
pub fn hamming_distance(a: &[u8], b: &[u8]) -> u32 {
    debug_assert_eq!(a.len(), b.len(), "codes must have equal width");

    let mut a_words = a.chunks_exact(8);
    let mut b_words = b.chunks_exact(8);
    let mut distance = 0u32;

    for (x, y) in (&mut a_words).zip(&mut b_words) {
        distance += (load_u64(x) ^ load_u64(y)).count_ones();
    }
    for (x, y) in a_words.remainder().iter().zip(b_words.remainder()) {
        distance += (x ^ y).count_ones();
    }
    distance
}

#[inline]
fn load_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    u64::from_le_bytes(buf)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn naive(a: &[u8], b: &[u8]) -> u32 {
        a.iter().zip(b).map(|(x, y)| (x ^ y).count_ones()).sum()
    }

    fn three_codes() -> impl Strategy<Value = (Vec<u8>, Vec<u8>, Vec<u8>)> {
        (0..40usize).prop_flat_map(|n| {
            (
                prop::collection::vec(any::<u8>(), n),
                prop::collection::vec(any::<u8>(), n),
                prop::collection::vec(any::<u8>(), n),
            )
        })
    }

    proptest! {
        #[test]
        fn prop_metric_laws((a, b, c) in three_codes()) {
            prop_assert_eq!(hamming_distance(&a, &a), 0);
            prop_assert_eq!(hamming_distance(&a, &b), hamming_distance(&b, &a));
            prop_assert!(
                hamming_distance(&a, &c) <= hamming_distance(&a, &b) + hamming_distance(&b, &c)
            );
        }

        #[test]
        fn prop_matches_bytewise_popcount((a, b, _c) in three_codes()) {
            prop_assert_eq!(hamming_distance(&a, &b), naive(&a, &b));
        }
    }
}
