//! Radix sorting of quantized depth keys.
//!
//! The sort array pairs each sortable primitive's position index with its
//! 16-bit depth key. Ascending key order is back-to-front draw order
//! (smaller key = farther from the eye).

/// One sortable primitive: `idx` is its slot in the positions cache,
/// `key` its quantized eye distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortIdx {
    pub idx: u32,
    pub key: u16,
}

/// In-place binary MSB radix sort, the primary sorter. Partitions on one
/// bit with two pointers and recurses into both halves.
pub fn msb_radix_sort(items: &mut [SortIdx]) {
    sort_bit(items, 15);
}

fn sort_bit(items: &mut [SortIdx], bit: u32) {
    if items.len() <= 1 {
        return;
    }
    let mask = 1u16 << bit;
    let mut lo = 0;
    let mut hi = items.len();
    while lo < hi {
        if items[lo].key & mask == 0 {
            lo += 1;
        } else {
            hi -= 1;
            items.swap(lo, hi);
        }
    }
    if bit > 0 {
        sort_bit(&mut items[..lo], bit - 1);
        sort_bit(&mut items[lo..], bit - 1);
    }
}

/// LSD counting radix sort, two passes of one byte each. Kept as the
/// alternate implementation; produces the same key order as
/// [`msb_radix_sort`] and is additionally stable.
pub fn lsd_radix_sort(items: &mut Vec<SortIdx>) {
    let mut swap = vec![SortIdx { idx: 0, key: 0 }; items.len()];
    for pass in 0..2 {
        let shift = pass * 8;
        let mut counts = [0usize; 256];
        for item in items.iter() {
            counts[((item.key >> shift) & 0xff) as usize] += 1;
        }
        // Histogram to scatter offsets
        let mut offset = 0;
        for count in counts.iter_mut() {
            let c = *count;
            *count = offset;
            offset += c;
        }
        for item in items.iter() {
            let bin = ((item.key >> shift) & 0xff) as usize;
            swap[counts[bin]] = *item;
            counts[bin] += 1;
        }
        std::mem::swap(items, &mut swap);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};

    fn is_ascending(items: &[SortIdx]) -> bool {
        items.windows(2).all(|w| w[0].key <= w[1].key)
    }

    fn random_keys(n: usize, seed: u64) -> Vec<SortIdx> {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        (0..n)
            .map(|i| SortIdx {
                idx: i as u32,
                key: rng.gen(),
            })
            .collect()
    }

    #[test]
    fn msb_matches_comparison_sort() {
        let mut items = random_keys(1000, 7);
        let mut reference = items.clone();
        reference.sort_by_key(|s| s.key);

        msb_radix_sort(&mut items);
        assert!(is_ascending(&items));
        let keys: Vec<u16> = items.iter().map(|s| s.key).collect();
        let ref_keys: Vec<u16> = reference.iter().map(|s| s.key).collect();
        assert_eq!(keys, ref_keys);
    }

    #[test]
    fn lsd_matches_msb_order() {
        let mut a = random_keys(1000, 11);
        let mut b = a.clone();
        msb_radix_sort(&mut a);
        lsd_radix_sort(&mut b);
        let ka: Vec<u16> = a.iter().map(|s| s.key).collect();
        let kb: Vec<u16> = b.iter().map(|s| s.key).collect();
        assert_eq!(ka, kb);
    }

    #[test]
    fn lsd_is_stable() {
        let mut items = vec![
            SortIdx { idx: 0, key: 5 },
            SortIdx { idx: 1, key: 5 },
            SortIdx { idx: 2, key: 1 },
            SortIdx { idx: 3, key: 5 },
        ];
        lsd_radix_sort(&mut items);
        let order: Vec<u32> = items.iter().map(|s| s.idx).collect();
        assert_eq!(order, vec![2, 0, 1, 3]);
    }

    #[test]
    fn degenerate_inputs() {
        let mut empty: Vec<SortIdx> = vec![];
        msb_radix_sort(&mut empty);
        lsd_radix_sort(&mut empty);

        let mut one = vec![SortIdx { idx: 0, key: 9 }];
        msb_radix_sort(&mut one);
        assert_eq!(one[0].key, 9);

        let mut equal = vec![SortIdx { idx: 3, key: 42 }; 17];
        msb_radix_sort(&mut equal);
        assert!(is_ascending(&equal));
    }

    #[test]
    fn extreme_keys_sort_to_the_ends() {
        let mut items = vec![
            SortIdx { idx: 0, key: 65535 },
            SortIdx { idx: 1, key: 0 },
            SortIdx { idx: 2, key: 32768 },
        ];
        msb_radix_sort(&mut items);
        assert_eq!(items[0].key, 0);
        assert_eq!(items[2].key, 65535);
    }

    #[test]
    fn sort_is_deterministic() {
        let mut a = random_keys(500, 3);
        let mut b = a.clone();
        msb_radix_sort(&mut a);
        msb_radix_sort(&mut b);
        assert_eq!(a, b);
    }
}
