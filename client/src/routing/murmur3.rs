//! MurmurHash3 (`x86_32`) as used by the hash routing strategy. The broker
//! computes the same hash independently when answering routing queries, so
//! the algorithm variant and seed are fixed, not configurable.

const C1: u32 = 0xcc9e2d51;
const C2: u32 = 0x1b873593;

/// `MurmurHash3_x86_32(key, seed)`.
pub fn murmur3_32(key: &[u8], seed: u32) -> u32 {
    let mut hash = seed;
    let chunks = key.chunks_exact(4);
    let tail = chunks.remainder();

    for chunk in chunks {
        let mut k = u32::from_le_bytes(chunk.try_into().unwrap());
        k = k.wrapping_mul(C1);
        k = k.rotate_left(15);
        k = k.wrapping_mul(C2);

        hash ^= k;
        hash = hash.rotate_left(13);
        hash = hash.wrapping_mul(5).wrapping_add(0xe6546b64);
    }

    let mut k1: u32 = 0;
    match tail.len() {
        3 => {
            k1 ^= (tail[2] as u32) << 16;
            k1 ^= (tail[1] as u32) << 8;
            k1 ^= tail[0] as u32;
        }
        2 => {
            k1 ^= (tail[1] as u32) << 8;
            k1 ^= tail[0] as u32;
        }
        1 => {
            k1 ^= tail[0] as u32;
        }
        _ => {}
    }

    if !tail.is_empty() {
        k1 = k1.wrapping_mul(C1);
        k1 = k1.rotate_left(15);
        k1 = k1.wrapping_mul(C2);
        hash ^= k1;
    }

    hash ^= key.len() as u32;
    hash ^= hash >> 16;
    hash = hash.wrapping_mul(0x85ebca6b);
    hash ^= hash >> 13;
    hash = hash.wrapping_mul(0xc2b2ae35);
    hash ^= hash >> 16;

    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: u32 = 104729;

    #[test]
    fn empty_key_is_deterministic() {
        assert_eq!(murmur3_32(b"", SEED), murmur3_32(b"", SEED));
    }

    #[test]
    fn matches_known_hash_distribution_table() {
        // partitions ["invoices-0","invoices-1","invoices-2"], "helloN" ->
        // "invoices-0M" where M = (index % 3) + 1.
        let partitions = ["invoices-0", "invoices-1", "invoices-2"];
        let expected = [
            ("hello1", "invoices-02"),
            ("hello2", "invoices-01"),
            ("hello3", "invoices-02"),
            ("hello4", "invoices-03"),
            ("hello5", "invoices-01"),
            ("hello6", "invoices-03"),
            ("hello7", "invoices-01"),
            ("hello8", "invoices-02"),
            ("hello9", "invoices-01"),
            ("hello10", "invoices-03"),
            ("hello88", "invoices-02"),
        ];

        for (key, expected_partition) in expected {
            let hash = murmur3_32(key.as_bytes(), SEED) as usize;
            let index = hash % partitions.len();
            let display = format!("invoices-0{}", index + 1);
            assert_eq!(
                display, expected_partition,
                "routing key {key:?} expected {expected_partition}, got {display}"
            );
        }
    }
}
