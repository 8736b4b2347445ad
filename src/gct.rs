//! The 3-hash two-core garbled cuckoo table.
//!
//! A key `k` with value `v` is encoded so that
//! `D[h0(k)] ^ D[h1(k)] ^ D[h2(k)] ^ <r(k), D[lm..]> = v`, where the three
//! sparse positions fall into the first `lm` slots and the `rm`-bit dense mask
//! `r(k)` selects among the last `rm`. Encoding peels the cuckoo hypergraph,
//! solves the leftover two-core densely and back-substitutes the rest.

use std::collections::HashSet;
use std::hash::Hash;

use rand::{CryptoRng, RngCore};

use crate::assembler::StorageAssembler;
use crate::bitstring::BitString;
use crate::error::{OkvsError, Result};
use crate::hash::{BufferedRandomGenerator, Hashable};
use crate::hypergraph::H3Hypergraph;
use crate::okvs::{OkvsDecoder, OkvsEncoder};
use crate::oracle::{HashKeys, PositionOracle};
use crate::params::{OkvsParams, NEG_LOG_FAILURE_PROBABILITY, SPARSE_HASH_NUM};
use crate::peeling::find_two_core;
use crate::utils::{xor_u8s_inplace, TimerOnce};

#[derive(Clone, Debug)]
pub struct H3TcGctOkvs {
    params: OkvsParams,
    oracle: PositionOracle,
}

impl H3TcGctOkvs {
    pub fn new(params: OkvsParams, keys: &HashKeys) -> Self {
        let oracle = PositionOracle::new(params.lm(), params.rm(), keys);
        Self { params, oracle }
    }

    pub fn params(&self) -> &OkvsParams {
        &self.params
    }

    /// Number of storage slots.
    pub fn m(&self) -> usize {
        self.params.m()
    }

    pub fn lm(&self) -> usize {
        self.params.lm()
    }

    pub fn rm(&self) -> usize {
        self.params.rm()
    }

    pub fn sparse_position_num(&self) -> usize {
        SPARSE_HASH_NUM
    }

    pub fn sparse_position_range(&self) -> usize {
        self.params.lm()
    }

    pub fn max_dense_position_num(&self) -> usize {
        self.params.rm()
    }

    /// Encoding fails with probability at most `2^-29` at the default λ.
    pub fn neg_log_failure_probability(&self) -> u32 {
        NEG_LOG_FAILURE_PROBABILITY
    }

    pub fn sparse_positions<K: Hashable + ?Sized>(&self, key: &K) -> [usize; SPARSE_HASH_NUM] {
        self.oracle.sparse_positions(key)
    }

    pub fn dense_positions<K: Hashable + ?Sized>(&self, key: &K) -> BitString {
        self.oracle.dense_positions(key)
    }

    /// Encode `map` drawing slot randomness from `rng`.
    ///
    /// Capacity errors ([`OkvsError::is_capacity`]) are retryable with a fresh
    /// encoder built from new [`HashKeys`].
    pub fn encode_with_rng<K, R>(&self, map: &[(K, Vec<u8>)], rng: &mut R) -> Result<Vec<Vec<u8>>>
    where
        K: Hashable + Eq + Hash + Sync,
        R: RngCore + CryptoRng,
    {
        let n = self.params.n();
        let byte_l = self.params.byte_l();
        if map.len() > n {
            tracing::warn!(len = map.len(), n, "too many keys");
            return Err(OkvsError::TooManyKeys { len: map.len(), n });
        }
        let mut seen = HashSet::with_capacity(map.len());
        for (index, (key, value)) in map.iter().enumerate() {
            if value.len() != byte_l {
                tracing::warn!(index, expected = byte_l, actual = value.len(), "value has the wrong length");
                return Err(OkvsError::ValueLength {
                    index,
                    expected: byte_l,
                    actual: value.len(),
                });
            }
            if !seen.insert(key) {
                tracing::warn!(index, "duplicate key");
                return Err(OkvsError::DuplicateKey { index });
            }
        }

        let timer = TimerOnce::new();
        let keys: Vec<&K> = map.iter().map(|(key, _)| key).collect();
        let graph = H3Hypergraph::build(&self.oracle, &keys);
        timer.finish("hashing");

        let timer = TimerOnce::new();
        let two_core = find_two_core(&graph);
        timer.finish("peeling");
        tracing::debug!(
            n = map.len(),
            lm = self.lm(),
            rm = self.rm(),
            core = two_core.core_size(),
            peeled = two_core.peel_stack.len(),
            "hypergraph peeled"
        );

        let values: Vec<&[u8]> = map.iter().map(|(_, value)| value.as_slice()).collect();
        StorageAssembler::new(&graph, &values, byte_l, self.rm(), rng).assemble(two_core, self.params.fill_mode())
    }

    fn check_storage(&self, storage: &[Vec<u8>]) -> Result<()> {
        if storage.len() != self.m() {
            return Err(OkvsError::MalformedStorage {
                expected: format!("{} slots", self.m()),
                actual: format!("{} slots", storage.len()),
            });
        }
        let byte_l = self.params.byte_l();
        if let Some((index, slot)) = storage.iter().enumerate().find(|(_, slot)| slot.len() != byte_l) {
            return Err(OkvsError::MalformedStorage {
                expected: format!("{} bytes per slot", byte_l),
                actual: format!("{} bytes in slot {}", slot.len(), index),
            });
        }
        Ok(())
    }
}

impl<K> OkvsEncoder<K, Vec<u8>> for H3TcGctOkvs
where
    K: Hashable + Eq + Hash + Sync,
{
    fn encode(&self, map: &[(K, Vec<u8>)]) -> Result<Vec<Vec<u8>>> {
        let mut rng = BufferedRandomGenerator::from_entropy();
        self.encode_with_rng(map, &mut rng)
    }
}

impl<K> OkvsDecoder<K, Vec<u8>> for H3TcGctOkvs
where
    K: Hashable,
{
    fn decode(&self, okvs: &[Vec<u8>], key: &K) -> Result<Vec<u8>> {
        self.check_storage(okvs)?;
        let [p0, p1, p2] = self.oracle.sparse_positions(key);
        let mut value = okvs[p0].clone();
        xor_u8s_inplace(&mut value, &okvs[p1]);
        xor_u8s_inplace(&mut value, &okvs[p2]);
        self.oracle.dense_positions(key).xor_selected(&okvs[self.lm()..], &mut value);
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::FillMode;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    fn random_map(rng: &mut ChaCha20Rng, n: usize, byte_l: usize) -> Vec<([u8; 16], Vec<u8>)> {
        let mut map = Vec::with_capacity(n);
        let mut keys = HashSet::new();
        while map.len() < n {
            let key: [u8; 16] = rng.gen();
            if keys.insert(key) {
                map.push((key, (0..byte_l).map(|_| rng.gen()).collect()));
            }
        }
        map
    }

    fn okvs(n: usize, l: usize, rng: &mut ChaCha20Rng) -> H3TcGctOkvs {
        H3TcGctOkvs::new(OkvsParams::new(n, l).unwrap(), &HashKeys::random(rng))
    }

    /// Encode with fresh keys until success, returning the number of failures.
    fn encode_retrying(
        n: usize,
        map: &[([u8; 16], Vec<u8>)],
        rng: &mut ChaCha20Rng,
    ) -> (H3TcGctOkvs, Vec<Vec<u8>>, usize) {
        let mut failures = 0;
        loop {
            let okvs = okvs(n, 128, rng);
            match okvs.encode_with_rng(map, rng) {
                Ok(storage) => return (okvs, storage, failures),
                Err(e) if e.is_capacity() && failures < 3 => failures += 1,
                Err(e) => panic!("encode failed: {}", e),
            }
        }
    }

    #[test]
    fn single_key() {
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let okvs = okvs(1, 128, &mut rng);
        assert_eq!(okvs.lm(), 8);
        assert_eq!(okvs.rm(), 40);
        let map = random_map(&mut rng, 1, 16);
        let storage = okvs.encode_with_rng(&map, &mut rng).unwrap();
        assert_eq!(storage.len(), okvs.m());
        assert_eq!(okvs.decode(&storage, &map[0].0).unwrap(), map[0].1);
        for _ in 0..10 {
            let other: [u8; 16] = rng.gen();
            assert_eq!(okvs.decode(&storage, &other).unwrap().len(), 16);
        }
    }

    #[test]
    fn introspection() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let okvs = okvs(1000, 128, &mut rng);
        assert_eq!(okvs.sparse_position_num(), 3);
        assert_eq!(okvs.sparse_position_range(), 1304);
        assert_eq!(okvs.max_dense_position_num(), 568);
        assert_eq!(okvs.m(), 1304 + 568);
        assert_eq!(okvs.neg_log_failure_probability(), 29);
        let positions = okvs.sparse_positions(&7u64);
        assert!(positions.iter().all(|p| *p < okvs.lm()));
        assert_eq!(okvs.dense_positions(&7u64).len(), okvs.rm());
    }

    #[test]
    fn round_trip_and_completeness() {
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        for n in [2usize, 10, 100, 300, 700, 1500, 3000] {
            let map = random_map(&mut rng, n, 16);
            let (okvs, storage, _) = encode_retrying(n, &map, &mut rng);
            assert_eq!(storage.len(), okvs.m());
            assert!(storage.iter().all(|slot| slot.len() == 16));
            let keys: Vec<[u8; 16]> = map.iter().map(|(k, _)| *k).collect();
            let decoded = okvs.decode_many(&storage, &keys).unwrap();
            for ((_, value), got) in map.iter().zip(decoded) {
                assert_eq!(value, &got, "n = {}", n);
            }
        }
    }

    #[test]
    fn partial_load_round_trips() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let map = random_map(&mut rng, 40, 4);
        let okvs = H3TcGctOkvs::new(OkvsParams::new(500, 32).unwrap(), &HashKeys::random(&mut rng));
        let storage = okvs.encode_with_rng(&map, &mut rng).unwrap();
        for (key, value) in &map {
            assert_eq!(&okvs.decode(&storage, key).unwrap(), value);
        }
        let empty: Vec<([u8; 16], Vec<u8>)> = Vec::new();
        let storage = okvs.encode_with_rng(&empty, &mut rng).unwrap();
        assert_eq!(storage.len(), okvs.m());
    }

    #[test]
    fn decode_is_idempotent() {
        let mut rng = ChaCha20Rng::seed_from_u64(4);
        let map = random_map(&mut rng, 50, 16);
        let (okvs, storage, _) = encode_retrying(50, &map, &mut rng);
        let probe: [u8; 16] = rng.gen();
        let first = okvs.decode(&storage, &probe).unwrap();
        for _ in 0..3 {
            assert_eq!(okvs.decode(&storage, &probe).unwrap(), first);
            assert_eq!(okvs.decode(&storage, &map[7].0).unwrap(), map[7].1);
        }
    }

    #[test]
    fn non_members_look_random() {
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let map = random_map(&mut rng, 1000, 16);
        let (okvs, storage, _) = encode_retrying(1000, &map, &mut rng);
        let stored: HashSet<&Vec<u8>> = map.iter().map(|(_, v)| v).collect();
        let members: HashSet<[u8; 16]> = map.iter().map(|(k, _)| *k).collect();
        let mut ones = 0usize;
        let mut total = 0usize;
        for _ in 0..2000 {
            let key: [u8; 16] = rng.gen();
            if members.contains(&key) {
                continue;
            }
            let value = okvs.decode(&storage, &key).unwrap();
            assert!(!stored.contains(&value));
            ones += value.iter().map(|b| b.count_ones() as usize).sum::<usize>();
            total += value.len() * 8;
        }
        let ratio = ones as f64 / total as f64;
        assert!((0.48..0.52).contains(&ratio), "ratio = {}", ratio);
    }

    #[test]
    fn zero_fill_round_trips() {
        let mut rng = ChaCha20Rng::seed_from_u64(6);
        let params = OkvsParams::new(200, 64).unwrap().with_fill_mode(FillMode::Zero);
        let map = random_map(&mut rng, 60, 8);
        let okvs = H3TcGctOkvs::new(params, &HashKeys::random(&mut rng));
        let storage = okvs.encode_with_rng(&map, &mut rng).unwrap();
        for (key, value) in &map {
            assert_eq!(&okvs.decode(&storage, key).unwrap(), value);
        }
        // 60 keys touch at most 180 of the 264 sparse slots
        let zeros = storage[..okvs.lm()].iter().filter(|slot| slot.iter().all(|b| *b == 0)).count();
        assert!(zeros >= okvs.lm() - 180, "zeros = {}", zeros);
    }

    #[test]
    fn rejects_too_many_keys() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let okvs = okvs(10, 128, &mut rng);
        let map = random_map(&mut rng, 11, 16);
        assert_eq!(
            okvs.encode_with_rng(&map, &mut rng).unwrap_err(),
            OkvsError::TooManyKeys { len: 11, n: 10 }
        );
    }

    #[test]
    fn rejects_bad_values_and_duplicates() {
        let mut rng = ChaCha20Rng::seed_from_u64(8);
        let okvs = okvs(10, 128, &mut rng);
        let mut map = random_map(&mut rng, 5, 16);
        map[3].1.pop();
        assert_eq!(
            okvs.encode_with_rng(&map, &mut rng).unwrap_err(),
            OkvsError::ValueLength { index: 3, expected: 16, actual: 15 }
        );
        map[3].1.push(0);
        map[4].0 = map[1].0;
        assert_eq!(okvs.encode_with_rng(&map, &mut rng).unwrap_err(), OkvsError::DuplicateKey { index: 4 });
    }

    #[derive(Clone, Default)]
    struct CapturedLog(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLog {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn every_input_rejection_is_logged() {
        let mut rng = ChaCha20Rng::seed_from_u64(13);
        let okvs = okvs(4, 128, &mut rng);
        let too_many = random_map(&mut rng, 5, 16);
        let mut short_value = random_map(&mut rng, 2, 16);
        short_value[1].1.truncate(3);
        let mut duplicate = random_map(&mut rng, 2, 16);
        duplicate[1].0 = duplicate[0].0;

        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            for map in [&too_many, &short_value, &duplicate] {
                let err = okvs.encode_with_rng(map, &mut rng).unwrap_err();
                assert!(!err.is_capacity());
            }
        });

        let text = log.text();
        assert_eq!(text.matches("WARN").count(), 3, "{}", text);
        assert!(text.contains("too many keys"), "{}", text);
        assert!(text.contains("value has the wrong length"), "{}", text);
        assert!(text.contains("duplicate key"), "{}", text);
    }

    #[test]
    fn rejects_malformed_storage() {
        let mut rng = ChaCha20Rng::seed_from_u64(9);
        let okvs = okvs(10, 128, &mut rng);
        let map = random_map(&mut rng, 10, 16);
        let mut storage = okvs.encode_with_rng(&map, &mut rng).unwrap();
        assert!(matches!(
            okvs.decode(&storage[1..], &map[0].0),
            Err(OkvsError::MalformedStorage { .. })
        ));
        storage[okvs.m() - 1].push(0);
        assert!(matches!(okvs.decode(&storage, &map[0].0), Err(OkvsError::MalformedStorage { .. })));
    }

    #[test]
    fn trait_encode_uses_entropy() {
        let mut rng = ChaCha20Rng::seed_from_u64(10);
        let okvs = okvs(20, 128, &mut rng);
        let map: Vec<(String, Vec<u8>)> = (0..20).map(|i| (format!("key {}", i), vec![i as u8; 16])).collect();
        let storage = okvs.encode(&map).unwrap();
        for (key, value) in &map {
            assert_eq!(&okvs.decode(&storage, key).unwrap(), value);
        }
    }

    #[test]
    fn encoder_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<H3TcGctOkvs>();
    }

    fn success_rate(trials: usize, seed: u64) {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let mut failures = 0;
        for _ in 0..trials {
            let map = random_map(&mut rng, 1000, 16);
            let okvs = okvs(1000, 128, &mut rng);
            match okvs.encode_with_rng(&map, &mut rng) {
                Ok(storage) => {
                    for (key, value) in &map {
                        assert_eq!(&okvs.decode(&storage, key).unwrap(), value);
                    }
                }
                Err(e) => {
                    assert!(e.is_capacity(), "unexpected {}", e);
                    failures += 1;
                }
            }
        }
        assert!(failures * 1000 <= trials, "{} failures in {} trials", failures, trials);
    }

    #[test]
    fn encodes_1000_keys() {
        success_rate(20, 11);
    }

    #[test]
    #[ignore = "1000 full encodes, run with --ignored"]
    fn encodes_1000_keys_1000_times() {
        success_rate(1000, 12);
    }
}
