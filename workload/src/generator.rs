use item::{AttributeValue, Item, ItemKey, OperationKind};
use rand::{
    Rng, SeedableRng,
    distributions::{Distribution, Uniform},
    rngs::StdRng,
};

use crate::error::WorkloadError;

pub const MAX_SCORE: i64 = 100;

/// One iteration's worth of requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationUnit {
    pub put: (ItemKey, AttributeValue),
    pub get: ItemKey,
    pub update: (ItemKey, AttributeValue),
    pub delete: ItemKey,
}

impl OperationUnit {
    pub fn key(&self, kind: OperationKind) -> ItemKey {
        match kind {
            OperationKind::Put => self.put.0,
            OperationKind::Get => self.get,
            OperationKind::Update => self.update.0,
            OperationKind::Delete => self.delete,
        }
    }
}

/// Draws randomized CRUD quadruples.
///
/// The four keys of a unit are sampled independently on purpose: the harness
/// measures throughput under contention, it is not a read-after-write check.
/// Do not correlate them.
pub struct OperationMixGenerator<R> {
    rng: R,
    keys: Uniform<u64>,
}

impl<R: Rng> OperationMixGenerator<R> {
    pub fn new(rng: R, id_space_max: u64) -> Result<Self, WorkloadError> {
        if id_space_max == 0 {
            return Err(WorkloadError::InvalidConfig(
                "id space must contain at least one key".into(),
            ));
        }
        Ok(Self {
            rng,
            keys: Uniform::new_inclusive(1, id_space_max),
        })
    }

    pub fn next_unit(&mut self) -> OperationUnit {
        let put = self.next_key();
        let get = self.next_key();
        let update = self.next_key();
        let delete = self.next_key();

        OperationUnit {
            put: (put, Item::seeded(put).data),
            get,
            update: (update, self.update_payload()),
            delete,
        }
    }

    fn next_key(&mut self) -> ItemKey {
        ItemKey(self.keys.sample(&mut self.rng))
    }

    fn update_payload(&mut self) -> AttributeValue {
        AttributeValue::map([(
            "score",
            AttributeValue::N(self.rng.gen_range(1..=MAX_SCORE)),
        )])
    }
}

impl OperationMixGenerator<StdRng> {
    /// Generator for worker `worker`; deterministic when `seed` is set.
    pub fn for_worker(
        id_space_max: u64,
        seed: Option<u64>,
        worker: usize,
    ) -> Result<Self, WorkloadError> {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(worker as u64)),
            None => StdRng::from_entropy(),
        };
        Self::new(rng, id_space_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_stay_in_id_space() -> Result<(), WorkloadError> {
        let mut generator = OperationMixGenerator::for_worker(10, Some(1), 0)?;
        for _ in 0..1000 {
            let unit = generator.next_unit();
            for kind in OperationKind::ALL {
                let key = unit.key(kind).get();
                assert!((1..=10).contains(&key), "{} out of range", key);
            }
        }
        Ok(())
    }

    #[test]
    fn test_payload_shapes() -> Result<(), WorkloadError> {
        let mut generator = OperationMixGenerator::for_worker(1_000_000, Some(9), 0)?;
        let unit = generator.next_unit();

        let (put_key, put_data) = &unit.put;
        assert_eq!(put_data.as_str(), Some(format!("Data for item {}", put_key).as_str()));

        let score = unit.update.1.get("score").and_then(AttributeValue::as_number);
        assert!(matches!(score, Some(1..=MAX_SCORE)));
        Ok(())
    }

    #[test]
    fn test_keys_are_drawn_independently() -> Result<(), WorkloadError> {
        let mut generator = OperationMixGenerator::for_worker(1_000_000, Some(3), 0)?;
        let units: Vec<OperationUnit> = (0..200).map(|_| generator.next_unit()).collect();

        // with a million keys, put and get almost never coincide
        let same = units.iter().filter(|u| u.put.0 == u.get).count();
        assert!(same < 5);
        Ok(())
    }

    #[test]
    fn test_seeded_workers_are_reproducible_and_distinct() -> Result<(), WorkloadError> {
        let mut a = OperationMixGenerator::for_worker(1_000_000, Some(42), 0)?;
        let mut b = OperationMixGenerator::for_worker(1_000_000, Some(42), 0)?;
        let mut c = OperationMixGenerator::for_worker(1_000_000, Some(42), 1)?;

        let first_a: Vec<_> = (0..10).map(|_| a.next_unit()).collect();
        let first_b: Vec<_> = (0..10).map(|_| b.next_unit()).collect();
        let first_c: Vec<_> = (0..10).map(|_| c.next_unit()).collect();
        assert_eq!(first_a, first_b);
        assert_ne!(first_a, first_c);
        Ok(())
    }

    #[test]
    fn test_single_key_space() -> Result<(), WorkloadError> {
        let mut generator = OperationMixGenerator::for_worker(1, None, 0)?;
        let unit = generator.next_unit();
        assert!(OperationKind::ALL.iter().all(|k| unit.key(*k) == ItemKey(1)));
        assert!(OperationMixGenerator::for_worker(0, None, 0).is_err());
        Ok(())
    }
}
