// src/inventory/pool.rs

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[cfg(test)]
use crate::inventory::slot::Slot;
use crate::inventory::slot::UnitSource;
use crate::model::placements::{UnitId, WaterfallEntry};

/// 随机池：每次加载从候选里均匀随机取一个（允许重复，不是轮询）
#[derive(Debug)]
pub struct RandomPool {
    candidates: Vec<WaterfallEntry>,
    rng: StdRng,
    attempt_index: Option<usize>,
    chosen_index: Option<usize>,
}

impl RandomPool {
    pub fn new(candidates: Vec<WaterfallEntry>) -> Self {
        Self::with_rng(candidates, StdRng::from_entropy())
    }

    pub fn with_rng(candidates: Vec<WaterfallEntry>, rng: StdRng) -> Self {
        let candidates = candidates
            .into_iter()
            .filter(|entry| !entry.unit_id.is_empty())
            .collect();
        Self {
            candidates,
            rng,
            attempt_index: None,
            chosen_index: None,
        }
    }

    #[cfg(test)]
    pub fn candidates(&self) -> &[WaterfallEntry] {
        &self.candidates
    }

    /// 当前这次请求选中的下标
    #[cfg(test)]
    pub fn attempt_index(&self) -> Option<usize> {
        self.attempt_index
    }

    /// 最近一次加载成功的下标
    #[cfg(test)]
    pub fn chosen_index(&self) -> Option<usize> {
        self.chosen_index
    }

    pub fn chosen_entry(&self) -> Option<&WaterfallEntry> {
        self.chosen_index.and_then(|index| self.candidates.get(index))
    }
}

impl UnitSource for RandomPool {
    fn next_unit(&mut self) -> UnitId {
        if self.candidates.is_empty() {
            self.attempt_index = None;
            return UnitId::empty();
        }
        let index = self.rng.gen_range(0..self.candidates.len());
        self.attempt_index = Some(index);
        self.candidates[index].unit_id.clone()
    }

    fn on_success(&mut self) {
        self.chosen_index = self.attempt_index;
    }

    fn chosen_name(&self) -> Option<&str> {
        self.chosen_entry().map(|entry| entry.name.as_str())
    }
}

#[cfg(test)]
pub type PoolSlot = Slot<RandomPool>;

#[cfg(test)]
impl Slot<RandomPool> {
    pub fn pool(name: impl Into<String>, candidates: Vec<WaterfallEntry>) -> Self {
        Slot::with_source(name, RandomPool::new(candidates))
    }

    pub fn seeded_pool(name: impl Into<String>, candidates: Vec<WaterfallEntry>, seed: u64) -> Self {
        Slot::with_source(name, RandomPool::with_rng(candidates, StdRng::seed_from_u64(seed)))
    }

    /// 当前缓存的 creative 来自哪个候选
    pub fn chosen_index(&self) -> Option<usize> {
        self.source().chosen_index()
    }

    pub fn chosen_entry(&self) -> Option<&WaterfallEntry> {
        self.source().chosen_entry()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::creative::{Creative, CreativePayload};
    use proptest::prelude::*;
    use std::collections::HashSet;
    use tokio::time::Instant;

    fn entries(n: usize) -> Vec<WaterfallEntry> {
        (0..n)
            .map(|i| WaterfallEntry {
                name: format!("I-{i}"),
                unit_id: UnitId::new(format!("unit-{i}")),
            })
            .collect()
    }

    #[test]
    fn empty_pool_never_loads() {
        let mut pool = PoolSlot::pool("I-Pool", Vec::new());
        assert!(pool.begin_load().is_none());
    }

    #[test]
    fn blank_candidates_are_filtered() {
        let mut list = entries(1);
        list.push(WaterfallEntry {
            name: "I-blank".into(),
            unit_id: UnitId::empty(),
        });
        let pool = PoolSlot::pool("I-Pool", list);
        assert_eq!(pool.source().candidates().len(), 1);
    }

    #[test]
    fn success_records_chosen_index() {
        let mut pool = PoolSlot::seeded_pool("I-Pool", entries(4), 7);
        let ticket = pool.begin_load().unwrap();
        let index = pool.source().attempt_index().unwrap();
        assert_eq!(ticket.unit_id, UnitId::new(format!("unit-{index}")));
        assert_eq!(pool.chosen_index(), None);

        let creative = Creative::new(ticket.unit_id.clone(), CreativePayload::Interstitial);
        pool.on_loaded(ticket.generation, creative, Instant::now())
            .unwrap();
        assert_eq!(pool.chosen_index(), Some(index));
        assert_eq!(pool.chosen_entry().unwrap().name, format!("I-{index}"));
    }

    #[test]
    fn selection_eventually_covers_every_candidate() {
        let mut source = RandomPool::with_rng(entries(3), StdRng::seed_from_u64(42));
        let mut seen = HashSet::new();
        for _ in 0..200 {
            seen.insert(source.next_unit());
        }
        assert_eq!(seen.len(), 3);
    }

    proptest! {
        #[test]
        fn picks_stay_in_bounds(n in 1usize..16, seed in any::<u64>()) {
            let mut source = RandomPool::with_rng(entries(n), StdRng::seed_from_u64(seed));
            for _ in 0..32 {
                let unit = source.next_unit();
                let index = source.attempt_index().unwrap();
                prop_assert!(index < n);
                prop_assert_eq!(unit, UnitId::new(format!("unit-{index}")));
            }
        }
    }
}
