// src/inventory/waterfall.rs

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::time::Instant;

use crate::inventory::backoff::BackoffPolicy;
use crate::inventory::pool::RandomPool;
use crate::inventory::resolver::PlacementResolver;
use crate::inventory::slot::{
    ExpiryTimer, FailureOutcome, FixedUnit, LoadTicket, Slot, UnitSource,
};
use crate::model::creative::Creative;
use crate::model::placements::{Floor, UnitId, WaterfallEntry};

/// 瀑布流里的 slot 要么是固定单元，要么是随机池
#[derive(Debug)]
pub enum WaterfallSource {
    Fixed(FixedUnit),
    Pool(RandomPool),
}

impl UnitSource for WaterfallSource {
    fn next_unit(&mut self) -> UnitId {
        match self {
            WaterfallSource::Fixed(unit) => unit.next_unit(),
            WaterfallSource::Pool(pool) => pool.next_unit(),
        }
    }

    fn on_success(&mut self) {
        match self {
            WaterfallSource::Fixed(unit) => unit.on_success(),
            WaterfallSource::Pool(pool) => pool.on_success(),
        }
    }

    fn chosen_name(&self) -> Option<&str> {
        match self {
            WaterfallSource::Fixed(_) => None,
            WaterfallSource::Pool(pool) => pool.chosen_name(),
        }
    }
}

pub type WaterfallSlot = Slot<WaterfallSource>;

/// **一个格式的瀑布流 holder 集合**
///
/// `slots` 的顺序就是 `get_available` 的优先级：
/// 广告位专属 holder（或随机池）在前，然后内置低 floor，最后内置高 floor。
/// 下标在构建后不变，编排器用它作为定时器和回调的地址。
#[derive(Debug)]
pub struct Waterfall {
    slots: Vec<WaterfallSlot>,
    policy: BackoffPolicy,
    max_retry: u32,
}

impl Waterfall {
    pub fn build(resolver: &PlacementResolver) -> Self {
        Self::build_with(resolver, None)
    }

    /// `seed` 只给测试用，让随机池可复现
    pub fn build_with(resolver: &PlacementResolver, seed: Option<u64>) -> Self {
        let snapshot = resolver.snapshot();
        let prefix = resolver.format().waterfall_prefix();
        let entries = resolver.waterfall_entries();
        let mut slots = Vec::with_capacity(entries.len() + 2);

        if snapshot.waterfall.random_mode {
            if !entries.is_empty() {
                let pool = match seed {
                    Some(seed) => RandomPool::with_rng(entries.to_vec(), StdRng::seed_from_u64(seed)),
                    None => RandomPool::new(entries.to_vec()),
                };
                slots.push(Slot::with_source(
                    format!("{prefix}-Pool"),
                    WaterfallSource::Pool(pool),
                ));
            }
        } else {
            for WaterfallEntry { name, unit_id } in entries {
                slots.push(Slot::with_source(
                    name.clone(),
                    WaterfallSource::Fixed(FixedUnit::new(unit_id.clone(), Floor::Low)),
                ));
            }
        }

        slots.push(Slot::with_source(
            format!("{prefix}-Base-Low"),
            WaterfallSource::Fixed(FixedUnit::new(resolver.base_low(), Floor::Low)),
        ));
        slots.push(Slot::with_source(
            format!("{prefix}-Base-High"),
            WaterfallSource::Fixed(FixedUnit::new(resolver.base_high(), Floor::High)),
        ));

        Self {
            slots,
            policy: BackoffPolicy::from(snapshot.reload_time),
            max_retry: snapshot.waterfall.max_retry(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot(&self, index: usize) -> Option<&WaterfallSlot> {
        self.slots.get(index)
    }

    pub fn slots(&self) -> &[WaterfallSlot] {
        &self.slots
    }

    #[cfg(test)]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|slot| slot.name() == name)
    }

    pub fn begin_load(&mut self, index: usize) -> Option<LoadTicket> {
        self.slots.get_mut(index)?.begin_load()
    }

    pub fn on_loaded(
        &mut self,
        index: usize,
        generation: u64,
        creative: Creative,
        now: Instant,
    ) -> Result<ExpiryTimer, Creative> {
        match self.slots.get_mut(index) {
            Some(slot) => slot.on_loaded(generation, creative, now),
            None => Err(creative),
        }
    }

    pub fn on_failed(&mut self, index: usize, generation: u64) -> FailureOutcome {
        let (policy, max_retry) = (self.policy, self.max_retry);
        match self.slots.get_mut(index) {
            Some(slot) => slot.on_failed(generation, &policy, max_retry),
            None => FailureOutcome::Stale,
        }
    }

    pub fn retry_due(&mut self, index: usize) -> Option<LoadTicket> {
        self.slots.get_mut(index)?.retry_due()
    }

    pub fn abandon_retry(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.abandon_retry();
        }
    }

    pub fn on_expired(&mut self, index: usize, generation: u64) -> Option<Creative> {
        self.slots.get_mut(index)?.on_expired(generation)
    }

    /// 按优先级窥视第一个可用的 creative
    pub fn get_available(&self) -> Option<(usize, &Creative)> {
        self.slots
            .iter()
            .enumerate()
            .find_map(|(index, slot)| slot.peek().map(|creative| (index, creative)))
    }

    pub fn take(&mut self, index: usize) -> Option<Creative> {
        self.slots.get_mut(index)?.take()
    }

    /// 按优先级取走第一个可用的 creative
    #[cfg(test)]
    pub fn take_available(&mut self) -> Option<(usize, Creative)> {
        let index = self.get_available()?.0;
        self.take(index).map(|creative| (index, creative))
    }

    pub fn has_available(&self) -> bool {
        self.slots.iter().any(Slot::has_creative)
    }

    /// 有请求在飞或者有重试在排队（轮询展示据此决定要不要等）
    pub fn any_pending(&self) -> bool {
        self.slots.iter().any(Slot::is_pending)
    }

    pub fn pause_all(&mut self) {
        for slot in &mut self.slots {
            slot.pause();
        }
    }

    /// 取消暂停，返回需要立刻加载的 slot 下标
    pub fn resume_all(&mut self) -> Vec<usize> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| slot.resume().then_some(index))
            .collect()
    }

    pub fn destroy_all(&mut self) -> Vec<Creative> {
        self.slots.iter_mut().filter_map(Slot::destroy).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigSnapshot;
    use crate::model::creative::CreativePayload;
    use crate::model::placements::AdFormat;
    use std::sync::Arc;

    fn snapshot(random_mode: bool) -> ConfigSnapshot {
        let mut snapshot = ConfigSnapshot::default();
        snapshot.waterfall.enabled = true;
        snapshot.waterfall.random_mode = random_mode;
        snapshot.floor_low.insert(AdFormat::Interstitial, UnitId::from("i-low"));
        snapshot.floor_high.insert(AdFormat::Interstitial, UnitId::from("i-high"));
        snapshot.interstitial_waterfall = vec![
            WaterfallEntry {
                name: "I-Mintegral".into(),
                unit_id: UnitId::from("i-m"),
            },
            WaterfallEntry {
                name: "I-Pangle".into(),
                unit_id: UnitId::from("i-p"),
            },
        ];
        snapshot
    }

    fn waterfall(random_mode: bool) -> Waterfall {
        let resolver =
            PlacementResolver::new(AdFormat::Interstitial, Arc::new(snapshot(random_mode)));
        Waterfall::build_with(&resolver, Some(1))
    }

    fn fill(waterfall: &mut Waterfall, index: usize) {
        let ticket = waterfall.begin_load(index).unwrap();
        let creative = Creative::new(ticket.unit_id, CreativePayload::Interstitial);
        waterfall
            .on_loaded(index, ticket.generation, creative, Instant::now())
            .unwrap();
    }

    #[test]
    fn holders_are_built_in_priority_order() {
        let names: Vec<_> = waterfall(false)
            .slots()
            .iter()
            .map(|slot| slot.name().to_string())
            .collect();
        assert_eq!(
            names,
            vec!["I-Mintegral", "I-Pangle", "I-Base-Low", "I-Base-High"]
        );

        let names: Vec<_> = waterfall(true)
            .slots()
            .iter()
            .map(|slot| slot.name().to_string())
            .collect();
        assert_eq!(names, vec!["I-Pool", "I-Base-Low", "I-Base-High"]);
    }

    #[test]
    fn placement_specific_holder_wins_over_bases() {
        let mut waterfall = waterfall(false);
        let high = waterfall.index_of("I-Base-High").unwrap();
        let low = waterfall.index_of("I-Base-Low").unwrap();
        let pangle = waterfall.index_of("I-Pangle").unwrap();
        fill(&mut waterfall, high);
        fill(&mut waterfall, low);
        assert_eq!(waterfall.get_available().unwrap().0, low);

        fill(&mut waterfall, pangle);
        let (index, creative) = waterfall.take_available().unwrap();
        assert_eq!(index, pangle);
        assert_eq!(creative.unit_id(), &UnitId::from("i-p"));
        assert_eq!(waterfall.take_available().unwrap().0, low);
        assert_eq!(waterfall.take_available().unwrap().0, high);
        assert!(waterfall.take_available().is_none());
    }

    #[test]
    fn pending_tracks_loading_and_retrying() {
        let mut waterfall = waterfall(true);
        assert!(!waterfall.any_pending());
        let ticket = waterfall.begin_load(0).unwrap();
        assert!(waterfall.any_pending());
        assert!(matches!(
            waterfall.on_failed(0, ticket.generation),
            FailureOutcome::Retry { .. }
        ));
        assert!(waterfall.any_pending());
    }

    #[test]
    fn resume_reloads_only_empty_idle_slots() {
        let mut waterfall = waterfall(false);
        fill(&mut waterfall, 0);
        waterfall.begin_load(1).unwrap();
        waterfall.pause_all();
        let reload = waterfall.resume_all();
        assert_eq!(reload, vec![2, 3]);
    }

    #[test]
    fn destroy_all_hands_back_every_creative() {
        let mut waterfall = waterfall(false);
        fill(&mut waterfall, 0);
        fill(&mut waterfall, 3);
        assert_eq!(waterfall.destroy_all().len(), 2);
        assert!(!waterfall.has_available());
    }
}
