// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The ordered chain of tier slots a registry reads from and writes to.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use hoard_tier::{CacheEntry, CacheTier, DynamicTier};
use tick::Clock;

use crate::telemetry::ext::TelemetryExt;
use crate::telemetry::{Activity, CollectionTelemetry, TierOperation};
use crate::wrapper::TierWrapper;
use crate::{Instrumentation, Life, Record, Source, life, storage_key};

/// The tier slots, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TierKind {
    /// In-process storage.
    Memory,
    /// Storage that outlives the process.
    Persistent,
    /// Storage shared between processes.
    Shared,
}

impl TierKind {
    /// Returns the slot name used in logs and metrics.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Persistent => "persistent",
            Self::Shared => "shared",
        }
    }

    /// Returns the [`Source`] of a payload read from this slot.
    #[must_use]
    pub fn source(self) -> Source {
        match self {
            Self::Memory => Source::MemoryTier,
            Self::Persistent => Source::PersistentTier,
            Self::Shared => Source::SharedTier,
        }
    }

    /// Returns `true` if payloads with this life are written to the slot.
    ///
    /// Runtime payloads live in memory only, forever payloads also go to the persistent slot,
    /// and expiring payloads go everywhere.
    #[must_use]
    pub fn accepts(self, life: Life) -> bool {
        match self {
            Self::Memory => true,
            Self::Persistent => life.persists(),
            Self::Shared => matches!(life, Life::Expires(_)),
        }
    }

    /// Returns `true` if the slot is read for payloads with this life.
    #[must_use]
    pub fn consulted_for(self, life: Life) -> bool {
        match self {
            Self::Memory => true,
            Self::Persistent | Self::Shared => life.persists(),
        }
    }
}

impl fmt::Display for TierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decides whether a hit from a lower-precedence slot is copied into the slots above it.
///
/// ```
/// use hoard::PromotionPolicy;
///
/// let _always = PromotionPolicy::always();
/// let _never = PromotionPolicy::never();
/// let _small = PromotionPolicy::when(|record| record.items.len() < 1_000);
/// ```
#[derive(Clone, Default)]
pub struct PromotionPolicy(PolicyType);

#[derive(Clone, Default)]
enum PolicyType {
    #[default]
    Always,
    Never,
    When(Arc<dyn Fn(&Record) -> bool + Send + Sync>),
}

impl fmt::Debug for PromotionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            PolicyType::Always => write!(f, "Always"),
            PolicyType::Never => write!(f, "Never"),
            PolicyType::When(_) => write!(f, "When(<closure>)"),
        }
    }
}

impl PromotionPolicy {
    /// Promotes every hit. This is the default.
    #[must_use]
    pub fn always() -> Self {
        Self(PolicyType::Always)
    }

    /// Never promotes.
    #[must_use]
    pub fn never() -> Self {
        Self(PolicyType::Never)
    }

    /// Promotes the hits the predicate accepts.
    pub fn when<F>(predicate: F) -> Self
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        Self(PolicyType::When(Arc::new(predicate)))
    }

    pub(crate) fn should_promote(&self, record: &Record) -> bool {
        match &self.0 {
            PolicyType::Always => true,
            PolicyType::Never => false,
            PolicyType::When(predicate) => predicate(record),
        }
    }
}

pub(crate) type RecordTier = DynamicTier<String, Record>;

type Slot = TierWrapper<Record, RecordTier>;

/// The configured slots of a registry, Memory then Persistent then Shared.
#[derive(Debug)]
pub(crate) struct TierChain {
    slots: Vec<Slot>,
    policy: PromotionPolicy,
    telemetry: Option<CollectionTelemetry>,
}

impl TierChain {
    pub(crate) fn new(
        tiers: impl IntoIterator<Item = (TierKind, RecordTier)>,
        policy: PromotionPolicy,
        clock: &Clock,
        telemetry: Option<CollectionTelemetry>,
    ) -> Self {
        let mut slots: Vec<Slot> = tiers
            .into_iter()
            .map(|(kind, tier)| TierWrapper::new(kind, tier, clock.clone(), telemetry.clone()))
            .collect();
        slots.sort_by_key(|slot| slot.kind());

        Self { slots, policy, telemetry }
    }

    pub(crate) fn kinds(&self) -> impl Iterator<Item = TierKind> + '_ {
        self.slots.iter().map(|slot| slot.kind())
    }

    /// Reads the first fresh record for `key` in precedence order and promotes it.
    ///
    /// Runs as timer `collection:{key}/lookup`, with one lap per slot consulted.
    pub(crate) fn lookup(&self, key: &str, life: Life, now: SystemTime, instrumentation: &Instrumentation) -> Option<(TierKind, Record)> {
        let timer = format!("collection:{key}/lookup");
        instrumentation.start(&timer);
        let found = self.find(key, life, now, instrumentation, &timer);
        instrumentation.stop(&timer);
        found
    }

    fn find(
        &self,
        key: &str,
        life: Life,
        now: SystemTime,
        instrumentation: &Instrumentation,
        timer: &str,
    ) -> Option<(TierKind, Record)> {
        let storage = storage_key(key);

        for (index, slot) in self.slots.iter().enumerate() {
            if !slot.kind().consulted_for(life) {
                continue;
            }

            let read = slot.get(&storage);
            instrumentation.lap(timer, slot.kind().as_str());

            match read {
                Ok(Some(entry)) => {
                    let record = entry.into_value();
                    if record.is_stale(now) {
                        tracing::debug!(collection.key = key, tier.name = slot.kind().as_str(), "stale record skipped");
                        continue;
                    }
                    self.promote(key, &storage, &record, life, now, &self.slots[..index]);
                    return Some((slot.kind(), record));
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        collection.key = key,
                        tier.name = slot.kind().as_str(),
                        error = %e,
                        "tier read failed, treating as a miss"
                    );
                }
            }
        }

        None
    }

    fn promote(&self, key: &str, storage: &String, record: &Record, life: Life, now: SystemTime, above: &[Slot]) {
        if above.is_empty() || !self.policy.should_promote(record) {
            return;
        }

        for slot in above.iter().filter(|slot| slot.kind().accepts(life)) {
            let Some(entry) = entry_for(record, life, now) else {
                return;
            };

            match slot.insert(storage, entry) {
                Ok(()) => self
                    .telemetry
                    .record(slot.kind().as_str(), TierOperation::Promote, Activity::Promoted, Duration::ZERO),
                Err(e) => tracing::warn!(
                    collection.key = key,
                    tier.name = slot.kind().as_str(),
                    error = %e,
                    "promotion failed"
                ),
            }
        }
    }

    /// Writes `record` to every slot that accepts `life`.
    ///
    /// Returns `true` when at least one slot other than memory stored it. Runs as timer
    /// `collection:{key}/write_back`, with one lap per slot written.
    pub(crate) fn write_back(
        &self,
        key: &str,
        record: &Record,
        life: Life,
        now: SystemTime,
        instrumentation: &Instrumentation,
    ) -> bool {
        let storage = storage_key(key);
        let timer = format!("collection:{key}/write_back");
        let mut persisted = false;
        instrumentation.start(&timer);

        for slot in self.slots.iter().filter(|slot| slot.kind().accepts(life)) {
            let Some(entry) = entry_for(record, life, now) else {
                tracing::debug!(collection.key = key, "record expired before it could be written");
                break;
            };

            let written = slot.insert(&storage, entry);
            instrumentation.lap(&timer, slot.kind().as_str());

            match written {
                Ok(()) => persisted |= slot.kind() != TierKind::Memory,
                Err(e) => tracing::warn!(
                    collection.key = key,
                    tier.name = slot.kind().as_str(),
                    error = %e,
                    "tier write failed"
                ),
            }
        }

        instrumentation.stop(&timer);
        persisted
    }

    /// Removes `key` from every slot.
    pub(crate) fn invalidate(&self, key: &str) {
        let storage = storage_key(key);
        for slot in &self.slots {
            if let Err(e) = slot.invalidate(&storage) {
                tracing::warn!(
                    collection.key = key,
                    tier.name = slot.kind().as_str(),
                    error = %e,
                    "tier invalidation failed"
                );
            }
        }
    }
}

/// Builds the entry written for `record`, carrying the remaining TTL for expiring lives.
///
/// Returns `None` when an expiring record has no time left.
fn entry_for(record: &Record, life: Life, now: SystemTime) -> Option<CacheEntry<Record>> {
    match life {
        Life::Expires(_) => {
            let left = life::remaining(record.expires_at?, now)?;
            Some(CacheEntry::with_ttl(record.clone(), left))
        }
        Life::Runtime | Life::Forever => Some(CacheEntry::new(record.clone())),
    }
}

#[cfg(test)]
mod tests {
    use hoard_tier::DynamicTierExt;
    use hoard_tier::testing::{MockTier, TierOp};
    use serde_json::json;
    use tick::ClockControl;

    use super::*;
    use crate::Items;
    use crate::testing::LogCapture;

    struct Fixture {
        control: ClockControl,
        memory: MockTier<String, Record>,
        persistent: MockTier<String, Record>,
        shared: MockTier<String, Record>,
        instrumentation: Instrumentation,
    }

    impl Fixture {
        fn new() -> Self {
            let control = ClockControl::new();
            let clock = control.to_clock();
            Self {
                memory: MockTier::new().with_clock(clock.clone()),
                persistent: MockTier::new().with_clock(clock.clone()),
                shared: MockTier::new().with_clock(clock.clone()),
                instrumentation: Instrumentation::new("k", false, clock),
                control,
            }
        }

        fn chain(&self, policy: PromotionPolicy) -> TierChain {
            TierChain::new(
                [
                    (TierKind::Shared, self.shared.clone().into_dynamic()),
                    (TierKind::Memory, self.memory.clone().into_dynamic()),
                    (TierKind::Persistent, self.persistent.clone().into_dynamic()),
                ],
                policy,
                &self.control.to_clock(),
                None,
            )
        }

        fn now(&self) -> SystemTime {
            self.control.to_clock().system_time()
        }

        fn record(&self, life: Life) -> Record {
            let created_at = self.now();
            Record {
                created_at,
                expires_at: life::expires_at(created_at, life),
                items: Items::from_value(json!([1, 2, 3])).unwrap(),
                source: Source::Runtime,
            }
        }
    }

    #[test]
    fn slots_are_ordered_by_precedence() {
        let fixture = Fixture::new();
        let chain = fixture.chain(PromotionPolicy::always());
        let kinds: Vec<_> = chain.kinds().collect();
        assert_eq!(kinds, [TierKind::Memory, TierKind::Persistent, TierKind::Shared]);
    }

    #[test]
    fn write_back_follows_life() {
        let fixture = Fixture::new();
        let chain = fixture.chain(PromotionPolicy::always());
        let key = storage_key("k");

        assert!(!chain.write_back("k", &fixture.record(Life::Runtime), Life::Runtime, fixture.now(), &fixture.instrumentation));
        assert!(fixture.memory.contains_key(&key));
        assert!(!fixture.persistent.contains_key(&key));
        assert!(!fixture.shared.contains_key(&key));

        assert!(chain.write_back("k", &fixture.record(Life::Forever), Life::Forever, fixture.now(), &fixture.instrumentation));
        assert!(fixture.persistent.peek(&key).unwrap().ttl().is_none());
        assert!(!fixture.shared.contains_key(&key));

        let life = Life::from_secs(5);
        let record = fixture.record(life);
        fixture.control.advance(Duration::from_secs(2));
        assert!(chain.write_back("k", &record, life, fixture.now(), &fixture.instrumentation));
        for tier in [&fixture.memory, &fixture.persistent, &fixture.shared] {
            assert_eq!(tier.peek(&key).unwrap().ttl(), Some(Duration::from_secs(3)));
        }
    }

    #[test]
    fn write_back_skips_records_without_time_left() {
        let fixture = Fixture::new();
        let chain = fixture.chain(PromotionPolicy::always());
        let life = Life::from_secs(1);
        let record = fixture.record(life);
        fixture.control.advance(Duration::from_secs(1));

        assert!(!chain.write_back("k", &record, life, fixture.now(), &fixture.instrumentation));
        assert_eq!(fixture.memory.entry_count(), 0);
    }

    #[test]
    fn runtime_lookups_only_consult_memory() {
        let fixture = Fixture::new();
        let chain = fixture.chain(PromotionPolicy::always());
        fixture
            .persistent
            .insert(&storage_key("k"), CacheEntry::new(fixture.record(Life::Runtime)))
            .unwrap();

        assert!(chain.lookup("k", Life::Runtime, fixture.now(), &fixture.instrumentation).is_none());
        assert!(!fixture.persistent.operations().iter().any(TierOp::is_get));
    }

    #[test]
    fn lower_hits_are_promoted() {
        let fixture = Fixture::new();
        let chain = fixture.chain(PromotionPolicy::always());
        let life = Life::from_secs(10);
        let record = fixture.record(life);
        fixture
            .shared
            .insert(&storage_key("k"), CacheEntry::with_ttl(record.clone(), Duration::from_secs(10)))
            .unwrap();
        fixture.control.advance(Duration::from_secs(4));

        let (kind, found) = chain.lookup("k", life, fixture.now(), &fixture.instrumentation).unwrap();
        assert_eq!(kind, TierKind::Shared);
        assert_eq!(found, record);

        for tier in [&fixture.memory, &fixture.persistent] {
            assert_eq!(tier.peek(&storage_key("k")).unwrap().ttl(), Some(Duration::from_secs(6)));
        }
    }

    #[test]
    fn forever_hits_are_not_promoted_into_shared() {
        let fixture = Fixture::new();
        let chain = fixture.chain(PromotionPolicy::always());
        fixture
            .persistent
            .insert(&storage_key("k"), CacheEntry::new(fixture.record(Life::Forever)))
            .unwrap();

        let (kind, _) = chain.lookup("k", Life::Forever, fixture.now(), &fixture.instrumentation).unwrap();
        assert_eq!(kind, TierKind::Persistent);
        assert!(fixture.memory.contains_key(&storage_key("k")));
        assert!(!fixture.shared.contains_key(&storage_key("k")));
    }

    #[test]
    fn promotion_policy_is_honored() {
        let fixture = Fixture::new();
        let chain = fixture.chain(PromotionPolicy::when(|record| record.items.len() > 10));
        fixture
            .persistent
            .insert(&storage_key("k"), CacheEntry::new(fixture.record(Life::Forever)))
            .unwrap();

        assert!(chain.lookup("k", Life::Forever, fixture.now(), &fixture.instrumentation).is_some());
        assert!(!fixture.memory.contains_key(&storage_key("k")));

        let never = fixture.chain(PromotionPolicy::never());
        assert!(never.lookup("k", Life::Forever, fixture.now(), &fixture.instrumentation).is_some());
        assert!(!fixture.memory.contains_key(&storage_key("k")));
    }

    #[test]
    fn stale_and_failing_slots_are_misses() {
        let fixture = Fixture::new();
        let chain = fixture.chain(PromotionPolicy::always());
        let life = Life::from_secs(5);

        // A record whose own deadline has passed, stored without a tier TTL.
        fixture
            .memory
            .insert(&storage_key("k"), CacheEntry::new(fixture.record(life)))
            .unwrap();
        fixture.shared.fail_when(|op| op.is_get());
        fixture.control.advance(Duration::from_secs(6));

        assert!(chain.lookup("k", life, fixture.now(), &fixture.instrumentation).is_none());
    }

    #[test]
    fn invalidate_reaches_every_slot() {
        let fixture = Fixture::new();
        let chain = fixture.chain(PromotionPolicy::always());
        let life = Life::from_secs(5);
        assert!(chain.write_back("k", &fixture.record(life), life, fixture.now(), &fixture.instrumentation));
        fixture.persistent.fail_when(|op| matches!(op, TierOp::Invalidate(_)));

        chain.invalidate("k");

        assert!(!fixture.memory.contains_key(&storage_key("k")));
        assert!(fixture.persistent.contains_key(&storage_key("k")));
        assert!(!fixture.shared.contains_key(&storage_key("k")));
    }

    #[test]
    fn tier_calls_are_timed_when_instrumented() {
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());
        let fixture = Fixture::new();
        let chain = fixture.chain(PromotionPolicy::never());
        let instrumentation = Instrumentation::new("k", true, fixture.control.to_clock());
        let life = Life::from_secs(5);

        assert!(chain.write_back("k", &fixture.record(life), life, fixture.now(), &instrumentation));
        assert!(chain.lookup("k", life, fixture.now(), &instrumentation).is_some());

        let output = capture.output();
        assert!(output.contains("collection:k/write_back"), "{output}");
        assert!(output.contains("collection:k/lookup"), "{output}");
        assert_eq!(output.matches("timer lap").count(), 4, "{output}");
        assert_eq!(output.matches("timer stopped").count(), 2, "{output}");

        let quiet = LogCapture::new();
        let _guard = tracing::subscriber::set_default(quiet.subscriber());
        chain.lookup("k", life, fixture.now(), &fixture.instrumentation);
        assert!(!quiet.output().contains("hoard.timer"));
    }

    #[test]
    fn kind_rules() {
        assert!(TierKind::Memory.accepts(Life::Runtime));
        assert!(!TierKind::Persistent.accepts(Life::Runtime));
        assert!(TierKind::Persistent.accepts(Life::Forever));
        assert!(!TierKind::Shared.accepts(Life::Forever));
        assert!(TierKind::Shared.consulted_for(Life::Forever));
        assert!(!TierKind::Shared.consulted_for(Life::Runtime));
        assert_eq!(TierKind::Persistent.source(), Source::PersistentTier);
        assert_eq!(TierKind::Shared.to_string(), "shared");
    }
}
