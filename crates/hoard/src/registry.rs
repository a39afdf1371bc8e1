// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The registry of named collections.

use std::collections::HashMap;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

#[cfg(feature = "memory")]
use hoard_memory::InMemoryTier;
use hoard_tier::{CacheTier, DynamicTierExt};
use parking_lot::RwLock;
use tick::Clock;

use crate::telemetry::ext::{ClockExt, TelemetryExt};
use crate::telemetry::{Activity, TierOperation};
use crate::tiers::{RecordTier, TierChain};
use crate::{
    Collection, CollectionTelemetry, DebugOptions, EncodedTier, Error, ErrorKind, Event, EventBus, EventKind, Instrumentation,
    Items, Life, Producer, PromotionPolicy, Record, Registration, TierKind, duplicates,
};

type KeyResolver = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// State shared by a registry and every collection handle it hands out.
pub(crate) struct Context {
    pub(crate) clock: Clock,
    pub(crate) tiers: TierChain,
    pub(crate) options: DebugOptions,
    pub(crate) telemetry: Option<CollectionTelemetry>,
    events: Option<Arc<dyn EventBus>>,
}

impl Context {
    pub(crate) fn now(&self) -> SystemTime {
        self.clock.system_time()
    }

    pub(crate) fn publish(&self, event: &Event) {
        tracing::trace!(collection.key = event.key(), hoard.event = event.kind().as_str(), "{}", event.name());
        if let Some(bus) = &self.events {
            bus.publish(event);
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("tiers", &self.tiers)
            .field("options", &self.options)
            .field("events", &self.events.is_some())
            .finish_non_exhaustive()
    }
}

/// A registered collection: its key, registration and debug hooks.
#[derive(Debug)]
pub(crate) struct Definition {
    pub(crate) key: String,
    pub(crate) registration: Registration,
    pub(crate) instrumentation: Instrumentation,
    runs: AtomicU64,
}

impl Definition {
    fn new(key: String, registration: Registration, context: &Context) -> Self {
        let enabled = registration.debug || context.options.instrument;
        Self {
            instrumentation: Instrumentation::new(key.clone(), enabled, context.clock.clone()),
            key,
            registration,
            runs: AtomicU64::new(0),
        }
    }

    pub(crate) fn life(&self) -> Life {
        self.registration.life
    }

    pub(crate) fn debug(&self) -> bool {
        self.registration.debug
    }

    /// Runs the producer and the transform pipeline.
    pub(crate) fn produce(&self, context: &Context) -> Result<Items, Error> {
        let run = self.runs.fetch_add(1, Ordering::Relaxed) + 1;
        let timer = format!("collection:{}/produce/{run}", self.key);
        self.instrumentation.start(&timer);

        let timed = context.clock.timed(|| self.registration.producer.invoke());
        let produced = timed
            .result
            .map_err(|e| Error::caused_by(ErrorKind::Production, self.key.as_str(), e))
            .and_then(|value| Items::from_value(value).map_err(|e| Error::caused_by(ErrorKind::Production, self.key.as_str(), e)));

        let activity = if produced.is_ok() { Activity::Produced } else { Activity::Failed };
        context.telemetry.record(&self.key, TierOperation::Produce, activity, timed.duration);
        self.instrumentation.lap(&timer, "produced");

        let items = match produced {
            Ok(items) => self.registration.curate(items),
            Err(error) => {
                self.instrumentation.stop(&timer);
                return Err(error);
            }
        };

        self.instrumentation.lap(&timer, "curated");
        self.instrumentation.stop(&timer);
        Ok(items)
    }
}

#[derive(Debug, Default)]
struct Definitions {
    by_key: HashMap<String, Arc<Definition>>,
    order: Vec<String>,
}

struct RegistryInner {
    context: Arc<Context>,
    definitions: RwLock<Definitions>,
    key_resolver: Option<KeyResolver>,
}

/// Named collections, each computed lazily by its producer and cached across tiers.
///
/// A registry is constructed once and shared by handle; clones refer to the same collections.
///
/// # Examples
///
/// ```
/// use hoard::{Producer, Registry, Source};
/// use serde_json::json;
/// use tick::ClockControl;
///
/// let registry = Registry::builder(ClockControl::new().to_clock()).build();
/// let mut nums = registry.register("nums", Producer::new(|| vec![1, 2, 3, 4, 5]), -1);
///
/// assert_eq!(nums.items().to_value(), json!([1, 2, 3, 4, 5]));
/// assert_eq!(nums.source(), Source::Runtime);
/// assert!(registry.get("nums").has(4));
/// ```
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl Registry {
    /// Starts building a registry that reads time from `clock`.
    #[must_use]
    pub fn builder(clock: Clock) -> RegistryBuilder {
        RegistryBuilder::new(clock)
    }

    /// Registers `key` and returns a handle to it.
    ///
    /// Registering a key twice is a configuration error: it is reported and the handle of the
    /// existing collection is returned, with its original producer and life.
    pub fn register(&self, key: impl Into<String>, producer: Producer, life: impl Into<Life>) -> Collection {
        self.register_with(key, Registration::new(producer).life(life))
    }

    /// Registers `key` with a full [`Registration`].
    ///
    /// A [`Producer::missing`] is reported and replaced by [`Producer::empty`].
    pub fn register_with(&self, key: impl Into<String>, registration: impl Into<Registration>) -> Collection {
        let key = key.into();
        let mut registration = registration.into();

        if !registration.producer.is_invocable() {
            let error = Error::new(ErrorKind::ProducerMissing, key.as_str());
            tracing::warn!(collection.key = %key, error = %error, "binding the empty producer");
            registration.producer = Producer::empty();
        }

        match self.define(key, registration) {
            Ok(definition) => self.announce(definition),
            Err(existing) => {
                let error = Error::new(ErrorKind::DuplicateKey, existing.key.as_str());
                tracing::warn!(collection.key = %existing.key, error = %error, "keeping the existing registration");
                self.handle(existing)
            }
        }
    }

    /// Registers `key`, returning the configuration error instead of recovering from it.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::ProducerMissing`] for a producer that cannot be invoked and
    /// [`ErrorKind::DuplicateKey`] for a key that is already registered.
    pub fn try_register(&self, key: impl Into<String>, registration: impl Into<Registration>) -> Result<Collection, Error> {
        let key = key.into();
        let registration = registration.into();

        if !registration.producer.is_invocable() {
            return Err(Error::new(ErrorKind::ProducerMissing, key));
        }

        self.define(key, registration)
            .map(|definition| self.announce(definition))
            .map_err(|existing| Error::new(ErrorKind::DuplicateKey, existing.key.as_str()))
    }

    /// Returns a handle to the collection registered under `key`.
    ///
    /// An unknown key is reported, and the handle returned is empty, unregistered and never
    /// touches a tier.
    #[track_caller]
    pub fn get(&self, key: &str) -> Collection {
        let location = Location::caller();
        let key = self.resolve_key(key);

        match self.definition(&key) {
            Some(definition) => {
                let mut collection = self.handle(definition);
                collection.note_access("get", location);
                collection
            }
            None => {
                let error = Error::new(ErrorKind::NotRegistered, key.as_str());
                tracing::warn!(collection.key = %key, error = %error, "returning an empty collection");
                self.unregistered(key)
            }
        }
    }

    /// Returns a handle to the collection registered under `key`.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::NotRegistered`] for an unknown key.
    #[track_caller]
    pub fn try_get(&self, key: &str) -> Result<Collection, Error> {
        let location = Location::caller();
        let key = self.resolve_key(key);

        let definition = self.definition(&key).ok_or_else(|| Error::new(ErrorKind::NotRegistered, key))?;
        let mut collection = self.handle(definition);
        collection.note_access("get", location);
        Ok(collection)
    }

    /// Returns `true` if `key` is registered.
    #[must_use]
    pub fn is_registered(&self, key: &str) -> bool {
        let key = self.resolve_key(key);
        self.inner.definitions.read().by_key.contains_key(&key)
    }

    /// Returns the registered keys in registration order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.inner.definitions.read().order.clone()
    }

    /// Returns the configured tier slots in precedence order.
    #[must_use]
    pub fn tiers(&self) -> Vec<TierKind> {
        self.inner.context.tiers.kinds().collect()
    }

    /// Returns the registry's clock.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.inner.context.clock
    }

    fn resolve_key(&self, key: &str) -> String {
        self.inner.key_resolver.as_ref().map_or_else(|| key.to_owned(), |resolve| resolve(key))
    }

    fn definition(&self, key: &str) -> Option<Arc<Definition>> {
        self.inner.definitions.read().by_key.get(key).cloned()
    }

    /// Stores a new definition, or returns the existing one for the key.
    fn define(&self, key: String, registration: Registration) -> Result<Arc<Definition>, Arc<Definition>> {
        let mut definitions = self.inner.definitions.write();
        if let Some(existing) = definitions.by_key.get(&key) {
            return Err(Arc::clone(existing));
        }

        let definition = Arc::new(Definition::new(key.clone(), registration, &self.inner.context));
        definitions.order.push(key.clone());
        definitions.by_key.insert(key, Arc::clone(&definition));
        Ok(definition)
    }

    fn announce(&self, definition: Arc<Definition>) -> Collection {
        let context = &self.inner.context;
        context.publish(&Event::new(EventKind::Registered, definition.key.as_str()));

        if context.options.check_duplicates {
            let others: Vec<Arc<Definition>> = {
                let definitions = self.inner.definitions.read();
                definitions
                    .order
                    .iter()
                    .filter(|key| **key != definition.key)
                    .filter_map(|key| definitions.by_key.get(key).cloned())
                    .collect()
            };
            duplicates::check(&definition, &others, context);
        }

        self.handle(definition)
    }

    fn handle(&self, definition: Arc<Definition>) -> Collection {
        Collection::new(definition, Arc::clone(&self.inner.context), true)
    }

    fn unregistered(&self, key: String) -> Collection {
        let context = Arc::clone(&self.inner.context);
        let definition = Definition::new(key, Registration::new(Producer::empty()), &context);
        Collection::new(Arc::new(definition), context, false)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("keys", &self.keys())
            .field("context", &self.inner.context)
            .finish_non_exhaustive()
    }
}

enum MemorySlot {
    Default,
    Custom(RecordTier),
    Disabled,
}

/// Configures a [`Registry`].
///
/// ```
/// use hoard::{DebugOptions, PromotionPolicy, Registry, TierKind};
/// use hoard_tier::testing::MockTier;
/// use tick::ClockControl;
///
/// let disk = MockTier::<String, Vec<u8>>::new();
/// let registry = Registry::builder(ClockControl::new().to_clock())
///     .persistent(disk)
///     .promotion_policy(PromotionPolicy::never())
///     .debug(DebugOptions::from_env())
///     .key_resolver(|key| key.to_lowercase())
///     .build();
///
/// assert_eq!(registry.tiers(), [TierKind::Memory, TierKind::Persistent]);
/// ```
pub struct RegistryBuilder {
    clock: Clock,
    memory: MemorySlot,
    persistent: Option<RecordTier>,
    shared: Option<RecordTier>,
    policy: PromotionPolicy,
    events: Option<Arc<dyn EventBus>>,
    options: DebugOptions,
    telemetry: Option<CollectionTelemetry>,
    key_resolver: Option<KeyResolver>,
}

impl RegistryBuilder {
    fn new(clock: Clock) -> Self {
        Self {
            clock,
            memory: MemorySlot::Default,
            persistent: None,
            shared: None,
            policy: PromotionPolicy::default(),
            events: None,
            options: DebugOptions::default(),
            telemetry: None,
            key_resolver: None,
        }
    }

    /// Uses `tier` for the memory slot instead of the default moka-backed one.
    #[must_use]
    pub fn memory<T>(mut self, tier: T) -> Self
    where
        T: CacheTier<String, Record> + 'static,
    {
        self.memory = MemorySlot::Custom(tier.into_dynamic());
        self
    }

    /// Leaves the memory slot empty.
    #[must_use]
    pub fn without_memory(mut self) -> Self {
        self.memory = MemorySlot::Disabled;
        self
    }

    /// Uses a byte store for the persistent slot. Records are stored as JSON.
    #[must_use]
    pub fn persistent<T>(mut self, tier: T) -> Self
    where
        T: CacheTier<String, Vec<u8>> + 'static,
    {
        self.persistent = Some(EncodedTier::new(tier).into_dynamic());
        self
    }

    /// Uses a byte store for the shared slot. Records are stored as JSON.
    #[must_use]
    pub fn shared<T>(mut self, tier: T) -> Self
    where
        T: CacheTier<String, Vec<u8>> + 'static,
    {
        self.shared = Some(EncodedTier::new(tier).into_dynamic());
        self
    }

    /// Controls whether hits from lower slots are copied into the slots above them.
    #[must_use]
    pub fn promotion_policy(mut self, policy: PromotionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Publishes lifecycle events to `bus`.
    #[must_use]
    pub fn events<B>(mut self, bus: B) -> Self
    where
        B: EventBus + 'static,
    {
        self.events = Some(Arc::new(bus));
        self
    }

    /// Sets the debug switches.
    #[must_use]
    pub fn debug(mut self, options: DebugOptions) -> Self {
        self.options = options;
        self
    }

    /// Records tier operations and producer runs.
    #[must_use]
    pub fn telemetry(mut self, telemetry: CollectionTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Rewrites keys passed to [`Registry::get`], [`Registry::try_get`] and
    /// [`Registry::is_registered`] before they are looked up.
    #[must_use]
    pub fn key_resolver<F>(mut self, resolve: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.key_resolver = Some(Arc::new(resolve));
        self
    }

    /// Builds the registry.
    #[must_use]
    pub fn build(self) -> Registry {
        let memory = match self.memory {
            #[cfg(feature = "memory")]
            MemorySlot::Default => Some(InMemoryTier::<String, Record>::new().into_dynamic()),
            #[cfg(not(feature = "memory"))]
            MemorySlot::Default => None,
            MemorySlot::Custom(tier) => Some(tier),
            MemorySlot::Disabled => None,
        };

        let slots = [
            memory.map(|tier| (TierKind::Memory, tier)),
            self.persistent.map(|tier| (TierKind::Persistent, tier)),
            self.shared.map(|tier| (TierKind::Shared, tier)),
        ];
        let tiers = TierChain::new(slots.into_iter().flatten(), self.policy, &self.clock, self.telemetry.clone());

        Registry {
            inner: Arc::new(RegistryInner {
                context: Arc::new(Context {
                    clock: self.clock,
                    tiers,
                    options: self.options,
                    telemetry: self.telemetry,
                    events: self.events,
                }),
                definitions: RwLock::new(Definitions::default()),
                key_resolver: self.key_resolver,
            }),
        }
    }
}

impl fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryBuilder")
            .field("persistent", &self.persistent.is_some())
            .field("shared", &self.shared.is_some())
            .field("policy", &self.policy)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
