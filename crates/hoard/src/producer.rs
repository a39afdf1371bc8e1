// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Producers and the registration a collection is defined by.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::{Items, Life};

pub(crate) type ProduceError = Box<dyn std::error::Error + Send + Sync>;

type ProduceFn = dyn Fn() -> Result<Value, ProduceError> + Send + Sync;
type TransformFn = dyn Fn(Items) -> Items + Send + Sync;

/// Computes the canonical value of a collection.
///
/// A producer runs synchronously to completion whenever its collection is refreshed. Its output
/// must serialize to a JSON array or object; anything else is a production error and the
/// collection keeps its previous payload.
///
/// # Examples
///
/// ```
/// use hoard::Producer;
///
/// let numbers = Producer::new(|| vec![1, 2, 3]);
/// let parsed = Producer::fallible(|| "4,5".split(',').map(str::parse::<u32>).collect::<Result<Vec<_>, _>>());
/// assert!(numbers.is_invocable());
/// assert!(parsed.is_invocable());
/// assert!(!Producer::missing().is_invocable());
/// ```
#[derive(Clone)]
pub struct Producer {
    inner: Option<Arc<ProduceFn>>,
}

impl Producer {
    /// Creates a producer from a closure returning any serializable value.
    pub fn new<F, T>(f: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
        T: Serialize,
    {
        Self::from_fn(move || serde_json::to_value(f()).map_err(Into::into))
    }

    /// Creates a producer from a closure that can fail.
    pub fn fallible<F, T, E>(f: F) -> Self
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
        T: Serialize,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::from_fn(move || {
            let value = f().map_err(Into::into)?;
            serde_json::to_value(value).map_err(Into::into)
        })
    }

    /// Creates a producer from a closure returning a JSON value.
    pub fn from_value<F>(f: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        Self::from_fn(move || Ok(f()))
    }

    /// A producer that always yields an empty sequence.
    #[must_use]
    pub fn empty() -> Self {
        Self::from_fn(|| Ok(Value::Array(Vec::new())))
    }

    /// A placeholder that cannot be invoked.
    ///
    /// Registering it is a configuration error; the registry binds [`Producer::empty`] instead.
    #[must_use]
    pub const fn missing() -> Self {
        Self { inner: None }
    }

    /// Returns `false` for [`Producer::missing`].
    #[must_use]
    pub fn is_invocable(&self) -> bool {
        self.inner.is_some()
    }

    fn from_fn(f: impl Fn() -> Result<Value, ProduceError> + Send + Sync + 'static) -> Self {
        Self { inner: Some(Arc::new(f)) }
    }

    pub(crate) fn invoke(&self) -> Result<Value, ProduceError> {
        match &self.inner {
            Some(f) => f(),
            None => Err("producer cannot be invoked".into()),
        }
    }
}

impl fmt::Debug for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer").field("invocable", &self.is_invocable()).finish()
    }
}

/// Everything a collection is registered with.
///
/// ```
/// use hoard::{Items, Producer, Registration};
///
/// let registration = Registration::new(Producer::new(|| vec![3, 1, 2]))
///     .life(300)
///     .debug(true)
///     .transform(|mut items: Items| {
///         items.retain(|_, value| !value.is_null());
///         items
///     });
/// # let _ = registration;
/// ```
#[derive(Clone)]
pub struct Registration {
    pub(crate) producer: Producer,
    pub(crate) life: Life,
    pub(crate) debug: bool,
    pub(crate) transforms: Vec<Arc<TransformFn>>,
}

impl Registration {
    /// Starts a registration with a runtime life and no transforms.
    #[must_use]
    pub fn new(producer: Producer) -> Self {
        Self {
            producer,
            life: Life::Runtime,
            debug: false,
            transforms: Vec::new(),
        }
    }

    /// Sets how long produced payloads stay valid. Accepts a [`Life`] or its seconds form.
    #[must_use]
    pub fn life(mut self, life: impl Into<Life>) -> Self {
        self.life = life.into();
        self
    }

    /// Turns on instrumentation and access logging for this collection alone.
    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Appends a step that curates produced items before they are stored.
    ///
    /// Steps run in the order they were added.
    #[must_use]
    pub fn transform<F>(mut self, f: F) -> Self
    where
        F: Fn(Items) -> Items + Send + Sync + 'static,
    {
        self.transforms.push(Arc::new(f));
        self
    }

    pub(crate) fn curate(&self, items: Items) -> Items {
        self.transforms.iter().fold(items, |items, step| step(items))
    }
}

impl From<Producer> for Registration {
    fn from(producer: Producer) -> Self {
        Self::new(producer)
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("producer", &self.producer)
            .field("life", &self.life)
            .field("debug", &self.debug)
            .field("transforms", &self.transforms.len())
            .finish()
    }
}
