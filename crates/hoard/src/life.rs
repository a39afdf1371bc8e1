// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! How long a collection's payload lives, and the time arithmetic around it.
//!
//! The helpers here are pure: they take the current time as an argument and never read a clock.

use std::time::{Duration, SystemTime};

/// The life configured for a collection.
///
/// The integer form used by [`Life::from_secs`] reserves `-1` for [`Life::Runtime`] and `0` for
/// [`Life::Forever`]; positive values are seconds.
///
/// ```
/// use std::time::Duration;
///
/// use hoard::Life;
///
/// assert_eq!(Life::from_secs(-1), Life::Runtime);
/// assert_eq!(Life::from_secs(0), Life::Forever);
/// assert_eq!(Life::from_secs(30), Life::Expires(Duration::from_secs(30)));
/// assert_eq!(Life::from_secs(30).as_secs(), 30);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Life {
    /// Kept in process memory only; never written to the persistent or shared tier.
    #[default]
    Runtime,
    /// Persisted without expiration.
    Forever,
    /// Persisted, and void once this long has passed since creation.
    Expires(Duration),
}

impl Life {
    /// Converts the integer form. Negative values other than `-1` are treated as `-1`.
    #[must_use]
    pub fn from_secs(secs: i64) -> Self {
        match secs {
            0 => Self::Forever,
            s if s > 0 => Self::Expires(Duration::from_secs(s.unsigned_abs())),
            _ => Self::Runtime,
        }
    }

    /// Returns the integer form.
    #[must_use]
    pub fn as_secs(self) -> i64 {
        match self {
            Self::Runtime => -1,
            Self::Forever => 0,
            Self::Expires(ttl) => i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX),
        }
    }

    /// Returns `true` when payloads are written past process memory.
    #[must_use]
    pub fn persists(self) -> bool {
        !matches!(self, Self::Runtime)
    }

    /// Returns the time-to-live, if the life expires.
    #[must_use]
    pub fn ttl(self) -> Option<Duration> {
        match self {
            Self::Expires(ttl) => Some(ttl),
            Self::Runtime | Self::Forever => None,
        }
    }
}

impl From<i64> for Life {
    fn from(secs: i64) -> Self {
        Self::from_secs(secs)
    }
}

impl From<i32> for Life {
    fn from(secs: i32) -> Self {
        Self::from_secs(i64::from(secs))
    }
}

impl From<Duration> for Life {
    /// A zero duration means "never expires", mirroring the integer form.
    fn from(ttl: Duration) -> Self {
        if ttl.is_zero() { Self::Forever } else { Self::Expires(ttl) }
    }
}

/// Returns when a payload created at `created_at` stops being valid.
#[must_use]
pub fn expires_at(created_at: SystemTime, life: Life) -> Option<SystemTime> {
    created_at.checked_add(life.ttl()?)
}

/// Returns the time left until `expires_at`, or `None` once it has been reached.
#[must_use]
pub fn remaining(expires_at: SystemTime, now: SystemTime) -> Option<Duration> {
    expires_at.duration_since(now).ok().filter(|left| !left.is_zero())
}

/// Returns `true` when a payload with this life and deadline is void at `now`.
///
/// Only expiring lives can expire. For them, a missing deadline counts as expired: the payload
/// was never successfully cached.
#[must_use]
pub fn has_expired(life: Life, expires_at: Option<SystemTime>, now: SystemTime) -> bool {
    match (life, expires_at) {
        (Life::Runtime | Life::Forever, _) => false,
        (Life::Expires(_), None) => true,
        (Life::Expires(_), Some(deadline)) => now > deadline,
    }
}
