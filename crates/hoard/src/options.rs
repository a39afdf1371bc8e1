// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Debug switches.

const INSTRUMENT_VAR: &str = "HOARD_DEBUG";
const ACCESS_LOG_VAR: &str = "HOARD_LOG_ACCESS";
const CHECK_DUPLICATES_VAR: &str = "HOARD_CHECK_DUPLICATES";

/// Registry-wide debug switches. All are off by default.
///
/// ```
/// use hoard::{DebugOptions, Registry};
/// use tick::ClockControl;
///
/// let registry = Registry::builder(ClockControl::new().to_clock())
///     .debug(DebugOptions {
///         check_duplicates: true,
///         ..DebugOptions::default()
///     })
///     .build();
/// # let _ = registry;
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebugOptions {
    /// Emits instrumentation timers and messages for every collection.
    pub instrument: bool,
    /// Records who read each collection and when.
    pub access_log: bool,
    /// Compares every newly registered producer against the existing ones.
    pub check_duplicates: bool,
}

impl DebugOptions {
    /// Every switch on.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            instrument: true,
            access_log: true,
            check_duplicates: true,
        }
    }

    /// Reads `HOARD_DEBUG`, `HOARD_LOG_ACCESS` and `HOARD_CHECK_DUPLICATES`.
    ///
    /// `1`, `true`, `yes` and `on` (any case) turn a switch on; anything else leaves it off.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let flag = |name| lookup(name).is_some_and(|value| truthy(&value));
        Self {
            instrument: flag(INSTRUMENT_VAR),
            access_log: flag(ACCESS_LOG_VAR),
            check_duplicates: flag(CHECK_DUPLICATES_VAR),
        }
    }
}

fn truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
