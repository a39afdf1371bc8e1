// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for collection operations.

use std::fmt;

/// What went wrong with a collection.
///
/// Every kind is recovered from locally by the infallible operations (`register`, `get`,
/// `items`, `refresh`); the `try_*` registry methods surface the configuration kinds instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The key was registered before; the earlier registration stands.
    DuplicateKey,
    /// No registration exists for the key.
    NotRegistered,
    /// The producer cannot be invoked.
    ProducerMissing,
    /// The producer failed or returned something other than a sequence.
    Production,
    /// A payload or stored record could not be encoded or decoded.
    MalformedPayload,
    /// A storage tier failed.
    Tier,
}

impl ErrorKind {
    /// Returns a stable, machine-friendly name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DuplicateKey => "duplicate_key",
            Self::NotRegistered => "not_registered",
            Self::ProducerMissing => "producer_missing",
            Self::Production => "production",
            Self::MalformedPayload => "malformed_payload",
            Self::Tier => "tier",
        }
    }

    /// Returns `true` for misuse of the registry, as opposed to runtime failures.
    #[must_use]
    pub fn is_configuration(self) -> bool {
        matches!(self, Self::DuplicateKey | Self::NotRegistered | Self::ProducerMissing)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::DuplicateKey => "already registered",
            Self::NotRegistered => "not registered",
            Self::ProducerMissing => "producer cannot be invoked",
            Self::Production => "producer failed",
            Self::MalformedPayload => "malformed payload",
            Self::Tier => "tier operation failed",
        };
        f.write_str(text)
    }
}

/// An error concerning one collection.
///
/// # Example
///
/// ```
/// use hoard::{ErrorKind, Registry};
/// use tick::ClockControl;
///
/// let registry = Registry::builder(ClockControl::new().to_clock()).build();
/// let error = registry.try_get("posts").expect_err("nothing registered");
/// assert_eq!(error.kind(), ErrorKind::NotRegistered);
/// assert!(error.to_string().contains("posts"));
/// ```
#[ohno::error]
#[display("collection `{key}`: {kind}")]
pub struct Error {
    kind: ErrorKind,
    key: String,
}

impl Error {
    /// Returns what went wrong.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the collection key the error concerns.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// A specialized [`Result`] type for collection operations.
pub type Result<T> = std::result::Result<T, Error>;
