// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for tier operations.

/// An error from a tier operation.
///
/// Opaque by design of the trait: backends wrap whatever went wrong underneath, and callers can
/// reach the cause through [`std::error::Error::source()`].
///
/// # Example
///
/// ```
/// use hoard_tier::Error;
///
/// let error = Error::from_message("disk full");
/// assert!(error.to_string().contains("disk full"));
/// ```
#[ohno::error]
pub struct Error {}

impl Error {
    /// Creates an error from anything convertible into a boxed error.
    pub fn from_message(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(cause)
    }
}

/// A specialized [`Result`] type for tier operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_debug_carry_cause() {
        let error = Error::from_message("backend unreachable");
        assert!(format!("{error}").contains("backend unreachable"));
        assert!(format!("{error:?}").contains("backend unreachable"));
    }

    #[test]
    fn result_alias_propagates() {
        fn read() -> Result<u8> {
            Err(Error::from_message("expected failure"))
        }

        fn outer() -> Result<u8> {
            let value = read()?;
            Ok(value + 1)
        }

        let err = outer().expect_err("should propagate");
        assert!(err.to_string().contains("expected failure"));
    }
}
