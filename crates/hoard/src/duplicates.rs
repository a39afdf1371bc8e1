// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Detects producers that yield the same items as another registered producer.

use std::sync::Arc;

use crate::registry::{Context, Definition};
use crate::{Equality, Event};

/// Compares the output of `candidate` against every definition in `others`.
///
/// The first match is reported and published; the key it matched is returned. Producers that
/// fail are skipped.
pub(crate) fn check(candidate: &Definition, others: &[Arc<Definition>], context: &Context) -> Option<String> {
    let produced = match candidate.produce(context) {
        Ok(items) => items.to_value(),
        Err(error) => {
            tracing::debug!(collection.key = %candidate.key, error = %error, "duplicate check skipped");
            return None;
        }
    };

    for other in others.iter().filter(|other| other.key != candidate.key) {
        let Ok(items) = other.produce(context) else {
            continue;
        };

        if Equality::Loose.matches(&produced, &items.to_value()) {
            tracing::warn!(
                collection.key = %candidate.key,
                duplicate_of = %other.key,
                "producer yields the same items as another collection"
            );
            context.publish(&Event::duplicate(candidate.key.as_str(), other.key.as_str()));
            return Some(other.key.clone());
        }
    }

    None
}
