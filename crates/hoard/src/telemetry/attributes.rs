// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#[cfg(any(feature = "metrics", test))]
pub(crate) const TIER_NAME: &str = "tier.name";

#[cfg(any(feature = "metrics", test))]
pub(crate) const TIER_OPERATION_NAME: &str = "tier.operation";

#[cfg(any(feature = "metrics", test))]
pub(crate) const TIER_ACTIVITY_NAME: &str = "tier.activity";

#[cfg(test)]
pub(crate) const TIER_DURATION_NAME: &str = "tier.duration_ns";

#[cfg(test)]
pub(crate) const COLLECTION_KEY_NAME: &str = "collection.key";

#[cfg(test)]
pub(crate) const ACTIVITY_EVENT_NAME: &str = "hoard.activity";
