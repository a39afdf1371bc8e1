// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The payload of a collection: an ordered map from keys to JSON values.
//!
//! A producer returns either a JSON array, whose elements are keyed `0..n`, or a JSON object,
//! whose keys are kept in order. Object keys that are canonical integers (`"3"`, `"-12"`, but
//! not `"03"`) become integer keys, so `{"0": "a", "1": "b"}` and `["a", "b"]` are the same
//! payload.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::Equality;

/// The key of one item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemKey {
    /// An integer position or integer-like key.
    Index(i64),
    /// Any other string key.
    Name(String),
}

impl ItemKey {
    /// Parses a string key, turning canonical integers into [`ItemKey::Index`].
    ///
    /// ```
    /// use hoard::ItemKey;
    ///
    /// assert_eq!(ItemKey::parse("7"), ItemKey::Index(7));
    /// assert_eq!(ItemKey::parse("07"), ItemKey::Name("07".into()));
    /// assert_eq!(ItemKey::parse("foo"), ItemKey::Name("foo".into()));
    /// ```
    #[must_use]
    pub fn parse(key: &str) -> Self {
        match key.parse::<i64>() {
            Ok(index) if index.to_string() == key => Self::Index(index),
            _ => Self::Name(key.to_owned()),
        }
    }

    /// Turns a name spelling a canonical integer into the matching index.
    fn canonical(self) -> Self {
        match self {
            Self::Name(name) => match Self::parse(&name) {
                Self::Index(index) => Self::Index(index),
                Self::Name(_) => Self::Name(name),
            },
            index @ Self::Index(_) => index,
        }
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(f, "{index}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

impl From<i64> for ItemKey {
    fn from(index: i64) -> Self {
        Self::Index(index)
    }
}

impl From<usize> for ItemKey {
    fn from(index: usize) -> Self {
        i64::try_from(index).map_or_else(|_| Self::Name(index.to_string()), Self::Index)
    }
}

impl From<&str> for ItemKey {
    fn from(key: &str) -> Self {
        Self::parse(key)
    }
}

impl From<String> for ItemKey {
    fn from(key: String) -> Self {
        Self::parse(&key)
    }
}

/// A key used to look an item up.
///
/// Only strings and integers address items. Anything else, such as a float, a boolean or an
/// array, converts to [`Lookup::Unsupported`], which never matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// A usable key.
    Key(ItemKey),
    /// A value that cannot address an item.
    Unsupported,
}

impl Lookup {
    fn key(&self) -> Option<&ItemKey> {
        match self {
            Self::Key(key) => Some(key),
            Self::Unsupported => None,
        }
    }
}

impl From<ItemKey> for Lookup {
    fn from(key: ItemKey) -> Self {
        Self::Key(key.canonical())
    }
}

impl From<&ItemKey> for Lookup {
    fn from(key: &ItemKey) -> Self {
        Self::Key(key.clone().canonical())
    }
}

impl From<i64> for Lookup {
    fn from(index: i64) -> Self {
        Self::Key(ItemKey::Index(index))
    }
}

impl From<i32> for Lookup {
    fn from(index: i32) -> Self {
        Self::Key(ItemKey::Index(i64::from(index)))
    }
}

impl From<usize> for Lookup {
    fn from(index: usize) -> Self {
        Self::Key(ItemKey::from(index))
    }
}

impl From<&str> for Lookup {
    fn from(key: &str) -> Self {
        Self::Key(ItemKey::parse(key))
    }
}

impl From<String> for Lookup {
    fn from(key: String) -> Self {
        Self::Key(ItemKey::parse(&key))
    }
}

impl From<&String> for Lookup {
    fn from(key: &String) -> Self {
        Self::Key(ItemKey::parse(key))
    }
}

impl From<&Value> for Lookup {
    fn from(value: &Value) -> Self {
        match value {
            Value::String(key) => Self::Key(ItemKey::parse(key)),
            Value::Number(number) => number.as_i64().map_or(Self::Unsupported, |index| Self::Key(ItemKey::Index(index))),
            Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => Self::Unsupported,
        }
    }
}

impl From<Value> for Lookup {
    fn from(value: Value) -> Self {
        Self::from(&value)
    }
}

/// The reason a JSON value is not a sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotASequence {
    found: &'static str,
}

impl NotASequence {
    /// Returns the JSON type that was found instead.
    #[must_use]
    pub fn found(&self) -> &'static str {
        self.found
    }
}

impl fmt::Display for NotASequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected an array or an object, found {}", self.found)
    }
}

impl std::error::Error for NotASequence {}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// An ordered, keyed sequence of JSON values.
///
/// Lookups by key go through a position index, and appending tracks the next free integer key,
/// so building and reading a sequence stay linear in its size.
///
/// ```
/// use hoard::{ItemKey, Items};
/// use serde_json::json;
///
/// let items = Items::from_value(json!({"0": 1, "1": 2, "foo": "bar"}))?;
/// assert_eq!(items.len(), 3);
/// assert_eq!(items.get(1), Some(&json!(2)));
/// assert_eq!(items.get("foo"), Some(&json!("bar")));
/// assert!(!items.is_list());
/// # Ok::<(), hoard::NotASequence>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Items {
    entries: Vec<(ItemKey, Value)>,
    positions: BTreeMap<ItemKey, usize>,
    // `None` once `i64::MAX` is taken.
    next_index: Option<i64>,
}

impl Items {
    /// Creates an empty sequence.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            positions: BTreeMap::new(),
            next_index: Some(0),
        }
    }

    /// Converts a JSON array or object.
    ///
    /// # Errors
    ///
    /// Returns [`NotASequence`] for scalars and `null`.
    pub fn from_value(value: Value) -> Result<Self, NotASequence> {
        match value {
            Value::Array(values) => Ok(values.into_iter().collect()),
            Value::Object(map) => Ok(map.into_iter().collect()),
            other => Err(NotASequence {
                found: type_name(&other),
            }),
        }
    }

    /// Converts back to JSON: an array when the keys are exactly `0..n` in order, an object
    /// otherwise.
    #[must_use]
    pub fn to_value(&self) -> Value {
        if self.is_list() {
            Value::Array(self.values().cloned().collect())
        } else {
            Value::Object(self.entries.iter().map(|(key, value)| (key.to_string(), value.clone())).collect())
        }
    }

    /// Returns `true` when the keys are exactly `0..n` in order.
    #[must_use]
    pub fn is_list(&self) -> bool {
        self.entries
            .iter()
            .enumerate()
            .all(|(position, (key, _))| matches!(key, ItemKey::Index(index) if usize::try_from(*index) == Ok(position)))
    }

    /// Returns the number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when there are no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: impl Into<Lookup>) -> Option<&Value> {
        let lookup = key.into();
        let position = *self.positions.get(lookup.key()?)?;
        self.entries.get(position).map(|(_, value)| value)
    }

    /// Returns `true` when `key` holds a value other than `null`.
    pub fn has(&self, key: impl Into<Lookup>) -> bool {
        self.get(key).is_some_and(|value| !value.is_null())
    }

    /// Returns `true` when some item equals `value` under `equality`.
    #[must_use]
    pub fn contains(&self, value: &Value, equality: Equality) -> bool {
        self.values().any(|item| equality.matches(item, value))
    }

    /// Stores `value` under `key`, replacing and returning a previous value in place.
    ///
    /// Name keys spelling a canonical integer are stored as [`ItemKey::Index`].
    pub fn insert(&mut self, key: impl Into<ItemKey>, value: Value) -> Option<Value> {
        let key = key.into().canonical();
        if let Some(&position) = self.positions.get(&key)
            && let Some((_, slot)) = self.entries.get_mut(position)
        {
            return Some(std::mem::replace(slot, value));
        }

        if let ItemKey::Index(index) = key
            && self.next_index.is_some_and(|next| index >= next)
        {
            self.next_index = index.checked_add(1);
        }
        self.append(key, value);
        None
    }

    /// Appends `value` under the next free integer key and returns that key.
    ///
    /// Returns `None` and leaves the sequence unchanged once `i64::MAX` is taken.
    ///
    /// ```
    /// use hoard::Items;
    /// use serde_json::json;
    ///
    /// let mut items = Items::from_value(json!({"5": "a", "name": "b"}))?;
    /// assert_eq!(items.push(json!("c")), Some(6));
    ///
    /// items.insert(i64::MAX, json!("last"));
    /// assert_eq!(items.push(json!("d")), None);
    /// # Ok::<(), hoard::NotASequence>(())
    /// ```
    pub fn push(&mut self, value: Value) -> Option<i64> {
        let index = self.next_index?;
        self.next_index = index.checked_add(1);
        self.append(ItemKey::Index(index), value);
        Some(index)
    }

    /// Removes and returns the value under `key`, keeping the order of the rest.
    pub fn remove(&mut self, key: impl Into<Lookup>) -> Option<Value> {
        let lookup = key.into();
        let position = self.positions.remove(lookup.key()?)?;
        let (_, value) = self.entries.remove(position);
        for (key, _) in &self.entries[position..] {
            if let Some(shifted) = self.positions.get_mut(key) {
                *shifted -= 1;
            }
        }
        Some(value)
    }

    /// Keeps only the items for which `keep` returns `true`.
    pub fn retain(&mut self, mut keep: impl FnMut(&ItemKey, &Value) -> bool) {
        self.entries.retain(|(key, value)| keep(key, value));
        self.positions = self.entries.iter().enumerate().map(|(position, (key, _))| (key.clone(), position)).collect();
    }

    /// Iterates over keys and values in order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&ItemKey, &Value)> {
        self.entries.iter().map(|(key, value)| (key, value))
    }

    /// Iterates over keys in order.
    pub fn keys(&self) -> impl ExactSizeIterator<Item = &ItemKey> {
        self.entries.iter().map(|(key, _)| key)
    }

    /// Iterates over values in order.
    pub fn values(&self) -> impl ExactSizeIterator<Item = &Value> {
        self.entries.iter().map(|(_, value)| value)
    }

    pub(crate) fn entry_at(&self, position: usize) -> Option<(&ItemKey, &Value)> {
        self.entries.get(position).map(|(key, value)| (key, value))
    }

    fn append(&mut self, key: ItemKey, value: Value) {
        self.positions.insert(key.clone(), self.entries.len());
        self.entries.push((key, value));
    }
}

/// Two sequences are equal when they hold the same keys and values in the same order.
impl PartialEq for Items {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl FromIterator<Value> for Items {
    fn from_iter<T: IntoIterator<Item = Value>>(iter: T) -> Self {
        let iter = iter.into_iter();
        let mut items = Self::new();
        items.entries.reserve(iter.size_hint().0);
        for value in iter {
            if items.push(value).is_none() {
                break;
            }
        }
        items
    }
}

impl<K> FromIterator<(K, Value)> for Items
where
    K: Into<ItemKey>,
{
    fn from_iter<T: IntoIterator<Item = (K, Value)>>(iter: T) -> Self {
        let iter = iter.into_iter();
        let mut items = Self::new();
        items.entries.reserve(iter.size_hint().0);
        for (key, value) in iter {
            items.insert(key, value);
        }
        items
    }
}

impl TryFrom<Value> for Items {
    type Error = NotASequence;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl Serialize for Items {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.is_list() {
            serializer.collect_seq(self.values())
        } else {
            serializer.collect_map(self.entries.iter().map(|(key, value)| (key.to_string(), value)))
        }
    }
}

impl<'de> Deserialize<'de> for Items {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn array_keys_are_positions() {
        let items = Items::from_value(json!([10, 20, 30])).unwrap();
        assert!(items.is_list());
        assert_eq!(items.keys().cloned().collect::<Vec<_>>(), vec![ItemKey::Index(0), ItemKey::Index(1), ItemKey::Index(2)]);
        assert_eq!(items.get(2), Some(&json!(30)));
        assert_eq!(items.get(3), None);
    }

    #[test]
    fn object_keeps_order_and_normalizes_integer_keys() {
        let items = Items::from_value(json!({"b": 1, "7": 2, "a": 3, "007": 4})).unwrap();
        let keys: Vec<_> = items.keys().map(ToString::to_string).collect();
        assert_eq!(keys, ["b", "7", "a", "007"]);
        assert_eq!(items.get(7), Some(&json!(2)));
        assert_eq!(items.get("7"), Some(&json!(2)));
        assert_eq!(items.get("007"), Some(&json!(4)));
    }

    #[test]
    fn scalars_are_not_sequences() {
        let error = Items::from_value(json!("oops")).unwrap_err();
        assert_eq!(error.found(), "string");
        assert!(error.to_string().contains("found string"));
        assert!(Items::from_value(Value::Null).is_err());
        assert!(Items::from_value(json!(3)).is_err());
    }

    #[test]
    fn has_ignores_nulls_and_unsupported_lookups() {
        let items = Items::from_value(json!({"a": null, "b": false, "1": 0})).unwrap();
        assert!(!items.has("a"));
        assert!(items.get("a").is_some());
        assert!(items.has("b"));
        assert!(items.has(1));
        assert!(!items.has(&json!(1.5)));
        assert!(!items.has(&json!(true)));
        assert!(!items.has(&json!([1])));
        assert!(items.has(&json!(1)));
        assert!(items.has(&json!("b")));
    }

    #[test]
    fn to_value_prefers_arrays() {
        let list = Items::from_value(json!({"0": "a", "1": "b"})).unwrap();
        assert_eq!(list.to_value(), json!(["a", "b"]));

        let sparse = Items::from_value(json!({"1": "a", "0": "b"})).unwrap();
        assert_eq!(sparse.to_value(), json!({"1": "a", "0": "b"}));
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut items: Items = vec![json!(1), json!(2)].into_iter().collect();
        assert_eq!(items.insert(0_i64, json!(9)), Some(json!(1)));
        assert_eq!(items.insert("x", json!(3)), None);
        assert_eq!(items.to_value(), json!({"0": 9, "1": 2, "x": 3}));
    }

    #[test]
    fn push_uses_next_integer_key() {
        let mut items = Items::from_value(json!({"5": "a", "name": "b"})).unwrap();
        assert_eq!(items.push(json!("c")), Some(6));
        assert_eq!(items.get(6), Some(&json!("c")));

        items.remove(6);
        assert_eq!(items.push(json!("d")), Some(7));

        let mut negative = Items::from_value(json!({"-4": "a"})).unwrap();
        assert_eq!(negative.push(json!("b")), Some(0));
    }

    #[test]
    fn push_stops_when_integer_keys_run_out() {
        let mut items = Items::new();
        items.insert(i64::MAX, json!("last"));
        assert_eq!(items.push(json!("more")), None);
        assert_eq!(items.len(), 1);
        assert_eq!(items.get(i64::MAX), Some(&json!("last")));

        items.insert("name", json!("still fine"));
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn integer_names_are_stored_as_indices() {
        let mut items = Items::new();
        items.insert(ItemKey::Name("7".into()), json!("a"));
        items.insert(ItemKey::Name("07".into()), json!("b"));

        assert_eq!(items.keys().cloned().collect::<Vec<_>>(), vec![ItemKey::Index(7), ItemKey::Name("07".into())]);
        assert_eq!(items.get(ItemKey::Name("7".into())), Some(&json!("a")));
        assert_eq!(items.insert(7_i64, json!("c")), Some(json!("a")));

        let text = serde_json::to_string(&items).unwrap();
        let back: Items = serde_json::from_str(&text).unwrap();
        assert_eq!(back.keys().collect::<Vec<_>>(), items.keys().collect::<Vec<_>>());
        assert_eq!(back, items);
    }

    #[test]
    fn large_payloads_build_and_read_in_linear_time() {
        const COUNT: i64 = 100_000;

        let started = std::time::Instant::now();
        let array = Items::from_value(Value::Array((0..COUNT).map(Value::from).collect())).unwrap();
        let object = Items::from_value(Value::Object((0..COUNT).map(|i| (format!("k{i}"), Value::from(i))).collect())).unwrap();
        for i in (COUNT - 1_000)..COUNT {
            assert_eq!(array.get(i), Some(&Value::from(i)));
            assert!(object.has(format!("k{i}")));
        }
        let elapsed = started.elapsed();

        assert_eq!(array.len(), 100_000);
        assert!(array.is_list());
        assert_eq!(object.len(), 100_000);
        assert!(elapsed < std::time::Duration::from_secs(10), "took {elapsed:?}");
    }

    #[test]
    fn remove_and_retain_keep_order() {
        let mut items = Items::from_value(json!([1, 2, 3, 4])).unwrap();
        assert_eq!(items.remove(1), Some(json!(2)));
        assert_eq!(items.get(2), Some(&json!(3)));
        assert_eq!(items.get(3), Some(&json!(4)));
        items.retain(|_, value| value != &json!(1));
        assert_eq!(items.get(3), Some(&json!(4)));
        assert_eq!(items.entry_at(0), Some((&ItemKey::Index(2), &json!(3))));
        items.retain(|_, value| value != &json!(4));
        assert_eq!(items.to_value(), json!({"2": 3}));
    }

    #[test]
    fn serde_matches_to_value() {
        let items = Items::from_value(json!({"x": [1, 2], "3": {"y": true}})).unwrap();
        let text = serde_json::to_string(&items).unwrap();
        assert_eq!(text, r#"{"x":[1,2],"3":{"y":true}}"#);

        let back: Items = serde_json::from_str(&text).unwrap();
        assert_eq!(back, items);

        let not_a_sequence = serde_json::from_str::<Items>("\"oops\"");
        assert!(not_a_sequence.is_err());
    }
}
