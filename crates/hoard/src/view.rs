// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Read-only sequence access to a resolved payload.

use std::ops::Index;
use std::sync::Arc;

use serde_json::Value;

use crate::items::Lookup;
use crate::{ItemKey, Items};

static NULL: Value = Value::Null;

/// An immutable snapshot of a collection's items.
///
/// Taking a view resolves the collection once; reading or iterating the view never triggers a
/// refresh, so a view keeps showing the payload it was taken from.
///
/// ```
/// use hoard::{Producer, Registry};
/// use serde_json::json;
/// use tick::ClockControl;
///
/// let registry = Registry::builder(ClockControl::new().to_clock()).build();
/// let view = registry.register("langs", Producer::new(|| ["rust", "c"]), -1).view();
///
/// assert_eq!(view[0], json!("rust"));
/// assert!(view[7].is_null());
///
/// let mut cursor = view.cursor();
/// while cursor.valid() {
///     println!("{:?} => {:?}", cursor.key(), cursor.current());
///     cursor.advance();
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemsView {
    items: Arc<Items>,
}

impl ItemsView {
    pub(crate) fn new(items: Arc<Items>) -> Self {
        Self { items }
    }

    /// Returns the number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if there are no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns `true` if `key` holds a non-null item.
    #[must_use]
    pub fn contains_key(&self, key: impl Into<Lookup>) -> bool {
        self.items.has(key)
    }

    /// Returns the item under `key`.
    #[must_use]
    pub fn get(&self, key: impl Into<Lookup>) -> Option<&Value> {
        self.items.get(key)
    }

    /// Returns the underlying items.
    #[must_use]
    pub fn items(&self) -> &Items {
        &self.items
    }

    /// Iterates over the items in order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&ItemKey, &Value)> {
        self.items.iter()
    }

    /// Returns a cursor positioned on the first item.
    #[must_use]
    pub fn cursor(&self) -> Cursor<'_> {
        Cursor {
            items: &self.items,
            position: 0,
        }
    }
}

impl<L: Into<Lookup>> Index<L> for ItemsView {
    type Output = Value;

    /// Returns the item under `key`, or `null` when it is missing.
    fn index(&self, key: L) -> &Value {
        self.items.get(key).unwrap_or(&NULL)
    }
}

impl<'a> IntoIterator for &'a ItemsView {
    type Item = (&'a ItemKey, &'a Value);
    type IntoIter = Box<dyn ExactSizeIterator<Item = Self::Item> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.items.iter())
    }
}

/// A restartable forward cursor over an [`ItemsView`].
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    items: &'a Items,
    position: usize,
}

impl<'a> Cursor<'a> {
    /// Moves back to the first item.
    pub fn rewind(&mut self) {
        self.position = 0;
    }

    /// Returns the item under the cursor.
    #[must_use]
    pub fn current(&self) -> Option<&'a Value> {
        self.items.entry_at(self.position).map(|(_, value)| value)
    }

    /// Returns the key under the cursor.
    #[must_use]
    pub fn key(&self) -> Option<&'a ItemKey> {
        self.items.entry_at(self.position).map(|(key, _)| key)
    }

    /// Moves to the next item.
    pub fn advance(&mut self) {
        if self.position < self.items.len() {
            self.position += 1;
        }
    }

    /// Returns `true` while the cursor is on an item.
    #[must_use]
    pub fn valid(&self) -> bool {
        self.position < self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn view() -> ItemsView {
        ItemsView::new(Arc::new(Items::from_value(json!({"0": "a", "1": null, "name": "b"})).unwrap()))
    }

    #[test]
    fn lookups() {
        let view = view();
        assert_eq!(view.len(), 3);
        assert!(view.contains_key(0));
        assert!(!view.contains_key(1));
        assert!(view.contains_key("name"));
        assert!(!view.contains_key(&json!(1.5)));
        assert_eq!(view.get("name"), Some(&json!("b")));
        assert_eq!(view["0"], json!("a"));
        assert!(view["missing"].is_null());
        assert!(ItemsView::default().is_empty());
    }

    #[test]
    fn cursor_walks_and_rewinds() {
        let view = view();
        let mut cursor = view.cursor();
        let mut keys = Vec::new();
        while cursor.valid() {
            keys.push(cursor.key().unwrap().to_string());
            cursor.advance();
        }
        assert_eq!(keys, ["0", "1", "name"]);
        assert_eq!(cursor.current(), None);
        cursor.advance();
        assert!(!cursor.valid());

        cursor.rewind();
        assert_eq!(cursor.current(), Some(&json!("a")));
        assert_eq!(cursor.key(), Some(&ItemKey::Index(0)));
    }

    #[test]
    fn iterates_in_order() {
        let view = view();
        let values: Vec<_> = (&view).into_iter().map(|(_, value)| value.clone()).collect();
        assert_eq!(values, [json!("a"), Value::Null, json!("b")]);
        assert_eq!(view.iter().len(), 3);
        assert_eq!(view.items().len(), 3);
    }
}
