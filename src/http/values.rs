//! Request-scoped value bag for handler-to-handler communication.
//!
//! Values are keyed by [`Key<T>`] tokens: the name identifies the slot and the
//! type parameter fixes what it holds. A slot written under one type and read
//! under another reads as absent.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

/// Typed key for a [`Values`] slot.
///
/// ```
/// use chain_api::http::values::{Key, Values};
///
/// const USER_ID: Key<i64> = Key::new("user_id");
///
/// let mut values = Values::new();
/// values.set(USER_ID, 42);
/// assert_eq!(values.get(USER_ID), Some(&42));
/// ```
pub struct Key<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Key<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for Key<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Key<T> {}

impl<T> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Key").field(&self.name).finish()
    }
}

type Slot = Box<dyn Any + Send + Sync>;

/// Mutable per-request store. Never shared across requests.
#[derive(Default)]
pub struct Values {
    slots: HashMap<&'static str, Slot>,
}

impl Values {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value`, replacing whatever the slot held before.
    pub fn set<T: Any + Send + Sync>(&mut self, key: Key<T>, value: T) {
        self.slots.insert(key.name, Box::new(value));
    }

    pub fn get<T: Any + Send + Sync>(&self, key: Key<T>) -> Option<&T> {
        self.slots.get(key.name)?.downcast_ref()
    }

    pub fn get_mut<T: Any + Send + Sync>(&mut self, key: Key<T>) -> Option<&mut T> {
        self.slots.get_mut(key.name)?.downcast_mut()
    }

    /// Remove and return the slot's value if it holds a `T`.
    pub fn remove<T: Any + Send + Sync>(&mut self, key: Key<T>) -> Option<T> {
        if !self.contains(key) {
            return None;
        }
        let slot = self.slots.remove(key.name)?;
        slot.downcast().ok().map(|boxed| *boxed)
    }

    pub fn contains<T: Any + Send + Sync>(&self, key: Key<T>) -> bool {
        self.get(key).is_some()
    }

    /// A clone of the stored value, or `T::default()` when absent or mistyped.
    pub fn get_or_default<T: Any + Send + Sync + Clone + Default>(&self, key: Key<T>) -> T {
        self.get(key).cloned().unwrap_or_default()
    }

    pub fn get_string(&self, key: Key<String>) -> String {
        self.get_or_default(key)
    }

    pub fn get_int(&self, key: Key<i32>) -> i32 {
        self.get_or_default(key)
    }

    pub fn get_int64(&self, key: Key<i64>) -> i64 {
        self.get_or_default(key)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl fmt::Debug for Values {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.slots.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAME: Key<String> = Key::new("name");
    const COUNT: Key<i32> = Key::new("count");
    const TOTAL: Key<i64> = Key::new("total");

    #[test]
    fn test_set_and_get() {
        let mut values = Values::new();
        values.set(NAME, "alice".to_string());
        values.set(COUNT, 3);

        assert_eq!(values.get(NAME).map(String::as_str), Some("alice"));
        assert_eq!(values.get_int(COUNT), 3);
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_last_write_wins() {
        let mut values = Values::new();
        values.set(COUNT, 1);
        values.set(COUNT, 2);
        assert_eq!(values.get_int(COUNT), 2);
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn test_missing_keys_read_as_zero() {
        let values = Values::new();
        assert_eq!(values.get_string(NAME), "");
        assert_eq!(values.get_int(COUNT), 0);
        assert_eq!(values.get_int64(TOTAL), 0);
        assert!(values.get(NAME).is_none());
    }

    #[test]
    fn test_mistyped_slot_reads_as_absent() {
        const COUNT_AS_I64: Key<i64> = Key::new("count");

        let mut values = Values::new();
        values.set(COUNT, 7);

        assert!(values.get(COUNT_AS_I64).is_none());
        assert_eq!(values.get_int64(COUNT_AS_I64), 0);
        assert_eq!(values.remove(COUNT_AS_I64), None);
        // The i32 value survives the failed typed removal
        assert_eq!(values.get_int(COUNT), 7);
    }

    #[test]
    fn test_get_mut_and_remove() {
        let mut values = Values::new();
        values.set(TOTAL, 10);
        if let Some(total) = values.get_mut(TOTAL) {
            *total += 5;
        }
        assert_eq!(values.remove(TOTAL), Some(15));
        assert!(values.is_empty());
    }
}
