//! Immutable execution context attached to subscribers.
//!
//! A [`Context`] is a persistent map: `put` returns a new context sharing the
//! old one as its parent, so nested scopes can add keys without affecting the
//! scope they were derived from.

use crate::error::{FlowError, Result};
use crate::hooks::Hook;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

struct Entry {
    key: &'static str,
    value: Arc<dyn Any + Send + Sync>,
    parent: Option<Arc<Entry>>,
}

/// Key/value pairs visible to a subscriber and its hooks.
#[derive(Clone, Default)]
pub struct Context {
    head: Option<Arc<Entry>>,
}

impl Context {
    pub fn empty() -> Self {
        Self { head: None }
    }

    pub fn of<V: Any + Send + Sync>(key: &'static str, value: V) -> Self {
        Self::empty().put(key, value)
    }

    /// New context with `key` bound to `value`; `self` is unchanged.
    pub fn put<V: Any + Send + Sync>(&self, key: &'static str, value: V) -> Self {
        Self {
            head: Some(Arc::new(Entry {
                key,
                value: Arc::new(value),
                parent: self.head.clone(),
            })),
        }
    }

    /// New context with every binding of `other` layered over `self`.
    pub fn put_all(&self, other: &Context) -> Self {
        let mut entries = Vec::new();
        let mut cursor = other.head.as_ref();
        while let Some(entry) = cursor {
            entries.push(entry);
            cursor = entry.parent.as_ref();
        }

        let mut head = self.head.clone();
        for entry in entries.into_iter().rev() {
            head = Some(Arc::new(Entry {
                key: entry.key,
                value: Arc::clone(&entry.value),
                parent: head,
            }));
        }
        Self { head }
    }

    /// Bind `hook` under the context key of its kind.
    pub fn with_hook(&self, hook: Hook) -> Self {
        self.put(hook.kind().context_key(), hook)
    }

    fn lookup(&self, key: &str) -> Option<&(dyn Any + Send + Sync)> {
        let mut cursor = self.head.as_ref();
        while let Some(entry) = cursor {
            if entry.key == key {
                return Some(&*entry.value);
            }
            cursor = entry.parent.as_ref();
        }
        None
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    /// Value bound to `key`.
    pub fn get<V: Any>(&self, key: &'static str) -> Result<&V> {
        self.lookup(key)
            .ok_or(FlowError::NoSuchKey(key))?
            .downcast_ref::<V>()
            .ok_or(FlowError::ValueType(key))
    }

    /// Value bound to `key`, or `None` when absent or of another type.
    pub fn get_or_none<V: Any>(&self, key: &str) -> Option<&V> {
        self.lookup(key)?.downcast_ref::<V>()
    }

    /// Number of distinct keys.
    pub fn size(&self) -> usize {
        self.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    fn keys(&self) -> Vec<&'static str> {
        let mut keys: Vec<&'static str> = Vec::new();
        let mut cursor = self.head.as_ref();
        while let Some(entry) = cursor {
            if !keys.contains(&entry.key) {
                keys.push(entry.key);
            }
            cursor = entry.parent.as_ref();
        }
        keys
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context").field("keys", &self.keys()).finish()
    }
}
