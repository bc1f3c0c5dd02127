//! Read-only introspection of stream primitives.
//!
//! Every primitive answers [`Scannable::scan`] for a fixed set of
//! attributes. Answers are for diagnostics only; nothing in the crate makes
//! control-flow decisions from them.

use serde::Serialize;
use std::sync::Arc;

/// Attributes a primitive can be asked about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Attr {
    /// The upstream subscription.
    Parent,
    /// The downstream subscriber.
    Actual,
    /// Demand requested by downstream and not yet forwarded or fulfilled.
    RequestedFromDownstream,
    Prefetch,
    Terminated,
    Cancelled,
}

/// Identity of a component, usable for "same instance" checks.
///
/// Never dereferenced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Addr(pub(crate) usize);

impl Addr {
    pub fn of<T: ?Sized>(ptr: &Arc<T>) -> Self {
        Addr(Arc::as_ptr(ptr) as *const () as usize)
    }

    pub fn of_ref<T: ?Sized>(value: &T) -> Self {
        Addr(value as *const T as *const () as usize)
    }
}

/// Answer to a scan query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Ref(Addr),
}

impl AttrValue {
    pub fn as_bool(self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_int(self) -> Option<i64> {
        match self {
            AttrValue::Int(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_ref_addr(self) -> Option<Addr> {
        match self {
            AttrValue::Ref(a) => Some(a),
            _ => None,
        }
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

impl From<i64> for AttrValue {
    fn from(i: i64) -> Self {
        AttrValue::Int(i)
    }
}

impl From<Addr> for AttrValue {
    fn from(a: Addr) -> Self {
        AttrValue::Ref(a)
    }
}

/// Point-in-time diagnostic view of a primitive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScanSnapshot {
    pub name: &'static str,
    pub parent: Option<Addr>,
    pub actual: Option<Addr>,
    pub requested: Option<i64>,
    pub prefetch: Option<i64>,
    pub terminated: Option<bool>,
    pub cancelled: Option<bool>,
}

/// Read-only attribute query implemented by every primitive.
pub trait Scannable {
    /// Value of `attr`, or `None` when it does not apply.
    fn scan(&self, attr: Attr) -> Option<AttrValue>;

    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// `true` only when `attr` is a flag reported as set.
    fn scan_flag(&self, attr: Attr) -> bool {
        self.scan(attr).and_then(AttrValue::as_bool).unwrap_or(false)
    }

    fn snapshot(&self) -> ScanSnapshot {
        ScanSnapshot {
            name: self.name(),
            parent: self.scan(Attr::Parent).and_then(AttrValue::as_ref_addr),
            actual: self.scan(Attr::Actual).and_then(AttrValue::as_ref_addr),
            requested: self
                .scan(Attr::RequestedFromDownstream)
                .and_then(AttrValue::as_int),
            prefetch: self.scan(Attr::Prefetch).and_then(AttrValue::as_int),
            terminated: self.scan(Attr::Terminated).and_then(AttrValue::as_bool),
            cancelled: self.scan(Attr::Cancelled).and_then(AttrValue::as_bool),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe;

    impl Scannable for Probe {
        fn scan(&self, attr: Attr) -> Option<AttrValue> {
            match attr {
                Attr::Prefetch => Some(32.into()),
                Attr::Cancelled => Some(true.into()),
                _ => None,
            }
        }
    }

    #[test]
    fn test_snapshot_collects_attributes() {
        let snapshot = Probe.snapshot();
        assert!(snapshot.name.ends_with("Probe"));
        assert_eq!(snapshot.prefetch, Some(32));
        assert_eq!(snapshot.cancelled, Some(true));
        assert_eq!(snapshot.terminated, None);
        assert!(Probe.scan_flag(Attr::Cancelled));
        assert!(!Probe.scan_flag(Attr::Terminated));
    }

    #[test]
    fn test_addr_identity() {
        let a = Arc::new(5u32);
        let b = Arc::clone(&a);
        let c = Arc::new(5u32);
        assert_eq!(Addr::of(&a), Addr::of(&b));
        assert_ne!(Addr::of(&a), Addr::of(&c));
        assert_eq!(Addr::of(&a), Addr::of_ref(&*a));
    }
}
