//! Cells for handing owned values and references between threads.

use parking_lot::Mutex;
use std::marker::PhantomData;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

/// Holds at most one boxed value. The only operations move ownership in or
/// out with a single atomic swap; the stored value is never borrowed, so no
/// reader can observe it while another thread frees it.
pub(crate) struct AtomicSlot<T> {
    ptr: AtomicPtr<T>,
    _owns: PhantomData<Box<T>>,
}

// SAFETY: values only move through `swap`, which hands the whole box to
// exactly one thread. Sharing the slot therefore only requires `T: Send`.
unsafe impl<T: Send> Send for AtomicSlot<T> {}
unsafe impl<T: Send> Sync for AtomicSlot<T> {}

impl<T> AtomicSlot<T> {
    pub(crate) const fn empty() -> Self {
        Self {
            ptr: AtomicPtr::new(ptr::null_mut()),
            _owns: PhantomData,
        }
    }

    pub(crate) fn new(value: T) -> Self {
        Self {
            ptr: AtomicPtr::new(Box::into_raw(Box::new(value))),
            _owns: PhantomData,
        }
    }

    /// Store `value` and return whatever was there before.
    pub(crate) fn swap(&self, value: Option<T>) -> Option<T> {
        let new = value.map_or(ptr::null_mut(), |v| Box::into_raw(Box::new(v)));
        let old = self.ptr.swap(new, Ordering::AcqRel);
        if old.is_null() {
            None
        } else {
            // SAFETY: `old` came from `Box::into_raw` and the swap made this
            // thread its only owner.
            Some(*unsafe { Box::from_raw(old) })
        }
    }

    pub(crate) fn take(&self) -> Option<T> {
        self.swap(None)
    }
}

impl<T> Drop for AtomicSlot<T> {
    fn drop(&mut self) {
        drop(self.take());
    }
}

/// Set-once reference to a peer that can be released again.
///
/// Subscribers and subscriptions point at each other; releasing the link on
/// cancel or termination breaks the cycle. A released link stays closed and
/// rejects every later bind.
pub(crate) struct Link<T> {
    state: Mutex<LinkState<T>>,
}

enum LinkState<T> {
    Unbound,
    Bound(T),
    Released,
}

impl<T: Clone> Link<T> {
    pub(crate) fn unbound() -> Self {
        Self {
            state: Mutex::new(LinkState::Unbound),
        }
    }

    pub(crate) fn bound(value: T) -> Self {
        Self {
            state: Mutex::new(LinkState::Bound(value)),
        }
    }

    /// Bind `value`, handing it back if the link was bound or released
    /// before.
    pub(crate) fn bind(&self, value: T) -> Result<(), T> {
        let mut state = self.state.lock();
        if !matches!(*state, LinkState::Unbound) {
            return Err(value);
        }
        *state = LinkState::Bound(value);
        Ok(())
    }

    pub(crate) fn get(&self) -> Option<T> {
        match &*self.state.lock() {
            LinkState::Bound(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// Close the link and return the bound value, if any. The caller drops
    /// it outside the lock.
    pub(crate) fn release(&self) -> Option<T> {
        match std::mem::replace(&mut *self.state.lock(), LinkState::Released) {
            LinkState::Bound(value) => Some(value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn test_swap_and_take() {
        let slot = AtomicSlot::empty();
        assert!(slot.swap(Some(1)).is_none());
        assert_eq!(slot.swap(Some(2)), Some(1));
        assert_eq!(slot.take(), Some(2));
        assert!(slot.take().is_none());
    }

    #[test]
    fn test_single_taker_under_race() {
        let slot = Arc::new(AtomicSlot::new(7u64));
        let winners = AtomicUsize::new(0);

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    if slot.take().is_some() {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                });
            }
        });

        assert_eq!(winners.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_releases_value() {
        let marker = Arc::new(());
        {
            let _slot = AtomicSlot::new(Arc::clone(&marker));
            assert_eq!(Arc::strong_count(&marker), 2);
        }
        assert_eq!(Arc::strong_count(&marker), 1);
    }

    #[test]
    fn test_link_binds_once() {
        let link = Link::unbound();
        assert!(link.get().is_none());
        assert!(link.bind(1).is_ok());
        assert_eq!(link.bind(2), Err(2));
        assert_eq!(link.get(), Some(1));
    }

    #[test]
    fn test_released_link_stays_closed() {
        let marker = Arc::new(());
        let link = Link::bound(Arc::clone(&marker));

        drop(link.release());
        assert_eq!(Arc::strong_count(&marker), 1);
        assert!(link.get().is_none());
        assert!(link.release().is_none());
        assert!(link.bind(Arc::clone(&marker)).is_err());
    }
}
