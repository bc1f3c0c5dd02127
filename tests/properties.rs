//! Property tests for demand arithmetic.

use flowbase::demand::{add_cap, add_cap_atomic, multiply_cap, produced, sub_or_zero, validate};
use flowbase::{Attr, AttrValue, DeferredSubscription, Scannable, Subscription, UNBOUNDED};
use parking_lot::Mutex;
use proptest::prelude::*;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Upstream that records each request it receives.
#[derive(Default)]
struct Demand {
    requests: Mutex<Vec<i64>>,
}

impl Demand {
    fn requests(&self) -> Vec<i64> {
        self.requests.lock().clone()
    }
}

impl Scannable for Demand {
    fn scan(&self, _attr: Attr) -> Option<AttrValue> {
        None
    }
}

impl Subscription<u8> for Demand {
    fn request(&self, n: i64) {
        self.requests.lock().push(n);
    }

    fn cancel(&self) {}
}

proptest! {
    #[test]
    fn prop_add_cap_exact_without_overflow(a in 0..=i64::MAX / 2, b in 0..=i64::MAX / 2) {
        prop_assert_eq!(add_cap(a, b), a + b);
    }

    #[test]
    fn prop_add_cap_saturates_on_negative_sum(a in 0..=UNBOUNDED, b in any::<i64>()) {
        let raw = a.wrapping_add(b);
        let expected = if raw < 0 { UNBOUNDED } else { raw };
        prop_assert_eq!(add_cap(a, b), expected);
    }

    #[test]
    fn prop_add_cap_never_negative(a in 0..=UNBOUNDED, b in any::<i64>()) {
        prop_assert!(add_cap(a, b) >= 0);
    }

    #[test]
    fn prop_atomic_matches_sequential(start in 0..=UNBOUNDED, adds in prop::collection::vec(any::<i64>(), 0..20)) {
        let cell = AtomicI64::new(start);
        let mut expected = start;
        for n in adds {
            let previous = add_cap_atomic(&cell, n);
            prop_assert_eq!(previous, expected);
            expected = add_cap(expected, n);
        }
        prop_assert_eq!(cell.load(Ordering::SeqCst), expected);
    }

    #[test]
    fn prop_multiply_cap_saturates(a in 0..=UNBOUNDED, b in 0..=UNBOUNDED) {
        let expected = a.checked_mul(b).unwrap_or(UNBOUNDED);
        prop_assert_eq!(multiply_cap(a, b), expected);
    }

    #[test]
    fn prop_sub_or_zero_floor(a in 0..=UNBOUNDED, b in 0..=UNBOUNDED) {
        let r = sub_or_zero(a, b);
        prop_assert!(r >= 0);
        prop_assert!(r <= a);
    }

    #[test]
    fn prop_produced_keeps_unbounded(n in 1..=UNBOUNDED) {
        let cell = AtomicI64::new(UNBOUNDED);
        prop_assert_eq!(produced(&cell, n), UNBOUNDED);
    }

    #[test]
    fn prop_validate_only_positive(n in any::<i64>()) {
        prop_assert_eq!(validate(n), n > 0);
    }

    #[test]
    fn prop_deferred_forwards_single_capped_sum(requests in prop::collection::vec(1..=UNBOUNDED, 1..10)) {
        let deferred = DeferredSubscription::<u8>::new();
        for n in &requests {
            deferred.request(*n);
        }
        let expected = requests.iter().fold(0, |acc, n| add_cap(acc, *n));
        prop_assert_eq!(deferred.requested(), expected);

        let upstream = Arc::new(Demand::default());
        prop_assert!(deferred.set(upstream.clone()));
        prop_assert_eq!(upstream.requests(), vec![expected]);
        prop_assert_eq!(deferred.requested(), 0);
    }

    #[test]
    fn prop_deferred_forwards_later_requests_unchanged(
        before in prop::collection::vec(1..=UNBOUNDED, 0..5),
        after in prop::collection::vec(1..=UNBOUNDED, 0..5),
    ) {
        let deferred = DeferredSubscription::<u8>::new();
        for n in &before {
            deferred.request(*n);
        }
        let upstream = Arc::new(Demand::default());
        deferred.set(upstream.clone());
        for n in &after {
            deferred.request(*n);
        }

        let mut expected = Vec::new();
        if !before.is_empty() {
            expected.push(before.iter().fold(0, |acc, n| add_cap(acc, *n)));
        }
        expected.extend(after.iter().copied());
        prop_assert_eq!(upstream.requests(), expected);
    }
}
