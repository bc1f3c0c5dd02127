//! Overflow-safe demand arithmetic.
//!
//! Demand is an `i64` in `[0, UNBOUNDED]`. Any addition whose wrapping sum
//! goes negative saturates at [`UNBOUNDED`]; that covers genuine overflow and
//! negative operands alike. Once a counter is unbounded it stays unbounded.

use crate::error::FlowError;
use std::sync::atomic::{AtomicI64, Ordering};

/// Demand meaning "no limit".
pub const UNBOUNDED: i64 = i64::MAX;

/// Saturating demand addition.
#[inline]
pub fn add_cap(a: i64, b: i64) -> i64 {
    let sum = a.wrapping_add(b);
    if sum < 0 {
        UNBOUNDED
    } else {
        sum
    }
}

/// Atomically add `to_add` to `cell` with [`add_cap`] and return the value
/// before the update.
///
/// A previous value of `0` tells the caller it moved the counter off zero and
/// owns starting delivery.
pub fn add_cap_atomic(cell: &AtomicI64, to_add: i64) -> i64 {
    let mut current = cell.load(Ordering::Acquire);
    loop {
        let next = add_cap(current, to_add);
        match cell.compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire) {
            Ok(previous) => return previous,
            Err(actual) => current = actual,
        }
    }
}

/// Saturating product of two non-negative demand values.
pub fn multiply_cap(a: i64, b: i64) -> i64 {
    a.checked_mul(b).filter(|p| *p >= 0).unwrap_or(UNBOUNDED)
}

/// `a - b`, floored at zero.
#[inline]
pub fn sub_or_zero(a: i64, b: i64) -> i64 {
    a.saturating_sub(b).max(0)
}

/// Atomically subtract `n` emitted items from `cell` and return the new value.
///
/// Counters at `0` or [`UNBOUNDED`] are left as they are.
pub fn produced(cell: &AtomicI64, n: i64) -> i64 {
    let mut current = cell.load(Ordering::Acquire);
    loop {
        if current == 0 || current == UNBOUNDED {
            return current;
        }
        let next = sub_or_zero(current, n);
        match cell.compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => return next,
            Err(actual) => current = actual,
        }
    }
}

/// Whether `n` is a legal request amount. Illegal amounts are logged.
pub fn validate(n: i64) -> bool {
    if n > 0 {
        return true;
    }
    report_bad_request(n);
    false
}

pub(crate) fn report_bad_request(n: i64) {
    tracing::debug!(error = %FlowError::BadRequest(n), "invalid request amount");
}
