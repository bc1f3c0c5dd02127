//! Process-wide hook registry.

use super::{Hook, HookKind, OperatorErrorFn};
use crate::error::Failure;
use parking_lot::{const_rwlock, RwLock};
use std::any::Any;
use std::sync::Arc;

/// Key under which the unkeyed operator-error hook is stored.
pub const DEFAULT_OPERATOR_ERROR_KEY: &str = "default";

/// Behavior of the built-in fallbacks used when no hook is installed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HooksConfig {
    /// Log dropped values at debug level.
    /// Default: true
    pub log_dropped_next: bool,

    /// Log dropped errors at error level.
    /// Default: true
    pub log_dropped_errors: bool,
}

impl HooksConfig {
    const DEFAULT: HooksConfig = HooksConfig {
        log_dropped_next: true,
        log_dropped_errors: true,
    };
}

impl Default for HooksConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

struct Registry {
    next_dropped: Option<Hook>,
    error_dropped: Option<Hook>,
    /// Keyed operator-error hooks in installation order.
    operator_error_chain: Vec<(String, OperatorErrorFn)>,
    /// Composition of `operator_error_chain`, rebuilt on every change.
    operator_error: Option<Hook>,
    rejected_execution: Option<Hook>,
    config: HooksConfig,
}

impl Registry {
    const EMPTY: Registry = Registry {
        next_dropped: None,
        error_dropped: None,
        operator_error_chain: Vec::new(),
        operator_error: None,
        rejected_execution: None,
        config: HooksConfig::DEFAULT,
    };

    fn rebuild_operator_error(&mut self) {
        let chain: Vec<OperatorErrorFn> = self
            .operator_error_chain
            .iter()
            .map(|(_, f)| Arc::clone(f))
            .collect();

        self.operator_error = match chain.len() {
            0 => None,
            1 => Some(Hook::OperatorError(Arc::clone(&chain[0]))),
            _ => Some(Hook::operator_error(
                move |error: Failure, data: Option<&dyn Any>| {
                    chain.iter().fold(error, |acc, f| f(acc, data))
                },
            )),
        };
    }
}

static REGISTRY: RwLock<Registry> = const_rwlock(Registry::EMPTY);

/// Install `hook` process-wide, replacing any hook of the same kind.
///
/// An operator-error hook is installed under [`DEFAULT_OPERATOR_ERROR_KEY`]
/// and composes with keyed operator-error hooks.
pub fn install(hook: Hook) {
    match hook {
        Hook::OperatorError(f) => install_operator_error_keyed(DEFAULT_OPERATOR_ERROR_KEY, f),
        Hook::NextDropped(_) => REGISTRY.write().next_dropped = Some(hook),
        Hook::ErrorDropped(_) => REGISTRY.write().error_dropped = Some(hook),
        Hook::RejectedExecution(_) => REGISTRY.write().rejected_execution = Some(hook),
    }
}

/// Install an operator-error hook under `key`.
///
/// Keyed hooks run in installation order, each receiving the error produced
/// by the previous one. Installing an existing key replaces it in place.
pub fn install_operator_error_keyed(key: impl Into<String>, f: OperatorErrorFn) {
    let key = key.into();
    let mut registry = REGISTRY.write();
    match registry
        .operator_error_chain
        .iter_mut()
        .find(|(existing, _)| *existing == key)
    {
        Some(entry) => entry.1 = f,
        None => registry.operator_error_chain.push((key, f)),
    }
    registry.rebuild_operator_error();
}

pub fn reset_operator_error_keyed(key: &str) {
    let mut registry = REGISTRY.write();
    registry.operator_error_chain.retain(|(existing, _)| existing != key);
    registry.rebuild_operator_error();
}

/// Remove the process-wide hook of `kind`. For operator errors this removes
/// every keyed hook.
pub fn reset(kind: HookKind) {
    let mut registry = REGISTRY.write();
    match kind {
        HookKind::NextDropped => registry.next_dropped = None,
        HookKind::ErrorDropped => registry.error_dropped = None,
        HookKind::OperatorError => {
            registry.operator_error_chain.clear();
            registry.rebuild_operator_error();
        }
        HookKind::RejectedExecution => registry.rejected_execution = None,
    }
}

/// Remove every hook and restore the default configuration.
pub fn reset_all() {
    *REGISTRY.write() = Registry::EMPTY;
}

/// The process-wide hook of `kind`, if one is installed.
pub fn resolve(kind: HookKind) -> Option<Hook> {
    let registry = REGISTRY.read();
    match kind {
        HookKind::NextDropped => registry.next_dropped.clone(),
        HookKind::ErrorDropped => registry.error_dropped.clone(),
        HookKind::OperatorError => registry.operator_error.clone(),
        HookKind::RejectedExecution => registry.rejected_execution.clone(),
    }
}

pub fn configure(config: HooksConfig) {
    REGISTRY.write().config = config;
}

pub fn config() -> HooksConfig {
    REGISTRY.read().config.clone()
}

/// Resets the whole registry when dropped.
#[must_use = "the registry is reset as soon as the guard is dropped"]
pub struct HooksResetGuard {
    _private: (),
}

impl Drop for HooksResetGuard {
    fn drop(&mut self) {
        reset_all();
    }
}

/// Guard that restores the default registry at the end of a scope.
pub fn scoped() -> HooksResetGuard {
    HooksResetGuard { _private: () }
}
