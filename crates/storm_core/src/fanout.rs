//! Concurrent fan-out of secondary effects.
//!
//! After a primary effect succeeds, its secondary effect (a cache write
//! or removal) and the record's lifecycle hook run concurrently. Both
//! always run to completion; the first error to arrive is reported and
//! the other is dropped.

use crate::entity::Model;
use crate::error::{CoreError, CoreResult, HookKind};
use parking_lot::Mutex;

/// Holds the first error reported by any branch.
struct FirstError(Mutex<Option<CoreError>>);

impl FirstError {
    fn new() -> Self {
        Self(Mutex::new(None))
    }

    fn record(&self, result: CoreResult<()>) {
        if let Err(err) = result {
            let mut slot = self.0.lock();
            if slot.is_none() {
                *slot = Some(err);
            }
        }
    }

    fn into_result(self) -> CoreResult<()> {
        match self.0.into_inner() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Runs `effect` and `hook` concurrently and waits for both.
///
/// With no hook, `effect` runs alone on the calling thread. A panic in
/// either branch is resumed on the caller after both have finished.
pub(crate) fn join<E, H>(effect: E, hook: Option<H>) -> CoreResult<()>
where
    E: FnOnce() -> CoreResult<()> + Send,
    H: FnOnce() -> CoreResult<()> + Send,
{
    let Some(hook) = hook else {
        return effect();
    };

    let first = FirstError::new();
    std::thread::scope(|s| {
        let task = s.spawn(|| first.record(hook()));
        first.record(effect());
        if let Err(payload) = task.join() {
            std::panic::resume_unwind(payload);
        }
    });
    first.into_result()
}

/// Returns true if the record implements the given hook.
pub(crate) fn has_hook<M: Model>(model: &M, kind: HookKind) -> bool {
    match kind {
        HookKind::AfterSave => model.as_save_hook().is_some(),
        HookKind::AfterCache => model.as_cache_hook().is_some(),
        HookKind::AfterUncache => model.as_uncache_hook().is_some(),
        HookKind::AfterDelete => model.as_delete_hook().is_some(),
    }
}

/// Invokes the given hook on the record, if it implements it.
pub(crate) fn run_hook<M: Model>(model: &M, kind: HookKind) -> CoreResult<()> {
    let result = match kind {
        HookKind::AfterSave => model.as_save_hook().map(|h| h.after_save()),
        HookKind::AfterCache => model.as_cache_hook().map(|h| h.after_cache()),
        HookKind::AfterUncache => model.as_uncache_hook().map(|h| h.after_uncache()),
        HookKind::AfterDelete => model.as_delete_hook().map(|h| h.after_delete()),
    };
    match result {
        Some(Err(source)) => Err(CoreError::Hook { hook: kind, source }),
        _ => Ok(()),
    }
}
