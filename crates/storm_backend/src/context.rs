//! Execution context passed to every backend call.

use crate::error::{BackendError, BackendResult};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Carries cancellation, an optional deadline and ambient values.
///
/// Contexts are cheap to clone. Derived contexts inherit their parent's
/// cancellation: cancelling a parent cancels every context derived from
/// it, but cancelling a child leaves the parent untouched. A derived
/// deadline can only tighten the inherited one.
///
/// # Example
///
/// ```rust
/// use storm_backend::Context;
/// use std::time::Duration;
///
/// let (ctx, token) = Context::background()
///     .with_timeout(Duration::from_secs(5))
///     .with_cancel();
/// assert!(ctx.check().is_ok());
///
/// token.cancel();
/// assert!(ctx.check().is_err());
/// ```
#[derive(Clone, Default)]
pub struct Context {
    cancel: CancellationToken,
    deadline: Option<Instant>,
    values: Arc<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl Context {
    /// Returns an empty context: never cancelled, no deadline, no values.
    #[must_use]
    pub fn background() -> Self {
        Self::default()
    }

    /// Derives a context that can be cancelled through the returned token.
    ///
    /// The token is a child of this context's token, so cancelling it
    /// never reaches the parent.
    #[must_use]
    pub fn with_cancel(&self) -> (Self, CancellationToken) {
        let token = self.cancel.child_token();
        let ctx = Self {
            cancel: token.clone(),
            deadline: self.deadline,
            values: Arc::clone(&self.values),
        };
        (ctx, token)
    }

    /// Returns the token this context observes.
    #[must_use]
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Derives a context that expires at `deadline`.
    #[must_use]
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(current) if current < deadline => current,
            _ => deadline,
        };
        Self {
            cancel: self.cancel.clone(),
            deadline: Some(deadline),
            values: Arc::clone(&self.values),
        }
    }

    /// Derives a context that expires after `timeout`.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derives a context carrying `value`, replacing any value of the same type.
    #[must_use]
    pub fn with_value<T: Any + Send + Sync>(&self, value: T) -> Self {
        let mut values = (*self.values).clone();
        values.insert(TypeId::of::<T>(), Arc::new(value));
        Self {
            cancel: self.cancel.clone(),
            deadline: self.deadline,
            values: Arc::new(values),
        }
    }

    /// Returns the ambient value of type `T`, if one was attached.
    #[must_use]
    pub fn value<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.values
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref::<T>())
    }

    /// Returns the deadline, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns true if this context or one of its ancestors was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fails if the context is cancelled or past its deadline.
    ///
    /// Backends call this before touching their data.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Cancelled`] or [`BackendError::DeadlineExceeded`].
    pub fn check(&self) -> BackendResult<()> {
        if self.is_cancelled() {
            return Err(BackendError::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(BackendError::DeadlineExceeded);
        }
        Ok(())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("cancelled", &self.is_cancelled())
            .field("deadline", &self.deadline)
            .field("values", &self.values.len())
            .finish()
    }
}
