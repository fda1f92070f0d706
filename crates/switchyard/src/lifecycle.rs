//! Lifecycle hooks around dispatch.
//!
//! # Execution Order
//!
//! - **Ready hooks** run once per process, in registration order, before
//!   the first event is dispatched. Concurrent first events wait for the
//!   same run.
//! - **Before-event hooks** run in registration order at the start of each
//!   event. The first failure stops the rest and is dispatched like any
//!   other error.
//! - **After-response hooks** run in registration order for every event,
//!   including failed and cancelled ones. Their failures are logged and do
//!   not change the response.
//!
//! # Example
//!
//! ```rust
//! use switchyard::lifecycle::Lifecycle;
//!
//! let lifecycle = Lifecycle::new()
//!     .once_before_ready(|_services| async { Ok(()) })
//!     .before_each_event(|ctx| {
//!         Box::pin(async move {
//!             ctx.insert_extension(42_u32);
//!             Ok(())
//!         })
//!     })
//!     .after_each_response(|_ctx, response| {
//!         Box::pin(async move {
//!             response.set_body(format!("{}\n", response.body()));
//!             Ok(())
//!         })
//!     });
//! assert_eq!(lifecycle.hook_counts(), (1, 1, 1));
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use switchyard_core::di::Container;
use switchyard_core::{BoxFuture, DispatchContext, DispatchResult, Response};
use thiserror::Error;
use tokio::sync::OnceCell;

/// A lifecycle hook failed.
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// A ready hook failed; the application will not dispatch events.
    #[error("ready hook `{hook}` failed: {message}")]
    Ready {
        /// Hook name.
        hook: String,
        /// Failure message.
        message: String,
    },

    /// Generic hook error with source.
    #[error("lifecycle hook error: {message}")]
    Hook {
        /// Error message.
        message: String,
        /// Optional source error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl LifecycleError {
    /// Creates a hook error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self::Hook {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a hook error with a source.
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Hook {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Result type for lifecycle hooks.
pub type LifecycleResult<T = ()> = Result<T, LifecycleError>;

/// Runs once before the first event.
pub type ReadyHook = Arc<dyn Fn(Arc<Container>) -> BoxFuture<'static, LifecycleResult> + Send + Sync>;

/// Runs at the start of every event.
pub type BeforeEventHook = Arc<
    dyn for<'a> Fn(&'a mut DispatchContext) -> BoxFuture<'a, DispatchResult<()>> + Send + Sync,
>;

/// Runs after every response is produced.
pub type AfterResponseHook = Arc<
    dyn for<'a> Fn(&'a DispatchContext, &'a mut Response) -> BoxFuture<'a, LifecycleResult>
        + Send
        + Sync,
>;

/// Registered lifecycle hooks.
#[must_use]
#[derive(Default)]
pub struct Lifecycle {
    ready_hooks: Vec<(String, ReadyHook)>,
    before_hooks: Vec<(String, BeforeEventHook)>,
    after_hooks: Vec<(String, AfterResponseHook)>,
    ready: OnceCell<Option<(String, String)>>,
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("ready_hooks", &self.ready_hooks.len())
            .field("before_hooks", &self.before_hooks.len())
            .field("after_hooks", &self.after_hooks.len())
            .field("ready", &self.ready.initialized())
            .finish()
    }
}

impl Lifecycle {
    /// Creates an empty lifecycle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a hook that runs once before the first event.
    pub fn once_before_ready<F, Fut>(self, hook: F) -> Self
    where
        F: Fn(Arc<Container>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = LifecycleResult> + Send + 'static,
    {
        let name = format!("ready_{}", self.ready_hooks.len());
        self.once_before_ready_named(name, hook)
    }

    /// Like [`once_before_ready`](Self::once_before_ready) with a name for logs.
    pub fn once_before_ready_named<F, Fut>(mut self, name: impl Into<String>, hook: F) -> Self
    where
        F: Fn(Arc<Container>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = LifecycleResult> + Send + 'static,
    {
        let hook: ReadyHook = Arc::new(move |services| Box::pin(hook(services)));
        self.ready_hooks.push((name.into(), hook));
        self
    }

    /// Registers a hook that runs before every event is matched.
    pub fn before_each_event<F>(mut self, hook: F) -> Self
    where
        F: for<'a> Fn(&'a mut DispatchContext) -> BoxFuture<'a, DispatchResult<()>>
            + Send
            + Sync
            + 'static,
    {
        let name = format!("before_{}", self.before_hooks.len());
        self.before_hooks.push((name, Arc::new(hook)));
        self
    }

    /// Registers a hook that runs after every response, even on failure.
    pub fn after_each_response<F>(mut self, hook: F) -> Self
    where
        F: for<'a> Fn(&'a DispatchContext, &'a mut Response) -> BoxFuture<'a, LifecycleResult>
            + Send
            + Sync
            + 'static,
    {
        let name = format!("after_{}", self.after_hooks.len());
        self.after_hooks.push((name, Arc::new(hook)));
        self
    }

    /// Number of (ready, before, after) hooks.
    #[must_use]
    pub fn hook_counts(&self) -> (usize, usize, usize) {
        (
            self.ready_hooks.len(),
            self.before_hooks.len(),
            self.after_hooks.len(),
        )
    }

    /// Runs the ready hooks unless they already ran.
    ///
    /// The outcome is remembered: a failed run is reported again on every
    /// later call without re-running any hook.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Ready`] naming the failed hook.
    pub async fn ensure_ready(&self, services: &Arc<Container>) -> LifecycleResult {
        let failure = self
            .ready
            .get_or_init(|| async {
                for (name, hook) in &self.ready_hooks {
                    tracing::debug!(hook = %name, "running ready hook");
                    if let Err(e) = hook(Arc::clone(services)).await {
                        tracing::error!(hook = %name, error = %e, "ready hook failed");
                        return Some((name.clone(), e.to_string()));
                    }
                }
                tracing::debug!(hooks = self.ready_hooks.len(), "application ready");
                None
            })
            .await;

        match failure {
            None => Ok(()),
            Some((hook, message)) => Err(LifecycleError::Ready {
                hook: hook.clone(),
                message: message.clone(),
            }),
        }
    }

    /// Returns true once the ready hooks have run.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self.ready.get(), Some(None))
    }

    /// Runs the before-event hooks, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the failing hook's error.
    pub async fn run_before(&self, ctx: &mut DispatchContext) -> DispatchResult<()> {
        for (name, hook) in &self.before_hooks {
            tracing::trace!(hook = %name, "running before-event hook");
            hook(ctx).await?;
        }
        Ok(())
    }

    /// Runs every after-response hook. Failures are logged.
    pub async fn run_after(&self, ctx: &DispatchContext, response: &mut Response) {
        for (name, hook) in &self.after_hooks {
            if let Err(e) = hook(ctx, response).await {
                tracing::warn!(
                    hook = %name,
                    event_id = %ctx.event_id(),
                    error = %e,
                    "after-response hook failed"
                );
            }
        }
    }
}
