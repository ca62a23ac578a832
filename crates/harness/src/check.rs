//! The unit of work the batch runner executes.

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// What a single attempt of a check reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    /// The check succeeded
    Pass { note: String },
    /// The check ran and reported failure
    Fail { note: String },
}

impl Outcome {
    /// Passing outcome with a note.
    #[must_use]
    pub fn pass(note: impl Into<String>) -> Self {
        Self::Pass { note: note.into() }
    }

    /// Failing outcome with a note.
    #[must_use]
    pub fn fail(note: impl Into<String>) -> Self {
        Self::Fail { note: note.into() }
    }

    /// Whether this outcome is a pass.
    #[must_use]
    pub const fn is_pass(&self) -> bool {
        matches!(self, Self::Pass { .. })
    }

    /// The free-form note attached to the outcome.
    #[must_use]
    pub fn note(&self) -> &str {
        match self {
            Self::Pass { note } | Self::Fail { note } => note,
        }
    }
}

/// Errors a check can raise instead of returning an [`Outcome`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CheckError {
    /// Generic failure raised by the check body
    #[error("{0}")]
    Failed(String),

    /// The attempt exceeded the runner's timeout
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// A credential the check needs is not configured
    #[error("missing credential: {0}")]
    MissingCredential(String),

    /// Transport-level failure talking to a remote service
    #[error("HTTP error: {0}")]
    Http(String),
}

impl CheckError {
    /// Whether running the same attempt again could succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(self, Self::MissingCredential(_))
    }
}

/// A named smoke check.
#[async_trait]
pub trait Check: Send + Sync {
    /// Display name, also the key used when logging results.
    fn name(&self) -> &str;

    /// Run one attempt.
    async fn run(&self) -> Result<Outcome, CheckError>;
}

type CheckFn = dyn Fn() -> BoxFuture<'static, Result<Outcome, CheckError>> + Send + Sync;

/// A check backed by a closure.
pub struct FnCheck {
    name: String,
    func: Box<CheckFn>,
}

impl FnCheck {
    /// Wrap an async closure.
    pub fn new<F, Fut>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Outcome, CheckError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            func: Box::new(move || Box::pin(func())),
        }
    }

    /// Wrap a synchronous predicate: `true` passes, `false` fails.
    pub fn from_bool<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        let predicate = std::sync::Arc::new(predicate);
        Self::new(name, move || {
            let predicate = std::sync::Arc::clone(&predicate);
            async move {
                if predicate() {
                    Ok(Outcome::pass("returned true"))
                } else {
                    Ok(Outcome::fail("returned false"))
                }
            }
        })
    }

    /// A placeholder check that always passes.
    pub fn always_pass(name: impl Into<String>) -> Self {
        Self::new(name, || async { Ok(Outcome::pass("placeholder check")) })
    }
}

impl std::fmt::Debug for FnCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnCheck").field("name", &self.name).finish()
    }
}

#[async_trait]
impl Check for FnCheck {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self) -> Result<Outcome, CheckError> {
        (self.func)().await
    }
}
