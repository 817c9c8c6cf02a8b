//! First-success-wins chains of fallible async steps.

use std::future::Future;

use anyhow::Result;
use futures::future::BoxFuture;

#[derive(Debug, PartialEq, Eq)]
pub enum Outcome<T> {
    Success { value: T, source: &'static str },

    /// Every step failed, reasons in attempt order
    Failure { reasons: Vec<(&'static str, String)> },
}

impl<T> Outcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn unwrap_or(self, default: T) -> T {
        match self {
            Outcome::Success { value, .. } => value,
            Outcome::Failure { .. } => default,
        }
    }

    pub fn unwrap_or_else(self, default: impl FnOnce(&[(&'static str, String)]) -> T) -> T {
        match self {
            Outcome::Success { value, .. } => value,
            Outcome::Failure { reasons } => default(&reasons),
        }
    }
}

/// Steps are lazy futures; a step is only polled once every step before it
/// has failed.
pub struct Chain<'a, T> {
    steps: Vec<(&'static str, BoxFuture<'a, Result<T>>)>,
}

impl<T> Default for Chain<'_, T> {
    fn default() -> Self {
        Self { steps: Vec::new() }
    }
}

impl<'a, T> Chain<'a, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then<F>(mut self, label: &'static str, step: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'a,
    {
        self.steps.push((label, Box::pin(step)));
        self
    }

    pub async fn run(self) -> Outcome<T> {
        let mut reasons = Vec::with_capacity(self.steps.len());

        for (label, step) in self.steps {
            match step.await {
                Ok(value) => {
                    return Outcome::Success {
                        value,
                        source: label,
                    }
                }
                Err(e) => {
                    debug!("{label} failed: {e:#}");
                    reasons.push((label, format!("{e:#}")));
                }
            }
        }

        Outcome::Failure { reasons }
    }
}
