// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ampliflow contributors

//! Operator interrupts
//!
//! The CLI forwards Ctrl-C here. A running step observes it and kills its
//! child process; outside a step the CLI exits directly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Shared interrupt flag
#[derive(Debug, Clone)]
pub struct Interrupt {
    tx: Arc<watch::Sender<bool>>,
    in_step: Arc<AtomicBool>,
}

impl Interrupt {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            in_step: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Raise the interrupt
    ///
    /// Returns whether the interrupt is being handled: a step command is
    /// running, or an earlier interrupt already stopped one.
    pub fn trigger(&self) -> bool {
        let already = self.tx.send_replace(true);
        already || self.in_step.load(Ordering::SeqCst)
    }

    /// Whether the interrupt has been raised
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Mark a step command as running until the returned guard drops
    pub(crate) fn enter_step(&self) -> StepScope {
        self.in_step.store(true, Ordering::SeqCst);
        StepScope {
            in_step: Arc::clone(&self.in_step),
        }
    }

    /// Resolves once the interrupt is raised
    pub(crate) async fn raised(&self) {
        let mut rx = self.tx.subscribe();
        let raised = rx.wait_for(|v| *v).await.is_ok();
        if !raised {
            std::future::pending::<()>().await;
        }
    }
}

impl Default for Interrupt {
    fn default() -> Self {
        Self::new()
    }
}

/// Clears the "step running" flag on drop
pub(crate) struct StepScope {
    in_step: Arc<AtomicBool>,
}

impl Drop for StepScope {
    fn drop(&mut self) {
        self.in_step.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_trigger_reports_running_step() {
        let interrupt = Interrupt::new();
        assert!(!interrupt.trigger());

        let interrupt = Interrupt::new();
        let scope = interrupt.enter_step();
        assert!(interrupt.trigger());
        drop(scope);
        assert!(interrupt.is_triggered());
        assert!(interrupt.trigger());
    }

    #[tokio::test]
    async fn test_raised_resolves_after_trigger() {
        let interrupt = Interrupt::new();
        let remote = interrupt.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            remote.trigger();
        });

        tokio::time::timeout(Duration::from_secs(5), interrupt.raised())
            .await
            .unwrap();
    }
}
