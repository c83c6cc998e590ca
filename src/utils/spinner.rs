// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ampliflow contributors

//! Progress spinner utilities
//!
//! Provides progress indicators for long-running step commands.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Create a spinner for indeterminate progress
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
            .template("{spinner:.blue} Running: {msg}... {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// A spinner that is cleared when the guard goes out of scope
///
/// Ticking happens on indicatif's background thread. Dropping the guard
/// stops it on every path out of the enclosing scope, including early
/// returns and cancelled futures.
pub struct SpinnerGuard {
    bar: ProgressBar,
}

impl SpinnerGuard {
    /// Start a visible spinner
    pub fn start(message: &str) -> Self {
        Self {
            bar: create_spinner(message),
        }
    }

    /// A guard that draws nothing
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }
}

impl Drop for SpinnerGuard {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_stops_spinner_on_drop() {
        let guard = SpinnerGuard::start("Sequence import");
        let bar = guard.bar.clone();
        assert!(!bar.is_finished());

        drop(guard);
        assert!(bar.is_finished());
    }

    #[test]
    fn test_guard_stops_spinner_on_early_return() {
        fn fails(bar: &mut Option<ProgressBar>) -> Result<(), String> {
            let guard = SpinnerGuard::start("DADA2 denoising");
            *bar = Some(guard.bar.clone());
            Err("exit 1".into())
        }

        let mut bar = None;
        assert!(fails(&mut bar).is_err());
        assert!(bar.unwrap().is_finished());
    }
}
