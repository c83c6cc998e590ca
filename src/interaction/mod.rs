// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ampliflow contributors

//! Operator interaction
//!
//! Prompts, parameter collection, and visualization presentation.

mod parameters;
pub(crate) mod presenter;
pub(crate) mod prompts;

pub use parameters::{parse_overrides, ParameterPrompt};
pub use presenter::{BrowserPresenter, Presenter};
pub use prompts::{is_yes, AutoPrompter, Prompter, TerminalPrompter};
