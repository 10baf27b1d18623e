// SPDX-FileCopyrightText: 2026 Braid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits at the engine's external seams.
//!
//! Tool implementations and the runtime's lifecycle manager live outside
//! the engine; these traits are the contracts it dispatches through.

pub mod lifecycle;
pub mod tool;

pub use lifecycle::RuntimeLifecycle;
pub use tool::ToolExecutor;
