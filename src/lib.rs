//! Emulates a POSIX shell command pipeline on Windows hosts, dispatching
//! each command to whichever of Git Bash, PowerShell, `cmd.exe`, or a native
//! GNU-utility port can run it most faithfully.
//!
//! The parsing, preprocessing, sandboxing, and strategy-selection logic
//! lives in [`winbash_core`]; the multi-backend process runner lives in
//! [`winbash_runner`]. This crate is the thin layer that wires the two
//! together behind a single tool-call boundary.

pub mod config;
pub mod orchestrator;
pub mod tool;

pub use config::WinbashConfig;
pub use orchestrator::BashToolExecutor;
pub use tool::{ToolInput, get_definition};
