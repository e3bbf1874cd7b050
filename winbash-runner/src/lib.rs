//! Cross-platform command runner that dispatches a single invocation to one
//! of several backend shells (native binary, Git Bash, PowerShell, or
//! `cmd.exe`). The crate exposes a trait-based executor so the orchestrator
//! can swap strategies (real subprocess, dry-run logging, or test-mode
//! synthesis) while reusing the same workspace-safe invocation type.
//!
//! ## Modules
//!
//! - [`executor`] - `CommandExecutor` trait, the multi-backend execution
//!   engine, capability detection, and statistics
//! - [`runner`] - High-level `BashRunner` for workspace-safe operations
//! - [`background`] - Background task management
//! - [`process_group`] - Process group management for reliable cleanup
//! - [`stream`] - Stream utilities for reading output

pub mod background;
pub mod executor;
pub mod policy;
pub mod process_group;
pub mod runner;
pub mod stream;

// Background task management
pub use background::{BackgroundCommandManager, BackgroundTaskHandle, BackgroundTaskStatus};

// Executor variants
#[cfg(feature = "dry-run")]
pub use executor::DryRunCommandExecutor;
pub use executor::{
    Capability, CapabilityInfo, CapabilitySet, CommandCategory, CommandExecutor, CommandInvocation,
    CommandOutput, CommandStatus, ExecutionEngine, ExecutionMethod, ExecutionStats,
    ProcessCommandExecutor, ShellKind, TimeoutError,
};

// Policy types
pub use policy::{AllowAllPolicy, CommandPolicy, WorkspaceGuardPolicy};

// Runner
pub use runner::BashRunner;

// Stream utilities
pub use stream::{ReadLineResult, read_line_with_limit};

// Process group utilities
pub use process_group::{
    DEFAULT_GRACEFUL_TIMEOUT_MS, GracefulTerminationResult, KillSignal, detach_from_tty,
    graceful_kill_process_group, graceful_kill_process_group_default, kill_child_process_group,
    kill_child_process_group_with_signal, kill_process_group, kill_process_group_by_pid,
    kill_process_group_by_pid_with_signal, kill_process_group_with_signal, set_parent_death_signal,
    set_process_group,
};

#[cfg(windows)]
pub use process_group::kill_process;
