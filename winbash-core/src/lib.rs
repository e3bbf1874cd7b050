//! Bash-syntax parsing, preprocessing, sandboxing, and execution-strategy
//! selection.
//!
//! This crate implements everything between "a raw command string arrived
//! from the caller" and "here is the backend and rendered script the
//! execution engine should run": the AST, the lexer/parser that build it,
//! the two preprocessing tiers, the sandbox validator, the path translator,
//! the strategy analyzer, and the per-utility command emulator. It does not
//! spawn processes itself — that is [`winbash_runner`]'s job.
//!
//! ## Modules
//!
//! - [`ast`] — the AST node set
//! - [`lexer`] / [`parser`] — bash-syntax tokenizer and recursive-descent parser
//! - [`preprocess_pipeline`] — pipeline-level substitutions (`$()`, heredocs, `<()`/`>()`)
//! - [`preprocess_command`] — command-level string rewrites (aliases, `~`, `${...}`, braces)
//! - [`strategy`] — per-node execution backend selection
//! - [`emulator`] — Unix-utility-to-PowerShell/cmd translators
//! - [`path_translator`] — Unix↔Windows virtual namespace mapping
//! - [`sandbox`] — workspace containment and command blacklist enforcement

pub mod ast;
pub mod emulator;
pub mod lexer;
pub mod parser;
pub mod path_translator;
pub mod preprocess_command;
pub mod preprocess_pipeline;
pub mod sandbox;
pub mod strategy;

pub use ast::{AstNode, ProcessSubstitutionDirection, Redirect, RedirectKind};
pub use emulator::{EmulatedCommand, emulate_command, is_quick_command};
pub use parser::parse;
pub use path_translator::{PathTranslator, TranslationDirection, to_git_bash_style};
pub use preprocess_command::{blank_unset_variables, preprocess_command_level, preprocess_for_emulation};
pub use preprocess_pipeline::{
    DEFAULT_MAX_NESTING_DEPTH, PipelineExecutor, PipelinePreprocessResult, PostCommand,
    preprocess_pipeline_level,
};
pub use sandbox::{SandboxRejection, SandboxValidator};
pub use strategy::{CapabilityProbe, SingleCommandBackend, Strategy, StrategyAnalyzer};
